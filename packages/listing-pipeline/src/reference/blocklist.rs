//! Contamination blocklist.
//!
//! Marketplace searches for this game routinely surface listings from other
//! card games. The blocklist holds phrases that identify those product lines.
//! It is versioned and can be swapped at runtime without rebuilding matchers:
//! matchers take a fresh [`Arc<Blocklist>`] snapshot per call.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

use crate::error::ReferenceError;
use crate::text::{contains_phrase, normalize};

/// Phrases identifying unrelated product lines.
pub const DEFAULT_TERMS: &[&str] = &[
    "pokemon",
    "pokémon",
    "magic the gathering",
    "mtg",
    "yugioh",
    "yu gi oh",
    "lorcana",
    "one piece",
    "flesh and blood",
    "digimon",
    "star wars unlimited",
    "sorcery contested realm",
    "metazoo",
    "grand archive",
    "weiss schwarz",
];

/// A versioned set of contamination phrases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blocklist {
    pub version: u64,
    pub terms: Vec<String>,
}

impl Default for Blocklist {
    fn default() -> Self {
        Self::new(1, DEFAULT_TERMS.iter().copied())
    }
}

impl Blocklist {
    /// Build a blocklist; terms are normalized and blanks dropped.
    pub fn new(version: u64, terms: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        let mut terms: Vec<String> = terms
            .into_iter()
            .map(|t| normalize(t.as_ref()))
            .filter(|t| !t.is_empty())
            .collect();
        terms.sort();
        terms.dedup();
        Self { version, terms }
    }

    /// Parse the JSON document form: `{"version": 3, "terms": ["pokemon", ...]}`.
    pub fn from_json(json: &str) -> Result<Self, ReferenceError> {
        let parsed: Blocklist = serde_json::from_str(json)?;
        Ok(Self::new(parsed.version, parsed.terms))
    }

    /// First term found in an already-normalized title.
    pub fn first_hit(&self, normalized_title: &str) -> Option<&str> {
        self.terms
            .iter()
            .find(|term| contains_phrase(normalized_title, term))
            .map(String::as_str)
    }

    pub fn is_blocked(&self, normalized_title: &str) -> bool {
        self.first_hit(normalized_title).is_some()
    }
}

/// Shared, hot-reloadable handle to the current blocklist.
#[derive(Debug)]
pub struct BlocklistHandle {
    current: RwLock<Arc<Blocklist>>,
}

impl Default for BlocklistHandle {
    fn default() -> Self {
        Self::new(Blocklist::default())
    }
}

impl BlocklistHandle {
    pub fn new(blocklist: Blocklist) -> Self {
        Self {
            current: RwLock::new(Arc::new(blocklist)),
        }
    }

    /// Current blocklist snapshot.
    pub fn snapshot(&self) -> Arc<Blocklist> {
        self.current.read().unwrap().clone()
    }

    pub fn version(&self) -> u64 {
        self.current.read().unwrap().version
    }

    /// Install a newer blocklist. Returns false (and keeps the current one)
    /// when `next` is not strictly newer.
    pub fn replace(&self, next: Blocklist) -> bool {
        let mut current = self.current.write().unwrap();
        if next.version <= current.version {
            return false;
        }
        info!(
            from_version = current.version,
            to_version = next.version,
            terms = next.terms.len(),
            "Blocklist updated"
        );
        *current = Arc::new(next);
        true
    }

    /// Reload from a JSON file. Errors leave the current blocklist in place.
    pub async fn reload_from_path(&self, path: &Path) -> Result<bool, ReferenceError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ReferenceError::Io {
                path: path.display().to_string(),
                source,
            })?;

        match Blocklist::from_json(&json) {
            Ok(next) => Ok(self.replace(next)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Blocklist reload failed, keeping current version");
                Err(e)
            }
        }
    }
}
