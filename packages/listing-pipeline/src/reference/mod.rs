//! Reference data consumed at the pipeline boundary.
//!
//! - [`blocklist`] - versioned, hot-reloadable contamination terms
//! - [`catalog`] - read-through cache over canonical products
//! - [`ReferenceLists`] - brand identifiers and maintained name lists

pub mod blocklist;
pub mod catalog;

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::text::{contains_phrase, normalize, token_set};

pub use blocklist::{Blocklist, BlocklistHandle};
pub use catalog::{Catalog, CatalogCache, CatalogSource};

/// Phrases that positively identify this game in a title.
pub const BRAND_IDENTIFIERS: &[&str] = &["wonders of the first", "wotf"];

/// Catalog names too common to trust without a brand identifier.
pub const AMBIGUOUS_NAMES: &[&str] = &[
    "booster box",
    "booster pack",
    "bundle",
    "dragon",
    "guardian",
    "fire",
    "shadow",
    "existence",
    "genesis",
];

/// Sealed catalog names so generic the scorer discounts them.
pub const GENERIC_SEALED_NAMES: &[&str] = &["booster box", "booster pack", "bundle", "lot", "case"];

/// Maintained lists the matcher and scorer consult.
#[derive(Debug, Clone)]
pub struct ReferenceLists {
    pub blocklist: Arc<BlocklistHandle>,
    brand_identifiers: Vec<String>,
    ambiguous_names: BTreeSet<String>,
    generic_sealed_names: BTreeSet<String>,
}

impl Default for ReferenceLists {
    fn default() -> Self {
        Self::new(Arc::new(BlocklistHandle::default()))
    }
}

impl ReferenceLists {
    pub fn new(blocklist: Arc<BlocklistHandle>) -> Self {
        Self {
            blocklist,
            brand_identifiers: normalize_all(BRAND_IDENTIFIERS.iter().copied()).into_iter().collect(),
            ambiguous_names: normalize_all(AMBIGUOUS_NAMES.iter().copied()),
            generic_sealed_names: normalize_all(GENERIC_SEALED_NAMES.iter().copied()),
        }
    }

    pub fn with_ambiguous_names(mut self, names: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        self.ambiguous_names = normalize_all(names);
        self
    }

    pub fn with_generic_sealed_names(mut self, names: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        self.generic_sealed_names = normalize_all(names);
        self
    }

    /// Whether a normalized title carries a trusted brand identifier.
    pub fn has_brand(&self, normalized_title: &str) -> bool {
        self.brand_identifiers
            .iter()
            .any(|b| contains_phrase(normalized_title, b))
    }

    pub fn is_ambiguous_name(&self, normalized_name: &str) -> bool {
        self.ambiguous_names.contains(normalized_name)
    }

    pub fn is_generic_sealed_name(&self, normalized_name: &str) -> bool {
        self.generic_sealed_names.contains(normalized_name)
    }

    /// Tokens that make up the brand identifiers.
    pub fn brand_tokens(&self) -> BTreeSet<String> {
        self.brand_identifiers
            .iter()
            .flat_map(|b| token_set(b))
            .collect()
    }
}

fn normalize_all(items: impl IntoIterator<Item = impl AsRef<str>>) -> BTreeSet<String> {
    items
        .into_iter()
        .map(|s| normalize(s.as_ref()))
        .filter(|s| !s.is_empty())
        .collect()
}
