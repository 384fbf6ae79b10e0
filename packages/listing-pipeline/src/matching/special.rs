//! The one catalog entry that token overlap cannot resolve.
//!
//! The card "The First" shares its name with the game itself, so every
//! branded title contains its tokens. It matches only on an explicit
//! collector code or a compound phrase, after the brand phrase is removed.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use crate::reference::Catalog;

static RE_NUMBERED_VARIANT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\s*(\d+)").unwrap());

static RE_BRAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"wonders\s+of\s+the\s+first|wonders\s+of\s+first").unwrap());

/// A catalog entry that only matches through explicit evidence.
pub struct SpecialCaseRule {
    /// Normalized catalog name this rule owns
    pub normalized_name: &'static str,

    /// Collector codes that identify the card on their own
    pub codes: &'static [&'static str],

    /// Phrases that identify the card once the brand phrase is removed
    pub phrases: &'static [&'static str],

    /// The only numbered variant (`#N`) allowed
    pub allowed_number: u32,
}

pub const THE_FIRST: SpecialCaseRule = SpecialCaseRule {
    normalized_name: "first",
    codes: &["001/401", "wotf-001", "wotf 001"],
    phrases: &["the first #1", "the first card", "the first promo"],
    allowed_number: 1,
};

pub const SPECIAL_CASES: &[SpecialCaseRule] = &[THE_FIRST];

/// Rule owning a normalized candidate name, if any.
pub fn rule_for(normalized_candidate: &str) -> Option<&'static SpecialCaseRule> {
    SPECIAL_CASES
        .iter()
        .find(|rule| rule.normalized_name == normalized_candidate)
}

impl SpecialCaseRule {
    /// Decide a match for this entry.
    ///
    /// `title_tokens` are the meaningful tokens of the normalized title;
    /// `own_tokens` are the tokens of this entry's name.
    pub fn matches(
        &self,
        title: &str,
        title_tokens: &BTreeSet<String>,
        own_tokens: &BTreeSet<String>,
        catalog: &Catalog,
    ) -> bool {
        let lowered = title.to_lowercase();
        let unbranded = RE_BRAND.replace_all(&lowered, " ");
        let unbranded = unbranded.split_whitespace().collect::<Vec<_>>().join(" ");

        for cap in RE_NUMBERED_VARIANT.captures_iter(&unbranded) {
            let number: u32 = cap[1].parse().unwrap_or(u32::MAX);
            if number != self.allowed_number {
                return false;
            }
        }

        let names_other_entity = title_tokens
            .iter()
            .any(|t| !own_tokens.contains(t) && catalog.is_entity_token(t));
        if names_other_entity {
            return false;
        }

        self.codes.iter().any(|code| unbranded.contains(code))
            || self.phrases.iter().any(|phrase| unbranded.contains(phrase))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::{normalize, token_set};
    use crate::types::product::{CanonicalProduct, ProductFamily};

    fn catalog() -> Catalog {
        let brand: BTreeSet<String> = ["wonders", "first", "wotf"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        Catalog::new(
            vec![
                CanonicalProduct::new("The First", ProductFamily::Single, "Existence"),
                CanonicalProduct::new("Gorrash", ProductFamily::Single, "Existence"),
            ],
            &brand,
        )
    }

    fn check(title: &str) -> bool {
        let tokens = token_set(&normalize(title));
        let own = token_set("first");
        THE_FIRST.matches(title, &tokens, &own, &catalog())
    }

    #[test]
    fn test_brand_alone_does_not_match() {
        assert!(!check("Wonders of the First Existence Booster Pack"));
        assert!(!check("Wonders of the First card lot"));
    }

    #[test]
    fn test_code_matches() {
        assert!(check("Wonders of the First 001/401 Classic Foil"));
        assert!(check("WOTF-001 holo"));
    }

    #[test]
    fn test_phrase_matches() {
        assert!(check("Wonders of the First The First #1 Promo"));
        assert!(check("The First card - Existence"));
    }

    #[test]
    fn test_other_numbered_variant_rejects() {
        assert!(!check("The First #3 Wonders of the First"));
    }

    #[test]
    fn test_other_entity_rejects() {
        assert!(!check("The First card + Gorrash 001/401"));
    }

    #[test]
    fn test_rule_lookup() {
        assert!(rule_for(&normalize("The First")).is_some());
        assert!(rule_for("gorrash").is_none());
    }
}
