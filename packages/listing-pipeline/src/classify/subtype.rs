//! Sealed-product subtype classification.

use regex::Regex;
use std::sync::LazyLock;

use crate::classify::rules::{first_match, rule_text, Rule};
use crate::types::attributes::ProductSubtype;
use crate::types::product::ProductFamily;

static RE_CASE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(case|cases)\b").unwrap());
static RE_COLLECTOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bcollector'?s?\b").unwrap());
static RE_PLAY_BUNDLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bplay\s+bundle\b").unwrap());
static RE_COLLECTOR_BUNDLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bcollector'?s?\s+bundle\b").unwrap());
static RE_SERIALIZED_ADVANTAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bserialized\s+advantage\b").unwrap());
static RE_STARTER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bstarter\b").unwrap());
static RE_PLAY_BOOSTER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bplay\s+booster\b").unwrap());
static RE_SILVER_PACK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bsilver\s+packs?\b").unwrap());
static RE_BULK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bbulk\b").unwrap());

pub static BOX_RULES: &[Rule<ProductSubtype>] = &[
    Rule {
        name: "case",
        pattern: &RE_CASE,
        unless: None,
        result: ProductSubtype::Case,
    },
    Rule {
        name: "collector box",
        pattern: &RE_COLLECTOR,
        unless: None,
        result: ProductSubtype::CollectorBoosterBox,
    },
];

pub static BUNDLE_RULES: &[Rule<ProductSubtype>] = &[
    Rule {
        name: "serialized advantage",
        pattern: &RE_SERIALIZED_ADVANTAGE,
        unless: None,
        result: ProductSubtype::SerializedAdvantage,
    },
    Rule {
        name: "play bundle",
        pattern: &RE_PLAY_BUNDLE,
        unless: None,
        result: ProductSubtype::PlayBundle,
    },
    Rule {
        name: "collector bundle",
        pattern: &RE_COLLECTOR_BUNDLE,
        unless: None,
        result: ProductSubtype::CollectorBundle,
    },
    Rule {
        name: "starter bundle",
        pattern: &RE_STARTER,
        unless: None,
        result: ProductSubtype::StarterBundle,
    },
];

pub static PACK_RULES: &[Rule<ProductSubtype>] = &[
    Rule {
        name: "collector pack",
        pattern: &RE_COLLECTOR,
        unless: None,
        result: ProductSubtype::CollectorBoosterPack,
    },
    Rule {
        name: "play pack",
        pattern: &RE_PLAY_BOOSTER,
        unless: None,
        result: ProductSubtype::PlayBoosterPack,
    },
    Rule {
        name: "silver pack",
        pattern: &RE_SILVER_PACK,
        unless: None,
        result: ProductSubtype::SilverPack,
    },
];

pub static LOT_RULES: &[Rule<ProductSubtype>] = &[Rule {
    name: "bulk lot",
    pattern: &RE_BULK,
    unless: None,
    result: ProductSubtype::BulkLot,
}];

/// Ladder and fallback for a sealed family; `None` for single items.
fn ladder(family: ProductFamily) -> Option<(&'static [Rule<ProductSubtype>], ProductSubtype)> {
    match family {
        ProductFamily::Box => Some((BOX_RULES, ProductSubtype::BoosterBox)),
        ProductFamily::Bundle => Some((BUNDLE_RULES, ProductSubtype::Bundle)),
        ProductFamily::Pack => Some((PACK_RULES, ProductSubtype::BoosterPack)),
        ProductFamily::Lot => Some((LOT_RULES, ProductSubtype::Lot)),
        ProductFamily::Single | ProductFamily::Proof => None,
    }
}

pub fn detect_subtype(title: &str, family: ProductFamily) -> Option<ProductSubtype> {
    let (rules, fallback) = ladder(family)?;
    let text = rule_text(title);
    Some(
        first_match(rules, &text)
            .map(|rule| rule.result)
            .unwrap_or(fallback),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singles_have_no_subtype() {
        assert_eq!(detect_subtype("Gorrash foil", ProductFamily::Single), None);
        assert_eq!(detect_subtype("Gorrash proof", ProductFamily::Proof), None);
    }

    #[test]
    fn test_box_subtypes() {
        assert_eq!(detect_subtype("Existence Booster Box Case (6 boxes)", ProductFamily::Box), Some(ProductSubtype::Case));
        assert_eq!(detect_subtype("Existence Collector Booster Box", ProductFamily::Box), Some(ProductSubtype::CollectorBoosterBox));
        assert_eq!(detect_subtype("Existence Booster Box", ProductFamily::Box), Some(ProductSubtype::BoosterBox));
    }

    #[test]
    fn test_bundle_subtypes() {
        let bundle = |t: &str| detect_subtype(t, ProductFamily::Bundle);
        assert_eq!(bundle("2x Wonders of the First Existence Play Bundle SEALED"), Some(ProductSubtype::PlayBundle));
        assert_eq!(bundle("Existence Collector's Bundle"), Some(ProductSubtype::CollectorBundle));
        assert_eq!(bundle("Serialized Advantage bundle"), Some(ProductSubtype::SerializedAdvantage));
        assert_eq!(bundle("Existence Starter Bundle"), Some(ProductSubtype::StarterBundle));
        assert_eq!(bundle("Existence Bundle"), Some(ProductSubtype::Bundle));
    }

    #[test]
    fn test_pack_subtypes() {
        let pack = |t: &str| detect_subtype(t, ProductFamily::Pack);
        assert_eq!(pack("Collector Booster Pack"), Some(ProductSubtype::CollectorBoosterPack));
        assert_eq!(pack("Play Booster Pack"), Some(ProductSubtype::PlayBoosterPack));
        assert_eq!(pack("Silver Pack"), Some(ProductSubtype::SilverPack));
        assert_eq!(pack("Booster Pack"), Some(ProductSubtype::BoosterPack));
    }

    #[test]
    fn test_lot_subtypes() {
        assert_eq!(detect_subtype("Bulk lot 500 cards", ProductFamily::Lot), Some(ProductSubtype::BulkLot));
        assert_eq!(detect_subtype("Rare lot", ProductFamily::Lot), Some(ProductSubtype::Lot));
    }
}
