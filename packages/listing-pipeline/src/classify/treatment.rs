//! Treatment classification.
//!
//! Sealed families resolve to `Sealed` or `Open Box`. Single items walk the
//! priority ladder below; a title without treatment evidence stays
//! `Unknown` rather than defaulting to paper.

use regex::Regex;
use std::sync::LazyLock;

use crate::classify::rules::{first_match, rule_text, Rule};
use crate::types::attributes::{BaseTreatment, Classification, Treatment};
use crate::types::product::ProductFamily;

static RE_SERIALIZED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(ocm|serialized|serial\s*(#|no\.?|number)?|numbered|1\s*of\s*1|1of1)\b|\b\d{1,3}\s*/\s*(1|5|10|25|50|75|99|100|150|199|250|299)\b",
    )
    .unwrap()
});
static RE_STONEFOIL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bstone\s*-?\s*foil\b").unwrap());
static RE_FORMLESS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bformless\b").unwrap());
static RE_PRERELEASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bpre\s*-?\s*release\b").unwrap());
static RE_PROMO: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bpromo(tional)?\b").unwrap());
static RE_PROOF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bproofs?\b").unwrap());
static RE_ERRATA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\berrata\b").unwrap());
static RE_FOIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(foil|holo|holofoil|holographic|rainbow)\b").unwrap());
static RE_NON_FOIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bnon\s*-?\s*(foil|holo)\b").unwrap());
static RE_PAPER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(paper|non\s*-?\s*(foil|holo))\b").unwrap());
static RE_ALT_ART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(alt|alternate)\s*-?\s*art\b|\balt\b").unwrap());

static RE_SEALED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(factory\s+sealed|sealed|new\s+in\s+box|nib|shrink\s*-?\s*wrapped)\b").unwrap()
});
static RE_OPENED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(opened|open\s+box|unsealed|used|resealed|no\s+shrink|empty\s+box|searched)\b")
        .unwrap()
});

/// Single-item ladder, highest priority first.
pub static SINGLE_RULES: &[Rule<BaseTreatment>] = &[
    Rule {
        name: "serialized",
        pattern: &RE_SERIALIZED,
        unless: None,
        result: BaseTreatment::OcmSerialized,
    },
    Rule {
        name: "stonefoil",
        pattern: &RE_STONEFOIL,
        unless: None,
        result: BaseTreatment::Stonefoil,
    },
    Rule {
        name: "formless",
        pattern: &RE_FORMLESS,
        unless: None,
        result: BaseTreatment::FormlessFoil,
    },
    Rule {
        name: "prerelease",
        pattern: &RE_PRERELEASE,
        unless: None,
        result: BaseTreatment::Prerelease,
    },
    Rule {
        name: "promo",
        pattern: &RE_PROMO,
        unless: None,
        result: BaseTreatment::Promo,
    },
    Rule {
        name: "proof",
        pattern: &RE_PROOF,
        unless: None,
        result: BaseTreatment::Proof,
    },
    Rule {
        name: "errata",
        pattern: &RE_ERRATA,
        unless: None,
        result: BaseTreatment::Errata,
    },
    Rule {
        name: "foil",
        pattern: &RE_FOIL,
        unless: Some(&RE_NON_FOIL),
        result: BaseTreatment::ClassicFoil,
    },
    Rule {
        name: "paper",
        pattern: &RE_PAPER,
        unless: None,
        result: BaseTreatment::ClassicPaper,
    },
];

/// Sealed ladder; sealed phrasing outranks opened phrasing.
pub static SEALED_RULES: &[Rule<BaseTreatment>] = &[
    Rule {
        name: "sealed",
        pattern: &RE_SEALED,
        unless: None,
        result: BaseTreatment::Sealed,
    },
    Rule {
        name: "opened",
        pattern: &RE_OPENED,
        unless: None,
        result: BaseTreatment::OpenBox,
    },
];

pub fn detect_treatment(title: &str, family: ProductFamily) -> Classification<Treatment> {
    let text = rule_text(title);

    if family.is_sealed() {
        let base = first_match(SEALED_RULES, &text)
            .map(|rule| rule.result)
            .unwrap_or(BaseTreatment::Sealed);
        return Classification::Known(Treatment::new(base));
    }

    match first_match(SINGLE_RULES, &text) {
        Some(rule) => {
            let treatment = Treatment::new(rule.result);
            if RE_ALT_ART.is_match(&text) {
                Classification::Known(treatment.with_alt_art())
            } else {
                Classification::Known(treatment)
            }
        }
        None => Classification::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(title: &str) -> String {
        detect_treatment(title, ProductFamily::Single).to_string()
    }

    #[test]
    fn test_serialized_outranks_foil() {
        assert_eq!(single("PSA 10 Wonders of the First Gorrash Foil 12/99"), "OCM Serialized");
        assert_eq!(single("Gorrash OCM holo"), "OCM Serialized");
    }

    #[test]
    fn test_collector_number_is_not_serial() {
        assert_eq!(single("Gorrash 123/401 foil"), "Classic Foil");
    }

    #[test]
    fn test_special_foils() {
        assert_eq!(single("Gorrash Stonefoil"), "Stonefoil");
        assert_eq!(single("Gorrash stone foil"), "Stonefoil");
        assert_eq!(single("Gorrash Formless Foil"), "Formless Foil");
    }

    #[test]
    fn test_promo_family() {
        assert_eq!(single("Gorrash Prerelease foil"), "Prerelease");
        assert_eq!(single("Gorrash promo"), "Promo");
        assert_eq!(single("Gorrash proof"), "Proof");
        assert_eq!(single("Gorrash errata"), "Errata");
    }

    #[test]
    fn test_non_foil_is_paper() {
        assert_eq!(single("Gorrash non-foil"), "Classic Paper");
        assert_eq!(single("Gorrash paper"), "Classic Paper");
    }

    #[test]
    fn test_no_evidence_is_unknown() {
        assert_eq!(
            detect_treatment("Wonders of the First Gorrash", ProductFamily::Single),
            Classification::Unknown
        );
    }

    #[test]
    fn test_alt_art_suffix_needs_base() {
        assert_eq!(single("Gorrash Alt Art Foil"), "Classic Foil Alt Art");
        assert_eq!(
            detect_treatment("Gorrash alt art", ProductFamily::Single),
            Classification::Unknown
        );
    }

    #[test]
    fn test_sealed_default_and_opened() {
        let sealed = |t: &str| detect_treatment(t, ProductFamily::Box).to_string();
        assert_eq!(sealed("Existence Booster Box"), "Sealed");
        assert_eq!(sealed("Existence Booster Box opened"), "Open Box");
        assert_eq!(sealed("Existence box unsealed"), "Open Box");
        // sealed phrasing wins ties
        assert_eq!(sealed("Opened display, sealed packs"), "Sealed");
    }

    #[test]
    fn test_each_single_rule_fires_alone() {
        for (rule, sample) in SINGLE_RULES.iter().zip([
            "x 5/25",
            "stonefoil",
            "formless",
            "prerelease",
            "promo",
            "proof",
            "errata",
            "holo",
            "paper",
        ]) {
            assert!(rule.applies(sample), "rule {} did not fire on {sample}", rule.name);
        }
    }
}
