//! Candidate matching: does a listing title belong to a catalog entry?

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::matching::special;
use crate::reference::{Blocklist, Catalog, ReferenceLists};
use crate::text::{contains_phrase, normalize, token_set};
use crate::types::product::{CanonicalProduct, ProductFamily};

/// Required coverage for sealed families.
pub const SEALED_RATIO: f64 = 0.6;
/// Required coverage for names with at most two meaningful tokens.
pub const SHORT_NAME_RATIO: f64 = 1.0;
/// Required coverage for everything else.
pub const DEFAULT_RATIO: f64 = 0.8;

/// Single-token names at or below this length never fuzzy match.
const SHORT_TOKEN_NO_FUZZ: usize = 6;

/// Title phrasing that means several packs are being sold together.
const MULTI_PACK_PHRASES: &[&str] = &["bundle", "booster box", "display box", "case", "blaster"];

/// Title phrasing that means one loose pack is being sold.
const SINGLE_PACK_PHRASES: &[&str] = &["single pack", "loose pack", "1 pack", "one pack", "single booster"];

/// Extra words that count as evidence for a variant keyword.
const VARIANT_SYNONYMS: &[(&str, &[&str])] = &[
    ("foil", &["holo", "holofoil", "foil"]),
    ("serialized", &["ocm", "numbered", "serial", "serialized"]),
    ("stonefoil", &["stonefoil", "stone foil"]),
    ("formless", &["formless"]),
    ("alt", &["alt art", "alternate art", "alt"]),
    ("promo", &["promo", "promotional"]),
    ("prerelease", &["prerelease", "pre release"]),
    ("paper", &["paper", "non foil", "nonfoil"]),
];

/// Why a title was rejected for a candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    Blocklisted(String),
    AmbiguousWithoutBrand,
    PackagingMismatch,
    EmptyCandidate,
    InsufficientOverlap { ratio: f64, required: f64 },
    MissingVariant,
    SpecialCase,
}

/// Result of evaluating one title against one candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchVerdict {
    Accepted { ratio: f64 },
    Rejected(RejectReason),
}

impl MatchVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, MatchVerdict::Accepted { .. })
    }
}

/// Arguments of one match decision.
#[derive(Debug, Clone, Copy)]
pub struct MatchInput<'t> {
    pub title: &'t str,
    pub candidate_name: &'t str,
    pub family: ProductFamily,
    pub variant: Option<&'t str>,
}

impl<'t> MatchInput<'t> {
    pub fn for_product(title: &'t str, product: &'t CanonicalProduct) -> Self {
        Self {
            title,
            candidate_name: &product.name,
            family: product.family,
            variant: product.variant.as_deref(),
        }
    }
}

/// Entity-resolution rules over a fixed set of reference data.
///
/// Takes a blocklist snapshot at construction; build a new matcher per page
/// to pick up hot-reloaded terms.
pub struct Matcher<'a> {
    lists: &'a ReferenceLists,
    blocklist: Arc<Blocklist>,
    catalog: &'a Catalog,
}

impl<'a> Matcher<'a> {
    pub fn new(lists: &'a ReferenceLists, catalog: &'a Catalog) -> Self {
        Self {
            lists,
            blocklist: lists.blocklist.snapshot(),
            catalog,
        }
    }

    /// Whether `title` belongs to the candidate.
    pub fn is_match(
        &self,
        title: &str,
        candidate_name: &str,
        family: ProductFamily,
        variant: Option<&str>,
    ) -> bool {
        self.evaluate(title, candidate_name, family, variant)
            .is_accepted()
    }

    pub fn matches_product(&self, title: &str, product: &CanonicalProduct) -> bool {
        self.check(MatchInput::for_product(title, product)).is_accepted()
    }

    pub fn check(&self, input: MatchInput<'_>) -> MatchVerdict {
        self.evaluate(input.title, input.candidate_name, input.family, input.variant)
    }

    /// Full decision with the reason for rejection.
    pub fn evaluate(
        &self,
        title: &str,
        candidate_name: &str,
        family: ProductFamily,
        variant: Option<&str>,
    ) -> MatchVerdict {
        let norm_title = normalize(title);
        let norm_candidate = normalize(candidate_name);
        let branded = self.lists.has_brand(&norm_title);

        if !branded {
            if let Some(term) = self.blocklist.first_hit(&norm_title) {
                return MatchVerdict::Rejected(RejectReason::Blocklisted(term.to_string()));
            }
        }

        let title_tokens = token_set(&norm_title);
        let candidate_tokens = token_set(&norm_candidate);

        if let Some(rule) = special::rule_for(&norm_candidate) {
            return if rule.matches(title, &title_tokens, &candidate_tokens, self.catalog) {
                MatchVerdict::Accepted { ratio: 1.0 }
            } else {
                MatchVerdict::Rejected(RejectReason::SpecialCase)
            };
        }

        if !branded && self.lists.is_ambiguous_name(&norm_candidate) {
            return MatchVerdict::Rejected(RejectReason::AmbiguousWithoutBrand);
        }

        if family.is_sealed() && packaging_conflict(&norm_title, &norm_candidate, family) {
            return MatchVerdict::Rejected(RejectReason::PackagingMismatch);
        }

        if candidate_tokens.is_empty() {
            return MatchVerdict::Rejected(RejectReason::EmptyCandidate);
        }

        let overlap = token_overlap(&title_tokens, &candidate_tokens);
        let ratio = overlap.ratio(candidate_tokens.len());
        let required = required_ratio(family, candidate_tokens.len());
        if ratio < required {
            return MatchVerdict::Rejected(RejectReason::InsufficientOverlap { ratio, required });
        }

        if let Some(variant) = variant {
            let near_total = overlap.exact == candidate_tokens.len() && candidate_tokens.len() >= 3;
            if !family.is_sealed() && !near_total && !has_variant_evidence(&norm_title, &title_tokens, variant) {
                return MatchVerdict::Rejected(RejectReason::MissingVariant);
            }
        }

        MatchVerdict::Accepted { ratio }
    }
}

/// Minimum coverage of candidate tokens for a family and name length.
pub fn required_ratio(family: ProductFamily, candidate_len: usize) -> f64 {
    if family.is_sealed() {
        SEALED_RATIO
    } else if candidate_len <= 2 {
        SHORT_NAME_RATIO
    } else {
        DEFAULT_RATIO
    }
}

/// Exact and fuzzy coverage of candidate tokens by title tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Overlap {
    pub exact: usize,
    pub fuzzy: usize,
}

impl Overlap {
    pub fn ratio(&self, candidate_len: usize) -> f64 {
        if candidate_len == 0 {
            return 0.0;
        }
        (self.exact + self.fuzzy) as f64 / candidate_len as f64
    }
}

pub fn token_overlap(title: &BTreeSet<String>, candidate: &BTreeSet<String>) -> Overlap {
    let exact = candidate.intersection(title).count();

    let fuzz_disabled = candidate.len() == 1
        && candidate
            .iter()
            .next()
            .is_some_and(|t| t.chars().count() <= SHORT_TOKEN_NO_FUZZ);

    let fuzzy = if fuzz_disabled {
        0
    } else {
        candidate
            .difference(title)
            .filter(|c| title.iter().any(|t| fuzzy_equal(c, t)))
            .count()
    };

    Overlap { exact, fuzzy }
}

/// Minimum edit-distance similarity for a candidate token of `len` chars.
pub fn fuzzy_threshold(len: usize) -> f64 {
    match len {
        0..=5 => 0.90,
        6..=7 => 0.85,
        _ => 0.80,
    }
}

fn fuzzy_equal(candidate: &str, title: &str) -> bool {
    if candidate.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }
    let c_len = candidate.chars().count();
    let t_len = title.chars().count();
    if c_len.abs_diff(t_len) > 2 {
        return false;
    }
    strsim::normalized_levenshtein(candidate, title) >= fuzzy_threshold(c_len)
}

fn packaging_conflict(norm_title: &str, norm_candidate: &str, family: ProductFamily) -> bool {
    let signals = |phrases: &[&str]| {
        phrases
            .iter()
            .any(|p| contains_phrase(norm_title, p) && !contains_phrase(norm_candidate, p))
    };

    match family {
        ProductFamily::Pack => signals(MULTI_PACK_PHRASES),
        ProductFamily::Bundle | ProductFamily::Box => signals(SINGLE_PACK_PHRASES),
        _ => false,
    }
}

fn has_variant_evidence(norm_title: &str, title_tokens: &BTreeSet<String>, variant: &str) -> bool {
    token_set(&normalize(variant)).iter().any(|keyword| {
        if title_tokens.contains(keyword) {
            return true;
        }
        VARIANT_SYNONYMS
            .iter()
            .filter(|(key, _)| key == keyword)
            .flat_map(|(_, synonyms)| synonyms.iter())
            .any(|syn| contains_phrase(norm_title, syn))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ReferenceLists;
    use crate::types::product::CanonicalProduct;

    fn catalog() -> Catalog {
        let lists = ReferenceLists::default();
        Catalog::new(
            vec![
                CanonicalProduct::new("The First", ProductFamily::Single, "Existence"),
                CanonicalProduct::new("Gorrash", ProductFamily::Single, "Existence"),
            ],
            &lists.brand_tokens(),
        )
    }

    fn with_matcher<R>(f: impl FnOnce(&Matcher) -> R) -> R {
        let lists = ReferenceLists::default();
        let catalog = catalog();
        let matcher = Matcher::new(&lists, &catalog);
        f(&matcher)
    }

    #[test]
    fn test_exact_single_name() {
        with_matcher(|m| {
            assert!(m.is_match("Wonders of the First Gorrash Foil", "Gorrash", ProductFamily::Single, None));
        });
    }

    #[test]
    fn test_blocklist_rejects_unbranded() {
        with_matcher(|m| {
            let verdict = m.evaluate("Pokemon Gorrash lookalike", "Gorrash", ProductFamily::Single, None);
            assert_eq!(verdict, MatchVerdict::Rejected(RejectReason::Blocklisted("pokemon".into())));
        });
    }

    #[test]
    fn test_brand_skips_blocklist() {
        with_matcher(|m| {
            assert!(m.is_match(
                "Wonders of the First Gorrash - not pokemon",
                "Gorrash",
                ProductFamily::Single,
                None
            ));
        });
    }

    #[test]
    fn test_ambiguous_name_needs_brand() {
        with_matcher(|m| {
            assert!(!m.is_match("Dragon holo card", "Dragon", ProductFamily::Single, None));
            assert!(m.is_match("WOTF Dragon holo", "Dragon", ProductFamily::Single, None));
        });
    }

    #[test]
    fn test_short_names_need_full_coverage() {
        with_matcher(|m| {
            assert!(!m.is_match("Wonders of the First Ashen Foil", "Ashen Tyrant", ProductFamily::Single, None));
            assert!(m.is_match("Wonders of the First Ashen Tyrant", "Ashen Tyrant", ProductFamily::Single, None));
        });
    }

    #[test]
    fn test_long_names_allow_partial_coverage() {
        with_matcher(|m| {
            // 4 of 5 tokens = 0.8
            assert!(m.is_match(
                "Sovereign of Ember Tides Reborn",
                "Sovereign of Ember Tides Unbound Reborn",
                ProductFamily::Single,
                None
            ));
            // 3 of 5 tokens = 0.6
            assert!(!m.is_match(
                "Sovereign Ember Reborn",
                "Sovereign of Ember Tides Unbound Reborn",
                ProductFamily::Single,
                None
            ));
        });
    }

    #[test]
    fn test_fuzzy_tolerates_typos_on_long_tokens() {
        with_matcher(|m| {
            assert!(m.is_match("Wonders of the First Bathraal Warden", "Bathr'al Warden", ProductFamily::Single, None));
        });
    }

    #[test]
    fn test_short_single_token_never_fuzzes() {
        with_matcher(|m| {
            assert!(!m.is_match("Wonders of the First Mirith", "Mireth", ProductFamily::Single, None));
            // seven characters is long enough to fuzz
            assert!(m.is_match("Wonders of the First Gorash", "Gorrash", ProductFamily::Single, None));
        });
    }

    #[test]
    fn test_fuzzy_thresholds() {
        assert_eq!(fuzzy_threshold(5), 0.90);
        assert_eq!(fuzzy_threshold(7), 0.85);
        assert_eq!(fuzzy_threshold(12), 0.80);
        assert!(!fuzzy_equal("warden", "wardens2x"));
    }

    #[test]
    fn test_sealed_ratio() {
        with_matcher(|m| {
            // 3 of 4 tokens
            assert!(m.is_match(
                "Wonders of the First Existence Collector Box",
                "Existence Collector Booster Box",
                ProductFamily::Box,
                None
            ));
        });
    }

    #[test]
    fn test_pack_candidate_rejects_bundle_title() {
        with_matcher(|m| {
            let verdict = m.evaluate(
                "Wonders of the First Existence Play Bundle booster pack",
                "Existence Booster Pack",
                ProductFamily::Pack,
                None,
            );
            assert_eq!(verdict, MatchVerdict::Rejected(RejectReason::PackagingMismatch));
        });
    }

    #[test]
    fn test_bundle_candidate_rejects_loose_pack() {
        with_matcher(|m| {
            assert!(!m.is_match(
                "WOTF Existence Play Bundle single pack",
                "Existence Play Bundle",
                ProductFamily::Bundle,
                None
            ));
        });
    }

    #[test]
    fn test_variant_requires_evidence() {
        with_matcher(|m| {
            assert!(!m.is_match("Wonders of the First Gorrash", "Gorrash", ProductFamily::Single, Some("Formless Foil")));
            assert!(m.is_match("Wonders of the First Gorrash holo", "Gorrash", ProductFamily::Single, Some("Foil")));
            assert!(m.is_match("Wonders of the First Gorrash Formless", "Gorrash", ProductFamily::Single, Some("Formless Foil")));
        });
    }

    #[test]
    fn test_variant_skipped_for_sealed() {
        with_matcher(|m| {
            assert!(m.is_match(
                "Wonders of the First Existence Booster Box",
                "Existence Booster Box",
                ProductFamily::Box,
                Some("Collector")
            ));
        });
    }

    #[test]
    fn test_special_case_routed() {
        with_matcher(|m| {
            assert!(!m.is_match("Wonders of the First Booster Pack", "The First", ProductFamily::Single, None));
            assert!(m.is_match("Wonders of the First 001/401 The First", "The First", ProductFamily::Single, None));
        });
    }
}
