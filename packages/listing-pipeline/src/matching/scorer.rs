//! Sealed-product scoring.
//!
//! When a title matches more than one sealed candidate (a "Collector Booster
//! Box" title also covers the plain "Booster Box" entry), the additive score
//! below decides ownership. It is also the only input to cross-product
//! reassignment in the deduplicator.

use crate::reference::ReferenceLists;
use crate::text::{contains_phrase, normalize, token_set};
use crate::types::product::{CanonicalProduct, ProductFamily};

pub const VERBATIM_BONUS: i32 = 100;
pub const FAMILY_ALIGNMENT_BONUS: i32 = 15;
pub const GENERIC_NAME_PENALTY: i32 = -10;
pub const SHARED_TOKEN_POINTS: i32 = 2;

/// Distinctive phrases rewarded when both title and candidate contain them.
pub const PHRASE_BONUSES: &[(&str, i32)] = &[
    ("collector booster", 50),
    ("play bundle", 40),
    ("collector bundle", 40),
    ("play booster", 40),
    ("booster box", 30),
    ("booster pack", 20),
    ("case", 20),
];

/// Specificity qualifiers rewarded when both sides share them.
pub const QUALIFIER_BONUSES: &[(&str, i32)] = &[
    ("collector", 25),
    ("serialized advantage", 25),
    ("first edition", 20),
    ("starter", 15),
    ("premium", 15),
];

/// How a title signals its packaging family, in priority order.
pub struct PackagingSignal {
    pub family: ProductFamily,
    pub phrases: &'static [&'static str],
    /// Applied when the title signals this family but the candidate is another
    pub penalty: i32,
}

pub const PACKAGING_SIGNALS: &[PackagingSignal] = &[
    PackagingSignal {
        family: ProductFamily::Bundle,
        phrases: &["bundle", "blaster", "serialized advantage"],
        penalty: -40,
    },
    PackagingSignal {
        family: ProductFamily::Box,
        phrases: &["case", "cases"],
        penalty: -50,
    },
    PackagingSignal {
        family: ProductFamily::Box,
        phrases: &["booster box", "display box", "box"],
        penalty: -40,
    },
    PackagingSignal {
        family: ProductFamily::Lot,
        phrases: &["lot", "bulk"],
        penalty: -20,
    },
    PackagingSignal {
        family: ProductFamily::Pack,
        phrases: &["booster pack", "pack", "packs"],
        penalty: -30,
    },
];

/// Per-rule contributions, kept separate for auditing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScoreBreakdown {
    pub verbatim: i32,
    pub phrases: i32,
    pub packaging: i32,
    pub qualifiers: i32,
    pub generic: i32,
    pub shared_tokens: i32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> i32 {
        self.verbatim + self.phrases + self.packaging + self.qualifiers + self.generic + self.shared_tokens
    }
}

/// The packaging family a normalized title signals, if any.
pub fn signalled_family(norm_title: &str) -> Option<&'static PackagingSignal> {
    PACKAGING_SIGNALS
        .iter()
        .find(|signal| signal.phrases.iter().any(|p| contains_phrase(norm_title, p)))
}

pub struct Scorer<'a> {
    lists: &'a ReferenceLists,
}

impl<'a> Scorer<'a> {
    pub fn new(lists: &'a ReferenceLists) -> Self {
        Self { lists }
    }

    /// Additive score of `title` for a candidate; 0 for non-sealed families.
    pub fn score(&self, title: &str, candidate_name: &str, family: ProductFamily) -> i32 {
        self.breakdown(title, candidate_name, family).total()
    }

    pub fn breakdown(&self, title: &str, candidate_name: &str, family: ProductFamily) -> ScoreBreakdown {
        if !family.is_sealed() {
            return ScoreBreakdown::default();
        }

        let title = normalize(title);
        let candidate = normalize(candidate_name);
        let mut b = ScoreBreakdown::default();

        if contains_phrase(&title, &candidate) {
            b.verbatim = VERBATIM_BONUS;
        }

        b.phrases = shared_phrase_points(&title, &candidate, PHRASE_BONUSES);
        b.qualifiers = shared_phrase_points(&title, &candidate, QUALIFIER_BONUSES);

        b.packaging = match signalled_family(&title) {
            Some(signal) if signal.family == family => FAMILY_ALIGNMENT_BONUS,
            Some(signal) => signal.penalty,
            None => 0,
        };

        if self.lists.is_generic_sealed_name(&candidate) {
            b.generic = GENERIC_NAME_PENALTY;
        }

        let shared = token_set(&title).intersection(&token_set(&candidate)).count() as i32;
        b.shared_tokens = shared * SHARED_TOKEN_POINTS;

        b
    }

    /// Highest-scoring candidate; ties go to the earliest candidate.
    pub fn best_candidate<'p>(
        &self,
        title: &str,
        candidates: impl IntoIterator<Item = &'p CanonicalProduct>,
    ) -> Option<(&'p CanonicalProduct, i32)> {
        let mut best: Option<(&CanonicalProduct, i32)> = None;
        for candidate in candidates {
            let score = self.score(title, &candidate.name, candidate.family);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((candidate, score));
            }
        }
        best
    }
}

fn shared_phrase_points(title: &str, candidate: &str, table: &[(&str, i32)]) -> i32 {
    table
        .iter()
        .filter(|(phrase, _)| contains_phrase(title, phrase) && contains_phrase(candidate, phrase))
        .map(|(_, points)| points)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn scorer_score(title: &str, name: &str, family: ProductFamily) -> i32 {
        let lists = ReferenceLists::default();
        Scorer::new(&lists).score(title, name, family)
    }

    #[test]
    fn test_non_sealed_scores_zero() {
        assert_eq!(scorer_score("Gorrash Foil", "Gorrash", ProductFamily::Single), 0);
        assert_eq!(scorer_score("Gorrash Proof", "Gorrash", ProductFamily::Proof), 0);
    }

    #[test]
    fn test_breakdown_for_exact_bundle() {
        let lists = ReferenceLists::default();
        let b = Scorer::new(&lists).breakdown(
            "Wonders of the First Existence Play Bundle",
            "Existence Play Bundle",
            ProductFamily::Bundle,
        );
        assert_eq!(b.verbatim, 100);
        assert_eq!(b.phrases, 40);
        assert_eq!(b.packaging, 15);
        assert_eq!(b.generic, 0);
        assert_eq!(b.shared_tokens, 6);
        assert_eq!(b.total(), 161);
    }

    #[test]
    fn test_collector_box_beats_generic_box() {
        let title = "Wonders of the First Existence Collector Booster Box Sealed";
        let collector = scorer_score(title, "Existence Collector Booster Box", ProductFamily::Box);
        let generic = scorer_score(title, "Existence Booster Box", ProductFamily::Box);
        assert!(collector > generic, "{collector} <= {generic}");
    }

    #[test]
    fn test_plain_box_title_prefers_plain_box() {
        let title = "Wonders of the First Existence Booster Box";
        let collector = scorer_score(title, "Existence Collector Booster Box", ProductFamily::Box);
        let generic = scorer_score(title, "Existence Booster Box", ProductFamily::Box);
        assert!(generic > collector);
    }

    #[test]
    fn test_packaging_penalty() {
        let title = "Existence Play Bundle";
        let as_box = scorer_score(title, "Existence Booster Box", ProductFamily::Box);
        let as_bundle = scorer_score(title, "Existence Play Bundle", ProductFamily::Bundle);
        assert!(as_box < 0);
        assert!(as_bundle > as_box);
    }

    #[test]
    fn test_generic_name_penalty() {
        let lists = ReferenceLists::default();
        let b = Scorer::new(&lists).breakdown("wotf booster box", "Booster Box", ProductFamily::Box);
        assert_eq!(b.generic, -10);
    }

    #[test]
    fn test_best_candidate_tie_goes_first() {
        let a = CanonicalProduct::new("Existence Booster Pack", ProductFamily::Pack, "Existence");
        let b = CanonicalProduct::new("Existence Booster Pack", ProductFamily::Pack, "Existence");
        let lists = ReferenceLists::default();
        let (best, _) = Scorer::new(&lists)
            .best_candidate("Existence Booster Pack", [&a, &b])
            .unwrap();
        assert_eq!(best.id, a.id);
    }

    const NAMES: &[(&str, ProductFamily)] = &[
        ("Existence Play Bundle", ProductFamily::Bundle),
        ("Existence Collector Booster Box", ProductFamily::Box),
        ("Existence Booster Pack", ProductFamily::Pack),
        ("Existence Bulk Lot", ProductFamily::Lot),
    ];

    proptest! {
        #[test]
        fn prop_verbatim_inclusion_never_lowers_score(
            idx in 0..NAMES.len(),
            prefix in "(wonders of the first |sealed |new |2x |rare )*",
            suffix in "( sealed| fast ship| english| mint| lot| pack)*",
        ) {
            let (name, family) = NAMES[idx];
            let with_name = format!("{prefix}{name}{suffix}");
            let without = format!("{prefix}{suffix}");
            prop_assert!(scorer_score(&with_name, name, family) >= scorer_score(&without, name, family));
        }
    }
}
