//! Grading detection.
//!
//! Rules run from most to least specific: service with a numeric grade, the
//! service-specific ungraded slab, then a generic "graded" mention. Service
//! codes only match as whole words, so "TAG" never fires inside "vintage".

use regex::{Captures, Regex};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::classify::rules::rule_text;
use crate::types::attributes::{Grading, GradingService};

// An optional condition word may sit between service and grade ("PSA Gem Mint 10").
// A trailing period only ends the grade when no digit follows it.
static RE_SERVICE_GRADE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(psa|bgs|beckett|cgc|sgc|tag)\s*[-:#]?\s*(?:(?:gem\s*(?:mint|mt)|pristine|mint|black\s+label)\s*)?(10(?:\.0)?|[1-9](?:\.[05])?)(?:$|[^\d.]|\.(?:$|\D))",
    )
    .unwrap()
});
static RE_AUTHENTIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bpsa\s*[-:]?\s*(authentic|auth|aa)\b").unwrap());
static RE_GRADED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(graded|slab|slabbed|gem\s+mint)\b").unwrap());

/// A grading rule with a capture-aware result.
pub struct GradingRule {
    pub name: &'static str,
    pub pattern: &'static LazyLock<Regex>,
    pub resolve: fn(&Captures) -> Option<Grading>,
}

pub static GRADING_RULES: &[GradingRule] = &[
    GradingRule {
        name: "service grade",
        pattern: &RE_SERVICE_GRADE,
        resolve: resolve_service_grade,
    },
    GradingRule {
        name: "psa authentic",
        pattern: &RE_AUTHENTIC,
        resolve: resolve_psa_authentic,
    },
    GradingRule {
        name: "graded",
        pattern: &RE_GRADED,
        resolve: resolve_unknown_service,
    },
];

fn parse_service(code: &str) -> Option<GradingService> {
    match code {
        "psa" => Some(GradingService::Psa),
        "bgs" | "beckett" => Some(GradingService::Bgs),
        "cgc" => Some(GradingService::Cgc),
        "sgc" => Some(GradingService::Sgc),
        "tag" => Some(GradingService::Tag),
        _ => None,
    }
}

fn resolve_service_grade(caps: &Captures) -> Option<Grading> {
    let service = parse_service(caps.get(1)?.as_str())?;
    let grade = Decimal::from_str(caps.get(2)?.as_str()).ok()?;
    Some(Grading::Graded { service, grade })
}

fn resolve_psa_authentic(_: &Captures) -> Option<Grading> {
    Some(Grading::Authentic {
        service: GradingService::Psa,
    })
}

fn resolve_unknown_service(_: &Captures) -> Option<Grading> {
    Some(Grading::UnknownService)
}

pub fn detect_grading(title: &str) -> Option<Grading> {
    let text = rule_text(title);
    GRADING_RULES.iter().find_map(|rule| {
        rule.pattern
            .captures(&text)
            .and_then(|caps| (rule.resolve)(&caps))
    })
}
