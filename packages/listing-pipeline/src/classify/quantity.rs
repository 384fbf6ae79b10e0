//! Quantity detection and per-unit price normalization.
//!
//! Only explicit multiplier phrasing counts. Calendar years, serial numbers
//! and product names with digits are blanked out before matching. For sealed
//! products, numbers describing what is inside the product ("contains 24
//! packs", "36 ct booster box") are contents, not units sold.

use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::LazyLock;

use crate::classify::rules::rule_text;
use crate::types::product::ProductFamily;

/// Upper bound for a believable multiplier.
pub const MAX_QUANTITY: u32 = 100;

/// Product-name tokens that contain digits but never mean a count.
pub const COMPOUND_DIGIT_TOKENS: &[&str] = &["1of1", "1 of 1", "3d", "2 player", "2-player", "1st edition"];

static RE_YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(19|20)\d{2}\b").unwrap());
static RE_FRACTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d+\s*/\s*\d+\b").unwrap());
static RE_PRICE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\s*\d+(?:[.,]\d+)*").unwrap());

static RE_PREFIX_X: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[\s(\[])(\d{1,3})\s*x\b").unwrap());
static RE_SUFFIX_X: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bx\s*(\d{1,3})\b").unwrap());
static RE_LOT_OF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:lot|set)\s+of\s+(\d{1,3})\b(?:\s+(?:sealed\s+)?(?:booster\s+|play\s+|collector\s+)?([a-z]+))?")
        .unwrap()
});
static RE_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,3})\s*(?:ct|count|copies)\b").unwrap());
static RE_PLAYSET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bplayset\b").unwrap());
static RE_UNITS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,3})\s+(?:sealed\s+)?(?:[a-z]+\s+)?(?:booster\s+|play\s+|collector\s+)?(boxes|box|bundles|bundle|packs|pack|lots)\b")
        .unwrap()
});
static RE_CONTENTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:contains|containing|includes|including|with|w/)\s+\d{1,3}\b|\b\d{1,3}\s*(?:packs?|cards?|ct|count)\s+(?:per|each|in|inside)\b|\b\d{1,3}\s*(?:ct|count|cards?)\b",
    )
    .unwrap()
});

/// Nouns naming the unit sold for a sealed family.
fn unit_nouns(family: ProductFamily) -> &'static [&'static str] {
    match family {
        ProductFamily::Box => &["box", "boxes"],
        ProductFamily::Bundle => &["bundle", "bundles"],
        ProductFamily::Pack => &["pack", "packs"],
        ProductFamily::Lot => &["lots"],
        ProductFamily::Single | ProductFamily::Proof => &[],
    }
}

/// Nouns naming what a sealed family contains.
fn content_nouns(family: ProductFamily) -> &'static [&'static str] {
    match family {
        ProductFamily::Box | ProductFamily::Bundle => &["pack", "packs", "card", "cards"],
        ProductFamily::Pack | ProductFamily::Lot => &["card", "cards", "pack", "packs"],
        ProductFamily::Single | ProductFamily::Proof => &[],
    }
}

fn in_bounds(n: u32) -> Option<u32> {
    (1..=MAX_QUANTITY).contains(&n).then_some(n)
}

fn first_number(re: &Regex, text: &str) -> Option<u32> {
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1)?.as_str().parse().ok())
        .find_map(in_bounds)
}

/// Blank out tokens that contain digits but are never counts.
fn scrub(text: &str) -> String {
    let mut text = RE_PRICE.replace_all(text, " ").into_owned();
    text = RE_YEAR.replace_all(&text, " ").into_owned();
    text = RE_FRACTION.replace_all(&text, " ").into_owned();
    for token in COMPOUND_DIGIT_TOKENS {
        text = text.replace(token, " ");
    }
    text
}

/// Number of units the listing sells; 1 when no multiplier is present.
pub fn detect_quantity(title: &str, family: ProductFamily) -> u32 {
    let text = scrub(&rule_text(title));

    if family.is_sealed() {
        detect_sealed_units(&text, family)
    } else {
        detect_single_units(&text)
    }
    .unwrap_or(1)
}

fn detect_single_units(text: &str) -> Option<u32> {
    first_number(&RE_PREFIX_X, text)
        .or_else(|| first_number(&RE_SUFFIX_X, text))
        .or_else(|| first_number(&RE_LOT_OF, text))
        .or_else(|| first_number(&RE_COUNT, text))
        .or_else(|| RE_PLAYSET.is_match(text).then_some(4))
}

fn detect_sealed_units(text: &str, family: ProductFamily) -> Option<u32> {
    let text = RE_CONTENTS.replace_all(text, " ");

    if let Some(n) = first_number(&RE_PREFIX_X, &text).or_else(|| first_number(&RE_SUFFIX_X, &text)) {
        return Some(n);
    }

    let contents = content_nouns(family);
    let lot = RE_LOT_OF.captures_iter(&text).find_map(|caps| {
        let noun = caps.get(2).map(|m| m.as_str());
        if noun.is_some_and(|n| contents.contains(&n)) {
            return None;
        }
        caps.get(1)?.as_str().parse().ok().and_then(in_bounds)
    });
    if lot.is_some() {
        return lot;
    }

    let units = unit_nouns(family);
    RE_UNITS.captures_iter(&text).find_map(|caps| {
        let noun = caps.get(2)?.as_str();
        if !units.contains(&noun) {
            return None;
        }
        caps.get(1)?.as_str().parse().ok().and_then(in_bounds)
    })
}

/// Total divided by quantity, rounded to cents (half away from zero).
pub fn per_unit_price(total: Decimal, quantity: u32) -> Decimal {
    if quantity <= 1 {
        return total;
    }
    (total / Decimal::from(quantity)).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
