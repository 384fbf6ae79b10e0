//! Alternate search phrasings for one product.
//!
//! Marketplace search is keyword based, so one phrasing misses listings that
//! word the product differently. Phrasings go from most to least specific;
//! the orchestrator tries them in order and may stop early.

use crate::types::product::CanonicalProduct;

/// Brand prefix used in search queries.
pub const SEARCH_BRAND: &str = "Wonders of the First";

/// Up to `max` distinct search phrasings for `product`, most specific first.
pub fn search_phrasings(product: &CanonicalProduct, max: usize) -> Vec<String> {
    let name = product.name.trim();
    let mut candidates = Vec::with_capacity(4);

    match product.variant.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        Some(variant) => candidates.push(format!("{SEARCH_BRAND} {name} {variant}")),
        None => candidates.push(format!("{SEARCH_BRAND} {name}")),
    }

    if product.family.is_sealed() {
        let set = product.set_name.trim();
        if !set.is_empty() && !name.to_lowercase().contains(&set.to_lowercase()) {
            candidates.push(format!("{SEARCH_BRAND} {set} {name}"));
        }
        candidates.push(format!("wotf {name}"));
    } else {
        candidates.push(format!("{SEARCH_BRAND} {name}"));
        candidates.push(format!("wotf {name}"));
    }
    candidates.push(name.to_string());

    let mut phrasings: Vec<String> = Vec::with_capacity(max);
    for candidate in candidates {
        if phrasings.len() >= max {
            break;
        }
        if !phrasings.iter().any(|p| p.eq_ignore_ascii_case(&candidate)) {
            phrasings.push(candidate);
        }
    }
    phrasings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::product::ProductFamily;

    #[test]
    fn test_single_with_variant() {
        let product = CanonicalProduct::new("Gorrash", ProductFamily::Single, "Existence").with_variant("Foil");
        assert_eq!(
            search_phrasings(&product, 3),
            vec![
                "Wonders of the First Gorrash Foil",
                "Wonders of the First Gorrash",
                "wotf Gorrash",
            ]
        );
    }

    #[test]
    fn test_no_duplicate_phrasings() {
        let product = CanonicalProduct::new("Gorrash", ProductFamily::Single, "Existence");
        let phrasings = search_phrasings(&product, 5);
        assert_eq!(phrasings, vec!["Wonders of the First Gorrash", "wotf Gorrash", "Gorrash"]);
    }

    #[test]
    fn test_sealed_adds_set_name() {
        let product = CanonicalProduct::new("Play Bundle", ProductFamily::Bundle, "Existence");
        let phrasings = search_phrasings(&product, 2);
        assert_eq!(
            phrasings,
            vec!["Wonders of the First Play Bundle", "Wonders of the First Existence Play Bundle"]
        );
    }

    #[test]
    fn test_bounded() {
        let product = CanonicalProduct::new("Gorrash", ProductFamily::Single, "Existence");
        assert!(search_phrasings(&product, 0).is_empty());
        assert_eq!(search_phrasings(&product, 1).len(), 1);
    }
}
