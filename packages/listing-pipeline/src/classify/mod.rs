//! Attribute classification.
//!
//! Four independent classifiers run over a listing title once it has been
//! matched to a product family:
//!
//! - [`treatment`] - print treatment, or sealed / opened for sealed families
//! - [`subtype`] - sealed-product subtype
//! - [`grading`] - grading service and grade
//! - [`quantity`] - units sold, driving the per-unit price
//!
//! Each classifier is an ordered [`rules::Rule`] table; the first rule that
//! applies wins.

pub mod grading;
pub mod quantity;
pub mod rules;
pub mod subtype;
pub mod treatment;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::attributes::{Classification, Grading, ProductSubtype, Treatment};
use crate::types::listing::{ClassifiedListing, RawListing};
use crate::types::product::{ProductFamily, ProductId};

pub use grading::detect_grading;
pub use quantity::{detect_quantity, per_unit_price};
pub use subtype::detect_subtype;
pub use treatment::detect_treatment;

/// Everything the classifiers derive from one title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedAttributes {
    pub treatment: Classification<Treatment>,
    pub subtype: Option<ProductSubtype>,
    pub grading: Option<Grading>,
    pub quantity: u32,
    /// Total price divided by quantity
    pub unit_price: Decimal,
}

/// Run all four classifiers over a raw listing.
pub fn classify(raw: &RawListing, family: ProductFamily) -> ClassifiedAttributes {
    let quantity = detect_quantity(&raw.title, family);
    ClassifiedAttributes {
        treatment: detect_treatment(&raw.title, family),
        subtype: detect_subtype(&raw.title, family),
        grading: detect_grading(&raw.title),
        quantity,
        unit_price: per_unit_price(raw.price, quantity),
    }
}

/// Combine a raw listing with its product and derived attributes.
///
/// The stored price is the per-unit price; the raw total is not kept.
pub fn into_classified(raw: RawListing, product_id: ProductId, attrs: ClassifiedAttributes) -> ClassifiedListing {
    ClassifiedListing {
        title: raw.title,
        price: attrs.unit_price,
        quantity: attrs.quantity,
        external_id: raw.external_id,
        sold_at: raw.sold_at,
        kind: raw.kind,
        observed_at: raw.observed_at,
        treatment: attrs.treatment,
        subtype: attrs.subtype,
        grading: attrs.grading,
        product_id,
        is_duplicate: false,
        metadata: raw.metadata,
    }
}
