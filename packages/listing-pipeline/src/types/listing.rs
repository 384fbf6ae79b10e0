//! Raw and classified marketplace listings.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::error::InputError;
use crate::text::normalize;
use crate::types::attributes::{Classification, Grading, ProductSubtype, Treatment};
use crate::types::product::ProductId;

/// Identifier of a persisted listing row.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub Uuid);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Whether the listing is still for sale or has settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    Active,
    Sold,
}

/// A listing as handed over by the extraction layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawListing {
    pub title: String,

    /// Total asking or settled price, already parsed upstream
    pub price: Decimal,

    /// Marketplace-assigned id, unique per marketplace
    #[serde(default)]
    pub external_id: Option<String>,

    /// Settlement time (required for sold listings)
    #[serde(default)]
    pub sold_at: Option<DateTime<Utc>>,

    pub kind: ListingKind,

    /// When the scrape observed the listing
    #[serde(default = "Utc::now")]
    pub observed_at: DateTime<Utc>,

    /// Pass-through fields (url, seller, image, ...)
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl RawListing {
    pub fn active(title: impl Into<String>, price: Decimal) -> Self {
        Self {
            title: title.into(),
            price,
            external_id: None,
            sold_at: None,
            kind: ListingKind::Active,
            observed_at: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    pub fn sold(title: impl Into<String>, price: Decimal, sold_at: DateTime<Utc>) -> Self {
        Self {
            kind: ListingKind::Sold,
            sold_at: Some(sold_at),
            ..Self::active(title, price)
        }
    }

    pub fn with_external_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = Some(id.into());
        self
    }

    pub fn with_observed_at(mut self, at: DateTime<Utc>) -> Self {
        self.observed_at = at;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Reject records missing a required field.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.title.trim().is_empty() {
            return Err(InputError::EmptyTitle);
        }
        if self.price <= Decimal::ZERO {
            return Err(InputError::NonPositivePrice(self.price.to_string()));
        }
        if self.kind == ListingKind::Sold && self.sold_at.is_none() {
            return Err(InputError::MissingSettlement);
        }
        Ok(())
    }

    /// External id with surrounding whitespace removed; blank ids count as absent.
    pub fn resolved_external_id(&self) -> Option<&str> {
        self.external_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Settlement date for sold listings, observation date otherwise.
    pub fn key_date(&self) -> NaiveDate {
        match (self.kind, self.sold_at) {
            (ListingKind::Sold, Some(at)) => at.date_naive(),
            _ => self.observed_at.date_naive(),
        }
    }
}

/// Fallback uniqueness tuple for listings without an external id.
///
/// The title is stored normalized, so case and punctuation variants of one
/// listing share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompositeKey {
    pub title: String,
    pub price: Decimal,
    pub date: NaiveDate,
}

impl CompositeKey {
    pub fn new(title: &str, price: Decimal, date: NaiveDate) -> Self {
        Self {
            title: normalize(title),
            price: price.normalize(),
            date,
        }
    }
}

/// A listing resolved to a product and annotated with attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedListing {
    pub title: String,

    /// Per-unit price (total / quantity when a multi-unit override applies)
    pub price: Decimal,

    pub quantity: u32,

    pub external_id: Option<String>,
    pub sold_at: Option<DateTime<Utc>>,
    pub kind: ListingKind,
    pub observed_at: DateTime<Utc>,

    pub treatment: Classification<Treatment>,
    pub subtype: Option<ProductSubtype>,
    pub grading: Option<Grading>,

    pub product_id: ProductId,
    pub is_duplicate: bool,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl ClassifiedListing {
    pub fn with_external_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = Some(id.into());
        self
    }

    pub fn composite_key(&self) -> CompositeKey {
        let date = match (self.kind, self.sold_at) {
            (ListingKind::Sold, Some(at)) => at.date_naive(),
            _ => self.observed_at.date_naive(),
        };
        CompositeKey::new(&self.title, self.price, date)
    }

    pub fn resolved_external_id(&self) -> Option<&str> {
        self.external_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// A persisted listing row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredListing {
    pub id: RecordId,
    pub listing: ClassifiedListing,
}

impl StoredListing {
    pub fn product_id(&self) -> ProductId {
        self.listing.product_id
    }
}
