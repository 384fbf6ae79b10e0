//! Canonical catalog products.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a canonical catalog product.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub Uuid);

impl ProductId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ProductId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ProductId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Product family of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductFamily {
    Single,
    Box,
    Pack,
    Bundle,
    Lot,
    Proof,
}

impl ProductFamily {
    /// Sealed-product-like families (multi-card, sold unopened).
    pub fn is_sealed(self) -> bool {
        matches!(
            self,
            ProductFamily::Box | ProductFamily::Pack | ProductFamily::Bundle | ProductFamily::Lot
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProductFamily::Single => "single",
            ProductFamily::Box => "box",
            ProductFamily::Pack => "pack",
            ProductFamily::Bundle => "bundle",
            ProductFamily::Lot => "lot",
            ProductFamily::Proof => "proof",
        }
    }
}

impl fmt::Display for ProductFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A canonical catalog entry listings are resolved against.
///
/// Created by catalog seeding; the pipeline only reads these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalProduct {
    #[serde(default)]
    pub id: ProductId,

    /// Display name, e.g. "Existence Play Bundle" or "Gorrash"
    pub name: String,

    pub family: ProductFamily,

    /// Set name, e.g. "Existence"
    pub set_name: String,

    /// Rarity or printed variant the catalog entry is pinned to
    #[serde(default)]
    pub variant: Option<String>,
}

impl CanonicalProduct {
    pub fn new(name: impl Into<String>, family: ProductFamily, set_name: impl Into<String>) -> Self {
        Self {
            id: ProductId::new(),
            name: name.into(),
            family,
            set_name: set_name.into(),
            variant: None,
        }
    }

    pub fn with_id(mut self, id: ProductId) -> Self {
        self.id = id;
        self
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }
}
