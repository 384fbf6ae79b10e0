//! Structured attributes derived from listing titles.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a classifier that may legitimately find nothing.
///
/// `Unknown` means "the title carries no evidence" and is never conflated
/// with a real vocabulary value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Classification<T> {
    Unknown,
    Known(T),
}

impl<T> Classification<T> {
    pub fn known(&self) -> Option<&T> {
        match self {
            Classification::Known(value) => Some(value),
            Classification::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Classification::Known(_))
    }
}

impl<T> From<Option<T>> for Classification<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Classification::Known(v),
            None => Classification::Unknown,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Classification<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Known(v) => v.fmt(f),
            Classification::Unknown => f.write_str("unknown"),
        }
    }
}

/// Controlled treatment vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseTreatment {
    Sealed,
    OpenBox,
    OcmSerialized,
    Stonefoil,
    FormlessFoil,
    Prerelease,
    Promo,
    Proof,
    Errata,
    ClassicFoil,
    ClassicPaper,
}

impl BaseTreatment {
    pub fn as_str(self) -> &'static str {
        match self {
            BaseTreatment::Sealed => "Sealed",
            BaseTreatment::OpenBox => "Open Box",
            BaseTreatment::OcmSerialized => "OCM Serialized",
            BaseTreatment::Stonefoil => "Stonefoil",
            BaseTreatment::FormlessFoil => "Formless Foil",
            BaseTreatment::Prerelease => "Prerelease",
            BaseTreatment::Promo => "Promo",
            BaseTreatment::Proof => "Proof",
            BaseTreatment::Errata => "Errata",
            BaseTreatment::ClassicFoil => "Classic Foil",
            BaseTreatment::ClassicPaper => "Classic Paper",
        }
    }
}

/// A resolved treatment, optionally qualified as alternate art.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Treatment {
    pub base: BaseTreatment,
    #[serde(default)]
    pub alt_art: bool,
}

impl Treatment {
    pub fn new(base: BaseTreatment) -> Self {
        Self {
            base,
            alt_art: false,
        }
    }

    pub fn with_alt_art(mut self) -> Self {
        self.alt_art = true;
        self
    }
}

impl fmt::Display for Treatment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base.as_str())?;
        if self.alt_art {
            f.write_str(" Alt Art")?;
        }
        Ok(())
    }
}

/// Sealed-product subtype vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductSubtype {
    Case,
    CollectorBoosterBox,
    BoosterBox,
    PlayBundle,
    CollectorBundle,
    SerializedAdvantage,
    StarterBundle,
    Bundle,
    CollectorBoosterPack,
    PlayBoosterPack,
    SilverPack,
    BoosterPack,
    BulkLot,
    Lot,
}

impl ProductSubtype {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductSubtype::Case => "Case",
            ProductSubtype::CollectorBoosterBox => "Collector Booster Box",
            ProductSubtype::BoosterBox => "Booster Box",
            ProductSubtype::PlayBundle => "Play Bundle",
            ProductSubtype::CollectorBundle => "Collector Bundle",
            ProductSubtype::SerializedAdvantage => "Serialized Advantage",
            ProductSubtype::StarterBundle => "Starter Bundle",
            ProductSubtype::Bundle => "Bundle",
            ProductSubtype::CollectorBoosterPack => "Collector Booster Pack",
            ProductSubtype::PlayBoosterPack => "Play Booster Pack",
            ProductSubtype::SilverPack => "Silver Pack",
            ProductSubtype::BoosterPack => "Booster Pack",
            ProductSubtype::BulkLot => "Bulk Lot",
            ProductSubtype::Lot => "Lot",
        }
    }
}

impl fmt::Display for ProductSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Third-party grading services recognised in titles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GradingService {
    Psa,
    Bgs,
    Cgc,
    Sgc,
    Tag,
}

impl GradingService {
    pub fn as_str(self) -> &'static str {
        match self {
            GradingService::Psa => "PSA",
            GradingService::Bgs => "BGS",
            GradingService::Cgc => "CGC",
            GradingService::Sgc => "SGC",
            GradingService::Tag => "TAG",
        }
    }
}

/// Grading certification found on a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Grading {
    /// Service plus numeric grade, e.g. "PSA 10", "BGS 9.5"
    Graded {
        service: GradingService,
        grade: Decimal,
    },
    /// Slabbed by the service without a numeric grade, e.g. "PSA Authentic"
    Authentic { service: GradingService },
    /// Clearly graded but the service is not named
    UnknownService,
}

impl fmt::Display for Grading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grading::Graded { service, grade } => {
                write!(f, "{} {}", service.as_str(), grade.normalize())
            }
            Grading::Authentic { service } => write!(f, "{} Authentic", service.as_str()),
            Grading::UnknownService => f.write_str("Graded"),
        }
    }
}
