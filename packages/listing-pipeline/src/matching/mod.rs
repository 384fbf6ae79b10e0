//! Entity resolution against the catalog.
//!
//! - [`matcher`] - token-overlap matching with contamination filtering
//! - [`scorer`] - additive tie-breaking between sealed candidates
//! - [`special`] - catalog entries needing bespoke evidence

pub mod matcher;
pub mod scorer;
pub mod special;

pub use matcher::{required_ratio, MatchInput, MatchVerdict, Matcher, RejectReason};
pub use scorer::{ScoreBreakdown, Scorer};
