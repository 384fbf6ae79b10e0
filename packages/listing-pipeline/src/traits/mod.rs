//! Trait seams between the pipeline and the outside world.
//!
//! Applications implement these to plug in a marketplace scraper and a
//! listing database; the orchestrator depends only on the traits.

pub mod source;
pub mod store;

pub use source::{LeaseToken, ListingSource, ResourceLease};
pub use store::ListingStore;
