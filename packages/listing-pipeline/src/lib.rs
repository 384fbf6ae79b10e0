//! Marketplace Listing Resolution Pipeline
//!
//! Turns raw scraped marketplace listings for Wonders of the First cards and
//! sealed product into clean, deduplicated, catalog-linked records.
//!
//! # Flow
//!
//! For each catalog product, the [`Orchestrator`] searches the marketplace
//! under a few alternate phrasings and pushes every result page through:
//!
//! 1. validation of required fields
//! 2. entity resolution against the product ([`Matcher`])
//! 3. attribute classification (treatment, subtype, grading, quantity)
//! 4. deduplication against stored listings ([`Deduplicator`])
//! 5. commit to a [`ListingStore`]
//!
//! # Usage
//!
//! ```rust,ignore
//! use listing_pipeline::{CatalogCache, MemoryStore, Orchestrator, PipelineConfig, ReferenceLists};
//!
//! let lists = ReferenceLists::default();
//! let catalog = Arc::new(CatalogCache::new(catalog_source, lists.brand_tokens()));
//! let orchestrator = Orchestrator::new(
//!     PipelineConfig::from_env()?,
//!     lists,
//!     catalog,
//!     scraper,
//!     browser_pool,
//!     Arc::new(MemoryStore::new()),
//! );
//! let report = orchestrator.run().await?;
//! ```
//!
//! # Modules
//!
//! - [`text`] - Normalization and tokenization
//! - [`reference`] - Blocklist, brand and name lists, catalog cache
//! - [`matching`] - Candidate matcher and sealed-product scorer
//! - [`classify`] - Attribute classifiers
//! - [`pipeline`] - Deduplication, page processing and orchestration
//! - [`traits`] - Source, lease and store abstractions
//! - [`stores`] - Storage implementations (MemoryStore, PostgresStore)
//! - [`testing`] - Mock implementations for testing

pub mod classify;
pub mod config;
pub mod error;
pub mod matching;
pub mod pipeline;
pub mod reference;
pub mod stores;
pub mod testing;
pub mod text;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{FetchError, InputError, PipelineError, ReferenceError, StoreError};
pub use config::{EarlyStop, PipelineConfig, RetryPolicy};
pub use types::{
    attributes::{BaseTreatment, Classification, Grading, GradingService, ProductSubtype, Treatment},
    listing::{ClassifiedListing, CompositeKey, ListingKind, RawListing, RecordId, StoredListing},
    product::{CanonicalProduct, ProductFamily, ProductId},
};
pub use traits::{LeaseToken, ListingSource, ListingStore, ResourceLease};

// Re-export pipeline components
pub use classify::{classify, ClassifiedAttributes};
pub use matching::{MatchInput, MatchVerdict, Matcher, RejectReason, Scorer};
pub use pipeline::{
    search_phrasings, CycleOutcome, Decision, DedupOutcome, Deduplicator, Orchestrator, PageProcessor,
    PageReport, ProductCycleReport, RunReport, SkipReason,
};
pub use reference::{Blocklist, BlocklistHandle, Catalog, CatalogCache, CatalogSource, ReferenceLists};
pub use text::normalize;

// Re-export stores
pub use stores::MemoryStore;

#[cfg(feature = "postgres")]
pub use stores::PostgresStore;

// Re-export testing utilities
pub use testing::{MockLease, MockSource, StaticCatalog};
