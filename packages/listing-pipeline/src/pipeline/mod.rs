//! Scrape pipeline.
//!
//! The pipeline orchestrates:
//! - Alternate search phrasings per product
//! - Page processing (validate → match → classify → dedupe → commit)
//! - Deduplication and cross-product ownership
//! - Bounded concurrency, retry and recycle of the fetch resource

pub mod dedup;
pub mod orchestrator;
pub mod page;
pub mod phrasing;

pub use dedup::{Decision, DedupOutcome, DedupPlan, Deduplicator, SkipReason};
pub use orchestrator::{CycleOutcome, Orchestrator, ProductCycleReport, RunReport};
pub use page::{PageProcessor, PageReport};
pub use phrasing::search_phrasings;
