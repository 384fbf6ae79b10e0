//! Typed errors for the listing pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`). Matching, classification
//! and deduplication never fail a whole batch: the variants here describe what
//! went wrong for a single record, a single store call, or a single fetch.

use thiserror::Error;

use crate::types::listing::RecordId;

/// Errors surfaced by the orchestration layer.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Fetching from the upstream marketplace failed after retries
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Storage operation failed
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Reference list could not be loaded
    #[error("reference list error: {0}")]
    Reference(#[from] ReferenceError),

    /// Operation was cancelled
    #[error("operation cancelled")]
    Cancelled,

    /// Product cycle exceeded its time budget
    #[error("timed out after {seconds}s")]
    Timeout { seconds: u64 },
}

/// A raw record that cannot enter the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("listing title is empty")]
    EmptyTitle,

    #[error("listing price must be positive, got {0}")]
    NonPositivePrice(String),

    #[error("sold listing is missing its settlement timestamp")]
    MissingSettlement,
}

/// Errors from the upstream fetch resource.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network connectivity failure (DNS, reset, TLS)
    #[error("connectivity failure: {0}")]
    Connectivity(String),

    /// The scarce fetch resource (browser session) crashed or became unusable
    #[error("resource failure: {0}")]
    Resource(String),

    /// Upstream responded but the page could not be used
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Lease could not be acquired
    #[error("lease unavailable: {0}")]
    LeaseUnavailable(String),
}

impl FetchError {
    /// Faults that are fixed by recycling the resource before retrying.
    pub fn needs_recycle(&self) -> bool {
        matches!(self, FetchError::Connectivity(_) | FetchError::Resource(_))
    }
}

/// Errors from the listing store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Write-time uniqueness violation
    #[error("uniqueness conflict on record {record_id}: {detail}")]
    Conflict { record_id: RecordId, detail: String },

    /// Insert collided with an existing row
    #[error("duplicate listing: {detail}")]
    DuplicateInsert { detail: String },

    /// Record vanished between read and write
    #[error("record not found: {0}")]
    NotFound(RecordId),

    /// Backend failure
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors loading reference data (blocklist, catalog).
#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("catalog source failed: {0}")]
    Catalog(String),
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
