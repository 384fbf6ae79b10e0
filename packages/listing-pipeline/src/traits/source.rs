//! Upstream marketplace access.
//!
//! Fetching goes through a scarce, crash-prone resource (a headless browser
//! session in production). [`ResourceLease`] hands out [`LeaseToken`]s for it
//! and can tear it down and rebuild it when a fetch reports a connectivity or
//! resource fault. [`ListingSource`] fetches one page of results through a
//! held token.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::FetchResult;
use crate::types::listing::RawListing;

/// Proof that the caller holds the fetch resource.
///
/// The generation changes every time the resource is recycled, so a stale
/// token can be told apart from a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeaseToken {
    pub slot: usize,
    pub generation: u64,
}

impl LeaseToken {
    pub fn new(slot: usize, generation: u64) -> Self {
        Self { slot, generation }
    }
}

impl fmt::Display for LeaseToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lease#{}.{}", self.slot, self.generation)
    }
}

/// Access to the scarce fetch resource.
#[async_trait]
pub trait ResourceLease: Send + Sync {
    /// Wait for a free slot and return a token for it.
    async fn acquire(&self) -> FetchResult<LeaseToken>;

    /// Give a token back.
    async fn release(&self, token: LeaseToken);

    /// Tear down and rebuild the resource behind `token`, returning a fresh token.
    async fn force_recycle(&self, token: LeaseToken) -> FetchResult<LeaseToken>;
}

/// Paginated marketplace search.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch one page (zero-based) of results for a search query.
    ///
    /// An empty page means the query is exhausted.
    async fn fetch_page(&self, lease: &LeaseToken, query: &str, page: u32) -> FetchResult<Vec<RawListing>>;
}
