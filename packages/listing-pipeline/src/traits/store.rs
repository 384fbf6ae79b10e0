//! Persistence of classified listings.

use async_trait::async_trait;
use std::collections::HashSet;

use crate::error::StoreResult;
use crate::types::listing::{ClassifiedListing, CompositeKey, RecordId, StoredListing};
use crate::types::product::ProductId;

/// Listing storage consulted and mutated by the deduplicator.
///
/// External ids are unique across the whole store, not per product. Rows
/// without an external id are unique on `(product_id, composite key)`.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// All stored rows whose external id is in `external_ids`, in one round trip.
    async fn find_by_external_ids(&self, external_ids: &[String]) -> StoreResult<Vec<StoredListing>>;

    /// Which of `keys` already exist under `product_id`, in one round trip.
    async fn existing_composite_keys(
        &self,
        product_id: ProductId,
        keys: &[CompositeKey],
    ) -> StoreResult<HashSet<CompositeKey>>;

    /// Move a stored row to another product.
    ///
    /// Returns [`StoreError::Conflict`](crate::error::StoreError::Conflict)
    /// when the target product already holds an equivalent row.
    async fn reassign(&self, record_id: RecordId, product_id: ProductId) -> StoreResult<()>;

    /// Remove a stored row.
    async fn delete(&self, record_id: RecordId) -> StoreResult<()>;

    /// Persist a new row.
    async fn insert(&self, listing: &ClassifiedListing) -> StoreResult<RecordId>;

    /// Number of rows stored under a product.
    async fn count_for_product(&self, product_id: ProductId) -> StoreResult<usize>;
}
