//! In-memory listing storage for testing and fixture runs.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::traits::store::ListingStore;
use crate::types::listing::{ClassifiedListing, CompositeKey, RecordId, StoredListing};
use crate::types::product::ProductId;

/// In-memory listing storage.
///
/// Enforces the same uniqueness rules as the database schema so that write
/// conflicts surface in tests: external ids are unique store-wide, and a
/// product never holds two rows with the same composite key.
pub struct MemoryStore {
    rows: RwLock<HashMap<RecordId, StoredListing>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }

    /// Seed a row directly, bypassing uniqueness checks.
    pub fn seed(&self, listing: ClassifiedListing) -> RecordId {
        let id = RecordId::new();
        self.rows
            .write()
            .unwrap()
            .insert(id, StoredListing { id, listing });
        id
    }

    pub fn get(&self, id: RecordId) -> Option<StoredListing> {
        self.rows.read().unwrap().get(&id).cloned()
    }

    /// All rows, ordered by record id.
    pub fn all(&self) -> Vec<StoredListing> {
        let mut rows: Vec<_> = self.rows.read().unwrap().values().cloned().collect();
        rows.sort_by_key(|r| r.id);
        rows
    }

    pub fn len(&self) -> usize {
        self.rows.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().unwrap().is_empty()
    }

    pub fn clear(&self) {
        self.rows.write().unwrap().clear();
    }
}

fn same_external_id(row: &StoredListing, external_id: &str) -> bool {
    row.listing.resolved_external_id() == Some(external_id)
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn find_by_external_ids(&self, external_ids: &[String]) -> StoreResult<Vec<StoredListing>> {
        let wanted: HashSet<&str> = external_ids.iter().map(|id| id.trim()).collect();
        let rows = self.rows.read().unwrap();
        let mut found: Vec<_> = rows
            .values()
            .filter(|row| {
                row.listing
                    .resolved_external_id()
                    .is_some_and(|id| wanted.contains(id))
            })
            .cloned()
            .collect();
        found.sort_by_key(|r| r.id);
        Ok(found)
    }

    async fn existing_composite_keys(
        &self,
        product_id: ProductId,
        keys: &[CompositeKey],
    ) -> StoreResult<HashSet<CompositeKey>> {
        let wanted: HashSet<&CompositeKey> = keys.iter().collect();
        Ok(self
            .rows
            .read()
            .unwrap()
            .values()
            .filter(|row| row.product_id() == product_id)
            .map(|row| row.listing.composite_key())
            .filter(|key| wanted.contains(key))
            .collect())
    }

    async fn reassign(&self, record_id: RecordId, product_id: ProductId) -> StoreResult<()> {
        let mut rows = self.rows.write().unwrap();
        let key = rows
            .get(&record_id)
            .ok_or(StoreError::NotFound(record_id))?
            .listing
            .composite_key();

        if let Some(existing) = rows
            .values()
            .find(|row| row.id != record_id && row.product_id() == product_id && row.listing.composite_key() == key)
        {
            return Err(StoreError::Conflict {
                record_id: existing.id,
                detail: format!("product {product_id} already holds '{}'", key.title),
            });
        }

        if let Some(row) = rows.get_mut(&record_id) {
            row.listing.product_id = product_id;
        }
        Ok(())
    }

    async fn delete(&self, record_id: RecordId) -> StoreResult<()> {
        self.rows
            .write()
            .unwrap()
            .remove(&record_id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(record_id))
    }

    async fn insert(&self, listing: &ClassifiedListing) -> StoreResult<RecordId> {
        let mut rows = self.rows.write().unwrap();

        if let Some(external_id) = listing.resolved_external_id() {
            if rows.values().any(|row| same_external_id(row, external_id)) {
                return Err(StoreError::DuplicateInsert {
                    detail: format!("external id {external_id}"),
                });
            }
        } else {
            let key = listing.composite_key();
            if rows
                .values()
                .any(|row| row.product_id() == listing.product_id && row.listing.composite_key() == key)
            {
                return Err(StoreError::DuplicateInsert {
                    detail: format!("'{}' on {}", key.title, key.date),
                });
            }
        }

        let id = RecordId::new();
        rows.insert(
            id,
            StoredListing {
                id,
                listing: listing.clone(),
            },
        );
        Ok(id)
    }

    async fn count_for_product(&self, product_id: ProductId) -> StoreResult<usize> {
        Ok(self
            .rows
            .read()
            .unwrap()
            .values()
            .filter(|row| row.product_id() == product_id)
            .count())
    }
}
