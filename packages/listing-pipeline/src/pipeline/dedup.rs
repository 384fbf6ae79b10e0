//! Deduplication against persisted listings.
//!
//! Runs once per page of matched listings for one product:
//!
//! 1. listings repeating an earlier one in the same batch are skipped
//! 2. listings with an external id are looked up in one bulk query
//!    - stored under this product: skip
//!    - stored under another product: sealed families compare the two
//!      products with the [`Scorer`] and move the stored row when this
//!      product scores strictly higher; otherwise skip. A row that would move
//!      onto a composite key this product already holds is deleted instead
//! 3. listings without one fall back to a bulk composite-key check
//! 4. everything left is inserted
//!
//! Planning only reads from the store and is the only step that can fail a
//! batch. [`Deduplicator::apply`] performs the writes one decision at a time
//! and turns a reassignment conflict into a delete of the stale row.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::matching::Scorer;
use crate::reference::{Catalog, ReferenceLists};
use crate::traits::store::ListingStore;
use crate::types::listing::{ClassifiedListing, CompositeKey, RecordId, StoredListing};
use crate::types::product::{CanonicalProduct, ProductId};

/// Why a listing was not written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Already stored under this product
    SameProduct,
    /// Stored under another product that scores at least as well
    OtherProductKept,
    /// Repeats an earlier listing in the same batch
    InBatch,
    /// No external id and the composite key is already stored
    CompositeKeyExists,
}

/// What to do with one listing.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Skip(SkipReason),
    Reassign {
        product_id: ProductId,
        existing_record_id: RecordId,
    },
    /// Stale row under another product whose equivalent already exists here
    Delete {
        existing_record_id: RecordId,
    },
    Insert(ClassifiedListing),
}

/// Planned decisions for a batch, parallel to the batch order.
///
/// `listings` carries every input listing with `is_duplicate` set for the
/// ones that are not new.
#[derive(Debug, Clone, Default)]
pub struct DedupPlan {
    pub decisions: Vec<Decision>,
    pub listings: Vec<ClassifiedListing>,
}

/// Counts of what a batch did to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupOutcome {
    pub inserted: usize,
    pub reassigned: usize,
    pub deleted: usize,
    pub skipped: HashMap<SkipReason, usize>,
    /// Inserts rejected by a concurrent writer
    pub insert_conflicts: usize,
    /// Writes that failed with a store error; the rest of the batch still ran
    pub failed: usize,
    pub inserted_ids: Vec<RecordId>,
}

impl DedupOutcome {
    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }

    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }

    fn skip(&mut self, reason: SkipReason) {
        *self.skipped.entry(reason).or_default() += 1;
    }

    pub fn merge(&mut self, other: &DedupOutcome) {
        self.inserted += other.inserted;
        self.reassigned += other.reassigned;
        self.deleted += other.deleted;
        self.insert_conflicts += other.insert_conflicts;
        self.failed += other.failed;
        for (reason, count) in &other.skipped {
            *self.skipped.entry(*reason).or_default() += count;
        }
        self.inserted_ids.extend(other.inserted_ids.iter().copied());
    }
}

/// Batch key used to spot repeats inside one page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum BatchKey {
    External(String),
    Composite(CompositeKey),
}

fn batch_key(listing: &ClassifiedListing) -> BatchKey {
    match listing.resolved_external_id() {
        Some(id) => BatchKey::External(id.to_string()),
        None => BatchKey::Composite(listing.composite_key()),
    }
}

pub struct Deduplicator<'a> {
    store: &'a dyn ListingStore,
    lists: &'a ReferenceLists,
    catalog: &'a Catalog,
}

impl<'a> Deduplicator<'a> {
    pub fn new(store: &'a dyn ListingStore, lists: &'a ReferenceLists, catalog: &'a Catalog) -> Self {
        Self { store, lists, catalog }
    }

    /// Plan and apply in one step.
    pub async fn run(&self, product: &CanonicalProduct, batch: Vec<ClassifiedListing>) -> StoreResult<(DedupPlan, DedupOutcome)> {
        let plan = self.plan(product, batch).await?;
        let outcome = self.apply(&plan.decisions).await;
        Ok((plan, outcome))
    }

    /// Decide what to do with each listing of a batch for `product`.
    pub async fn plan(&self, product: &CanonicalProduct, batch: Vec<ClassifiedListing>) -> StoreResult<DedupPlan> {
        let external_ids: Vec<String> = batch
            .iter()
            .filter_map(|l| l.resolved_external_id().map(str::to_string))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let stored: HashMap<String, StoredListing> = if external_ids.is_empty() {
            HashMap::new()
        } else {
            self.store
                .find_by_external_ids(&external_ids)
                .await?
                .into_iter()
                .filter_map(|row| {
                    let id = row.listing.resolved_external_id()?.to_string();
                    Some((id, row))
                })
                .collect()
        };

        let composite_keys: Vec<CompositeKey> = batch
            .iter()
            .filter(|l| l.resolved_external_id().is_none())
            .map(|l| l.composite_key())
            .collect();
        let stored_keys = if composite_keys.is_empty() {
            HashSet::new()
        } else {
            self.store
                .existing_composite_keys(product.id, &composite_keys)
                .await?
        };

        // Rows held by other products that this product may take over. If an
        // equivalent row already exists here, the stale one is deleted instead.
        let foreign_keys: Vec<CompositeKey> = if product.family.is_sealed() {
            stored
                .values()
                .filter(|row| row.product_id() != product.id)
                .map(|row| row.listing.composite_key())
                .collect()
        } else {
            Vec::new()
        };
        let held_here = if foreign_keys.is_empty() {
            HashSet::new()
        } else {
            self.store
                .existing_composite_keys(product.id, &foreign_keys)
                .await?
        };

        let scorer = Scorer::new(self.lists);
        let mut seen = HashSet::new();
        let mut plan = DedupPlan::default();

        for mut listing in batch {
            let decision = if !seen.insert(batch_key(&listing)) {
                Decision::Skip(SkipReason::InBatch)
            } else if let Some(external_id) = listing.resolved_external_id() {
                match stored.get(external_id) {
                    Some(row) if row.product_id() == product.id => Decision::Skip(SkipReason::SameProduct),
                    Some(row) => match self.resolve_ownership(&scorer, product, &listing, row) {
                        Decision::Reassign { existing_record_id, .. }
                            if held_here.contains(&row.listing.composite_key()) =>
                        {
                            Decision::Delete { existing_record_id }
                        }
                        decision => decision,
                    },
                    None => Decision::Insert(listing.clone()),
                }
            } else if stored_keys.contains(&listing.composite_key()) {
                Decision::Skip(SkipReason::CompositeKeyExists)
            } else {
                Decision::Insert(listing.clone())
            };

            listing.is_duplicate = !matches!(decision, Decision::Insert(_));
            plan.decisions.push(decision);
            plan.listings.push(listing);
        }

        Ok(plan)
    }

    /// Decide whether a row stored under another product should move here.
    fn resolve_ownership(
        &self,
        scorer: &Scorer<'_>,
        product: &CanonicalProduct,
        listing: &ClassifiedListing,
        row: &StoredListing,
    ) -> Decision {
        if !product.family.is_sealed() {
            return Decision::Skip(SkipReason::OtherProductKept);
        }

        let Some(owner) = self.catalog.get(row.product_id()) else {
            info!(
                title = %listing.title,
                product_id = %product.id,
                owner_id = %row.product_id(),
                "Owner product left the catalog, moving listing to current product"
            );
            return Decision::Reassign {
                product_id: product.id,
                existing_record_id: row.id,
            };
        };

        // Existing owner goes first so it keeps the listing on a tie.
        match scorer.best_candidate(&listing.title, [owner, product]) {
            Some((winner, score)) if winner.id == product.id => {
                info!(
                    title = %listing.title,
                    product_id = %product.id,
                    owner_id = %owner.id,
                    score,
                    "Ambiguous ownership moved to current product"
                );
                Decision::Reassign {
                    product_id: product.id,
                    existing_record_id: row.id,
                }
            }
            _ => {
                info!(
                    title = %listing.title,
                    product_id = %product.id,
                    owner_id = %owner.id,
                    "Ambiguous ownership kept by existing product"
                );
                Decision::Skip(SkipReason::OtherProductKept)
            }
        }
    }

    /// Execute planned decisions.
    ///
    /// Each decision is written on its own. Uniqueness conflicts are resolved
    /// in place: a conflicting reassignment deletes the stale row, a
    /// conflicting insert is counted and dropped. Any other store error is
    /// logged and counted in [`DedupOutcome::failed`].
    pub async fn apply(&self, decisions: &[Decision]) -> DedupOutcome {
        let mut outcome = DedupOutcome::default();

        for decision in decisions {
            match decision {
                Decision::Skip(reason) => outcome.skip(*reason),
                Decision::Reassign {
                    product_id,
                    existing_record_id,
                } => match self.store.reassign(*existing_record_id, *product_id).await {
                    Ok(()) => outcome.reassigned += 1,
                    Err(StoreError::Conflict { record_id, detail }) => {
                        warn!(
                            stale = %existing_record_id,
                            kept = %record_id,
                            detail = %detail,
                            "Reassignment conflict, deleting stale duplicate"
                        );
                        self.delete_stale(*existing_record_id, &mut outcome).await;
                    }
                    Err(e) => {
                        warn!(record_id = %existing_record_id, error = %e, "Reassignment failed");
                        outcome.failed += 1;
                    }
                },
                Decision::Delete { existing_record_id } => {
                    self.delete_stale(*existing_record_id, &mut outcome).await;
                }
                Decision::Insert(listing) => match self.store.insert(listing).await {
                    Ok(id) => {
                        outcome.inserted += 1;
                        outcome.inserted_ids.push(id);
                    }
                    Err(StoreError::DuplicateInsert { detail }) => {
                        debug!(title = %listing.title, detail = %detail, "Insert lost a uniqueness race");
                        outcome.insert_conflicts += 1;
                    }
                    Err(e) => {
                        warn!(title = %listing.title, error = %e, "Insert failed");
                        outcome.failed += 1;
                    }
                },
            }
        }

        outcome
    }

    async fn delete_stale(&self, record_id: RecordId, outcome: &mut DedupOutcome) {
        match self.store.delete(record_id).await {
            Ok(()) => outcome.deleted += 1,
            // Already gone
            Err(StoreError::NotFound(_)) => {}
            Err(e) => {
                warn!(record_id = %record_id, error = %e, "Deleting stale duplicate failed");
                outcome.failed += 1;
            }
        }
    }
}
