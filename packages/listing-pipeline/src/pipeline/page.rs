//! One page of raw listings for one product: validate, match, classify,
//! deduplicate, commit.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classify::{classify, into_classified};
use crate::error::StoreResult;
use crate::matching::Matcher;
use crate::pipeline::dedup::{DedupOutcome, Deduplicator};
use crate::reference::{Catalog, ReferenceLists};
use crate::traits::store::ListingStore;
use crate::types::listing::{ClassifiedListing, RawListing};
use crate::types::product::CanonicalProduct;

/// Result of processing one page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageReport {
    /// Raw records on the page
    pub received: usize,

    /// Records dropped for a missing or invalid required field
    pub invalid: usize,

    /// Records that did not confidently match the product
    pub unmatched: usize,

    pub dedup: DedupOutcome,

    /// Matched listings, with duplicates flagged
    #[serde(skip)]
    pub listings: Vec<ClassifiedListing>,
}

impl PageReport {
    pub fn matched(&self) -> usize {
        self.listings.len()
    }
}

pub struct PageProcessor<'a> {
    store: &'a dyn ListingStore,
    lists: &'a ReferenceLists,
    catalog: &'a Catalog,
}

impl<'a> PageProcessor<'a> {
    pub fn new(store: &'a dyn ListingStore, lists: &'a ReferenceLists, catalog: &'a Catalog) -> Self {
        Self { store, lists, catalog }
    }

    /// Process one page for `product`.
    ///
    /// Bad records are dropped and counted; only a store failure fails the page.
    pub async fn process(&self, product: &CanonicalProduct, page: Vec<RawListing>) -> StoreResult<PageReport> {
        let matcher = Matcher::new(self.lists, self.catalog);
        let mut report = PageReport {
            received: page.len(),
            ..Default::default()
        };

        let mut batch = Vec::with_capacity(page.len());
        for raw in page {
            if let Err(e) = raw.validate() {
                debug!(title = %raw.title, error = %e, "Dropping malformed listing");
                report.invalid += 1;
                continue;
            }
            if !matcher.matches_product(&raw.title, product) {
                report.unmatched += 1;
                continue;
            }
            let attrs = classify(&raw, product.family);
            batch.push(into_classified(raw, product.id, attrs));
        }

        if batch.is_empty() {
            return Ok(report);
        }

        let dedup = Deduplicator::new(self.store, self.lists, self.catalog);
        let (plan, outcome) = dedup.run(product, batch).await?;
        report.dedup = outcome;
        report.listings = plan.listings;

        debug!(
            product_id = %product.id,
            received = report.received,
            matched = report.matched(),
            inserted = report.dedup.inserted,
            "Page processed"
        );
        Ok(report)
    }
}
