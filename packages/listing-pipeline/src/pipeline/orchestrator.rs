//! Scrape cycles across the catalog.
//!
//! One cycle per product: try each search phrasing in turn, fetch a bounded
//! number of result pages per phrasing, and push every page through the
//! [`PageProcessor`]. Products run concurrently on a bounded worker pool.
//!
//! The fetch resource is scarce and crash-prone. Connectivity and resource
//! faults recycle it and retry with exponential backoff; other faults retry
//! after a short fixed delay. A page that still fails marks its product cycle
//! incomplete without touching the others. Cancellation and the per-product
//! timeout are checked between pages.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::PipelineConfig;
use crate::error::{FetchError, PipelineError, Result};
use crate::pipeline::page::{PageProcessor, PageReport};
use crate::pipeline::phrasing::search_phrasings;
use crate::reference::{Catalog, CatalogCache, ReferenceLists};
use crate::traits::source::{LeaseToken, ListingSource, ResourceLease};
use crate::traits::store::ListingStore;
use crate::types::listing::{ClassifiedListing, CompositeKey, RawListing};
use crate::types::product::{CanonicalProduct, ProductId};

/// How a product cycle ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// All phrasings ran or early stop was reached
    Finished,
    Cancelled,
    TimedOut,
    /// The fetch resource could not be acquired
    Aborted { reason: String },
}

/// What one product cycle did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCycleReport {
    pub product_id: ProductId,
    pub product_name: String,
    pub phrasings_tried: usize,
    pub pages_fetched: usize,
    pub failed_pages: usize,
    pub received: usize,
    pub invalid: usize,
    pub unmatched: usize,
    pub matched: usize,
    /// Matched listings not seen earlier in the run
    pub distinct: usize,
    pub inserted: usize,
    pub reassigned: usize,
    pub deleted: usize,
    pub duplicates: usize,
    /// Individual writes the store rejected
    pub failed_writes: usize,
    pub early_stopped: bool,
    pub outcome: CycleOutcome,
}

impl ProductCycleReport {
    fn new(product: &CanonicalProduct) -> Self {
        Self {
            product_id: product.id,
            product_name: product.name.clone(),
            phrasings_tried: 0,
            pages_fetched: 0,
            failed_pages: 0,
            received: 0,
            invalid: 0,
            unmatched: 0,
            matched: 0,
            distinct: 0,
            inserted: 0,
            reassigned: 0,
            deleted: 0,
            duplicates: 0,
            failed_writes: 0,
            early_stopped: false,
            outcome: CycleOutcome::Finished,
        }
    }

    /// Finished with every page fetched and every write committed.
    pub fn is_complete(&self) -> bool {
        self.outcome == CycleOutcome::Finished && self.failed_pages == 0 && self.failed_writes == 0
    }

    fn absorb(&mut self, page: &PageReport) {
        self.pages_fetched += 1;
        self.received += page.received;
        self.invalid += page.invalid;
        self.unmatched += page.unmatched;
        self.matched += page.matched();
        self.inserted += page.dedup.inserted;
        self.reassigned += page.dedup.reassigned;
        self.deleted += page.dedup.deleted;
        self.duplicates += page.dedup.skipped_total();
        self.failed_writes += page.dedup.failed;
    }
}

/// Summary of a whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub products: Vec<ProductCycleReport>,
}

impl RunReport {
    pub fn total_inserted(&self) -> usize {
        self.products.iter().map(|p| p.inserted).sum()
    }

    pub fn total_reassigned(&self) -> usize {
        self.products.iter().map(|p| p.reassigned).sum()
    }

    pub fn incomplete(&self) -> impl Iterator<Item = &ProductCycleReport> {
        self.products.iter().filter(|p| !p.is_complete())
    }

    pub fn for_product(&self, id: ProductId) -> Option<&ProductCycleReport> {
        self.products.iter().find(|p| p.product_id == id)
    }
}

/// Run-wide identity of a listing, used for early stopping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SeenKey {
    External(String),
    Composite(ProductId, CompositeKey),
}

impl SeenKey {
    fn of(listing: &ClassifiedListing) -> Self {
        match listing.resolved_external_id() {
            Some(id) => SeenKey::External(id.to_string()),
            None => SeenKey::Composite(listing.product_id, listing.composite_key()),
        }
    }
}

/// Drives scrape cycles for every catalog product.
pub struct Orchestrator {
    config: PipelineConfig,
    lists: ReferenceLists,
    catalog: Arc<CatalogCache>,
    source: Arc<dyn ListingSource>,
    lease: Arc<dyn ResourceLease>,
    store: Arc<dyn ListingStore>,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(
        config: PipelineConfig,
        lists: ReferenceLists,
        catalog: Arc<CatalogCache>,
        source: Arc<dyn ListingSource>,
        lease: Arc<dyn ResourceLease>,
        store: Arc<dyn ListingStore>,
    ) -> Self {
        Self {
            config,
            lists,
            catalog,
            source,
            lease,
            store,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops the run at the next page boundary.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one cycle for every catalog product.
    pub async fn run(&self) -> Result<RunReport> {
        let catalog = self.catalog.get().await?;
        let products = catalog.products().to_vec();
        self.run_products(&catalog, products).await
    }

    /// Run one cycle for the given products only.
    pub async fn run_for(&self, ids: &[ProductId]) -> Result<RunReport> {
        let catalog = self.catalog.get().await?;
        let products = ids.iter().filter_map(|id| catalog.get(*id).cloned()).collect();
        self.run_products(&catalog, products).await
    }

    async fn run_products(&self, catalog: &Catalog, products: Vec<CanonicalProduct>) -> Result<RunReport> {
        if self.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let started_at = Utc::now();
        let seen = Mutex::new(HashSet::new());
        info!(products = products.len(), workers = self.config.workers, "Starting scrape run");

        let reports: Vec<ProductCycleReport> = stream::iter(products.iter())
            .map(|product| self.run_product(catalog, product, &seen))
            .buffer_unordered(self.config.workers.max(1))
            .collect()
            .await;

        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            products: reports,
        };
        info!(
            products = report.products.len(),
            inserted = report.total_inserted(),
            reassigned = report.total_reassigned(),
            incomplete = report.incomplete().count(),
            "Scrape run finished"
        );
        Ok(report)
    }

    #[instrument(skip_all, fields(product_id = %product.id, product = %product.name))]
    async fn run_product(
        &self,
        catalog: &Catalog,
        product: &CanonicalProduct,
        seen: &Mutex<HashSet<SeenKey>>,
    ) -> ProductCycleReport {
        let mut report = ProductCycleReport::new(product);
        let deadline = Instant::now() + self.config.product_timeout;

        let mut token = match self.acquire_lease().await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Could not acquire fetch resource, skipping product");
                report.outcome = CycleOutcome::Aborted { reason: e.to_string() };
                return report;
            }
        };

        let processor = PageProcessor::new(self.store.as_ref(), &self.lists, catalog);
        let threshold = self.config.early_stop.threshold_for(product.family);

        'phrasings: for query in search_phrasings(product, self.config.max_phrasings) {
            report.phrasings_tried += 1;

            for page in 0..self.config.max_pages {
                if self.cancel.is_cancelled() {
                    report.outcome = CycleOutcome::Cancelled;
                    break 'phrasings;
                }
                if Instant::now() >= deadline {
                    let err = PipelineError::Timeout {
                        seconds: self.config.product_timeout.as_secs(),
                    };
                    warn!(error = %err, "Product cycle out of time");
                    report.outcome = CycleOutcome::TimedOut;
                    break 'phrasings;
                }

                let listings = match self.fetch_with_retry(&mut token, &query, page).await {
                    Ok(listings) => listings,
                    Err(e) => {
                        warn!(query = %query, page, error = %e, "Page failed after retries");
                        report.failed_pages += 1;
                        break;
                    }
                };
                if listings.is_empty() {
                    debug!(query = %query, page, "Empty page, phrasing exhausted");
                    break;
                }

                match processor.process(product, listings).await {
                    Ok(page_report) => {
                        report.absorb(&page_report);
                        let mut seen = seen.lock().unwrap();
                        report.distinct += page_report
                            .listings
                            .iter()
                            .filter(|l| seen.insert(SeenKey::of(l)))
                            .count();
                    }
                    Err(e) => {
                        let err = PipelineError::from(e);
                        warn!(query = %query, page, error = %err, "Page commit failed");
                        report.failed_pages += 1;
                    }
                }
            }

            if report.distinct >= threshold {
                info!(distinct = report.distinct, threshold, "Early stop, skipping remaining phrasings");
                report.early_stopped = true;
                break;
            }
        }

        self.lease.release(token).await;

        info!(
            pages = report.pages_fetched,
            matched = report.matched,
            inserted = report.inserted,
            reassigned = report.reassigned,
            failed_pages = report.failed_pages,
            failed_writes = report.failed_writes,
            outcome = ?report.outcome,
            "Product cycle finished"
        );
        report
    }

    async fn acquire_lease(&self) -> std::result::Result<LeaseToken, FetchError> {
        let retry = &self.config.retry;
        let mut attempt = 0;
        loop {
            match self.lease.acquire().await {
                Ok(token) => return Ok(token),
                Err(e) if attempt >= retry.max_retries => return Err(e),
                Err(e) => {
                    attempt += 1;
                    let delay = retry.backoff(attempt, true);
                    debug!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "Lease acquire failed, retrying");
                    sleep(delay).await;
                }
            }
        }
    }

    /// Fetch one page, recycling the resource on connectivity/resource faults.
    async fn fetch_with_retry(
        &self,
        token: &mut LeaseToken,
        query: &str,
        page: u32,
    ) -> std::result::Result<Vec<RawListing>, FetchError> {
        let retry = &self.config.retry;
        let mut attempt = 0;
        loop {
            let err = match self.source.fetch_page(token, query, page).await {
                Ok(listings) => return Ok(listings),
                Err(e) => e,
            };
            if attempt >= retry.max_retries {
                return Err(err);
            }
            attempt += 1;

            let recycle = err.needs_recycle();
            let delay = retry.backoff(attempt, recycle);
            warn!(
                query,
                page,
                attempt,
                recycle,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Fetch failed, retrying"
            );
            sleep(delay).await;

            if recycle {
                match self.lease.force_recycle(*token).await {
                    Ok(fresh) => *token = fresh,
                    Err(e) => warn!(lease = %token, error = %e, "Recycle failed"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EarlyStop, RetryPolicy};
    use crate::stores::MemoryStore;
    use crate::testing::{existence_products, MockLease, MockSource, StaticCatalog};
    use rust_decimal::Decimal;
    use std::time::Duration;

    fn fast_config() -> PipelineConfig {
        PipelineConfig::default().with_retry(RetryPolicy {
            max_retries: 2,
            base_backoff: Duration::from_millis(1),
            fixed_backoff: Duration::from_millis(1),
        })
    }

    fn orchestrator(
        config: PipelineConfig,
        products: Vec<CanonicalProduct>,
        source: Arc<MockSource>,
        lease: Arc<MockLease>,
        store: Arc<MemoryStore>,
    ) -> Orchestrator {
        let lists = ReferenceLists::default();
        let cache = Arc::new(CatalogCache::new(
            Arc::new(StaticCatalog::new(products)),
            lists.brand_tokens(),
        ));
        Orchestrator::new(config, lists, cache, source, lease, store)
    }

    fn gorrash() -> CanonicalProduct {
        existence_products()
            .into_iter()
            .find(|p| p.name == "Gorrash")
            .unwrap()
    }

    fn gorrash_page(ids: std::ops::Range<u32>) -> Vec<RawListing> {
        ids.map(|i| {
            RawListing::active(format!("Wonders of the First Gorrash Foil #{i}"), Decimal::new(500 + i as i64, 2))
                .with_external_id(format!("g-{i}"))
        })
        .collect()
    }

    #[tokio::test]
    async fn test_fetches_until_empty_page() {
        let product = gorrash();
        let query = search_phrasings(&product, 1).remove(0);
        let source = Arc::new(
            MockSource::new()
                .with_page(&query, 0, gorrash_page(0..3))
                .with_page(&query, 1, gorrash_page(3..5)),
        );
        let store = Arc::new(MemoryStore::new());
        let orch = orchestrator(
            fast_config().with_max_phrasings(1),
            vec![product.clone()],
            source.clone(),
            Arc::new(MockLease::new(1)),
            store.clone(),
        );

        let report = orch.run().await.unwrap();
        let cycle = report.for_product(product.id).unwrap();

        assert_eq!(cycle.pages_fetched, 2);
        assert_eq!(cycle.inserted, 5);
        assert!(cycle.is_complete());
        // third request returned the empty page
        assert_eq!(source.fetch_count(), 3);
        assert_eq!(store.len(), 5);
    }

    #[tokio::test]
    async fn test_recycles_on_resource_fault() {
        let product = gorrash();
        let query = search_phrasings(&product, 1).remove(0);
        let source = Arc::new(
            MockSource::new()
                .with_page(&query, 0, gorrash_page(0..2))
                .with_failures(&query, 0, vec![FetchError::Resource("browser crashed".into())]),
        );
        let lease = Arc::new(MockLease::new(1));
        let orch = orchestrator(
            fast_config().with_max_phrasings(1).with_max_pages(1),
            vec![product.clone()],
            source,
            lease.clone(),
            Arc::new(MemoryStore::new()),
        );

        let report = orch.run().await.unwrap();
        let cycle = report.for_product(product.id).unwrap();

        assert_eq!(lease.recycle_count(), 1);
        assert_eq!(cycle.inserted, 2);
        assert!(cycle.is_complete());
        assert_eq!(lease.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_upstream_fault_retries_without_recycle() {
        let product = gorrash();
        let query = search_phrasings(&product, 1).remove(0);
        let source = Arc::new(
            MockSource::new()
                .with_page(&query, 0, gorrash_page(0..1))
                .with_failures(&query, 0, vec![FetchError::Upstream("captcha".into())]),
        );
        let lease = Arc::new(MockLease::new(1));
        let orch = orchestrator(
            fast_config().with_max_phrasings(1).with_max_pages(1),
            vec![product.clone()],
            source,
            lease.clone(),
            Arc::new(MemoryStore::new()),
        );

        let report = orch.run().await.unwrap();
        assert_eq!(lease.recycle_count(), 0);
        assert_eq!(report.total_inserted(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_mark_cycle_incomplete() {
        let product = gorrash();
        let query = search_phrasings(&product, 1).remove(0);
        let failures = (0..5)
            .map(|_| FetchError::Connectivity("connection reset".into()))
            .collect();
        let source = Arc::new(
            MockSource::new()
                .with_page(&query, 0, gorrash_page(0..2))
                .with_failures(&query, 0, failures),
        );
        let orch = orchestrator(
            fast_config().with_max_phrasings(1),
            vec![product.clone()],
            source,
            Arc::new(MockLease::new(1)),
            Arc::new(MemoryStore::new()),
        );

        let report = orch.run().await.unwrap();
        let cycle = report.for_product(product.id).unwrap();

        assert_eq!(cycle.failed_pages, 1);
        assert_eq!(cycle.outcome, CycleOutcome::Finished);
        assert!(!cycle.is_complete());
        assert_eq!(report.incomplete().count(), 1);
    }

    #[tokio::test]
    async fn test_early_stop_skips_remaining_phrasings() {
        let product = gorrash();
        let phrasings = search_phrasings(&product, 3);
        let source = Arc::new(
            MockSource::new()
                .with_page(&phrasings[0], 0, gorrash_page(0..3))
                .with_page(&phrasings[1], 0, gorrash_page(3..6)),
        );
        let config = fast_config().with_early_stop(EarlyStop {
            single_threshold: 3,
            sealed_threshold: 3,
        });
        let orch = orchestrator(
            config,
            vec![product.clone()],
            source.clone(),
            Arc::new(MockLease::new(1)),
            Arc::new(MemoryStore::new()),
        );

        let report = orch.run().await.unwrap();
        let cycle = report.for_product(product.id).unwrap();

        assert!(cycle.early_stopped);
        assert_eq!(cycle.phrasings_tried, 1);
        assert!(source.queries().iter().all(|q| q == &phrasings[0]));
    }

    #[tokio::test]
    async fn test_lease_unavailable_aborts_only_that_product() {
        let product = gorrash();
        let lease = Arc::new(MockLease::new(1).with_acquire_failures(10));
        let orch = orchestrator(
            fast_config(),
            vec![product.clone()],
            Arc::new(MockSource::new()),
            lease,
            Arc::new(MemoryStore::new()),
        );

        let report = orch.run().await.unwrap();
        let cycle = report.for_product(product.id).unwrap();
        assert!(matches!(cycle.outcome, CycleOutcome::Aborted { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let orch = orchestrator(
            fast_config(),
            vec![gorrash()],
            Arc::new(MockSource::new()),
            Arc::new(MockLease::new(1)),
            Arc::new(MemoryStore::new()),
        )
        .with_cancellation(cancel);

        assert!(matches!(orch.run().await, Err(PipelineError::Cancelled)));
    }

    #[tokio::test]
    async fn test_zero_timeout_stops_before_fetching() {
        let source = Arc::new(MockSource::new());
        let orch = orchestrator(
            fast_config().with_product_timeout(Duration::ZERO),
            vec![gorrash()],
            source.clone(),
            Arc::new(MockLease::new(1)),
            Arc::new(MemoryStore::new()),
        );

        let report = orch.run().await.unwrap();
        assert_eq!(report.products[0].outcome, CycleOutcome::TimedOut);
        assert_eq!(source.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_products_run_concurrently_with_bounded_workers() {
        let products = existence_products();
        let lease = Arc::new(MockLease::new(2));
        let orch = orchestrator(
            fast_config().with_workers(2),
            products.clone(),
            Arc::new(MockSource::new().with_latency(Duration::from_millis(5))),
            lease.clone(),
            Arc::new(MemoryStore::new()),
        );

        let report = orch.run().await.unwrap();
        assert_eq!(report.products.len(), products.len());
        assert!(lease.peak_outstanding() <= 2);
        assert_eq!(lease.outstanding(), 0);
    }

    /// Cancels the run as soon as the first page is requested.
    struct CancelOnFetch {
        inner: MockSource,
        cancel: CancellationToken,
    }

    #[async_trait::async_trait]
    impl ListingSource for CancelOnFetch {
        async fn fetch_page(
            &self,
            lease: &LeaseToken,
            query: &str,
            page: u32,
        ) -> std::result::Result<Vec<RawListing>, FetchError> {
            self.cancel.cancel();
            self.inner.fetch_page(lease, query, page).await
        }
    }

    #[tokio::test]
    async fn test_cancel_mid_cycle_stops_at_page_boundary() {
        let product = gorrash();
        let query = search_phrasings(&product, 1).remove(0);
        let cancel = CancellationToken::new();
        let source = Arc::new(CancelOnFetch {
            inner: MockSource::new()
                .with_page(&query, 0, gorrash_page(0..2))
                .with_page(&query, 1, gorrash_page(2..4)),
            cancel: cancel.clone(),
        });
        let lease = Arc::new(MockLease::new(1));
        let lists = ReferenceLists::default();
        let cache = Arc::new(CatalogCache::new(
            Arc::new(StaticCatalog::new(vec![product.clone()])),
            lists.brand_tokens(),
        ));
        let orch = Orchestrator::new(
            fast_config(),
            lists,
            cache,
            source.clone(),
            lease.clone(),
            Arc::new(MemoryStore::new()),
        )
        .with_cancellation(cancel);

        let report = orch.run().await.unwrap();
        let cycle = report.for_product(product.id).unwrap();

        assert_eq!(cycle.outcome, CycleOutcome::Cancelled);
        assert_eq!(cycle.pages_fetched, 1);
        assert_eq!(cycle.inserted, 2);
        assert_eq!(source.inner.fetch_count(), 1);
        assert_eq!(lease.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_failed_page_still_checks_early_stop() {
        let product = gorrash();
        let phrasings = search_phrasings(&product, 3);
        let failures = (0..5)
            .map(|_| FetchError::Upstream("rate limited".into()))
            .collect();
        let source = Arc::new(
            MockSource::new()
                .with_page(&phrasings[0], 0, gorrash_page(0..3))
                .with_failures(&phrasings[0], 1, failures)
                .with_page(&phrasings[1], 0, gorrash_page(3..6)),
        );
        let config = fast_config().with_early_stop(EarlyStop {
            single_threshold: 3,
            sealed_threshold: 3,
        });
        let orch = orchestrator(
            config,
            vec![product.clone()],
            source.clone(),
            Arc::new(MockLease::new(1)),
            Arc::new(MemoryStore::new()),
        );

        let report = orch.run().await.unwrap();
        let cycle = report.for_product(product.id).unwrap();

        assert_eq!(cycle.failed_pages, 1);
        assert!(cycle.early_stopped);
        assert_eq!(cycle.phrasings_tried, 1);
        assert!(source.queries().iter().all(|q| q == &phrasings[0]));
    }
}
