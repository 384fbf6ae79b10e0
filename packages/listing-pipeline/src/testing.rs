//! Testing utilities including mock implementations.
//!
//! These are useful for exercising the pipeline without a live marketplace,
//! browser session or database.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::error::{FetchError, FetchResult, ReferenceError};
use crate::reference::{Catalog, CatalogSource, ReferenceLists};
use crate::traits::source::{LeaseToken, ListingSource, ResourceLease};
use crate::types::attributes::Classification;
use crate::types::listing::{ClassifiedListing, ListingKind, RawListing};
use crate::types::product::{CanonicalProduct, ProductFamily, ProductId};

/// A catalog source serving a fixed product list.
#[derive(Default)]
pub struct StaticCatalog {
    products: Vec<CanonicalProduct>,
    loads: AtomicUsize,
}

impl StaticCatalog {
    pub fn new(products: Vec<CanonicalProduct>) -> Self {
        Self {
            products,
            loads: AtomicUsize::new(0),
        }
    }

    /// Number of times the catalog was loaded.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogSource for StaticCatalog {
    async fn load_products(&self) -> Result<Vec<CanonicalProduct>, ReferenceError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.products.clone())
    }
}

/// A mock marketplace serving predefined pages.
///
/// Unknown `(query, page)` pairs return an empty page. Injected failures for
/// a page are returned, one per call, before the page itself.
#[derive(Default)]
pub struct MockSource {
    pages: RwLock<HashMap<(String, u32), Vec<RawListing>>>,
    failures: RwLock<HashMap<(String, u32), VecDeque<FetchError>>>,
    latency: Option<Duration>,

    /// Call tracking for assertions
    calls: RwLock<Vec<MockFetchCall>>,
}

/// Record of a fetch made against the mock source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockFetchCall {
    pub query: String,
    pub page: u32,
    pub lease: LeaseToken,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `listings` for a query and page.
    pub fn with_page(self, query: impl Into<String>, page: u32, listings: Vec<RawListing>) -> Self {
        self.pages
            .write()
            .unwrap()
            .insert((query.into(), page), listings);
        self
    }

    /// Fail the next calls for a query and page with these errors, in order.
    pub fn with_failures(self, query: impl Into<String>, page: u32, failures: Vec<FetchError>) -> Self {
        self.failures
            .write()
            .unwrap()
            .entry((query.into(), page))
            .or_default()
            .extend(failures);
        self
    }

    /// Sleep this long on every fetch.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockFetchCall> {
        self.calls.read().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    /// Queries fetched, in call order.
    pub fn queries(&self) -> Vec<String> {
        self.calls
            .read()
            .unwrap()
            .iter()
            .map(|c| c.query.clone())
            .collect()
    }
}

#[async_trait]
impl ListingSource for MockSource {
    async fn fetch_page(&self, lease: &LeaseToken, query: &str, page: u32) -> FetchResult<Vec<RawListing>> {
        self.calls.write().unwrap().push(MockFetchCall {
            query: query.to_string(),
            page,
            lease: *lease,
        });

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let key = (query.to_string(), page);
        let failure = self
            .failures
            .write()
            .unwrap()
            .get_mut(&key)
            .and_then(VecDeque::pop_front);
        if let Some(err) = failure {
            return Err(err);
        }

        Ok(self
            .pages
            .read()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_default())
    }
}

/// A mock fetch resource with a fixed number of slots.
pub struct MockLease {
    slots: Semaphore,
    next_slot: AtomicUsize,
    generation: AtomicU64,
    acquire_failures: AtomicUsize,
    outstanding: AtomicUsize,
    peak: AtomicUsize,
    recycles: AtomicUsize,
}

impl MockLease {
    pub fn new(slots: usize) -> Self {
        Self {
            slots: Semaphore::new(slots),
            next_slot: AtomicUsize::new(0),
            generation: AtomicU64::new(0),
            acquire_failures: AtomicUsize::new(0),
            outstanding: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            recycles: AtomicUsize::new(0),
        }
    }

    /// Fail the next `n` acquisitions.
    pub fn with_acquire_failures(self, n: usize) -> Self {
        self.acquire_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Tokens currently held.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Most tokens held at once.
    pub fn peak_outstanding(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn recycle_count(&self) -> usize {
        self.recycles.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceLease for MockLease {
    async fn acquire(&self) -> FetchResult<LeaseToken> {
        let failing = self
            .acquire_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(FetchError::LeaseUnavailable("mock lease refused".into()));
        }

        let permit = self
            .slots
            .acquire()
            .await
            .map_err(|e| FetchError::LeaseUnavailable(e.to_string()))?;
        permit.forget();

        let held = self.outstanding.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(held, Ordering::SeqCst);

        Ok(LeaseToken::new(
            self.next_slot.fetch_add(1, Ordering::SeqCst),
            self.generation.load(Ordering::SeqCst),
        ))
    }

    async fn release(&self, _token: LeaseToken) {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
        self.slots.add_permits(1);
    }

    async fn force_recycle(&self, token: LeaseToken) -> FetchResult<LeaseToken> {
        self.recycles.fetch_add(1, Ordering::SeqCst);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(LeaseToken::new(token.slot, generation))
    }
}

fn fixed_id(n: u128) -> ProductId {
    ProductId(Uuid::from_u128(n))
}

/// A small Existence-set catalog with stable ids.
pub fn existence_products() -> Vec<CanonicalProduct> {
    vec![
        CanonicalProduct::new("Gorrash", ProductFamily::Single, "Existence").with_id(fixed_id(1)),
        CanonicalProduct::new("Mireth", ProductFamily::Single, "Existence").with_id(fixed_id(2)),
        CanonicalProduct::new("The First", ProductFamily::Single, "Existence").with_id(fixed_id(3)),
        CanonicalProduct::new("Booster Box", ProductFamily::Box, "Existence").with_id(fixed_id(4)),
        CanonicalProduct::new("Existence Collector Booster Box", ProductFamily::Box, "Existence")
            .with_id(fixed_id(5)),
        CanonicalProduct::new("Existence Play Bundle", ProductFamily::Bundle, "Existence").with_id(fixed_id(6)),
        CanonicalProduct::new("Existence Booster Pack", ProductFamily::Pack, "Existence").with_id(fixed_id(7)),
    ]
}

pub fn existence_catalog() -> Catalog {
    Catalog::new(existence_products(), &ReferenceLists::default().brand_tokens())
}

/// A classified single-unit listing with a fixed price and observation time.
pub fn classified_listing(title: &str, product_id: ProductId) -> ClassifiedListing {
    ClassifiedListing {
        title: title.to_string(),
        price: Decimal::new(1250, 2),
        quantity: 1,
        external_id: None,
        sold_at: None,
        kind: ListingKind::Active,
        observed_at: Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap(),
        treatment: Classification::Unknown,
        subtype: None,
        grading: None,
        product_id,
        is_duplicate: false,
        metadata: HashMap::new(),
    }
}

/// An active raw listing with an external id.
pub fn raw_listing(title: &str, price_cents: i64, external_id: &str) -> RawListing {
    RawListing::active(title, Decimal::new(price_cents, 2))
        .with_external_id(external_id)
        .with_observed_at(Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap())
}
