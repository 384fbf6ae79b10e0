//! Read-through catalog cache.
//!
//! The catalog is loaded from a [`CatalogSource`] on first use and then
//! served as an immutable [`Catalog`] snapshot. Population happens under a
//! single async mutex; readers after that only take a short read lock to
//! clone the `Arc`. Call [`CatalogCache::invalidate`] after reseeding.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::ReferenceError;
use crate::text::{normalize, token_set};
use crate::types::product::{CanonicalProduct, ProductId};

/// Where catalog entries come from (database seed table, fixture file, ...).
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn load_products(&self) -> Result<Vec<CanonicalProduct>, ReferenceError>;
}

/// Immutable view over all canonical products.
#[derive(Debug, Default)]
pub struct Catalog {
    products: Vec<CanonicalProduct>,
    by_id: HashMap<ProductId, usize>,
    /// Name tokens of single-item entries, minus brand words
    entity_tokens: BTreeSet<String>,
}

impl Catalog {
    pub fn new(products: Vec<CanonicalProduct>, brand_tokens: &BTreeSet<String>) -> Self {
        let by_id = products
            .iter()
            .enumerate()
            .map(|(idx, p)| (p.id, idx))
            .collect();

        let entity_tokens = products
            .iter()
            .filter(|p| !p.family.is_sealed())
            .flat_map(|p| token_set(&normalize(&p.name)))
            .filter(|t| !brand_tokens.contains(t))
            .collect();

        Self {
            products,
            by_id,
            entity_tokens,
        }
    }

    pub fn get(&self, id: ProductId) -> Option<&CanonicalProduct> {
        self.by_id.get(&id).map(|&idx| &self.products[idx])
    }

    pub fn products(&self) -> &[CanonicalProduct] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Whether `token` is part of some single-item entry's name.
    pub fn is_entity_token(&self, token: &str) -> bool {
        self.entity_tokens.contains(token)
    }
}

/// Lazily populated, explicitly invalidated catalog cache.
pub struct CatalogCache {
    source: Arc<dyn CatalogSource>,
    brand_tokens: BTreeSet<String>,
    snapshot: RwLock<Option<Arc<Catalog>>>,
    populate: Mutex<()>,
}

impl CatalogCache {
    pub fn new(source: Arc<dyn CatalogSource>, brand_tokens: BTreeSet<String>) -> Self {
        Self {
            source,
            brand_tokens,
            snapshot: RwLock::new(None),
            populate: Mutex::new(()),
        }
    }

    /// Current catalog, loading it on first use.
    pub async fn get(&self) -> Result<Arc<Catalog>, ReferenceError> {
        if let Some(catalog) = self.cached() {
            return Ok(catalog);
        }

        let _guard = self.populate.lock().await;
        // Another task may have populated while we waited.
        if let Some(catalog) = self.cached() {
            return Ok(catalog);
        }

        let products = self.source.load_products().await?;
        let catalog = Arc::new(Catalog::new(products, &self.brand_tokens));
        info!(products = catalog.len(), "Catalog cache populated");
        *self.snapshot.write().unwrap() = Some(catalog.clone());
        Ok(catalog)
    }

    /// Drop the cached catalog; the next `get` reloads from the source.
    pub fn invalidate(&self) {
        debug!("Catalog cache invalidated");
        *self.snapshot.write().unwrap() = None;
    }

    pub fn is_populated(&self) -> bool {
        self.snapshot.read().unwrap().is_some()
    }

    fn cached(&self) -> Option<Arc<Catalog>> {
        self.snapshot.read().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticCatalog;
    use crate::types::product::ProductFamily;

    fn brand() -> BTreeSet<String> {
        ["wonders", "first"].iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_loads_once() {
        let source = Arc::new(StaticCatalog::new(vec![CanonicalProduct::new(
            "Gorrash",
            ProductFamily::Single,
            "Existence",
        )]));
        let cache = CatalogCache::new(source.clone(), brand());

        assert!(!cache.is_populated());
        let a = cache.get().await.unwrap();
        let b = cache.get().await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(source.load_count(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let source = Arc::new(StaticCatalog::new(vec![]));
        let cache = CatalogCache::new(source.clone(), brand());

        cache.get().await.unwrap();
        cache.invalidate();
        cache.get().await.unwrap();
        assert_eq!(source.load_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_first_use_loads_once() {
        let source = Arc::new(StaticCatalog::new(vec![]));
        let cache = Arc::new(CatalogCache::new(source.clone(), brand()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get().await.map(|_| ()) })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(source.load_count(), 1);
    }

    #[test]
    fn test_entity_tokens_skip_sealed_and_brand() {
        let catalog = Catalog::new(
            vec![
                CanonicalProduct::new("Gorrash", ProductFamily::Single, "Existence"),
                CanonicalProduct::new("First Light", ProductFamily::Single, "Existence"),
                CanonicalProduct::new("Existence Booster Box", ProductFamily::Box, "Existence"),
            ],
            &brand(),
        );
        assert!(catalog.is_entity_token("gorrash"));
        assert!(catalog.is_entity_token("light"));
        assert!(!catalog.is_entity_token("first"));
        assert!(!catalog.is_entity_token("booster"));
    }
}
