// Runs one scrape cycle over a recorded fixture and prints the run report.
//
// LISTING_FIXTURE   path to a JSON fixture: {"catalog": [...], "pages": {"<query>": [[...], ...]}}
// LISTING_BLOCKLIST optional path to a versioned blocklist document

use anyhow::{Context, Result};
use listing_pipeline::{
    BlocklistHandle, CanonicalProduct, CatalogCache, MemoryStore, MockLease, MockSource, Orchestrator,
    PipelineConfig, RawListing, ReferenceLists, StaticCatalog,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Deserialize)]
struct Fixture {
    catalog: Vec<CanonicalProduct>,
    #[serde(default)]
    pages: HashMap<String, Vec<Vec<RawListing>>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,listing_pipeline=debug".into()))
        .with(fmt::layer().with_target(true).with_line_number(true))
        .init();

    let config = PipelineConfig::from_env().context("Failed to load configuration")?;
    tracing::info!(?config, "Configuration loaded");

    let fixture_path = env::var("LISTING_FIXTURE").context("LISTING_FIXTURE must be set")?;
    let raw = tokio::fs::read_to_string(&fixture_path)
        .await
        .with_context(|| format!("Failed to read fixture {fixture_path}"))?;
    let fixture: Fixture = serde_json::from_str(&raw).context("Fixture is not valid JSON")?;
    tracing::info!(
        products = fixture.catalog.len(),
        queries = fixture.pages.len(),
        "Fixture loaded"
    );

    let blocklist = Arc::new(BlocklistHandle::default());
    if let Ok(path) = env::var("LISTING_BLOCKLIST") {
        blocklist
            .reload_from_path(Path::new(&path))
            .await
            .with_context(|| format!("Failed to load blocklist {path}"))?;
    }
    let lists = ReferenceLists::new(blocklist);

    let mut source = MockSource::new();
    for (query, pages) in fixture.pages {
        for (page, listings) in pages.into_iter().enumerate() {
            source = source.with_page(query.clone(), page as u32, listings);
        }
    }

    let catalog = Arc::new(CatalogCache::new(
        Arc::new(StaticCatalog::new(fixture.catalog)),
        lists.brand_tokens(),
    ));
    let store = Arc::new(MemoryStore::new());
    let lease = Arc::new(MockLease::new(config.workers));

    let orchestrator = Orchestrator::new(config, lists, catalog, Arc::new(source), lease, store.clone());

    let cancel = orchestrator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping at the next page boundary");
            cancel.cancel();
        }
    });

    let report = orchestrator.run().await.context("Scrape run failed")?;
    tracing::info!(stored = store.len(), "Run complete");

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
