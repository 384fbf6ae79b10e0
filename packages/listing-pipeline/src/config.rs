//! Orchestrator configuration.

use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::types::product::ProductFamily;

/// How failed fetches are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries per page after the first attempt
    pub max_retries: u32,

    /// First delay before a recycle-and-retry; doubles on each further attempt
    pub base_backoff: Duration,

    /// Delay before retrying a failure that does not need a recycle
    pub fixed_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff: Duration::from_secs(2),
            fixed_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32, recycle: bool) -> Duration {
        if recycle {
            let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
            self.base_backoff.saturating_mul(factor)
        } else {
            self.fixed_backoff
        }
    }
}

/// Distinct-result thresholds after which remaining phrasings are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarlyStop {
    pub single_threshold: usize,
    pub sealed_threshold: usize,
}

impl Default for EarlyStop {
    fn default() -> Self {
        Self {
            single_threshold: 40,
            sealed_threshold: 25,
        }
    }
}

impl EarlyStop {
    pub fn threshold_for(&self, family: ProductFamily) -> usize {
        if family.is_sealed() {
            self.sealed_threshold
        } else {
            self.single_threshold
        }
    }
}

/// Configuration for a scrape run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Products processed concurrently
    pub workers: usize,

    /// Alternate search phrasings tried per product
    pub max_phrasings: usize,

    /// Result pages fetched per phrasing
    pub max_pages: u32,

    pub retry: RetryPolicy,

    pub early_stop: EarlyStop,

    /// Wall-clock budget for one product, checked between pages
    pub product_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            max_phrasings: 3,
            max_pages: 3,
            retry: RetryPolicy::default(),
            early_stop: EarlyStop::default(),
            product_timeout: Duration::from_secs(600),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_max_phrasings(mut self, max: usize) -> Self {
        self.max_phrasings = max;
        self
    }

    pub fn with_max_pages(mut self, max: u32) -> Self {
        self.max_pages = max;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_early_stop(mut self, early_stop: EarlyStop) -> Self {
        self.early_stop = early_stop;
        self
    }

    pub fn with_product_timeout(mut self, timeout: Duration) -> Self {
        self.product_timeout = timeout;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Missing variables keep their defaults; present but unparsable ones
    /// are errors.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let defaults = Self::default();
        Ok(Self {
            workers: env_or("LISTING_WORKERS", defaults.workers)?.max(1),
            max_phrasings: env_or("LISTING_MAX_PHRASINGS", defaults.max_phrasings)?,
            max_pages: env_or("LISTING_MAX_PAGES", defaults.max_pages)?,
            retry: RetryPolicy {
                max_retries: env_or("LISTING_MAX_RETRIES", defaults.retry.max_retries)?,
                base_backoff: Duration::from_millis(env_or(
                    "LISTING_BASE_BACKOFF_MS",
                    defaults.retry.base_backoff.as_millis() as u64,
                )?),
                fixed_backoff: Duration::from_millis(env_or(
                    "LISTING_FIXED_BACKOFF_MS",
                    defaults.retry.fixed_backoff.as_millis() as u64,
                )?),
            },
            early_stop: EarlyStop {
                single_threshold: env_or("LISTING_SINGLE_THRESHOLD", defaults.early_stop.single_threshold)?,
                sealed_threshold: env_or("LISTING_SEALED_THRESHOLD", defaults.early_stop.sealed_threshold)?,
            },
            product_timeout: Duration::from_secs(env_or(
                "LISTING_PRODUCT_TIMEOUT_SECS",
                defaults.product_timeout.as_secs(),
            )?),
        })
    }
}

fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}
