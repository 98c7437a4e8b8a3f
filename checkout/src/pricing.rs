//! Price catalog loading.
//!
//! Prices come from a [`PriceSource`]. Each fetch attempt is bounded by a
//! timeout and retried with backoff; when every attempt fails the checkout
//! continues with an empty catalog, so all prices read as zero.

use crate::error::PriceFetchError;
use crate::types::{Money, PriceCatalog, Tier};
use checkout_runtime::{retry_with_predicate, RetryPolicy};
use futures::future::{self, BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Where current prices come from
pub trait PriceSource: Send + Sync {
    /// Fetch the current catalog
    ///
    /// # Errors
    ///
    /// Returns [`PriceFetchError`] if the catalog is unavailable or malformed.
    fn fetch(&self) -> BoxFuture<'static, Result<PriceCatalog, PriceFetchError>>;
}

/// Always returns the same catalog
#[derive(Clone, Debug, Default)]
pub struct StaticPriceSource {
    catalog: PriceCatalog,
}

impl StaticPriceSource {
    /// Source serving `catalog`
    #[must_use]
    pub const fn new(catalog: PriceCatalog) -> Self {
        Self { catalog }
    }
}

impl PriceSource for StaticPriceSource {
    fn fetch(&self) -> BoxFuture<'static, Result<PriceCatalog, PriceFetchError>> {
        future::ready(Ok(self.catalog.clone())).boxed()
    }
}

/// Serves a catalog document in the pricing endpoint's format
///
/// The document is a JSON object mapping tier keys to prices in cents:
///
/// ```json
/// { "earlyBird": 5000, "regular": 7500, "vipSolo": 15000 }
/// ```
#[derive(Clone, Debug)]
pub struct JsonPriceSource {
    document: Arc<str>,
}

impl JsonPriceSource {
    /// Source serving `document`
    #[must_use]
    pub fn new(document: impl Into<Arc<str>>) -> Self {
        Self {
            document: document.into(),
        }
    }
}

impl PriceSource for JsonPriceSource {
    fn fetch(&self) -> BoxFuture<'static, Result<PriceCatalog, PriceFetchError>> {
        future::ready(parse_catalog(&self.document)).boxed()
    }
}

/// Parse a catalog document. Keys that are not tiers are skipped.
///
/// # Errors
///
/// Returns [`PriceFetchError::Malformed`] if the document is not an object of
/// non-negative integer prices.
pub fn parse_catalog(document: &str) -> Result<PriceCatalog, PriceFetchError> {
    let raw: BTreeMap<String, u64> = serde_json::from_str(document)
        .map_err(|e| PriceFetchError::Malformed(e.to_string()))?;

    Ok(raw
        .into_iter()
        .filter_map(|(key, cents)| match Tier::from_key(&key) {
            Some(tier) => Some((tier, Money::from_cents(cents))),
            None => {
                tracing::warn!(key, "Ignoring unknown tier in price catalog");
                None
            },
        })
        .collect())
}

/// Fetch the catalog with a per-attempt timeout, retrying transient failures.
///
/// # Errors
///
/// Returns the last [`PriceFetchError`] once retries are exhausted, or the
/// first non-transient one.
pub async fn fetch_with_retry(
    source: Arc<dyn PriceSource>,
    timeout: Duration,
    policy: RetryPolicy,
) -> Result<PriceCatalog, PriceFetchError> {
    retry_with_predicate(
        "price catalog fetch",
        policy,
        || {
            let attempt = source.fetch();
            async move {
                match tokio::time::timeout(timeout, attempt).await {
                    Ok(result) => result,
                    Err(_) => Err(PriceFetchError::Timeout(timeout)),
                }
            }
        },
        PriceFetchError::is_transient,
    )
    .await
}

/// Price catalog as seen by the checkout
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceCatalogState {
    catalog: PriceCatalog,
    loading: bool,
}

impl Default for PriceCatalogState {
    fn default() -> Self {
        Self {
            catalog: PriceCatalog::empty(),
            loading: true,
        }
    }
}

impl PriceCatalogState {
    /// Whether the catalog is still being fetched
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Prices to derive totals from; empty while loading
    #[must_use]
    pub const fn catalog(&self) -> &PriceCatalog {
        &self.catalog
    }

    /// Start (or restart) a fetch
    pub fn begin_loading(&mut self) {
        self.catalog = PriceCatalog::empty();
        self.loading = true;
    }

    /// Install a fetched catalog
    pub fn loaded(&mut self, catalog: PriceCatalog) {
        self.catalog = catalog;
        self.loading = false;
    }

    /// Give up on fetching; every price reads as zero
    pub fn failed(&mut self) {
        self.catalog = PriceCatalog::empty();
        self.loading = false;
    }
}
