//! Shipping quote service.
//!
//! Loads the methods eligible for a (website, country) pair together with the
//! lines of their tables, then runs the core aggregator over them. Loaded
//! configuration is kept in a short-TTL `moka` cache.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, instrument, warn};

use shipquote_core::{
    CountryId, LineIndex, MethodKind, RateAggregator, RateQuote, ShippingMethod, ShippingMethodId,
    ShippingRequest, WebsiteId,
};

use crate::db::{CheckoutStore, RepositoryError};

/// Above this many methods the aggregator fans out over the rayon pool.
const PARALLEL_METHOD_THRESHOLD: usize = 64;

const CONFIG_CACHE_CAPACITY: u64 = 1_000;

/// Everything needed to quote one (website, country) pair.
#[derive(Debug, Clone)]
pub struct ShippingConfig {
    pub methods: Vec<ShippingMethod>,
    pub lines: LineIndex,
    /// False when some table's lines failed to load.
    pub complete: bool,
}

/// Cache of loaded configuration keyed by (website, country).
pub type ConfigCache = Cache<(WebsiteId, CountryId), Arc<ShippingConfig>>;

/// Build the configuration cache, or `None` when caching is disabled.
#[must_use]
pub fn build_config_cache(ttl: Option<Duration>) -> Option<ConfigCache> {
    ttl.map(|ttl| {
        Cache::builder()
            .max_capacity(CONFIG_CACHE_CAPACITY)
            .time_to_live(ttl)
            .build()
    })
}

/// Shipping quote service.
pub struct ShippingService<'a> {
    store: &'a dyn CheckoutStore,
    cache: Option<&'a ConfigCache>,
    aggregator: &'a RateAggregator,
}

impl<'a> ShippingService<'a> {
    /// Create a new shipping service.
    #[must_use]
    pub const fn new(
        store: &'a dyn CheckoutStore,
        cache: Option<&'a ConfigCache>,
        aggregator: &'a RateAggregator,
    ) -> Self {
        Self {
            store,
            cache,
            aggregator,
        }
    }

    /// Configuration for `website` and `country`, from cache when possible.
    ///
    /// A failure to read table lines does not fail the load: the affected
    /// tables are marked unavailable so only those methods drop out. Such a
    /// partial configuration is never cached.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the method list cannot be read.
    #[instrument(skip(self), fields(website = %website, country = %country))]
    pub async fn load_config(
        &self,
        website: WebsiteId,
        country: CountryId,
    ) -> Result<Arc<ShippingConfig>, RepositoryError> {
        let key = (website, country);
        if let Some(cache) = self.cache
            && let Some(config) = cache.get(&key).await
        {
            debug!("Cache hit for shipping configuration");
            return Ok(config);
        }

        let methods = self.store.eligible_methods(website, country).await?;
        let tables: Vec<ShippingMethodId> = methods
            .iter()
            .filter(|m| m.kind() == MethodKind::Table)
            .map(|m| m.id)
            .collect();

        let (lines, complete) = match self.store.table_lines(&tables).await {
            Ok(lines) => (LineIndex::from_lines(lines), true),
            Err(e) => {
                warn!(error = %e, tables = tables.len(), "Failed to load shipping table lines");
                let mut index = LineIndex::new();
                for table in &tables {
                    index.mark_unavailable(*table, e.to_string());
                }
                (index, false)
            }
        };

        let config = Arc::new(ShippingConfig {
            methods,
            lines,
            complete,
        });

        if let Some(cache) = self.cache
            && config.complete
        {
            cache.insert(key, Arc::clone(&config)).await;
        }

        Ok(config)
    }

    /// Quotes for `request`, in method registration order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the method configuration cannot be read.
    #[instrument(skip(self, request), fields(country = %request.country(), guest = request.is_guest))]
    pub async fn quote(&self, request: &ShippingRequest) -> Result<Vec<RateQuote>, RepositoryError> {
        let config = self.load_config(request.website, request.country()).await?;
        Ok(self.aggregate(request, &config))
    }

    fn aggregate(&self, request: &ShippingRequest, config: &ShippingConfig) -> Vec<RateQuote> {
        if config.methods.len() >= PARALLEL_METHOD_THRESHOLD {
            self.aggregator
                .aggregate_parallel(request, &config.methods, &config.lines)
        } else {
            self.aggregator
                .aggregate(request, &config.methods, &config.lines)
        }
    }
}
