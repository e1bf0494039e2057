//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use shipquote_core::{RateAggregator, StrategyRegistry};

use crate::config::StorefrontConfig;
use crate::db::{CheckoutStore, PgCheckoutStore};
use crate::services::shipping::{ConfigCache, ShippingService, build_config_cache};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    store: Arc<dyn CheckoutStore>,
    aggregator: RateAggregator,
    config_cache: Option<ConfigCache>,
}

impl AppState {
    /// Create a new application state with the built-in pricing strategies.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        Self::with_registry(config, pool, StrategyRegistry::builtin())
    }

    /// Create application state with a custom strategy registry.
    #[must_use]
    pub fn with_registry(
        config: StorefrontConfig,
        pool: PgPool,
        registry: StrategyRegistry,
    ) -> Self {
        let store = Arc::new(PgCheckoutStore::new(pool.clone()));
        Self::with_store(config, pool, store, registry)
    }

    /// Create application state over any checkout store.
    ///
    /// `pool` still backs the readiness probe.
    #[must_use]
    pub fn with_store(
        config: StorefrontConfig,
        pool: PgPool,
        store: Arc<dyn CheckoutStore>,
        registry: StrategyRegistry,
    ) -> Self {
        let config_cache = build_config_cache(config.shipping.config_cache_ttl);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                store,
                aggregator: RateAggregator::new(registry),
                config_cache,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Store behind the shipping routes.
    #[must_use]
    pub fn store(&self) -> &dyn CheckoutStore {
        self.inner.store.as_ref()
    }

    /// Shipping service bound to this state's store, cache and strategies.
    #[must_use]
    pub fn shipping(&self) -> ShippingService<'_> {
        ShippingService::new(
            self.inner.store.as_ref(),
            self.inner.config_cache.as_ref(),
            &self.inner.aggregator,
        )
    }
}
