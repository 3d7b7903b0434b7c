//! Wiring of the store, the cache and the services for one CLI invocation.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::adapters::cache::CoherentCache;
use crate::adapters::sqlite::{
    initialize_from_config, SqliteSkinRepository, SqliteTransactionRepository, SqliteUserRepository,
};
use crate::domain::models::Config;
use crate::services::{InventoryService, RequestContext, TransactionService, UserService};

/// All services sharing one pool and one cache.
pub struct Market {
    pub users: UserService<SqliteUserRepository>,
    pub inventory: InventoryService<SqliteSkinRepository>,
    pub transactions: TransactionService<SqliteTransactionRepository>,
    pub cache: Arc<CoherentCache>,
    config: Config,
}

impl Market {
    /// Open (and migrate) the configured database.
    pub async fn open(config: Config) -> Result<Self> {
        let pool = initialize_from_config(&config.database)
            .await
            .with_context(|| format!("Failed to open database at {}", config.database.path))?;
        Ok(Self::with_pool(pool, config))
    }

    pub fn with_pool(pool: SqlitePool, config: Config) -> Self {
        let cache = Arc::new(CoherentCache::new(&config.cache));
        Self {
            users: UserService::new(Arc::new(SqliteUserRepository::new(pool.clone())), Arc::clone(&cache)),
            inventory: InventoryService::new(Arc::new(SqliteSkinRepository::new(pool.clone())), Arc::clone(&cache)),
            transactions: TransactionService::new(Arc::new(SqliteTransactionRepository::new(pool)), Arc::clone(&cache)),
            cache,
            config,
        }
    }

    /// Fresh request context carrying the configured deadline.
    pub fn request(&self) -> RequestContext {
        RequestContext::from_config(&self.config.requests)
    }
}
