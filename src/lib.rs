//! Skinmarket - cache-coherent marketplace services
//!
//! Users with balances, an inventory of tradeable skins and a transaction
//! ledger, all served through one in-process read cache that stays coherent
//! with the SQLite store. Balance transfers between users run as a
//! compensating saga.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, repository ports and the error taxonomy
//! - **Adapter Layer** (`adapters`): The coherent cache and the SQLite repositories
//! - **Service Layer** (`services`): Cache-aware use cases and the transfer saga
//! - **Infrastructure Layer** (`infrastructure`): Configuration and logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use skinmarket::adapters::cache::CoherentCache;
//! use skinmarket::adapters::sqlite::{initialize_database, SqliteUserRepository};
//! use skinmarket::services::{RequestContext, UserService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pool = initialize_database("sqlite:market.db", None).await?;
//!     let users = UserService::new(
//!         Arc::new(SqliteUserRepository::new(pool)),
//!         Arc::new(CoherentCache::default()),
//!     );
//!     let ctx = RequestContext::new();
//!     let alice = users.create_user(&ctx, "alice", "alice@example.com").await?;
//!     users.adjust_balance(&ctx, alice.id, 100.0).await?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use adapters::cache::{CacheMetrics, CoherentCache};
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    Config, Page, Paged, Skin, Transaction, TransactionStats, TransactionStatus, TransactionType, User,
};
pub use domain::ports::{SkinRepository, TransactionRepository, UserRepository};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    BalanceTransfer, InventoryService, RequestContext, TransactionService, TransferReceipt, UserService,
};
