pub mod config;
pub mod paging;
pub mod skin;
pub mod transaction;
pub mod user;

pub use config::{CacheConfig, Config, DatabaseConfig, LoggingConfig, RequestConfig};
pub use paging::{Page, Paged};
pub use skin::Skin;
pub use transaction::{
    Transaction, TransactionStats, TransactionStatus, TransactionType, TransactionUpdate,
};
pub use user::{AdminUserUpdate, User};
