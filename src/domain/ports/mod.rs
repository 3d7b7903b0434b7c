//! Port trait definitions (Hexagonal Architecture)
//!
//! Repository contracts the cache-aware services are written against:
//! - UserRepository: user records and atomic balance deltas
//! - SkinRepository: inventory items, listing and ownership
//! - TransactionRepository: transaction records and aggregate statistics

pub mod skin_repository;
pub mod transaction_repository;
pub mod user_repository;

pub use skin_repository::{SkinFilter, SkinRepository};
pub use transaction_repository::{StatsFilter, TransactionFilter, TransactionRepository};
pub use user_repository::{UserFilter, UserRepository};
