//! Transaction repository port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    Page, Transaction, TransactionStats, TransactionStatus, TransactionType, TransactionUpdate,
};

/// Filter criteria for listing transactions.
///
/// `user_id` matches the buyer or the seller.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub user_id: Option<Uuid>,
    pub skin_id: Option<Uuid>,
    pub status: Option<TransactionStatus>,
    pub tx_type: Option<TransactionType>,
}

/// Filter criteria for aggregate statistics. Date bounds are inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsFilter {
    pub user_id: Option<Uuid>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// Repository interface for Transaction persistence.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Insert a new transaction.
    async fn create(&self, transaction: &Transaction) -> DomainResult<()>;

    /// Get a transaction by ID.
    async fn get(&self, id: Uuid) -> DomainResult<Option<Transaction>>;

    /// Apply a partial update and return the updated record.
    async fn update(&self, id: Uuid, update: &TransactionUpdate) -> DomainResult<Transaction>;

    /// Delete a transaction by ID.
    async fn delete(&self, id: Uuid) -> DomainResult<()>;

    /// List transactions, newest first.
    async fn list(&self, filter: TransactionFilter, page: Page) -> DomainResult<Vec<Transaction>>;

    /// Count transactions matching a filter.
    async fn count(&self, filter: TransactionFilter) -> DomainResult<u64>;

    /// Aggregate statistics over the filtered set.
    async fn stats(&self, filter: StatsFilter) -> DomainResult<TransactionStats>;
}
