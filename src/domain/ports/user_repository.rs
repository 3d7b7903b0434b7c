//! User repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Page, User};

/// Filter criteria for listing users.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub is_admin: Option<bool>,
}

/// Repository interface for User persistence.
///
/// Balance changes go through `increment_balance` / `debit_balance`, which
/// must be applied atomically by the store (no read-modify-write).
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user.
    async fn create(&self, user: &User) -> DomainResult<()>;

    /// Get a user by ID.
    async fn get(&self, id: Uuid) -> DomainResult<Option<User>>;

    /// Get a user by email address.
    async fn get_by_email(&self, email: &str) -> DomainResult<Option<User>>;

    /// Get a user by username.
    async fn get_by_username(&self, username: &str) -> DomainResult<Option<User>>;

    /// Update profile fields (username, email, admin flag) of an existing user.
    /// The balance column is left alone.
    async fn update(&self, user: &User) -> DomainResult<()>;

    /// Delete a user by ID.
    async fn delete(&self, id: Uuid) -> DomainResult<()>;

    /// Assign a balance outright. Admin override only.
    async fn set_balance(&self, id: Uuid, balance: f64) -> DomainResult<()>;

    /// Atomically add a signed delta to a user's balance, returning the new balance.
    async fn increment_balance(&self, id: Uuid, delta: f64) -> DomainResult<f64>;

    /// Atomically subtract `amount` if and only if the balance covers it,
    /// returning the new balance. Fails with `InsufficientBalance` otherwise.
    async fn debit_balance(&self, id: Uuid, amount: f64) -> DomainResult<f64>;

    /// List users, newest first.
    async fn list(&self, filter: UserFilter, page: Page) -> DomainResult<Vec<User>>;

    /// Count users matching a filter.
    async fn count(&self, filter: UserFilter) -> DomainResult<u64>;
}
