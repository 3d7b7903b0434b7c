//! Balance transfer saga.
//!
//! Moves an amount between two accounts with two independent atomic
//! increments and no lock held across them:
//!
//! 1. load the sender (through the cache) and check its balance,
//! 2. load the receiver,
//! 3. debit the sender with a guarded atomic decrement,
//! 4. credit the receiver with an atomic increment,
//! 5. if the credit fails, credit the amount back onto the sender.
//!
//! The step-1 balance check is only a fast fail. The debit re-checks the
//! balance inside the store, so a concurrent transfer cannot overdraw the
//! sender between the check and the debit.
//!
//! When both the credit and the compensation fail, the money is debited
//! from the sender without being credited anywhere. That outcome is
//! reported as [`DomainError::PartialTransferUnrecovered`] and logged at
//! error level; it is never retried.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::adapters::cache::{keys, Affected, CoherentCache, EntityKind};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::User;
use crate::domain::ports::UserRepository;
use crate::services::request::RequestContext;

/// Where a transfer ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferState {
    Completed,
    /// Rejected before any mutation.
    Rejected,
    /// Credit failed, sender restored.
    RolledBack,
    /// Credit failed and so did the compensation.
    Unrecovered,
}

impl TransferState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Rejected => "rejected",
            Self::RolledBack => "rolled_back",
            Self::Unrecovered => "unrecovered",
        }
    }

    /// Whether balances were touched on the way to this state.
    pub fn mutated(&self) -> bool {
        !matches!(self, Self::Rejected)
    }
}

/// Result of a completed transfer.
#[derive(Debug, Clone, Serialize)]
pub struct TransferReceipt {
    pub from: Uuid,
    pub to: Uuid,
    pub amount: f64,
    pub from_balance: f64,
    pub to_balance: f64,
}

type Outcome = (TransferState, DomainResult<TransferReceipt>);

pub struct BalanceTransfer<R: UserRepository> {
    repository: Arc<R>,
    cache: Arc<CoherentCache>,
}

impl<R: UserRepository> BalanceTransfer<R> {
    pub fn new(repository: Arc<R>, cache: Arc<CoherentCache>) -> Self {
        Self { repository, cache }
    }

    /// Move `amount` from `from` to `to`.
    pub async fn transfer(
        &self,
        ctx: &RequestContext,
        from: Uuid,
        to: Uuid,
        amount: f64,
    ) -> DomainResult<TransferReceipt> {
        let (state, outcome) = self.run(ctx, from, to, amount).await;

        if state.mutated() {
            self.cache
                .invalidate_for_write(EntityKind::User, &Affected::ids([from, to]))
                .await;
        }

        match (&outcome, state) {
            (Ok(_), _) => info!(%from, %to, amount, state = state.as_str(), "Balance transfer completed"),
            (Err(_), TransferState::Unrecovered) => {}
            (Err(e), _) => warn!(%from, %to, amount, state = state.as_str(), error = %e, "Balance transfer failed"),
        }
        outcome
    }

    async fn run(&self, ctx: &RequestContext, from: Uuid, to: Uuid, amount: f64) -> Outcome {
        if let Err(e) = validate(from, to, amount) {
            return (TransferState::Rejected, Err(e));
        }

        // Aborting is only honoured while nothing has been mutated.
        let sender = match ctx.run(self.load_account(from)).await {
            Ok(sender) => sender,
            Err(e) => return (TransferState::Rejected, Err(e)),
        };
        if sender.balance < amount {
            let err = DomainError::InsufficientBalance {
                account: from,
                available: sender.balance,
                requested: amount,
            };
            return (TransferState::Rejected, Err(err));
        }
        if let Err(e) = ctx.run(self.load_account(to)).await {
            return (TransferState::Rejected, Err(e));
        }
        if let Err(e) = ctx.check() {
            return (TransferState::Rejected, Err(e));
        }

        let from_balance = match self.repository.debit_balance(from, amount).await {
            Ok(balance) => balance,
            Err(e) => {
                let e = match e {
                    DomainError::UserNotFound(id) => DomainError::AccountNotFound(id),
                    other => other,
                };
                // The store's guard saw a fresher balance than our read: drop
                // the cached sender so the next attempt reloads it.
                if matches!(e, DomainError::InsufficientBalance { .. }) {
                    self.cache.delete(&keys::user_record(from)).await;
                    self.cache.delete(&keys::user_balance(from)).await;
                }
                return (TransferState::Rejected, Err(e));
            }
        };

        match self.repository.increment_balance(to, amount).await {
            Ok(to_balance) => (
                TransferState::Completed,
                Ok(TransferReceipt {
                    from,
                    to,
                    amount,
                    from_balance,
                    to_balance,
                }),
            ),
            Err(credit_error) => self.compensate(from, to, amount, credit_error).await,
        }
    }

    async fn compensate(
        &self,
        from: Uuid,
        to: Uuid,
        amount: f64,
        credit_error: DomainError,
    ) -> Outcome {
        warn!(%from, %to, amount, error = %credit_error, "Credit leg failed, crediting sender back");

        match self.repository.increment_balance(from, amount).await {
            Ok(_) => {
                let original = match credit_error {
                    DomainError::UserNotFound(id) => DomainError::AccountNotFound(id),
                    other => other,
                };
                (TransferState::RolledBack, Err(original))
            }
            Err(rollback_error) => {
                error!(
                    %from,
                    %to,
                    amount,
                    credit_error = %credit_error,
                    rollback_error = %rollback_error,
                    "Balance transfer left unrecovered: sender debited, receiver not credited"
                );
                (
                    TransferState::Unrecovered,
                    Err(DomainError::PartialTransferUnrecovered {
                        from,
                        to,
                        amount,
                        credit_error: credit_error.to_string(),
                        rollback_error: rollback_error.to_string(),
                    }),
                )
            }
        }
    }

    async fn load_account(&self, id: Uuid) -> DomainResult<User> {
        let repository = Arc::clone(&self.repository);
        self.cache
            .get_or_load(&keys::user_record(id), || async move {
                repository.get(id).await?.ok_or(DomainError::AccountNotFound(id))
            })
            .await
    }
}

fn validate(from: Uuid, to: Uuid, amount: f64) -> DomainResult<()> {
    if !(amount.is_finite() && amount > 0.0) {
        return Err(DomainError::InvalidArgument(format!(
            "transfer amount must be a positive number, got {amount}"
        )));
    }
    if from == to {
        return Err(DomainError::InvalidArgument(
            "cannot transfer to the same account".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteUserRepository};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::domain::models::Page;
    use crate::domain::ports::UserFilter;

    /// Wraps a real repository and fails selected increments.
    struct FaultyRepository {
        inner: SqliteUserRepository,
        fail_credit_to: Option<Uuid>,
        fail_rollback: AtomicBool,
        debited: AtomicBool,
    }

    #[async_trait]
    impl UserRepository for FaultyRepository {
        async fn create(&self, user: &User) -> DomainResult<()> {
            self.inner.create(user).await
        }
        async fn get(&self, id: Uuid) -> DomainResult<Option<User>> {
            self.inner.get(id).await
        }
        async fn get_by_email(&self, email: &str) -> DomainResult<Option<User>> {
            self.inner.get_by_email(email).await
        }
        async fn get_by_username(&self, username: &str) -> DomainResult<Option<User>> {
            self.inner.get_by_username(username).await
        }
        async fn update(&self, user: &User) -> DomainResult<()> {
            self.inner.update(user).await
        }
        async fn delete(&self, id: Uuid) -> DomainResult<()> {
            self.inner.delete(id).await
        }
        async fn set_balance(&self, id: Uuid, balance: f64) -> DomainResult<()> {
            self.inner.set_balance(id, balance).await
        }
        async fn increment_balance(&self, id: Uuid, delta: f64) -> DomainResult<f64> {
            if Some(id) == self.fail_credit_to {
                return Err(DomainError::DatabaseError("credit leg unavailable".into()));
            }
            if self.debited.load(Ordering::SeqCst) && self.fail_rollback.load(Ordering::SeqCst) {
                return Err(DomainError::DatabaseError("rollback leg unavailable".into()));
            }
            self.inner.increment_balance(id, delta).await
        }
        async fn debit_balance(&self, id: Uuid, amount: f64) -> DomainResult<f64> {
            let balance = self.inner.debit_balance(id, amount).await?;
            self.debited.store(true, Ordering::SeqCst);
            Ok(balance)
        }
        async fn list(&self, filter: UserFilter, page: Page) -> DomainResult<Vec<User>> {
            self.inner.list(filter, page).await
        }
        async fn count(&self, filter: UserFilter) -> DomainResult<u64> {
            self.inner.count(filter).await
        }
    }

    async fn setup(a: f64, b: f64) -> (Arc<SqliteUserRepository>, Uuid, Uuid) {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = SqliteUserRepository::new(pool);
        let alice = User::new("alice", "alice@example.com").with_balance(a);
        let bob = User::new("bob", "bob@example.com").with_balance(b);
        repo.create(&alice).await.unwrap();
        repo.create(&bob).await.unwrap();
        (Arc::new(repo), alice.id, bob.id)
    }

    async fn balance<R: UserRepository>(repo: &R, id: Uuid) -> f64 {
        repo.get(id).await.unwrap().unwrap().balance
    }

    fn saga<R: UserRepository>(repo: Arc<R>) -> BalanceTransfer<R> {
        BalanceTransfer::new(repo, Arc::new(CoherentCache::default()))
    }

    fn faulty(inner: &SqliteUserRepository, fail_credit_to: Uuid, fail_rollback: bool) -> Arc<FaultyRepository> {
        Arc::new(FaultyRepository {
            inner: inner.clone(),
            fail_credit_to: Some(fail_credit_to),
            fail_rollback: AtomicBool::new(fail_rollback),
            debited: AtomicBool::new(false),
        })
    }

    #[tokio::test]
    async fn test_successful_transfer() {
        let (repo, a, b) = setup(100.0, 50.0).await;
        let receipt = saga(repo.clone())
            .transfer(&RequestContext::new(), a, b, 30.0)
            .await
            .unwrap();

        assert!((receipt.from_balance - 70.0).abs() < 1e-9);
        assert!((receipt.to_balance - 80.0).abs() < 1e-9);
        assert!((balance(repo.as_ref(), a).await - 70.0).abs() < 1e-9);
        assert!((balance(repo.as_ref(), b).await - 80.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_insufficient_balance_changes_nothing() {
        let (repo, a, b) = setup(20.0, 50.0).await;
        let err = saga(repo.clone())
            .transfer(&RequestContext::new(), a, b, 30.0)
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::InsufficientBalance { .. }));
        assert!((balance(repo.as_ref(), a).await - 20.0).abs() < 1e-9);
        assert!((balance(repo.as_ref(), b).await - 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_missing_accounts_are_account_not_found() {
        let (repo, a, _) = setup(100.0, 0.0).await;
        let ghost = Uuid::new_v4();
        let transfer = saga(repo.clone());

        let err = transfer.transfer(&RequestContext::new(), ghost, a, 1.0).await.unwrap_err();
        assert!(matches!(err, DomainError::AccountNotFound(id) if id == ghost));

        let err = transfer.transfer(&RequestContext::new(), a, ghost, 1.0).await.unwrap_err();
        assert!(matches!(err, DomainError::AccountNotFound(id) if id == ghost));
        assert!((balance(repo.as_ref(), a).await - 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_invalid_arguments() {
        let (repo, a, b) = setup(100.0, 0.0).await;
        let transfer = saga(repo);
        let ctx = RequestContext::new();

        for amount in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let err = transfer.transfer(&ctx, a, b, amount).await.unwrap_err();
            assert!(matches!(err, DomainError::InvalidArgument(_)), "amount {amount}");
        }
        let err = transfer.transfer(&ctx, a, a, 1.0).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_credit_failure_rolls_back() {
        let (repo, a, b) = setup(100.0, 50.0).await;
        let err = saga(faulty(&repo, b, false))
            .transfer(&RequestContext::new(), a, b, 30.0)
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::DatabaseError(_)));
        assert!(!err.is_reconciliation_hazard());
        assert!((balance(repo.as_ref(), a).await - 100.0).abs() < 1e-9);
        assert!((balance(repo.as_ref(), b).await - 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_credit_and_rollback_failure_is_unrecovered() {
        let (repo, a, b) = setup(100.0, 50.0).await;
        let err = saga(faulty(&repo, b, true))
            .transfer(&RequestContext::new(), a, b, 30.0)
            .await
            .unwrap_err();

        assert!(err.is_reconciliation_hazard());
        match err {
            DomainError::PartialTransferUnrecovered { from, to, amount, .. } => {
                assert_eq!((from, to), (a, b));
                assert!((amount - 30.0).abs() < 1e-9);
            }
            other => panic!("unexpected error: {other}"),
        }
        // Sender debited, receiver untouched.
        assert!((balance(repo.as_ref(), a).await - 70.0).abs() < 1e-9);
        assert!((balance(repo.as_ref(), b).await - 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_cached_accounts_are_invalidated() {
        let (repo, a, b) = setup(100.0, 50.0).await;
        let cache = Arc::new(CoherentCache::default());
        let transfer = BalanceTransfer::new(repo.clone(), cache.clone());

        transfer.transfer(&RequestContext::new(), a, b, 10.0).await.unwrap();
        assert!(cache.get::<User>(&keys::user_record(a)).await.is_none());
        assert!(cache.get::<User>(&keys::user_record(b)).await.is_none());
    }

    #[tokio::test]
    async fn test_stale_cached_balance_cannot_overdraw() {
        let (repo, a, b) = setup(100.0, 50.0).await;
        let cache = Arc::new(CoherentCache::default());
        let mut stale = repo.get(a).await.unwrap().unwrap();
        stale.balance = 1_000.0;
        cache.put(&keys::user_record(a), stale).await;
        cache.put(&keys::user_balance(a), 1_000.0_f64).await;

        let err = BalanceTransfer::new(repo.clone(), cache.clone())
            .transfer(&RequestContext::new(), a, b, 500.0)
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::InsufficientBalance { .. }));
        assert!((balance(repo.as_ref(), a).await - 100.0).abs() < 1e-9);
        assert!((balance(repo.as_ref(), b).await - 50.0).abs() < 1e-9);
        assert!(cache.get::<User>(&keys::user_record(a)).await.is_none());
        assert!(cache.get::<f64>(&keys::user_balance(a)).await.is_none());
    }

    #[tokio::test]
    async fn test_cancelled_before_debit_mutates_nothing() {
        let (repo, a, b) = setup(100.0, 50.0).await;
        let ctx = RequestContext::new();
        ctx.cancel();

        let err = saga(repo.clone()).transfer(&ctx, a, b, 10.0).await.unwrap_err();
        assert!(matches!(err, DomainError::Cancelled));
        assert!((balance(repo.as_ref(), a).await - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_only_rejection_leaves_balances_untouched() {
        assert!(!TransferState::Rejected.mutated());
        assert!(TransferState::RolledBack.mutated());
        assert!(TransferState::Unrecovered.mutated());
    }
}
