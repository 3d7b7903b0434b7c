//! Transaction service: purchase records, history listings and statistics.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::adapters::cache::{keys, Affected, CoherentCache, EntityKind};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Page, Paged, Transaction, TransactionStats, TransactionStatus, TransactionType, TransactionUpdate,
};
use crate::domain::ports::{StatsFilter, TransactionFilter, TransactionRepository};
use crate::services::request::RequestContext;

pub struct TransactionService<R: TransactionRepository> {
    repository: Arc<R>,
    cache: Arc<CoherentCache>,
}

impl<R: TransactionRepository> TransactionService<R> {
    pub fn new(repository: Arc<R>, cache: Arc<CoherentCache>) -> Self {
        Self { repository, cache }
    }

    /// Record a new transaction. It always starts out `PENDING`.
    pub async fn create_transaction(&self, ctx: &RequestContext, transaction: Transaction) -> DomainResult<Transaction> {
        let transaction = transaction.with_status(TransactionStatus::Pending);
        transaction.validate().map_err(DomainError::InvalidArgument)?;

        ctx.run_write(
            &self.cache,
            EntityKind::Transaction,
            &affected_transaction(&transaction),
            self.repository.create(&transaction),
        )
        .await?;

        info!(
            transaction_id = %transaction.id,
            buyer_id = %transaction.buyer_id,
            skin_id = %transaction.skin_id,
            amount = transaction.amount,
            "Transaction created"
        );
        Ok(transaction)
    }

    pub async fn get_transaction(&self, ctx: &RequestContext, id: Uuid) -> DomainResult<Transaction> {
        let key = keys::transaction_record(id);
        ctx.run(self.cache.get_or_load(&key, || async move {
            self.repository.get(id).await?.ok_or(DomainError::TransactionNotFound(id))
        }))
        .await
    }

    /// Change status and/or description.
    pub async fn update_transaction(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        update: TransactionUpdate,
    ) -> DomainResult<Transaction> {
        if update.is_empty() {
            return Err(DomainError::InvalidArgument("no fields to update".to_string()));
        }

        let before = self.fetch(ctx, id).await?;
        let updated = ctx
            .run_write(
                &self.cache,
                EntityKind::Transaction,
                &affected_transaction(&before),
                self.repository.update(id, &update),
            )
            .await?;

        info!(
            transaction_id = %id,
            from = before.status.as_str(),
            to = updated.status.as_str(),
            "Transaction updated"
        );
        Ok(updated)
    }

    /// Mark a transaction `CANCELLED`, recording the reason when one is given.
    pub async fn cancel_transaction(&self, ctx: &RequestContext, id: Uuid, reason: &str) -> DomainResult<Transaction> {
        let reason = reason.trim();
        let update = TransactionUpdate {
            status: Some(TransactionStatus::Cancelled),
            description: (!reason.is_empty()).then(|| format!("Cancelled: {reason}")),
        };
        self.update_transaction(ctx, id, update).await
    }

    pub async fn delete_transaction(&self, ctx: &RequestContext, id: Uuid) -> DomainResult<()> {
        let transaction = self.fetch(ctx, id).await?;

        ctx.run_write(
            &self.cache,
            EntityKind::Transaction,
            &affected_transaction(&transaction),
            self.repository.delete(id),
        )
        .await?;

        info!(transaction_id = %id, "Transaction deleted");
        Ok(())
    }

    /// Transactions where the user is buyer or seller, newest first.
    pub async fn list_by_user(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        status: Option<TransactionStatus>,
        tx_type: Option<TransactionType>,
        page: Page,
    ) -> DomainResult<Paged<Transaction>> {
        let key = keys::transactions_by_user(user_id, status, tx_type, page);
        let filter = TransactionFilter {
            user_id: Some(user_id),
            status,
            tx_type,
            ..TransactionFilter::default()
        };
        ctx.run(self.cache.get_or_load(&key, || self.load_page(filter, page)))
            .await
    }

    /// Full history of one skin.
    pub async fn list_by_skin(&self, ctx: &RequestContext, skin_id: Uuid) -> DomainResult<Vec<Transaction>> {
        let key = keys::transactions_by_skin(skin_id);
        let filter = TransactionFilter {
            skin_id: Some(skin_id),
            ..TransactionFilter::default()
        };
        ctx.run(self.cache.get_or_load(&key, || self.repository.list(filter, Page::all())))
            .await
    }

    pub async fn list_by_status(
        &self,
        ctx: &RequestContext,
        status: TransactionStatus,
        page: Page,
    ) -> DomainResult<Paged<Transaction>> {
        let key = keys::transactions_by_status(status, page);
        let filter = TransactionFilter {
            status: Some(status),
            ..TransactionFilter::default()
        };
        ctx.run(self.cache.get_or_load(&key, || self.load_page(filter, page)))
            .await
    }

    pub async fn list_all(&self, ctx: &RequestContext, page: Page) -> DomainResult<Paged<Transaction>> {
        let key = keys::transactions_all(page);
        ctx.run(self.cache.get_or_load(&key, || self.load_page(TransactionFilter::default(), page)))
            .await
    }

    /// Aggregate statistics, optionally scoped to a user and a date range.
    ///
    /// Success means `COMPLETED`; failure means `FAILED` or `CANCELLED`.
    pub async fn compute_stats(&self, ctx: &RequestContext, filter: StatsFilter) -> DomainResult<TransactionStats> {
        if let (Some(start), Some(end)) = (filter.start, filter.end) {
            if start > end {
                return Err(DomainError::InvalidArgument(format!(
                    "start {start} is after end {end}"
                )));
            }
        }

        let key = keys::transaction_stats(filter);
        ctx.run(self.cache.get_or_load(&key, || self.repository.stats(filter)))
            .await
    }

    async fn load_page(&self, filter: TransactionFilter, page: Page) -> DomainResult<Paged<Transaction>> {
        let items = self.repository.list(filter.clone(), page).await?;
        let total = self.repository.count(filter).await?;
        Ok(Paged::new(items, total))
    }

    /// Uncached read for write paths.
    async fn fetch(&self, ctx: &RequestContext, id: Uuid) -> DomainResult<Transaction> {
        ctx.run(self.repository.get(id))
            .await?
            .ok_or(DomainError::TransactionNotFound(id))
    }
}

fn affected_transaction(transaction: &Transaction) -> Affected {
    Affected::ids([transaction.id])
        .with_owners(transaction.parties())
        .with_skins([transaction.skin_id])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteTransactionRepository};

    async fn setup_service() -> TransactionService<SqliteTransactionRepository> {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = Arc::new(SqliteTransactionRepository::new(pool));
        TransactionService::new(repo, Arc::new(CoherentCache::default()))
    }

    #[tokio::test]
    async fn test_create_starts_pending() {
        let service = setup_service().await;
        let ctx = RequestContext::new();

        let tx = Transaction::new(Uuid::new_v4(), Uuid::new_v4(), 12.0).with_status(TransactionStatus::Completed);
        let created = service.create_transaction(&ctx, tx).await.unwrap();
        assert_eq!(created.status, TransactionStatus::Pending);

        let err = service
            .create_transaction(&ctx, Transaction::new(Uuid::new_v4(), Uuid::new_v4(), -1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_update_visible_through_cache() {
        let service = setup_service().await;
        let ctx = RequestContext::new();
        let tx = service
            .create_transaction(&ctx, Transaction::new(Uuid::new_v4(), Uuid::new_v4(), 10.0))
            .await
            .unwrap();
        service.get_transaction(&ctx, tx.id).await.unwrap();

        let update = TransactionUpdate {
            status: Some(TransactionStatus::Completed),
            description: None,
        };
        service.update_transaction(&ctx, tx.id, update).await.unwrap();
        assert_eq!(
            service.get_transaction(&ctx, tx.id).await.unwrap().status,
            TransactionStatus::Completed
        );

        let err = service
            .update_transaction(&ctx, tx.id, TransactionUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_cancel_records_reason() {
        let service = setup_service().await;
        let ctx = RequestContext::new();
        let tx = service
            .create_transaction(
                &ctx,
                Transaction::new(Uuid::new_v4(), Uuid::new_v4(), 10.0).with_description("original"),
            )
            .await
            .unwrap();

        let cancelled = service.cancel_transaction(&ctx, tx.id, "buyer changed mind").await.unwrap();
        assert_eq!(cancelled.status, TransactionStatus::Cancelled);
        assert_eq!(cancelled.description, "Cancelled: buyer changed mind");

        let tx2 = service
            .create_transaction(
                &ctx,
                Transaction::new(Uuid::new_v4(), Uuid::new_v4(), 10.0).with_description("kept"),
            )
            .await
            .unwrap();
        let cancelled = service.cancel_transaction(&ctx, tx2.id, "  ").await.unwrap();
        assert_eq!(cancelled.description, "kept");

        let err = service.cancel_transaction(&ctx, Uuid::new_v4(), "x").await.unwrap_err();
        assert!(matches!(err, DomainError::TransactionNotFound(_)));
    }

    #[tokio::test]
    async fn test_user_history_refreshed_for_both_parties() {
        let service = setup_service().await;
        let ctx = RequestContext::new();
        let buyer = Uuid::new_v4();
        let seller = Uuid::new_v4();

        assert_eq!(
            service.list_by_user(&ctx, seller, None, None, Page::all()).await.unwrap().total_count,
            0
        );

        service
            .create_transaction(
                &ctx,
                Transaction::new(buyer, Uuid::new_v4(), 25.0).with_seller(seller),
            )
            .await
            .unwrap();

        assert_eq!(
            service.list_by_user(&ctx, seller, None, None, Page::all()).await.unwrap().total_count,
            1
        );
        assert_eq!(
            service.list_by_user(&ctx, buyer, None, None, Page::all()).await.unwrap().total_count,
            1
        );
        let sells = service
            .list_by_user(&ctx, buyer, None, Some(TransactionType::Sell), Page::all())
            .await
            .unwrap();
        assert!(sells.items.is_empty());
    }

    #[tokio::test]
    async fn test_status_and_skin_listings() {
        let service = setup_service().await;
        let ctx = RequestContext::new();
        let skin = Uuid::new_v4();

        let tx = service
            .create_transaction(&ctx, Transaction::new(Uuid::new_v4(), skin, 5.0))
            .await
            .unwrap();
        assert_eq!(service.list_by_skin(&ctx, skin).await.unwrap().len(), 1);
        assert_eq!(
            service
                .list_by_status(&ctx, TransactionStatus::Pending, Page::all())
                .await
                .unwrap()
                .total_count,
            1
        );

        service.cancel_transaction(&ctx, tx.id, "").await.unwrap();
        assert_eq!(
            service
                .list_by_status(&ctx, TransactionStatus::Pending, Page::all())
                .await
                .unwrap()
                .total_count,
            0
        );
        assert_eq!(service.list_all(&ctx, Page::new(10, 0)).await.unwrap().total_count, 1);

        service.delete_transaction(&ctx, tx.id).await.unwrap();
        assert!(service.list_by_skin(&ctx, skin).await.unwrap().is_empty());
        assert!(service.get_transaction(&ctx, tx.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_stats_refreshed_after_write() {
        let service = setup_service().await;
        let ctx = RequestContext::new();

        let empty = service.compute_stats(&ctx, StatsFilter::default()).await.unwrap();
        assert_eq!(empty, TransactionStats::default());

        let a = service
            .create_transaction(&ctx, Transaction::new(Uuid::new_v4(), Uuid::new_v4(), 10.0))
            .await
            .unwrap();
        let b = service
            .create_transaction(&ctx, Transaction::new(Uuid::new_v4(), Uuid::new_v4(), 20.0))
            .await
            .unwrap();
        service
            .update_transaction(
                &ctx,
                a.id,
                TransactionUpdate {
                    status: Some(TransactionStatus::Completed),
                    description: None,
                },
            )
            .await
            .unwrap();
        service
            .update_transaction(
                &ctx,
                b.id,
                TransactionUpdate {
                    status: Some(TransactionStatus::Failed),
                    description: None,
                },
            )
            .await
            .unwrap();

        let stats = service.compute_stats(&ctx, StatsFilter::default()).await.unwrap();
        assert_eq!(stats.total, 2);
        assert!((stats.total_amount - 30.0).abs() < 1e-9);
        assert_eq!(stats.success_count, 1);
        assert_eq!(stats.failure_count, 1);
        assert!((stats.average_amount - 15.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_stats_rejects_inverted_range() {
        let service = setup_service().await;
        let now = chrono::Utc::now();
        let filter = StatsFilter {
            user_id: None,
            start: Some(now),
            end: Some(now - chrono::Duration::days(1)),
        };
        let err = service.compute_stats(&RequestContext::new(), filter).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument(_)));
    }
}
