//! SQLite implementation of the TransactionRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::adapters::sqlite::{format_datetime, parse_datetime, parse_optional_uuid, parse_uuid, push_page};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Page, Transaction, TransactionStats, TransactionStatus, TransactionType, TransactionUpdate,
};
use crate::domain::ports::{StatsFilter, TransactionFilter, TransactionRepository};

const TRANSACTION_COLUMNS: &str =
    "id, buyer_id, seller_id, skin_id, amount, status, tx_type, description, created_at, updated_at";

#[derive(Clone)]
pub struct SqliteTransactionRepository {
    pool: SqlitePool,
}

impl SqliteTransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn filter_clause(filter: &TransactionFilter) -> (String, Vec<String>) {
    let mut clause = String::from(" WHERE 1=1");
    let mut bindings = Vec::new();

    if let Some(user_id) = filter.user_id {
        clause.push_str(" AND (buyer_id = ? OR seller_id = ?)");
        bindings.push(user_id.to_string());
        bindings.push(user_id.to_string());
    }
    if let Some(skin_id) = filter.skin_id {
        clause.push_str(" AND skin_id = ?");
        bindings.push(skin_id.to_string());
    }
    if let Some(status) = filter.status {
        clause.push_str(" AND status = ?");
        bindings.push(status.as_str().to_string());
    }
    if let Some(tx_type) = filter.tx_type {
        clause.push_str(" AND tx_type = ?");
        bindings.push(tx_type.as_str().to_string());
    }

    (clause, bindings)
}

fn stats_clause(filter: &StatsFilter) -> (String, Vec<String>) {
    let mut clause = String::from(" WHERE 1=1");
    let mut bindings = Vec::new();

    if let Some(user_id) = filter.user_id {
        clause.push_str(" AND (buyer_id = ? OR seller_id = ?)");
        bindings.push(user_id.to_string());
        bindings.push(user_id.to_string());
    }
    if let Some(start) = filter.start {
        clause.push_str(" AND created_at >= ?");
        bindings.push(format_datetime(&start));
    }
    if let Some(end) = filter.end {
        clause.push_str(" AND created_at <= ?");
        bindings.push(format_datetime(&end));
    }

    (clause, bindings)
}

#[async_trait]
impl TransactionRepository for SqliteTransactionRepository {
    async fn create(&self, transaction: &Transaction) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO transactions (id, buyer_id, seller_id, skin_id, amount, status, tx_type, description, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#
        )
        .bind(transaction.id.to_string())
        .bind(transaction.buyer_id.to_string())
        .bind(transaction.seller_id.map(|id| id.to_string()))
        .bind(transaction.skin_id.to_string())
        .bind(transaction.amount)
        .bind(transaction.status.as_str())
        .bind(transaction.tx_type.as_str())
        .bind(&transaction.description)
        .bind(format_datetime(&transaction.created_at))
        .bind(format_datetime(&transaction.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Transaction>> {
        let query = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?");
        let row: Option<TransactionRow> = sqlx::query_as(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn update(&self, id: Uuid, update: &TransactionUpdate) -> DomainResult<Transaction> {
        let mut query = String::from("UPDATE transactions SET updated_at = ?");
        let mut bindings = vec![format_datetime(&chrono::Utc::now())];

        if let Some(status) = update.status {
            query.push_str(", status = ?");
            bindings.push(status.as_str().to_string());
        }
        if let Some(description) = &update.description {
            query.push_str(", description = ?");
            bindings.push(description.clone());
        }
        query.push_str(&format!(" WHERE id = ? RETURNING {TRANSACTION_COLUMNS}"));
        bindings.push(id.to_string());

        let mut q = sqlx::query_as::<_, TransactionRow>(&query);
        for binding in &bindings {
            q = q.bind(binding);
        }

        let row = q.fetch_optional(&self.pool).await?;
        row.ok_or(DomainError::TransactionNotFound(id))?.try_into()
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::TransactionNotFound(id));
        }

        Ok(())
    }

    async fn list(&self, filter: TransactionFilter, page: Page) -> DomainResult<Vec<Transaction>> {
        let (clause, bindings) = filter_clause(&filter);
        let mut query = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions{clause} ORDER BY created_at DESC, id");
        push_page(&mut query, page);

        let mut q = sqlx::query_as::<_, TransactionRow>(&query);
        for binding in &bindings {
            q = q.bind(binding);
        }

        let rows: Vec<TransactionRow> = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn count(&self, filter: TransactionFilter) -> DomainResult<u64> {
        let (clause, bindings) = filter_clause(&filter);
        let query = format!("SELECT COUNT(*) FROM transactions{clause}");

        let mut q = sqlx::query_as::<_, (i64,)>(&query);
        for binding in &bindings {
            q = q.bind(binding);
        }

        let (count,) = q.fetch_one(&self.pool).await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn stats(&self, filter: StatsFilter) -> DomainResult<TransactionStats> {
        let (clause, bindings) = stats_clause(&filter);
        let query = format!(
            r#"SELECT COUNT(*) AS total,
                      TOTAL(amount) AS total_amount,
                      COALESCE(SUM(CASE WHEN status = 'COMPLETED' THEN 1 ELSE 0 END), 0) AS success_count,
                      COALESCE(SUM(CASE WHEN status IN ('FAILED', 'CANCELLED') THEN 1 ELSE 0 END), 0) AS failure_count
               FROM transactions{clause}"#
        );

        let mut q = sqlx::query_as::<_, StatsRow>(&query);
        for binding in &bindings {
            q = q.bind(binding);
        }

        let row = q.fetch_one(&self.pool).await?;
        Ok(TransactionStats::from_totals(
            u64::try_from(row.total).unwrap_or(0),
            row.total_amount,
            u64::try_from(row.success_count).unwrap_or(0),
            u64::try_from(row.failure_count).unwrap_or(0),
        ))
    }
}

#[derive(sqlx::FromRow)]
struct StatsRow {
    total: i64,
    total_amount: f64,
    success_count: i64,
    failure_count: i64,
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: String,
    buyer_id: String,
    seller_id: Option<String>,
    skin_id: String,
    amount: f64,
    status: String,
    tx_type: String,
    description: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = DomainError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let status = TransactionStatus::from_str(&row.status)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid transaction status: {}", row.status)))?;
        let tx_type = TransactionType::from_str(&row.tx_type)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid transaction type: {}", row.tx_type)))?;

        Ok(Transaction {
            id: parse_uuid(&row.id)?,
            buyer_id: parse_uuid(&row.buyer_id)?,
            seller_id: parse_optional_uuid(row.seller_id)?,
            skin_id: parse_uuid(&row.skin_id)?,
            amount: row.amount,
            status,
            tx_type,
            description: row.description,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use chrono::{Duration, TimeZone, Utc};

    async fn setup_test_repo() -> SqliteTransactionRepository {
        let pool = create_migrated_test_pool().await.unwrap();
        SqliteTransactionRepository::new(pool)
    }

    #[tokio::test]
    async fn test_create_get_update() {
        let repo = setup_test_repo().await;
        let tx = Transaction::new(Uuid::new_v4(), Uuid::new_v4(), 12.0).with_seller(Uuid::new_v4());
        repo.create(&tx).await.unwrap();

        let retrieved = repo.get(tx.id).await.unwrap().unwrap();
        assert_eq!(retrieved.status, TransactionStatus::Pending);
        assert_eq!(retrieved.seller_id, tx.seller_id);

        let updated = repo
            .update(
                tx.id,
                &TransactionUpdate {
                    status: Some(TransactionStatus::Completed),
                    description: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, TransactionStatus::Completed);
        assert_eq!(updated.buyer_id, tx.buyer_id);

        let err = repo.update(Uuid::new_v4(), &TransactionUpdate::default()).await.unwrap_err();
        assert!(matches!(err, DomainError::TransactionNotFound(_)));
    }

    #[tokio::test]
    async fn test_user_filter_matches_buyer_or_seller() {
        let repo = setup_test_repo().await;
        let user = Uuid::new_v4();
        repo.create(&Transaction::new(user, Uuid::new_v4(), 1.0)).await.unwrap();
        repo.create(&Transaction::new(Uuid::new_v4(), Uuid::new_v4(), 2.0).with_seller(user))
            .await
            .unwrap();
        repo.create(&Transaction::new(Uuid::new_v4(), Uuid::new_v4(), 3.0)).await.unwrap();

        let filter = TransactionFilter {
            user_id: Some(user),
            ..Default::default()
        };
        assert_eq!(repo.list(filter.clone(), Page::all()).await.unwrap().len(), 2);
        assert_eq!(repo.count(filter).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let repo = setup_test_repo().await;
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        for i in 0..3 {
            let mut tx = Transaction::new(Uuid::new_v4(), Uuid::new_v4(), f64::from(i + 1));
            tx.created_at = base + Duration::minutes(i64::from(i));
            repo.create(&tx).await.unwrap();
        }

        let listed = repo.list(TransactionFilter::default(), Page::all()).await.unwrap();
        let amounts: Vec<f64> = listed.iter().map(|t| t.amount).collect();
        assert_eq!(amounts, vec![3.0, 2.0, 1.0]);
    }

    #[tokio::test]
    async fn test_stats_aggregate() {
        let repo = setup_test_repo().await;
        let user = Uuid::new_v4();
        repo.create(&Transaction::new(user, Uuid::new_v4(), 10.0).with_status(TransactionStatus::Completed))
            .await
            .unwrap();
        repo.create(&Transaction::new(user, Uuid::new_v4(), 20.0).with_status(TransactionStatus::Failed))
            .await
            .unwrap();

        let stats = repo
            .stats(StatsFilter {
                user_id: Some(user),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(stats.total, 2);
        assert!((stats.total_amount - 30.0).abs() < 1e-9);
        assert_eq!(stats.success_count, 1);
        assert_eq!(stats.failure_count, 1);
        assert!((stats.average_amount - 15.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_stats_empty_set_is_zero() {
        let repo = setup_test_repo().await;
        let stats = repo.stats(StatsFilter::default()).await.unwrap();
        assert_eq!(stats, TransactionStats::default());
    }

    #[tokio::test]
    async fn test_stats_date_bounds_are_inclusive() {
        let repo = setup_test_repo().await;
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap();

        for (at, amount) in [
            (start, 1.0),
            (end, 2.0),
            (start - Duration::seconds(1), 100.0),
            (end + Duration::seconds(1), 200.0),
        ] {
            let mut tx = Transaction::new(Uuid::new_v4(), Uuid::new_v4(), amount)
                .with_status(TransactionStatus::Cancelled);
            tx.created_at = at;
            repo.create(&tx).await.unwrap();
        }

        let stats = repo
            .stats(StatsFilter {
                user_id: None,
                start: Some(start),
                end: Some(end),
            })
            .await
            .unwrap();
        assert_eq!(stats.total, 2);
        assert!((stats.total_amount - 3.0).abs() < 1e-9);
        assert_eq!(stats.failure_count, 2);
    }
}
