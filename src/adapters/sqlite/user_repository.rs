//! SQLite implementation of the UserRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::adapters::sqlite::{format_datetime, map_unique_violation, parse_datetime, parse_uuid, push_page};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Page, User};
use crate::domain::ports::{UserFilter, UserRepository};

const USER_COLUMNS: &str = "id, username, email, balance, is_admin, created_at, updated_at";

#[derive(Clone)]
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(&self, clause: &str, value: &str) -> DomainResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE {clause} = ?");
        let row: Option<UserRow> = sqlx::query_as(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.try_into()).transpose()
    }
}

fn filter_clause(filter: &UserFilter) -> String {
    let mut clause = String::from(" WHERE 1=1");
    if let Some(is_admin) = filter.is_admin {
        clause.push_str(if is_admin { " AND is_admin = 1" } else { " AND is_admin = 0" });
    }
    clause
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(&self, user: &User) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO users (id, username, email, balance, is_admin, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.balance)
        .bind(user.is_admin)
        .bind(format_datetime(&user.created_at))
        .bind(format_datetime(&user.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, || format!("user with username '{}' or email '{}'", user.username, user.email)))?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<User>> {
        self.fetch_one_where("id", &id.to_string()).await
    }

    async fn get_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        // Column collation is NOCASE.
        self.fetch_one_where("email", email).await
    }

    async fn get_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        self.fetch_one_where("username", username).await
    }

    async fn update(&self, user: &User) -> DomainResult<()> {
        let result = sqlx::query(
            r#"UPDATE users SET username = ?, email = ?, is_admin = ?, updated_at = ?
               WHERE id = ?"#
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.is_admin)
        .bind(format_datetime(&user.updated_at))
        .bind(user.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, || format!("user with username '{}' or email '{}'", user.username, user.email)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::UserNotFound(user.id));
        }

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::UserNotFound(id));
        }

        Ok(())
    }

    async fn set_balance(&self, id: Uuid, balance: f64) -> DomainResult<()> {
        let result = sqlx::query("UPDATE users SET balance = ?, updated_at = ? WHERE id = ?")
            .bind(balance)
            .bind(format_datetime(&chrono::Utc::now()))
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::UserNotFound(id));
        }

        Ok(())
    }

    async fn increment_balance(&self, id: Uuid, delta: f64) -> DomainResult<f64> {
        let row: Option<(f64,)> = sqlx::query_as(
            "UPDATE users SET balance = balance + ?, updated_at = ? WHERE id = ? RETURNING balance",
        )
        .bind(delta)
        .bind(format_datetime(&chrono::Utc::now()))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(balance,)| balance).ok_or(DomainError::UserNotFound(id))
    }

    async fn debit_balance(&self, id: Uuid, amount: f64) -> DomainResult<f64> {
        let row: Option<(f64,)> = sqlx::query_as(
            "UPDATE users SET balance = balance - ?, updated_at = ? WHERE id = ? AND balance >= ? RETURNING balance",
        )
        .bind(amount)
        .bind(format_datetime(&chrono::Utc::now()))
        .bind(id.to_string())
        .bind(amount)
        .fetch_optional(&self.pool)
        .await?;

        if let Some((balance,)) = row {
            return Ok(balance);
        }

        // Either the account is gone or the guard rejected the debit.
        let current: Option<(f64,)> = sqlx::query_as("SELECT balance FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match current {
            Some((available,)) => Err(DomainError::InsufficientBalance {
                account: id,
                available,
                requested: amount,
            }),
            None => Err(DomainError::UserNotFound(id)),
        }
    }

    async fn list(&self, filter: UserFilter, page: Page) -> DomainResult<Vec<User>> {
        let mut query = format!("SELECT {USER_COLUMNS} FROM users{}", filter_clause(&filter));
        query.push_str(" ORDER BY created_at DESC, id");
        push_page(&mut query, page);

        let rows: Vec<UserRow> = sqlx::query_as(&query).fetch_all(&self.pool).await?;
        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn count(&self, filter: UserFilter) -> DomainResult<u64> {
        let query = format!("SELECT COUNT(*) FROM users{}", filter_clause(&filter));
        let (count,): (i64,) = sqlx::query_as(&query).fetch_one(&self.pool).await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    username: String,
    email: String,
    balance: f64,
    is_admin: bool,
    created_at: String,
    updated_at: String,
}

impl TryFrom<UserRow> for User {
    type Error = DomainError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: parse_uuid(&row.id)?,
            username: row.username,
            email: row.email,
            balance: row.balance,
            is_admin: row.is_admin,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
        })
    }
}
