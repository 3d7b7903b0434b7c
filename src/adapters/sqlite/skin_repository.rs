//! SQLite implementation of the SkinRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::adapters::sqlite::{format_datetime, parse_datetime, parse_optional_uuid, parse_uuid, push_page};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Page, Skin};
use crate::domain::ports::{SkinFilter, SkinRepository};

const SKIN_COLUMNS: &str =
    "id, name, description, price, image, rarity, condition, owner_id, is_listed, created_at, updated_at";

#[derive(Clone)]
pub struct SqliteSkinRepository {
    pool: SqlitePool,
}

impl SqliteSkinRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn filter_clause(filter: &SkinFilter) -> (String, Vec<String>) {
    let mut clause = String::from(" WHERE 1=1");
    let mut bindings = Vec::new();

    if let Some(owner_id) = filter.owner_id {
        clause.push_str(" AND owner_id = ?");
        bindings.push(owner_id.to_string());
    }
    if filter.listed_only {
        clause.push_str(" AND is_listed = 1");
    }

    (clause, bindings)
}

#[async_trait]
impl SkinRepository for SqliteSkinRepository {
    async fn create(&self, skin: &Skin) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO skins (id, name, description, price, image, rarity, condition, owner_id, is_listed, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#
        )
        .bind(skin.id.to_string())
        .bind(&skin.name)
        .bind(&skin.description)
        .bind(skin.price)
        .bind(&skin.image)
        .bind(&skin.rarity)
        .bind(&skin.condition)
        .bind(skin.owner_id.map(|id| id.to_string()))
        .bind(skin.is_listed)
        .bind(format_datetime(&skin.created_at))
        .bind(format_datetime(&skin.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Skin>> {
        let query = format!("SELECT {SKIN_COLUMNS} FROM skins WHERE id = ?");
        let row: Option<SkinRow> = sqlx::query_as(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn update(&self, skin: &Skin) -> DomainResult<()> {
        let result = sqlx::query(
            r#"UPDATE skins SET name = ?, description = ?, price = ?, image = ?, rarity = ?,
               condition = ?, owner_id = ?, is_listed = ?, updated_at = ?
               WHERE id = ?"#
        )
        .bind(&skin.name)
        .bind(&skin.description)
        .bind(skin.price)
        .bind(&skin.image)
        .bind(&skin.rarity)
        .bind(&skin.condition)
        .bind(skin.owner_id.map(|id| id.to_string()))
        .bind(skin.is_listed)
        .bind(format_datetime(&skin.updated_at))
        .bind(skin.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::SkinNotFound(skin.id));
        }

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM skins WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::SkinNotFound(id));
        }

        Ok(())
    }

    async fn set_listing(&self, id: Uuid, is_listed: bool) -> DomainResult<()> {
        let result = sqlx::query("UPDATE skins SET is_listed = ?, updated_at = ? WHERE id = ?")
            .bind(is_listed)
            .bind(format_datetime(&chrono::Utc::now()))
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::SkinNotFound(id));
        }

        Ok(())
    }

    async fn transfer_ownership(&self, id: Uuid, new_owner_id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("UPDATE skins SET owner_id = ?, updated_at = ? WHERE id = ?")
            .bind(new_owner_id.to_string())
            .bind(format_datetime(&chrono::Utc::now()))
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::SkinNotFound(id));
        }

        Ok(())
    }

    async fn list(&self, filter: SkinFilter, page: Page) -> DomainResult<Vec<Skin>> {
        let (clause, bindings) = filter_clause(&filter);
        let mut query = format!("SELECT {SKIN_COLUMNS} FROM skins{clause} ORDER BY created_at DESC, id");
        push_page(&mut query, page);

        let mut q = sqlx::query_as::<_, SkinRow>(&query);
        for binding in &bindings {
            q = q.bind(binding);
        }

        let rows: Vec<SkinRow> = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn count(&self, filter: SkinFilter) -> DomainResult<u64> {
        let (clause, bindings) = filter_clause(&filter);
        let query = format!("SELECT COUNT(*) FROM skins{clause}");

        let mut q = sqlx::query_as::<_, (i64,)>(&query);
        for binding in &bindings {
            q = q.bind(binding);
        }

        let (count,) = q.fetch_one(&self.pool).await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

#[derive(sqlx::FromRow)]
struct SkinRow {
    id: String,
    name: String,
    description: String,
    price: f64,
    image: String,
    rarity: String,
    condition: String,
    owner_id: Option<String>,
    is_listed: bool,
    created_at: String,
    updated_at: String,
}

impl TryFrom<SkinRow> for Skin {
    type Error = DomainError;

    fn try_from(row: SkinRow) -> Result<Self, Self::Error> {
        Ok(Skin {
            id: parse_uuid(&row.id)?,
            name: row.name,
            description: row.description,
            price: row.price,
            image: row.image,
            rarity: row.rarity,
            condition: row.condition,
            owner_id: parse_optional_uuid(row.owner_id)?,
            is_listed: row.is_listed,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    async fn setup_test_repo() -> SqliteSkinRepository {
        let pool = create_migrated_test_pool().await.unwrap();
        SqliteSkinRepository::new(pool)
    }

    #[tokio::test]
    async fn test_create_and_get_skin() {
        let repo = setup_test_repo().await;
        let owner = Uuid::new_v4();
        let skin = Skin::new("AWP | Asiimov", 85.0)
            .with_owner(owner)
            .with_rarity("Covert")
            .with_condition("Field-Tested");
        repo.create(&skin).await.unwrap();

        let retrieved = repo.get(skin.id).await.unwrap().unwrap();
        assert_eq!(retrieved.name, "AWP | Asiimov");
        assert_eq!(retrieved.owner_id, Some(owner));
        assert_eq!(retrieved.rarity, "Covert");
        assert!(!retrieved.is_listed);
    }

    #[tokio::test]
    async fn test_set_listing_and_transfer_ownership() {
        let repo = setup_test_repo().await;
        let skin = Skin::new("M4A4 | Howl", 1500.0).with_owner(Uuid::new_v4());
        repo.create(&skin).await.unwrap();

        repo.set_listing(skin.id, true).await.unwrap();
        let new_owner = Uuid::new_v4();
        repo.transfer_ownership(skin.id, new_owner).await.unwrap();

        let retrieved = repo.get(skin.id).await.unwrap().unwrap();
        assert!(retrieved.is_listed);
        assert_eq!(retrieved.owner_id, Some(new_owner));

        let missing = Uuid::new_v4();
        assert!(matches!(repo.set_listing(missing, true).await, Err(DomainError::SkinNotFound(_))));
        assert!(matches!(
            repo.transfer_ownership(missing, new_owner).await,
            Err(DomainError::SkinNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_by_owner_and_listed() {
        let repo = setup_test_repo().await;
        let owner = Uuid::new_v4();
        repo.create(&Skin::new("A", 1.0).with_owner(owner).listed(true)).await.unwrap();
        repo.create(&Skin::new("B", 2.0).with_owner(owner)).await.unwrap();
        repo.create(&Skin::new("C", 3.0).with_owner(Uuid::new_v4()).listed(true)).await.unwrap();

        assert_eq!(repo.list(SkinFilter::owned_by(owner), Page::all()).await.unwrap().len(), 2);
        assert_eq!(repo.list(SkinFilter::listed(), Page::all()).await.unwrap().len(), 2);
        assert_eq!(
            repo.count(SkinFilter { owner_id: Some(owner), listed_only: true }).await.unwrap(),
            1
        );
        assert_eq!(repo.count(SkinFilter::default()).await.unwrap(), 3);
        assert_eq!(repo.list(SkinFilter::default(), Page::new(2, 2)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete_skin() {
        let repo = setup_test_repo().await;
        let mut skin = Skin::new("Glock-18 | Fade", 300.0);
        repo.create(&skin).await.unwrap();

        skin.price = 320.0;
        skin.description = "Factory New".to_string();
        repo.update(&skin).await.unwrap();
        let retrieved = repo.get(skin.id).await.unwrap().unwrap();
        assert!((retrieved.price - 320.0).abs() < f64::EPSILON);
        assert_eq!(retrieved.description, "Factory New");

        repo.delete(skin.id).await.unwrap();
        assert!(repo.get(skin.id).await.unwrap().is_none());
        assert!(matches!(repo.delete(skin.id).await, Err(DomainError::SkinNotFound(_))));
    }
}
