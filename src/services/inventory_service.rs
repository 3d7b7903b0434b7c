//! Inventory service: skins, market listing and ownership.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::adapters::cache::{keys, Affected, CoherentCache, EntityKind};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Page, Paged, Skin};
use crate::domain::ports::{SkinFilter, SkinRepository};
use crate::services::request::RequestContext;

pub struct InventoryService<R: SkinRepository> {
    repository: Arc<R>,
    cache: Arc<CoherentCache>,
}

impl<R: SkinRepository> InventoryService<R> {
    pub fn new(repository: Arc<R>, cache: Arc<CoherentCache>) -> Self {
        Self { repository, cache }
    }

    pub async fn create_skin(&self, ctx: &RequestContext, skin: Skin) -> DomainResult<Skin> {
        skin.validate().map_err(DomainError::InvalidArgument)?;

        ctx.run_write(
            &self.cache,
            EntityKind::Skin,
            &affected_skin(&skin),
            self.repository.create(&skin),
        )
        .await?;

        info!(skin_id = %skin.id, name = %skin.name, price = skin.price, "Skin created");
        Ok(skin)
    }

    pub async fn get_skin(&self, ctx: &RequestContext, id: Uuid) -> DomainResult<Skin> {
        ctx.run(self.load_skin(id)).await
    }

    /// Filtered listing, newest first. Each (filter, page) pair is cached.
    pub async fn list_skins(&self, ctx: &RequestContext, filter: SkinFilter, page: Page) -> DomainResult<Paged<Skin>> {
        let key = keys::skin_list(filter, page);
        ctx.run(self.cache.get_or_load(&key, || async move {
            let items = self.repository.list(filter, page).await?;
            let total = self.repository.count(filter).await?;
            Ok(Paged::new(items, total))
        }))
        .await
    }

    pub async fn list_by_owner(&self, ctx: &RequestContext, owner_id: Uuid, page: Page) -> DomainResult<Paged<Skin>> {
        self.list_skins(ctx, SkinFilter::owned_by(owner_id), page).await
    }

    /// Skins currently offered on the market.
    pub async fn list_listed(&self, ctx: &RequestContext, page: Page) -> DomainResult<Paged<Skin>> {
        self.list_skins(ctx, SkinFilter::listed(), page).await
    }

    /// Replace the descriptive fields of a skin.
    ///
    /// Owner and listing flag are carried over from the stored record; use
    /// [`Self::transfer_ownership`] and [`Self::set_listing`] for those.
    pub async fn update_skin(&self, ctx: &RequestContext, skin: Skin) -> DomainResult<Skin> {
        skin.validate().map_err(DomainError::InvalidArgument)?;
        let before = self.fetch(ctx, skin.id).await?;

        let updated = Skin {
            owner_id: before.owner_id,
            is_listed: before.is_listed,
            created_at: before.created_at,
            updated_at: chrono::Utc::now(),
            ..skin
        };

        ctx.run_write(
            &self.cache,
            EntityKind::Skin,
            &affected_skin(&updated),
            self.repository.update(&updated),
        )
        .await?;

        info!(skin_id = %updated.id, "Skin updated");
        Ok(updated)
    }

    pub async fn delete_skin(&self, ctx: &RequestContext, id: Uuid) -> DomainResult<()> {
        let skin = self.fetch(ctx, id).await?;

        ctx.run_write(
            &self.cache,
            EntityKind::Skin,
            &affected_skin(&skin),
            self.repository.delete(id),
        )
        .await?;

        info!(skin_id = %id, "Skin deleted");
        Ok(())
    }

    /// Put a skin on the market or take it off.
    pub async fn set_listing(&self, ctx: &RequestContext, id: Uuid, is_listed: bool) -> DomainResult<Skin> {
        let mut skin = self.fetch(ctx, id).await?;

        ctx.run_write(
            &self.cache,
            EntityKind::Skin,
            &affected_skin(&skin),
            self.repository.set_listing(id, is_listed),
        )
        .await?;

        skin.is_listed = is_listed;
        info!(skin_id = %id, is_listed, "Skin listing changed");
        Ok(skin)
    }

    pub async fn transfer_ownership(&self, ctx: &RequestContext, id: Uuid, new_owner_id: Uuid) -> DomainResult<Skin> {
        let mut skin = self.fetch(ctx, id).await?;
        let previous_owner = skin.owner_id;

        let affected = affected_skin(&skin).with_owners([new_owner_id]);
        ctx.run_write(
            &self.cache,
            EntityKind::Skin,
            &affected,
            self.repository.transfer_ownership(id, new_owner_id),
        )
        .await?;

        skin.owner_id = Some(new_owner_id);
        info!(
            skin_id = %id,
            from = ?previous_owner,
            to = %new_owner_id,
            "Skin ownership transferred"
        );
        Ok(skin)
    }

    /// Uncached read for write paths.
    async fn fetch(&self, ctx: &RequestContext, id: Uuid) -> DomainResult<Skin> {
        ctx.run(self.repository.get(id))
            .await?
            .ok_or(DomainError::SkinNotFound(id))
    }

    async fn load_skin(&self, id: Uuid) -> DomainResult<Skin> {
        self.cache
            .get_or_load(&keys::skin_record(id), || async move {
                self.repository.get(id).await?.ok_or(DomainError::SkinNotFound(id))
            })
            .await
    }
}

fn affected_skin(skin: &Skin) -> Affected {
    Affected::ids([skin.id]).with_owners(skin.owner_id)
}
