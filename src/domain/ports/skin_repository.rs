//! Skin (inventory) repository port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Page, Skin};

/// Filter criteria for listing skins.
///
/// `listed_only: false` does not restrict on listing status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SkinFilter {
    pub owner_id: Option<Uuid>,
    pub listed_only: bool,
}

impl SkinFilter {
    pub fn owned_by(owner_id: Uuid) -> Self {
        Self {
            owner_id: Some(owner_id),
            listed_only: false,
        }
    }

    pub fn listed() -> Self {
        Self {
            owner_id: None,
            listed_only: true,
        }
    }
}

/// Repository interface for Skin persistence.
#[async_trait]
pub trait SkinRepository: Send + Sync {
    /// Insert a new skin.
    async fn create(&self, skin: &Skin) -> DomainResult<()>;

    /// Get a skin by ID.
    async fn get(&self, id: Uuid) -> DomainResult<Option<Skin>>;

    /// Update an existing skin.
    async fn update(&self, skin: &Skin) -> DomainResult<()>;

    /// Delete a skin by ID.
    async fn delete(&self, id: Uuid) -> DomainResult<()>;

    /// Set the market listing flag.
    async fn set_listing(&self, id: Uuid, is_listed: bool) -> DomainResult<()>;

    /// Reassign the skin to a new owner.
    async fn transfer_ownership(&self, id: Uuid, new_owner_id: Uuid) -> DomainResult<()>;

    /// List skins, newest first.
    async fn list(&self, filter: SkinFilter, page: Page) -> DomainResult<Vec<Skin>>;

    /// Count skins matching a filter.
    async fn count(&self, filter: SkinFilter) -> DomainResult<u64>;
}
