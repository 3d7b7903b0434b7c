//! User service: profiles, balances and the admin surface.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::adapters::cache::{keys, Affected, CoherentCache, EntityKind};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{AdminUserUpdate, Page, Paged, User};
use crate::domain::ports::{UserFilter, UserRepository};
use crate::services::balance_transfer::{BalanceTransfer, TransferReceipt};
use crate::services::request::RequestContext;

pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
    cache: Arc<CoherentCache>,
    transfers: BalanceTransfer<R>,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repository: Arc<R>, cache: Arc<CoherentCache>) -> Self {
        let transfers = BalanceTransfer::new(Arc::clone(&repository), Arc::clone(&cache));
        Self {
            repository,
            cache,
            transfers,
        }
    }

    /// Register a user. The first user ever registered becomes an admin.
    pub async fn create_user(&self, ctx: &RequestContext, username: &str, email: &str) -> DomainResult<User> {
        let mut user = User::new(username.trim(), email.trim());
        user.validate().map_err(DomainError::InvalidArgument)?;

        ctx.run(async {
            if self.repository.get_by_email(&user.email).await?.is_some() {
                return Err(DomainError::AlreadyExists(format!("email {}", user.email)));
            }
            if self.repository.get_by_username(&user.username).await?.is_some() {
                return Err(DomainError::AlreadyExists(format!("username {}", user.username)));
            }
            Ok(())
        })
        .await?;

        if ctx.run(self.repository.count(UserFilter::default())).await? == 0 {
            user.is_admin = true;
        }

        ctx.run_write(
            &self.cache,
            EntityKind::User,
            &affected_user(&user),
            self.repository.create(&user),
        )
        .await?;

        info!(user_id = %user.id, username = %user.username, is_admin = user.is_admin, "User created");
        Ok(user)
    }

    pub async fn get_user(&self, ctx: &RequestContext, id: Uuid) -> DomainResult<User> {
        ctx.run(self.load_user(id)).await
    }

    /// Find a user by email, case-insensitively.
    pub async fn get_user_by_email(&self, ctx: &RequestContext, email: &str) -> DomainResult<Option<User>> {
        let key = keys::user_by_email(email);
        ctx.run(self.lookup(&key, || self.repository.get_by_email(email))).await
    }

    pub async fn get_user_by_username(&self, ctx: &RequestContext, username: &str) -> DomainResult<Option<User>> {
        let key = keys::user_by_username(username);
        ctx.run(self.lookup(&key, || self.repository.get_by_username(username))).await
    }

    /// Change username and/or email.
    pub async fn update_profile(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        username: Option<String>,
        email: Option<String>,
    ) -> DomainResult<User> {
        if username.is_none() && email.is_none() {
            return Err(DomainError::InvalidArgument("no fields to update".to_string()));
        }
        self.apply_update(
            ctx,
            id,
            AdminUserUpdate {
                username,
                email,
                ..AdminUserUpdate::default()
            },
        )
        .await
    }

    pub async fn get_balance(&self, ctx: &RequestContext, id: Uuid) -> DomainResult<f64> {
        let key = keys::user_balance(id);
        ctx.run(self.cache.get_or_load(&key, || async move {
            let user = self.repository.get(id).await?.ok_or(DomainError::UserNotFound(id))?;
            Ok(user.balance)
        }))
        .await
    }

    /// Apply a signed delta. Negative deltas never take the balance below zero.
    pub async fn adjust_balance(&self, ctx: &RequestContext, id: Uuid, delta: f64) -> DomainResult<f64> {
        if !delta.is_finite() || delta == 0.0 {
            return Err(DomainError::InvalidArgument(format!(
                "balance delta must be a non-zero number, got {delta}"
            )));
        }

        let mutation = async {
            if delta > 0.0 {
                self.repository.increment_balance(id, delta).await
            } else {
                self.repository.debit_balance(id, -delta).await
            }
        };
        let balance = ctx
            .run_write(&self.cache, EntityKind::User, &Affected::ids([id]), mutation)
            .await?;

        info!(user_id = %id, delta, balance, "Balance adjusted");
        Ok(balance)
    }

    pub async fn delete_user(&self, ctx: &RequestContext, id: Uuid) -> DomainResult<()> {
        let user = ctx
            .run(self.repository.get(id))
            .await?
            .ok_or(DomainError::UserNotFound(id))?;

        ctx.run_write(
            &self.cache,
            EntityKind::User,
            &affected_user(&user),
            self.repository.delete(id),
        )
        .await?;

        info!(user_id = %id, "User deleted");
        Ok(())
    }

    /// Admin listing. Always served from the store.
    pub async fn list_users(&self, ctx: &RequestContext, filter: UserFilter, page: Page) -> DomainResult<Paged<User>> {
        ctx.run(async {
            let items = self.repository.list(filter.clone(), page).await?;
            let total = self.repository.count(filter).await?;
            Ok(Paged::new(items, total))
        })
        .await
    }

    /// Change any field of another user's account, balance included.
    pub async fn admin_update_user(
        &self,
        ctx: &RequestContext,
        admin_id: Uuid,
        user_id: Uuid,
        update: AdminUserUpdate,
    ) -> DomainResult<User> {
        let admin = ctx.run(self.repository.get(admin_id)).await?;
        if !admin.is_some_and(|a| a.is_admin) {
            return Err(DomainError::Unauthorized(format!("{admin_id} is not an admin")));
        }
        if update.is_empty() {
            return Err(DomainError::InvalidArgument("no fields to update".to_string()));
        }

        let updated = self.apply_update(ctx, user_id, update).await?;
        info!(admin_id = %admin_id, user_id = %user_id, "User updated by admin");
        Ok(updated)
    }

    pub async fn transfer_balance(
        &self,
        ctx: &RequestContext,
        from: Uuid,
        to: Uuid,
        amount: f64,
    ) -> DomainResult<TransferReceipt> {
        self.transfers.transfer(ctx, from, to, amount).await
    }

    async fn apply_update(&self, ctx: &RequestContext, id: Uuid, update: AdminUserUpdate) -> DomainResult<User> {
        let before = ctx
            .run(self.repository.get(id))
            .await?
            .ok_or(DomainError::UserNotFound(id))?;

        let mut user = before.clone();
        if let Some(username) = update.username {
            user.username = username.trim().to_string();
        }
        if let Some(email) = update.email {
            user.email = email.trim().to_string();
        }
        if let Some(is_admin) = update.is_admin {
            user.is_admin = is_admin;
        }
        user.updated_at = chrono::Utc::now();
        user.validate().map_err(DomainError::InvalidArgument)?;

        let balance = update.balance;
        if balance.is_some_and(|b| !b.is_finite()) {
            return Err(DomainError::InvalidArgument("balance must be a finite number".to_string()));
        }

        // Both the old and the new lookup keys may be cached.
        let affected = affected_user(&before)
            .with_lookup(keys::user_by_email(&user.email))
            .with_lookup(keys::user_by_username(&user.username));

        let mutation = async {
            self.repository.update(&user).await?;
            if let Some(balance) = balance {
                self.repository.set_balance(id, balance).await?;
            }
            // Balance may have moved since the read above.
            self.repository.get(id).await?.ok_or(DomainError::UserNotFound(id))
        };
        ctx.run_write(&self.cache, EntityKind::User, &affected, mutation).await
    }

    async fn load_user(&self, id: Uuid) -> DomainResult<User> {
        self.cache
            .get_or_load(&keys::user_record(id), || async move {
                self.repository.get(id).await?.ok_or(DomainError::UserNotFound(id))
            })
            .await
    }

    /// Secondary-key lookup. The lookup entry holds only the id; the user
    /// itself is served from its record entry.
    async fn lookup<F, Fut>(&self, key: &keys::CacheKey, load: F) -> DomainResult<Option<User>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = DomainResult<Option<User>>>,
    {
        if let Some(id) = self.cache.get::<Uuid>(key).await {
            match self.load_user(id).await {
                Ok(user) => return Ok(Some(user)),
                Err(DomainError::UserNotFound(_)) => {
                    debug!(key = %key, "Lookup pointed at a missing user");
                    self.cache.delete(key).await;
                }
                Err(e) => return Err(e),
            }
        }

        let ticket = self.cache.fill_ticket();
        let Some(user) = load().await? else {
            return Ok(None);
        };
        if self.cache.fill(ticket, key, user.id).await {
            self.cache.fill(ticket, &keys::user_record(user.id), user.clone()).await;
        }
        Ok(Some(user))
    }
}

fn affected_user(user: &User) -> Affected {
    Affected::ids([user.id])
        .with_lookup(keys::user_by_email(&user.email))
        .with_lookup(keys::user_by_username(&user.username))
}
