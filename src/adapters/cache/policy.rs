//! TTL classes and post-write invalidation rules.

use std::time::Duration;

use uuid::Uuid;

use super::keys::{self, CacheKey, EntityKind, KeyPrefix, Namespace};
use crate::domain::models::CacheConfig;

/// Per-namespace TTLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub record: Duration,
    pub lookup: Duration,
    pub balance: Duration,
    pub list: Duration,
    pub stats: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

impl TtlPolicy {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            record: Duration::from_secs(config.record_ttl_secs),
            lookup: Duration::from_secs(config.lookup_ttl_secs),
            balance: Duration::from_secs(config.balance_ttl_secs),
            list: Duration::from_secs(config.list_ttl_secs),
            stats: Duration::from_secs(config.stats_ttl_secs),
        }
    }

    /// The same TTL for every namespace.
    pub fn uniform(ttl: Duration) -> Self {
        Self {
            record: ttl,
            lookup: ttl,
            balance: ttl,
            list: ttl,
            stats: ttl,
        }
    }

    pub fn ttl_for(&self, namespace: Namespace) -> Duration {
        match namespace {
            Namespace::Record => self.record,
            Namespace::Lookup => self.lookup,
            Namespace::Balance => self.balance,
            Namespace::List => self.list,
            Namespace::Stats => self.stats,
        }
    }
}

/// Identifiers touched by a write, as far as the writer knows them.
///
/// Anything not named here (for example lists owned by a party the writer
/// never loaded) stays cached until its TTL runs out.
#[derive(Debug, Clone, Default)]
pub struct Affected {
    /// Primary ids of the mutated records
    pub ids: Vec<Uuid>,
    /// Owners / parties whose scoped lists may now differ
    pub owners: Vec<Uuid>,
    /// Skins whose transaction history may now differ
    pub skins: Vec<Uuid>,
    /// Secondary lookup keys (email / username) the record was reachable under
    pub lookups: Vec<CacheKey>,
}

impl Affected {
    pub fn ids(ids: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_owners(mut self, owners: impl IntoIterator<Item = Uuid>) -> Self {
        self.owners.extend(owners);
        self
    }

    pub fn with_skins(mut self, skins: impl IntoIterator<Item = Uuid>) -> Self {
        self.skins.extend(skins);
        self
    }

    pub fn with_lookup(mut self, key: CacheKey) -> Self {
        self.lookups.push(key);
        self
    }
}

/// What `invalidate_for_write` removes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationPlan {
    pub keys: Vec<CacheKey>,
    pub prefixes: Vec<KeyPrefix>,
}

/// Compute the keys and key families a write to `kind` must drop:
/// (a) point keys of every affected id, (b) every list family whose scope
/// could now return a different result, (c) every stats key of the kind.
pub fn plan_invalidation(kind: EntityKind, affected: &Affected) -> InvalidationPlan {
    let mut plan = InvalidationPlan::default();

    match kind {
        EntityKind::User => {
            for id in &affected.ids {
                plan.keys.push(keys::user_record(*id));
                plan.keys.push(keys::user_balance(*id));
            }
            plan.keys.extend(affected.lookups.iter().cloned());
            plan.prefixes.push(keys::namespace_family(EntityKind::User, Namespace::List));
        }
        EntityKind::Skin => {
            for id in &affected.ids {
                plan.keys.push(keys::skin_record(*id));
            }
            for owner in &affected.owners {
                plan.prefixes.push(keys::skin_lists_for_owner(*owner));
            }
            plan.prefixes.push(keys::skin_lists_unscoped());
        }
        EntityKind::Transaction => {
            for id in &affected.ids {
                plan.keys.push(keys::transaction_record(*id));
            }
            for party in &affected.owners {
                plan.prefixes.push(keys::transaction_lists_for_user(*party));
            }
            for skin in &affected.skins {
                plan.prefixes.push(keys::transaction_lists_for_skin(*skin));
            }
            plan.prefixes.push(keys::transaction_lists_by_status());
            plan.prefixes.push(keys::transaction_lists_all());
        }
    }

    plan.prefixes.push(keys::namespace_family(kind, Namespace::Stats));
    plan
}
