//! Cache keys: an entity kind, a namespace and an ordered parameter tuple.
//!
//! Keys render to `<entity>:<namespace>:<name>=<value>:...`. Parameters are
//! rendered in the order they are added, so every key family that shares
//! its leading parameters also shares a rendered prefix. That is what makes
//! owner-scoped or status-scoped bulk eviction possible without tracking
//! individual keys.

use std::fmt;

use uuid::Uuid;

use crate::domain::models::{Page, TransactionStatus, TransactionType};
use crate::domain::ports::{SkinFilter, StatsFilter};

/// Placeholder rendered for an absent optional parameter.
const ANY: &str = "*";

/// Entity kind component of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    Skin,
    Transaction,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Skin => "skin",
            Self::Transaction => "transaction",
        }
    }
}

/// Namespace component of a key. Each namespace has its own TTL class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Single entity by primary id
    Record,
    /// Single entity by a secondary unique field (email, username)
    Lookup,
    /// Scalar account balance
    Balance,
    /// Filtered and/or paginated lists
    List,
    /// Aggregate statistics
    Stats,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Record => "record",
            Self::Lookup => "lookup",
            Self::Balance => "balance",
            Self::List => "list",
            Self::Stats => "stats",
        }
    }
}

/// A fully parameterized cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    entity: EntityKind,
    namespace: Namespace,
    rendered: String,
}

impl CacheKey {
    pub fn builder(entity: EntityKind, namespace: Namespace) -> KeyBuilder {
        KeyBuilder::new(entity, namespace)
    }

    pub fn entity(&self) -> EntityKind {
        self.entity
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn as_str(&self) -> &str {
        &self.rendered
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

/// A key family: every key whose leading segments equal these.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPrefix {
    rendered: String,
}

impl KeyPrefix {
    /// Whether `key` belongs to this family.
    ///
    /// Matching is segment-aligned: `owner=ab` does not match `owner=abc`.
    pub fn matches(&self, key: &str) -> bool {
        match key.strip_prefix(self.rendered.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with(':'),
            None => false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.rendered
    }
}

impl fmt::Display for KeyPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}*", self.rendered)
    }
}

/// Incremental key renderer.
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    entity: EntityKind,
    namespace: Namespace,
    rendered: String,
}

impl KeyBuilder {
    fn new(entity: EntityKind, namespace: Namespace) -> Self {
        Self {
            entity,
            namespace,
            rendered: format!("{}:{}", entity.as_str(), namespace.as_str()),
        }
    }

    /// Append a `name=value` segment.
    pub fn param(mut self, name: &str, value: impl fmt::Display) -> Self {
        self.push_name(name);
        push_escaped(&mut self.rendered, &value.to_string());
        self
    }

    /// Append a segment whose value may be absent.
    pub fn opt_param<V: fmt::Display>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.param(name, v),
            None => self.any(name),
        }
    }

    /// Append a segment holding the unescaped "any" placeholder.
    fn any(mut self, name: &str) -> Self {
        self.push_name(name);
        self.rendered.push_str(ANY);
        self
    }

    fn push_name(&mut self, name: &str) {
        self.rendered.push(':');
        self.rendered.push_str(name);
        self.rendered.push('=');
    }

    /// Append the pagination window.
    pub fn page(self, page: Page) -> Self {
        self.opt_param("limit", page.limit).param("offset", page.offset)
    }

    pub fn build(self) -> CacheKey {
        CacheKey {
            entity: self.entity,
            namespace: self.namespace,
            rendered: self.rendered,
        }
    }

    pub fn prefix(self) -> KeyPrefix {
        KeyPrefix {
            rendered: self.rendered,
        }
    }
}

/// Escape the separator and the placeholder so free-text values (emails,
/// usernames) cannot forge extra segments or an "any" match.
fn push_escaped(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '%' => out.push_str("%25"),
            ':' => out.push_str("%3A"),
            '*' => out.push_str("%2A"),
            _ => out.push(ch),
        }
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub fn user_record(id: Uuid) -> CacheKey {
    CacheKey::builder(EntityKind::User, Namespace::Record).param("id", id).build()
}

/// Folds ASCII case only, matching the column's NOCASE collation.
pub fn user_by_email(email: &str) -> CacheKey {
    CacheKey::builder(EntityKind::User, Namespace::Lookup)
        .param("email", email.to_ascii_lowercase())
        .build()
}

pub fn user_by_username(username: &str) -> CacheKey {
    CacheKey::builder(EntityKind::User, Namespace::Lookup)
        .param("username", username)
        .build()
}

pub fn user_balance(id: Uuid) -> CacheKey {
    CacheKey::builder(EntityKind::User, Namespace::Balance).param("id", id).build()
}

// ---------------------------------------------------------------------------
// Skins
// ---------------------------------------------------------------------------

pub fn skin_record(id: Uuid) -> CacheKey {
    CacheKey::builder(EntityKind::Skin, Namespace::Record).param("id", id).build()
}

pub fn skin_list(filter: SkinFilter, page: Page) -> CacheKey {
    CacheKey::builder(EntityKind::Skin, Namespace::List)
        .opt_param("owner", filter.owner_id)
        .param("listed", filter.listed_only)
        .page(page)
        .build()
}

/// Every skin list scoped to `owner`, any listing flag, any page.
pub fn skin_lists_for_owner(owner: Uuid) -> KeyPrefix {
    CacheKey::builder(EntityKind::Skin, Namespace::List).param("owner", owner).prefix()
}

/// Every skin list not scoped to an owner (the global "listed" market view).
pub fn skin_lists_unscoped() -> KeyPrefix {
    CacheKey::builder(EntityKind::Skin, Namespace::List).any("owner").prefix()
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

pub fn transaction_record(id: Uuid) -> CacheKey {
    CacheKey::builder(EntityKind::Transaction, Namespace::Record).param("id", id).build()
}

pub fn transactions_by_user(
    user_id: Uuid,
    status: Option<TransactionStatus>,
    tx_type: Option<TransactionType>,
    page: Page,
) -> CacheKey {
    CacheKey::builder(EntityKind::Transaction, Namespace::List)
        .param("scope", "user")
        .param("user", user_id)
        .opt_param("status", status.map(|s| s.as_str()))
        .opt_param("type", tx_type.map(|t| t.as_str()))
        .page(page)
        .build()
}

pub fn transactions_by_skin(skin_id: Uuid) -> CacheKey {
    CacheKey::builder(EntityKind::Transaction, Namespace::List)
        .param("scope", "skin")
        .param("skin", skin_id)
        .build()
}

pub fn transactions_by_status(status: TransactionStatus, page: Page) -> CacheKey {
    CacheKey::builder(EntityKind::Transaction, Namespace::List)
        .param("scope", "status")
        .param("status", status.as_str())
        .page(page)
        .build()
}

pub fn transactions_all(page: Page) -> CacheKey {
    CacheKey::builder(EntityKind::Transaction, Namespace::List)
        .param("scope", "all")
        .page(page)
        .build()
}

pub fn transaction_lists_for_user(user_id: Uuid) -> KeyPrefix {
    CacheKey::builder(EntityKind::Transaction, Namespace::List)
        .param("scope", "user")
        .param("user", user_id)
        .prefix()
}

pub fn transaction_lists_for_skin(skin_id: Uuid) -> KeyPrefix {
    CacheKey::builder(EntityKind::Transaction, Namespace::List)
        .param("scope", "skin")
        .param("skin", skin_id)
        .prefix()
}

pub fn transaction_lists_by_status() -> KeyPrefix {
    CacheKey::builder(EntityKind::Transaction, Namespace::List)
        .param("scope", "status")
        .prefix()
}

pub fn transaction_lists_all() -> KeyPrefix {
    CacheKey::builder(EntityKind::Transaction, Namespace::List)
        .param("scope", "all")
        .prefix()
}

pub fn transaction_stats(filter: StatsFilter) -> CacheKey {
    CacheKey::builder(EntityKind::Transaction, Namespace::Stats)
        .opt_param("user", filter.user_id)
        .opt_param("start", filter.start.map(|d| d.timestamp_micros()))
        .opt_param("end", filter.end.map(|d| d.timestamp_micros()))
        .build()
}

/// Every key of `entity` in `namespace`.
pub fn namespace_family(entity: EntityKind, namespace: Namespace) -> KeyPrefix {
    CacheKey::builder(entity, namespace).prefix()
}
