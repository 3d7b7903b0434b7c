//! Coherent in-memory read cache.
//!
//! Uses `moka` for bounded, per-entry TTL caching. Services read through it
//! and invalidate through [`CoherentCache::invalidate_for_write`] after every
//! successful write.

pub mod keys;
pub mod policy;
pub mod store;

pub use keys::{CacheKey, EntityKind, KeyPrefix, Namespace};
pub use policy::{Affected, InvalidationPlan, TtlPolicy};
pub use store::{CacheMetrics, CoherentCache, FillTicket};
