//! Infrastructure adapters: the SQLite store and the in-memory cache.

pub mod cache;
pub mod sqlite;
