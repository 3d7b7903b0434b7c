//! Domain layer for the skinmarket services
//!
//! This module contains entity models, repository ports and the error taxonomy.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
