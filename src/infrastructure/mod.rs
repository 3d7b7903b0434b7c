//! Infrastructure layer module
//!
//! Process-level concerns that sit outside the hexagon:
//! - Configuration management (figment)
//! - Logging infrastructure (tracing)

pub mod config;
pub mod logging;
