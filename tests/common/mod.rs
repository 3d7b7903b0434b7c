//! Common test utilities for integration tests

use skinmarket::adapters::sqlite::create_migrated_test_pool;
use skinmarket::cli::Market;
use skinmarket::domain::models::{Config, User};
use skinmarket::services::RequestContext;

/// Market over a private in-memory database.
pub async fn setup_market() -> Market {
    let pool = create_migrated_test_pool()
        .await
        .expect("Failed to create test pool");
    Market::with_pool(pool, Config::default())
}

/// Register a user and give them an opening balance.
#[allow(dead_code)]
pub async fn funded_user(market: &Market, name: &str, balance: f64) -> User {
    let ctx = RequestContext::new();
    let user = market
        .users
        .create_user(&ctx, name, &format!("{name}@example.com"))
        .await
        .expect("Failed to create user");
    if balance > 0.0 {
        market
            .users
            .adjust_balance(&ctx, user.id, balance)
            .await
            .expect("Failed to fund user");
    }
    user
}

/// Setup test logging
///
/// Call this at the beginning of tests that need logging.
#[allow(dead_code)]
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
