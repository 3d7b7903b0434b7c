//! User domain model.
//!
//! A user owns a monetary balance. The balance is only ever moved by signed
//! deltas applied atomically in the store; the admin override path is the
//! single place where it is assigned directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered marketplace user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub balance: f64,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with a zero balance.
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
            balance: 0.0,
            is_admin: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_admin(mut self, is_admin: bool) -> Self {
        self.is_admin = is_admin;
        self
    }

    pub fn with_balance(mut self, balance: f64) -> Self {
        self.balance = balance;
        self
    }

    /// Validate the user's profile fields.
    pub fn validate(&self) -> Result<(), String> {
        let username_len = self.username.chars().count();
        if !(3..=50).contains(&username_len) {
            return Err(format!(
                "username must be 3-50 characters, got {username_len}"
            ));
        }
        if !is_plausible_email(&self.email) {
            return Err(format!("invalid email address: {}", self.email));
        }
        if !self.balance.is_finite() {
            return Err("balance must be a finite number".to_string());
        }
        Ok(())
    }
}

/// Fields an administrator may change on another user's account.
///
/// `None` leaves the field untouched. `balance` is the admin override path:
/// it assigns the balance directly instead of applying a delta.
#[derive(Debug, Clone, Default)]
pub struct AdminUserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub balance: Option<f64>,
    pub is_admin: Option<bool>,
}

impl AdminUserUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.balance.is_none()
            && self.is_admin.is_none()
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}
