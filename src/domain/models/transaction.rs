//! Transaction domain model and aggregate statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a marketplace transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl Default for TransactionStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "COMPLETED" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Terminal success state counted by statistics.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Terminal failure set counted by statistics. Failed and cancelled are
    /// aggregated together.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Cancelled)
    }
}

/// Direction of a transaction from the buyer's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Buy,
    Sell,
}

impl Default for TransactionType {
    fn default() -> Self {
        Self::Buy
    }
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "BUY" => Some(Self::Buy),
            "SELL" => Some(Self::Sell),
            _ => None,
        }
    }
}

/// A recorded purchase or sale of a skin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Option<Uuid>,
    pub skin_id: Uuid,
    pub amount: f64,
    pub status: TransactionStatus,
    pub tx_type: TransactionType,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new pending transaction.
    pub fn new(buyer_id: Uuid, skin_id: Uuid, amount: f64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            buyer_id,
            seller_id: None,
            skin_id,
            amount,
            status: TransactionStatus::Pending,
            tx_type: TransactionType::Buy,
            description: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_seller(mut self, seller_id: Uuid) -> Self {
        self.seller_id = Some(seller_id);
        self
    }

    pub fn with_type(mut self, tx_type: TransactionType) -> Self {
        self.tx_type = tx_type;
        self
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Users whose transaction lists include this record.
    pub fn parties(&self) -> Vec<Uuid> {
        let mut parties = vec![self.buyer_id];
        if let Some(seller) = self.seller_id {
            if seller != self.buyer_id {
                parties.push(seller);
            }
        }
        parties
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.amount.is_finite() && self.amount > 0.0) {
            return Err("amount must be positive".to_string());
        }
        Ok(())
    }
}

/// Partial update applied to an existing transaction.
#[derive(Debug, Clone, Default)]
pub struct TransactionUpdate {
    pub status: Option<TransactionStatus>,
    pub description: Option<String>,
}

impl TransactionUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.description.is_none()
    }
}

/// Aggregate statistics over a filtered set of transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionStats {
    pub total: u64,
    pub total_amount: f64,
    pub success_count: u64,
    pub failure_count: u64,
    pub average_amount: f64,
}

impl TransactionStats {
    /// Build statistics from raw aggregate totals.
    ///
    /// An empty set yields all-zero statistics rather than a NaN average.
    pub fn from_totals(total: u64, total_amount: f64, success_count: u64, failure_count: u64) -> Self {
        if total == 0 {
            return Self::default();
        }
        Self {
            total,
            total_amount,
            success_count,
            failure_count,
            average_amount: total_amount / total as f64,
        }
    }
}
