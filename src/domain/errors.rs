//! Domain errors for the skinmarket services.

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors that can occur in the skinmarket system.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    #[error("Skin not found: {0}")]
    SkinNotFound(Uuid),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(Uuid),

    /// An account referenced by a balance transfer does not exist.
    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Insufficient balance on account {account}: available {available}, requested {requested}")]
    InsufficientBalance {
        account: Uuid,
        available: f64,
        requested: f64,
    },

    /// The credit leg of a transfer failed and the compensating credit-back
    /// onto the sender failed too. `amount` is debited from `from` and was
    /// never credited to `to`; an operator has to reconcile by hand.
    #[error(
        "Partial transfer unrecovered: {amount} debited from {from} but not credited to {to} \
         (credit error: {credit_error}; rollback error: {rollback_error})"
    )]
    PartialTransferUnrecovered {
        from: Uuid,
        to: Uuid,
        amount: f64,
        credit_error: String,
        rollback_error: String,
    },

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Request deadline exceeded")]
    DeadlineExceeded,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// True for the "entity absent" class, whichever entity it was.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound(_)
                | Self::SkinNotFound(_)
                | Self::TransactionNotFound(_)
                | Self::AccountNotFound(_)
        )
    }

    /// True when money may be stuck between two accounts and needs
    /// manual reconciliation.
    pub fn is_reconciliation_hazard(&self) -> bool {
        matches!(self, Self::PartialTransferUnrecovered { .. })
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}
