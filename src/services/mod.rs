//! Cache-aware use cases over the repository ports.

pub mod balance_transfer;
pub mod inventory_service;
pub mod request;
pub mod transaction_service;
pub mod user_service;

pub use balance_transfer::{BalanceTransfer, TransferReceipt, TransferState};
pub use inventory_service::InventoryService;
pub use request::RequestContext;
pub use transaction_service::TransactionService;
pub use user_service::UserService;
