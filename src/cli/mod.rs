//! Command-line interface.

pub mod commands;
pub mod context;
pub mod output;
pub mod table;

use clap::{Parser, Subcommand};

use crate::domain::errors::DomainError;

pub use context::Market;

#[derive(Parser, Debug)]
#[command(name = "skinmarket")]
#[command(about = "Skinmarket - users, inventory and transactions behind a coherent cache", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the project directory, config file and database
    Init(commands::init::InitArgs),

    /// User accounts and balances
    User(commands::user::UserArgs),

    /// Skin inventory and market listing
    Skin(commands::skin::SkinArgs),

    /// Transaction records and statistics
    Tx(commands::tx::TxArgs),

    /// Move balance from one user to another
    Transfer(commands::transfer::TransferArgs),
}

/// Print a command failure and exit non-zero.
///
/// Reconciliation hazards get their own exit code so scripts can page
/// someone.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    let hazard = err
        .downcast_ref::<DomainError>()
        .is_some_and(DomainError::is_reconciliation_hazard);

    if json_mode {
        let body = serde_json::json!({
            "success": false,
            "error": format!("{err:#}"),
            "reconciliation_required": hazard,
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
        if hazard {
            eprintln!("Balances need manual reconciliation.");
        }
    }

    std::process::exit(if hazard { 3 } else { 1 });
}
