//! Implementation of the `skinmarket transfer` command.

use anyhow::Result;
use clap::Args;
use uuid::Uuid;

use crate::cli::context::Market;
use crate::cli::output::{output, CommandOutput};
use crate::cli::table::money;
use crate::domain::models::Config;
use crate::services::TransferReceipt;

#[derive(Args, Debug)]
pub struct TransferArgs {
    /// Sending user
    pub from: Uuid,
    /// Receiving user
    pub to: Uuid,
    pub amount: f64,
}

#[derive(Debug, serde::Serialize)]
pub struct TransferOutput {
    pub success: bool,
    #[serde(flatten)]
    pub receipt: TransferReceipt,
}

impl CommandOutput for TransferOutput {
    fn to_human(&self) -> String {
        let r = &self.receipt;
        [
            format!("Transferred {} from {} to {}", money(r.amount), r.from, r.to),
            format!("  {} balance: {}", r.from, money(r.from_balance)),
            format!("  {} balance: {}", r.to, money(r.to_balance)),
        ]
        .join("\n")
    }
}

pub async fn execute(args: TransferArgs, config: Config, json_mode: bool) -> Result<()> {
    let market = Market::open(config).await?;
    let ctx = market.request();

    let receipt = market
        .users
        .transfer_balance(&ctx, args.from, args.to, args.amount)
        .await?;

    output(
        &TransferOutput {
            success: true,
            receipt,
        },
        json_mode,
    );
    Ok(())
}
