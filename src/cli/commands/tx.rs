//! Transaction CLI commands.

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Subcommand};
use uuid::Uuid;

use super::PageArgs;
use crate::cli::context::Market;
use crate::cli::output::{output, short_id, truncate, CommandOutput};
use crate::cli::table::{list_table, money, render_list};
use crate::domain::models::{Config, Page, Transaction, TransactionStats, TransactionStatus, TransactionType};
use crate::domain::ports::StatsFilter;

#[derive(Args, Debug)]
pub struct TxArgs {
    #[command(subcommand)]
    pub command: TxCommands,
}

#[derive(Subcommand, Debug)]
pub enum TxCommands {
    /// Record a new pending transaction
    Create {
        buyer: Uuid,
        skin: Uuid,
        amount: f64,
        #[arg(long)]
        seller: Option<Uuid>,
        /// buy or sell
        #[arg(long = "type", default_value = "buy", value_parser = parse_type)]
        tx_type: TransactionType,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Show transaction details
    Show {
        id: Uuid,
    },
    /// List transactions, newest first
    List {
        /// Only transactions where this user is buyer or seller
        #[arg(long)]
        user: Option<Uuid>,
        /// Full history of one skin
        #[arg(long, conflicts_with = "user")]
        skin: Option<Uuid>,
        #[arg(long, value_parser = parse_status, requires = "user")]
        status: Option<TransactionStatus>,
        #[arg(long = "type", value_parser = parse_type, requires = "user")]
        tx_type: Option<TransactionType>,
        #[command(flatten)]
        page: PageArgs,
    },
    /// List transactions in one status
    ListStatus {
        #[arg(value_parser = parse_status)]
        status: TransactionStatus,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Cancel a transaction
    Cancel {
        id: Uuid,
        #[arg(short, long, default_value = "")]
        reason: String,
    },
    /// Aggregate statistics
    Stats {
        #[arg(long)]
        user: Option<Uuid>,
        /// Inclusive lower bound (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_start)]
        from: Option<DateTime<Utc>>,
        /// Inclusive upper bound (RFC 3339 or YYYY-MM-DD, whole day)
        #[arg(long, value_parser = parse_end)]
        to: Option<DateTime<Utc>>,
    },
}

fn parse_status(s: &str) -> Result<TransactionStatus, String> {
    TransactionStatus::from_str(s).ok_or_else(|| format!("unknown status '{s}'"))
}

fn parse_type(s: &str) -> Result<TransactionType, String> {
    TransactionType::from_str(s).ok_or_else(|| format!("unknown transaction type '{s}'"))
}

fn parse_start(s: &str) -> Result<DateTime<Utc>, String> {
    parse_bound(s, false)
}

fn parse_end(s: &str) -> Result<DateTime<Utc>, String> {
    parse_bound(s, true)
}

/// A bare date expands to the start or the last microsecond of that day.
fn parse_bound(s: &str, end_of_day: bool) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| format!("invalid date '{s}'"))?;
    let time = if end_of_day {
        date.and_hms_micro_opt(23, 59, 59, 999_999)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    time.map(|t| t.and_utc()).ok_or_else(|| format!("invalid date '{s}'"))
}

#[derive(Debug, serde::Serialize)]
pub struct TransactionOutput {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Option<Uuid>,
    pub skin_id: Uuid,
    pub amount: f64,
    pub status: &'static str,
    pub tx_type: &'static str,
    pub description: String,
    pub created_at: String,
}

impl From<&Transaction> for TransactionOutput {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: tx.id,
            buyer_id: tx.buyer_id,
            seller_id: tx.seller_id,
            skin_id: tx.skin_id,
            amount: tx.amount,
            status: tx.status.as_str(),
            tx_type: tx.tx_type.as_str(),
            description: tx.description.clone(),
            created_at: tx.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        }
    }
}

impl CommandOutput for TransactionOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Transaction: {}", self.id),
            format!("Type: {}", self.tx_type),
            format!("Status: {}", self.status),
            format!("Amount: {}", money(self.amount)),
            format!("Buyer: {}", self.buyer_id),
        ];
        if let Some(seller) = self.seller_id {
            lines.push(format!("Seller: {seller}"));
        }
        lines.push(format!("Skin: {}", self.skin_id));
        lines.push(format!("Created: {}", self.created_at));
        if !self.description.is_empty() {
            lines.push(format!("\nDescription: {}", self.description));
        }
        lines.join("\n")
    }
}

#[derive(Debug, serde::Serialize)]
pub struct TransactionListOutput {
    pub transactions: Vec<TransactionOutput>,
    pub total: u64,
}

impl TransactionListOutput {
    fn new(items: &[Transaction], total: u64) -> Self {
        Self {
            transactions: items.iter().map(TransactionOutput::from).collect(),
            total,
        }
    }
}

impl CommandOutput for TransactionListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "type", "status", "amount", "buyer", "skin", "description"]);
        for tx in &self.transactions {
            table.add_row(vec![
                short_id(&tx.id),
                tx.tx_type.to_string(),
                tx.status.to_string(),
                money(tx.amount),
                short_id(&tx.buyer_id),
                short_id(&tx.skin_id),
                truncate(&tx.description, 40),
            ]);
        }
        render_list("transaction", &table, self.transactions.len(), self.total)
    }
}

#[derive(Debug, serde::Serialize)]
pub struct StatsOutput {
    #[serde(flatten)]
    pub stats: TransactionStats,
}

impl CommandOutput for StatsOutput {
    fn to_human(&self) -> String {
        let s = &self.stats;
        [
            format!("Transactions: {}", s.total),
            format!("Total amount: {}", money(s.total_amount)),
            format!("Completed: {}", s.success_count),
            format!("Failed or cancelled: {}", s.failure_count),
            format!("Average amount: {}", money(s.average_amount)),
        ]
        .join("\n")
    }
}

pub async fn execute(args: TxArgs, config: Config, json_mode: bool) -> Result<()> {
    let market = Market::open(config).await?;
    let ctx = market.request();
    let transactions = &market.transactions;

    match args.command {
        TxCommands::Create {
            buyer,
            skin,
            amount,
            seller,
            tx_type,
            description,
        } => {
            let mut tx = Transaction::new(buyer, skin, amount)
                .with_type(tx_type)
                .with_description(description);
            if let Some(seller) = seller {
                tx = tx.with_seller(seller);
            }
            let tx = transactions.create_transaction(&ctx, tx).await?;
            output(&TransactionOutput::from(&tx), json_mode);
        }
        TxCommands::Show { id } => {
            let tx = transactions.get_transaction(&ctx, id).await?;
            output(&TransactionOutput::from(&tx), json_mode);
        }
        TxCommands::List {
            user,
            skin,
            status,
            tx_type,
            page,
        } => {
            let listed = match (user, skin) {
                (Some(user), _) => {
                    let paged = transactions
                        .list_by_user(&ctx, user, status, tx_type, Page::from(page))
                        .await?;
                    TransactionListOutput::new(&paged.items, paged.total_count)
                }
                (None, Some(skin)) => {
                    let history = transactions.list_by_skin(&ctx, skin).await?;
                    TransactionListOutput::new(&history, history.len() as u64)
                }
                (None, None) => {
                    let paged = transactions.list_all(&ctx, Page::from(page)).await?;
                    TransactionListOutput::new(&paged.items, paged.total_count)
                }
            };
            output(&listed, json_mode);
        }
        TxCommands::ListStatus { status, page } => {
            let paged = transactions.list_by_status(&ctx, status, Page::from(page)).await?;
            output(&TransactionListOutput::new(&paged.items, paged.total_count), json_mode);
        }
        TxCommands::Cancel { id, reason } => {
            let tx = transactions.cancel_transaction(&ctx, id, &reason).await?;
            output(&TransactionOutput::from(&tx), json_mode);
        }
        TxCommands::Stats { user, from, to } => {
            if from.is_some_and(|f| to.is_some_and(|t| f > t)) {
                return Err(anyhow!("--from must not be after --to"));
            }
            let filter = StatsFilter {
                user_id: user,
                start: from,
                end: to,
            };
            let stats = transactions.compute_stats(&ctx, filter).await?;
            output(&StatsOutput { stats }, json_mode);
        }
    }

    Ok(())
}
