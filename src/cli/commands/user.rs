//! User CLI commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use uuid::Uuid;

use super::PageArgs;
use crate::cli::context::Market;
use crate::cli::output::{output, short_id, truncate, CommandOutput};
use crate::cli::table::{list_table, money, render_list};
use crate::domain::models::{AdminUserUpdate, Config, Page, User};
use crate::domain::ports::UserFilter;

#[derive(Args, Debug)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommands,
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Register a new user (the first one becomes admin)
    Create {
        username: String,
        email: String,
    },
    /// Show a user by id, email or username
    Show {
        /// User id, email address or username
        user: String,
    },
    /// Show a user's balance
    Balance {
        id: Uuid,
    },
    /// Add (or with a negative amount, withdraw) funds
    Deposit {
        id: Uuid,
        #[arg(allow_hyphen_values = true)]
        amount: f64,
    },
    /// List users
    List {
        /// Only admins
        #[arg(long)]
        admins: bool,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Change username and/or email
    Update {
        id: Uuid,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Admin override of another user's role or balance
    Promote {
        /// Acting admin
        #[arg(long = "as")]
        admin: Uuid,
        /// Target user
        user: Uuid,
        /// Revoke admin instead of granting it
        #[arg(long)]
        revoke: bool,
        /// Set the balance outright
        #[arg(long)]
        balance: Option<f64>,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct UserOutput {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub balance: f64,
    pub is_admin: bool,
    pub created_at: String,
}

impl From<&User> for UserOutput {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            balance: user.balance,
            is_admin: user.is_admin,
            created_at: user.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        }
    }
}

impl CommandOutput for UserOutput {
    fn to_human(&self) -> String {
        [
            format!("User: {}", self.username),
            format!("ID: {}", self.id),
            format!("Email: {}", self.email),
            format!("Balance: {}", money(self.balance)),
            format!("Admin: {}", if self.is_admin { "yes" } else { "no" }),
            format!("Created: {}", self.created_at),
        ]
        .join("\n")
    }
}

#[derive(Debug, serde::Serialize)]
pub struct UserListOutput {
    pub users: Vec<UserOutput>,
    pub total: u64,
}

impl CommandOutput for UserListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "username", "email", "balance", "admin"]);
        for user in &self.users {
            table.add_row(vec![
                short_id(&user.id),
                truncate(&user.username, 24),
                truncate(&user.email, 32),
                money(user.balance),
                if user.is_admin { "yes".to_string() } else { String::new() },
            ]);
        }
        render_list("user", &table, self.users.len(), self.total)
    }
}

#[derive(Debug, serde::Serialize)]
pub struct BalanceOutput {
    pub id: Uuid,
    pub balance: f64,
}

impl CommandOutput for BalanceOutput {
    fn to_human(&self) -> String {
        format!("Balance of {}: {}", self.id, money(self.balance))
    }
}

pub async fn execute(args: UserArgs, config: Config, json_mode: bool) -> Result<()> {
    let market = Market::open(config).await?;
    let ctx = market.request();
    let users = &market.users;

    match args.command {
        UserCommands::Create { username, email } => {
            let user = users.create_user(&ctx, &username, &email).await?;
            output(&UserOutput::from(&user), json_mode);
        }
        UserCommands::Show { user } => {
            let found = if let Ok(id) = Uuid::parse_str(&user) {
                Some(users.get_user(&ctx, id).await?)
            } else if user.contains('@') {
                users.get_user_by_email(&ctx, &user).await?
            } else {
                users.get_user_by_username(&ctx, &user).await?
            };
            let found = found.with_context(|| format!("User not found: {user}"))?;
            output(&UserOutput::from(&found), json_mode);
        }
        UserCommands::Balance { id } => {
            let balance = users.get_balance(&ctx, id).await?;
            output(&BalanceOutput { id, balance }, json_mode);
        }
        UserCommands::Deposit { id, amount } => {
            let balance = users.adjust_balance(&ctx, id, amount).await?;
            output(&BalanceOutput { id, balance }, json_mode);
        }
        UserCommands::List { admins, page } => {
            let filter = UserFilter {
                is_admin: admins.then_some(true),
            };
            let listed = users.list_users(&ctx, filter, Page::from(page)).await?;
            output(
                &UserListOutput {
                    users: listed.items.iter().map(UserOutput::from).collect(),
                    total: listed.total_count,
                },
                json_mode,
            );
        }
        UserCommands::Update { id, username, email } => {
            let user = users.update_profile(&ctx, id, username, email).await?;
            output(&UserOutput::from(&user), json_mode);
        }
        UserCommands::Promote {
            admin,
            user,
            revoke,
            balance,
        } => {
            let update = AdminUserUpdate {
                is_admin: Some(!revoke),
                balance,
                ..AdminUserUpdate::default()
            };
            let updated = users.admin_update_user(&ctx, admin, user, update).await?;
            output(&UserOutput::from(&updated), json_mode);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_negative_deposit_parses() {
        let id = Uuid::new_v4();
        let cli = Cli::try_parse_from(["skinmarket", "user", "deposit", &id.to_string(), "-12.5"]).unwrap();
        match cli.command {
            crate::cli::Commands::User(UserArgs {
                command: UserCommands::Deposit { amount, .. },
            }) => assert!((amount + 12.5).abs() < f64::EPSILON),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_list_rejects_page_zero() {
        assert!(Cli::try_parse_from(["skinmarket", "user", "list", "--page", "0"]).is_err());
    }

    #[test]
    fn test_list_output_human() {
        let user = User::new("alice", "alice@example.com").with_balance(12.0).with_admin(true);
        let out = UserListOutput {
            users: vec![UserOutput::from(&user)],
            total: 1,
        };
        let human = out.to_human();
        assert!(human.starts_with("1 user:"));
        assert!(human.contains("alice@example.com"));
        assert!(human.contains("12.00"));
    }
}
