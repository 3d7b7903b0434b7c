//! Implementation of the `skinmarket init` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tokio::fs;

use crate::adapters::sqlite::initialize_database;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::config::CONFIG_DIR;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config file
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub initialized_path: PathBuf,
    pub config_written: bool,
    pub database_path: PathBuf,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if self.config_written {
            lines.push(format!("\nConfig written to {CONFIG_DIR}/config.yaml"));
        }
        if self.success {
            lines.push(format!("Database ready at {}", self.database_path.display()));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: InitArgs, config: &Config, json_mode: bool) -> Result<()> {
    let target_path = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir().context("Failed to get current directory")?.join(&args.path)
    };

    let market_dir = target_path.join(CONFIG_DIR);
    let config_path = market_dir.join("config.yaml");
    let already_initialized = config_path.exists();

    fs::create_dir_all(&market_dir)
        .await
        .with_context(|| format!("Failed to create {}", market_dir.display()))?;

    let config_written = !already_initialized || args.force;
    if config_written {
        let yaml = serde_yaml::to_string(config).context("Failed to serialize config")?;
        fs::write(&config_path, yaml)
            .await
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
    }

    let database_path = if PathBuf::from(&config.database.path).is_absolute() {
        PathBuf::from(&config.database.path)
    } else {
        target_path.join(&config.database.path)
    };
    let db_url = format!("sqlite:{}", database_path.display());
    initialize_database(&db_url, None)
        .await
        .context("Failed to initialize database")?;

    let message = match (already_initialized, args.force) {
        (false, _) => "Project initialized successfully.",
        (true, true) => "Project reinitialized successfully.",
        (true, false) => "Project already initialized; database migrations checked.",
    };

    output(
        &InitOutput {
            success: true,
            message: message.to_string(),
            initialized_path: target_path,
            config_written,
            database_path,
        },
        json_mode,
    );
    Ok(())
}
