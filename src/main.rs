//! Skinmarket CLI entry point.

use clap::Parser;

use skinmarket::cli::{handle_error, Cli, Commands};
use skinmarket::infrastructure::config::ConfigLoader;
use skinmarket::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ConfigLoader::load() {
        Ok(config) => config,
        Err(err) => handle_error(err, cli.json),
    };

    let _logger = match LoggerImpl::init(&LogConfig::from(&config.logging)) {
        Ok(logger) => Some(logger),
        Err(err) => {
            eprintln!("Warning: logging disabled: {err:#}");
            None
        }
    };

    let result = match cli.command {
        Commands::Init(args) => skinmarket::cli::commands::init::execute(args, &config, cli.json).await,
        Commands::User(args) => skinmarket::cli::commands::user::execute(args, config, cli.json).await,
        Commands::Skin(args) => skinmarket::cli::commands::skin::execute(args, config, cli.json).await,
        Commands::Tx(args) => skinmarket::cli::commands::tx::execute(args, config, cli.json).await,
        Commands::Transfer(args) => skinmarket::cli::commands::transfer::execute(args, config, cli.json).await,
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}
