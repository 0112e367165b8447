//! optracker library root.
//! Exposes the CLI parser, the high-level run() function and the tracker
//! modules so tests and embedding callers can drive them directly.

pub mod cli;
pub mod config;
pub mod core;
pub mod db;
pub mod errors;
pub mod models;
pub mod ui;
pub mod utils;

use clap::Parser;
use cli::parser::{Cli, Commands};
use config::Config;
use errors::AppResult;

/// Central command dispatcher
pub fn dispatch(cli: &Cli, cfg: &Config) -> AppResult<()> {
    match &cli.command {
        Commands::Init => cli::commands::init::handle(cli),
        Commands::Config { .. } => cli::commands::config::handle(&cli.command, cfg),
        Commands::Db { .. } => cli::commands::db::handle(&cli.command, cfg),
        Commands::Log { .. } => cli::commands::log::handle(&cli.command, cfg),
        Commands::Units { .. } => cli::commands::units::handle(&cli.command, cfg),
        Commands::Directory { .. } => cli::commands::directory::handle(&cli.command, cfg),
        Commands::Punch { .. } => cli::commands::punch::handle(&cli.command, cfg),
        Commands::History { .. } => cli::commands::history::handle(&cli.command, cfg),
        Commands::Report { .. } => cli::commands::report::handle(&cli.command, cfg),
        Commands::Purge { .. } => cli::commands::purge::handle(&cli.command, cfg),
        Commands::Diag { .. } => cli::commands::diag::handle(&cli.command, cfg),
    }
}

/// Entry point used by main.rs
pub fn run() -> AppResult<()> {
    let cli = Cli::parse();

    // Config is loaded once and handed to every command.
    let mut cfg = Config::load()?;

    if let Some(custom_db) = &cli.db {
        cfg.database = custom_db.clone();
    }
    cfg.validate()?;

    tracing::debug!(database = %cfg.database, "configuration loaded");
    dispatch(&cli, &cfg)
}
