//! CLI module for the User Accounts API
//!
//! Provides subcommands:
//! - `serve`: run the HTTP server
//! - `migrate`: prepare the configured storage backend

pub mod migrate;
pub mod serve;

use clap::{Parser, Subcommand};
use tracing::warn;

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// User Accounts API - user management over MongoDB or PostgreSQL
#[derive(Parser)]
#[command(name = "user-accounts-api")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve,

    /// Create the users table (PostgreSQL) or indexes (MongoDB)
    Migrate(migrate::MigrateArgs),
}

/// Load `.env` and configuration, then install logging
fn bootstrap() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let (config, load_error) = match AppConfig::load() {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    logging::init_logging(&config.logging)?;

    if let Some(e) = load_error {
        warn!(error = %e, "Failed to load configuration, using defaults");
    }

    Ok(config)
}
