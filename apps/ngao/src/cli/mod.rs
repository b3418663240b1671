//! # NGAO CLI Module
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `init` - Create the first (superuser) account
//! - `seed` - Load admin units and officers from a JSON file
//! - `stats` - Dashboard counts visible to an officer
//! - `history` - Status transitions of one workflow entity

mod commands;

use clap::{Parser, Subcommand};
use ngao_core::NgaoError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// NGAO MIS - National Government Administration Office workflow service
#[derive(Parser, Debug)]
#[command(name = "ngao")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the redb database (overrides `[storage] path`)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json_mode: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to (overrides `[server] host`)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides `[server] port`)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Create the first account. Refused once any officer exists.
    Init {
        #[arg(long)]
        email: String,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        /// Phone number in +254 format
        #[arg(long)]
        phone: String,

        /// Role slug (e.g. `cs`, `ps`)
        #[arg(long, default_value = "cs")]
        role: String,
    },

    /// Load admin units and officers from a JSON seed file
    Seed {
        /// Path to the seed file
        #[arg(short, long)]
        file: PathBuf,

        /// Officer the records are created as
        #[arg(short, long)]
        officer: u64,
    },

    /// Show dashboard counts visible to an officer
    Stats {
        #[arg(short, long)]
        officer: u64,
    },

    /// Show the status history of an incident or registration
    History {
        /// Entity kind (incident, birth, death, marriage, national_id)
        #[arg(short, long)]
        kind: String,

        #[arg(short, long)]
        id: u64,

        #[arg(short, long)]
        officer: u64,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

pub async fn execute(cli: Cli) -> Result<(), NgaoError> {
    let config = load_config(cli.config.as_deref(), cli.database)?;
    if cli.verbose {
        tracing::info!(backend = ?config.storage.backend, path = %config.storage.path.display(), "Configuration loaded");
    }
    let json_mode = cli.json_mode;

    match cli.command {
        Commands::Server { host, port } => cmd_server(config, host, port).await,
        Commands::Init {
            email,
            first_name,
            last_name,
            phone,
            role,
        } => cmd_init(&config, json_mode, email, first_name, last_name, phone, &role),
        Commands::Seed { file, officer } => cmd_seed(&config, json_mode, &file, officer),
        Commands::Stats { officer } => cmd_stats(&config, json_mode, officer),
        Commands::History { kind, id, officer } => {
            cmd_history(&config, json_mode, &kind, id, officer)
        }
    }
}
