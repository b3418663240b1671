//! # NGAO MIS
//!
//! The service binary for the NGAO workflow engine.
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │              apps/ngao (THE BINARY)           │
//! │                                               │
//! │   ┌─────────────┐        ┌─────────────┐      │
//! │   │    CLI      │        │  HTTP API   │      │
//! │   │   (clap)    │        │   (axum)    │      │
//! │   └──────┬──────┘        └──────┬──────┘      │
//! │          └───────────┬──────────┘             │
//! │                      ▼                        │
//! │              ┌───────────────┐                │
//! │              │   ngao-core   │                │
//! │              │  (THE ENGINE) │                │
//! │              └───────────────┘                │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! ngao -D ngao.redb init --email cs@ngao.go.ke --first-name Jane \
//!     --last-name Doe --phone +254700000001
//! ngao -D ngao.redb seed -f units.json --officer 1
//! ngao --config ngao.toml server --port 8080
//! ngao -D ngao.redb history --kind incident --id 3 --officer 1
//! ```

mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // NGAO_LOG_FORMAT=json switches to machine-parseable output.
    let log_format = std::env::var("NGAO_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ngao=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_banner() {
    println!(
        r#"
  ███╗   ██╗ ██████╗  █████╗  ██████╗
  ████╗  ██║██╔════╝ ██╔══██╗██╔═══██╗
  ██╔██╗ ██║██║  ███╗███████║██║   ██║
  ██║╚██╗██║██║   ██║██╔══██║██║   ██║
  ██║ ╚████║╚██████╔╝██║  ██║╚██████╔╝
  ╚═╝  ╚═══╝ ╚═════╝ ╚═╝  ╚═╝ ╚═════╝

  NGAO MIS v{}

  Incidents • Civil Registration • Chain of Command
"#,
        env!("CARGO_PKG_VERSION")
    );
}
