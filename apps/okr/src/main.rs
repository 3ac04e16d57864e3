//! # okr - OKR Governance CLI
//!
//! The main binary for the okr-core governance and rollup engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                 apps/okr (THE BINARY)                │
//! │                                                      │
//! │  ┌─────────────┐  ┌─────────────┐  ┌──────────────┐  │
//! │  │    CLI      │  │   Config    │  │  Data file   │  │
//! │  │   (clap)    │  │   (toml)    │  │ (serde_json) │  │
//! │  └──────┬──────┘  └──────┬──────┘  └──────┬───────┘  │
//! │         └────────────────┼────────────────┘          │
//! │                          ▼                           │
//! │                  ┌───────────────┐                   │
//! │                  │   okr-core    │                   │
//! │                  │  (THE LOGIC)  │                   │
//! │                  └───────────────┘                   │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! okr --tenant org-a show
//! okr --tenant org-a --user alice check-in --key-result kr-1 --value 42 --write
//! okr --tenant org-a transition --objective obj-1 --to PUBLISHED --write
//! okr --superuser --json show
//! ```

use clap::Parser;
use okr::cli::{self, Cli};
use okr::config::{AppConfig, LogFormat};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    };

    init_tracing(&config);

    let stdout = std::io::stdout();
    if let Err(e) = cli::execute(cli, &config, &mut stdout.lock()) {
        tracing::error!("Error: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
/// `OKR_LOG_FORMAT=json` enables machine-parseable logs.
fn init_tracing(config: &AppConfig) {
    let filter =
        tracing_subscriber::EnvFilter::new(config.log_filter(std::env::var("OKR_LOG").ok()));

    match config.log_format(std::env::var("OKR_LOG_FORMAT").ok()) {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
