//! # GUM - Graph Unfolding Machine
//!
//! The command-line driver for the unfolding machine.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                  apps/gum (THE BINARY)               │
//! │                                                      │
//! │  ┌─────────────┐   ┌──────────────┐   ┌───────────┐  │
//! │  │    CLI      │   │  genome_io   │   │  stepping │  │
//! │  │   (clap)    │   │ (json/toml)  │   │   loop    │  │
//! │  └──────┬──────┘   └──────┬───────┘   └─────┬─────┘  │
//! │         └─────────────────┼─────────────────┘        │
//! │                           ▼                          │
//! │                   ┌───────────────┐                  │
//! │                   │   gum-core    │                  │
//! │                   │  (THE LOGIC)  │                  │
//! │                   └───────────────┘                  │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! gum validate -g genome.json
//! gum run -g genome.json --steps 50 --state run.gums
//! gum inspect --state run.gums
//! gum hash --state run.gums
//! ```

use clap::Parser;
use gum::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // GUM_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("GUM_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "gum=info,gum_core=info".into());

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

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the GUM startup banner.
fn print_banner() {
    println!(
        r#"
   ██████╗ ██╗   ██╗███╗   ███╗
  ██╔════╝ ██║   ██║████╗ ████║
  ██║  ███╗██║   ██║██╔████╔██║
  ██║   ██║██║   ██║██║╚██╔╝██║
  ╚██████╔╝╚██████╔╝██║ ╚═╝ ██║
   ╚═════╝  ╚═════╝ ╚═╝     ╚═╝

  Graph Unfolding Machine v{}

  Snapshot • Match • Unfold
"#,
        env!("CARGO_PKG_VERSION")
    );
}
