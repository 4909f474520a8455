//! ctxlink CLI — the main entry point.
//!
//! Commands:
//! - `serve`   — Start the protocol server
//! - `client`  — Run a short conversation against a server
//! - `status`  — Show the effective configuration

use clap::{Parser, Subcommand};
use ctxlink_config::AppConfig;
use std::path::Path;
use tracing::info;

mod commands;

#[derive(Parser)]
#[command(
    name = "ctxlink",
    about = "ctxlink — context-carrying message protocol over WebSocket",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the protocol server
    Serve {
        /// Override the listen host
        #[arg(long)]
        host: Option<String>,

        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Connect to a server, initialize a context and send prompts
    Client {
        /// Server URL (defaults to ws://127.0.0.1:<configured port>)
        #[arg(short, long)]
        url: Option<String>,

        /// Model id for the initial context
        #[arg(short, long)]
        model: Option<String>,

        /// Prompts to send in order
        prompts: Vec<String>,
    },

    /// Show the effective configuration
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Initialize tracing
    let filter = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false);
    if config.logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
    report_config_source(&AppConfig::config_path());

    match cli.command {
        Commands::Serve { host, port } => commands::serve::run(config, host, port).await?,
        Commands::Client { url, model, prompts } => {
            commands::client::run(&config, url, model, prompts).await?
        }
        Commands::Status => commands::status::run(&config)?,
    }

    Ok(())
}

/// Log which config file is in effect. Returns whether it exists.
fn report_config_source(path: &Path) -> bool {
    let found = path.exists();
    if found {
        info!(path = %path.display(), "Loaded config file");
    } else {
        info!(path = %path.display(), "No config file found, using defaults");
    }
    found
}
