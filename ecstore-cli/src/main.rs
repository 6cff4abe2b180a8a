//! ecstore CLI
//!
//! Command-line client for the ecstore gateway.
//!
//! # Commands
//! - `upload` - Upload a file
//! - `download` - Download a file
//! - `status` - Show storage node liveness
//! - `list` - List stored files

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod client;
mod commands;
mod symbols;

use client::GatewayClient;

#[derive(Parser)]
#[command(name = "ecstore")]
#[command(about = "ecstore erasure-coded storage CLI")]
#[command(version)]
struct Cli {
    /// Gateway HTTP URL
    #[arg(
        long,
        global = true,
        env = "ECSTORE_GATEWAY",
        default_value = "http://localhost:8080"
    )]
    gateway: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file to storage
    Upload {
        /// Path to the file
        path: PathBuf,
    },

    /// Download a file from storage
    Download {
        /// Object name
        name: String,

        /// Output path (file or directory, default: ./<name>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show storage node status
    Status,

    /// List stored files
    List {
        /// Show size, geometry, upload time and hash
        #[arg(short, long)]
        long: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    tracing::debug!(gateway = %cli.gateway, "Using gateway");
    let client = GatewayClient::new(&cli.gateway)?;

    match cli.command {
        Commands::Upload { path } => commands::upload(&client, &path).await,
        Commands::Download { name, output } => {
            commands::download(&client, &name, output.as_deref()).await
        }
        Commands::Status => commands::status(&client).await,
        Commands::List { long } => commands::list(&client, long).await,
    }
}
