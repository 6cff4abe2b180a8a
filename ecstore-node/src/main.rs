//! ecstore Storage Node Daemon
//!
//! Runs a storage node that keeps fragments in a local chunk store and
//! serves them to the gateway over gRPC.

use clap::Parser;
use ecstore_node::{NodeConfig, StorageNode};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ecstore-node")]
#[command(about = "ecstore storage node daemon")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Storage directory (overrides config file)
    #[arg(short, long, env = "ECSTORE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// gRPC listen port (overrides config file)
    #[arg(short, long, env = "ECSTORE_NODE_PORT")]
    port: Option<u16>,

    /// Keep fragments in memory only
    #[arg(long)]
    memory: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    info!("ecstore storage node starting...");

    // Priority: CLI args / env > config.toml > defaults
    let config = NodeConfig::load_or_default(&cli.config).with_overrides(
        cli.data_dir,
        cli.port,
        cli.memory,
    );

    let node = StorageNode::open(config)?;

    info!("========================================");
    info!("  Node ID:     {}", node.config().node.id);
    info!("  Name:        {}", node.config().node.name);
    info!("  Backend:     {:?}", node.config().storage.backend);
    info!("  Data dir:    {:?}", node.config().data_dir());
    info!(
        "  gRPC:        {}:{}",
        node.config().network.bind_address,
        node.config().network.port
    );
    info!("========================================");
    info!("Press Ctrl+C to shut down");

    node.serve(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received shutdown signal");
    })
    .await?;

    info!("ecstore storage node stopped");
    Ok(())
}
