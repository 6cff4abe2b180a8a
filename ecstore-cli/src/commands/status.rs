//! Status Command
//!
//! Shows gateway health and storage node liveness.

use crate::client::GatewayClient;
use crate::symbols;
use anyhow::{Context, Result};
use console::style;

/// Run status command
pub async fn run(client: &GatewayClient) -> Result<()> {
    let healthy = client.health().await.unwrap_or(false);

    println!("{}", style("ecstore Status").bold().underlined());
    println!();

    let gateway_state = if healthy {
        style("Online").green()
    } else {
        style("Offline").red()
    };
    println!("Gateway: {} ({})", gateway_state, client.base_url());
    println!();

    if !healthy {
        println!(
            "{}",
            style("Cannot retrieve node status: gateway is offline").yellow()
        );
        return Ok(());
    }

    let nodes = client.status().await.context("Failed to get node status")?;

    println!(
        "{:<4} {:<12} {:<28} {}",
        style("ID").bold(),
        style("NAME").bold(),
        style("ADDRESS").bold(),
        style("STATUS").bold()
    );
    for node in &nodes {
        let dot = if node.is_alive() {
            style(symbols::DOT).green()
        } else {
            style(symbols::DOT).red()
        };
        println!(
            "{:<4} {:<12} {:<28} {} {}",
            node.id, node.name, node.address, dot, node.status
        );
    }

    let alive = nodes.iter().filter(|n| n.is_alive()).count();
    println!();
    println!("{} of {} nodes alive", style(alive).cyan(), nodes.len());

    Ok(())
}
