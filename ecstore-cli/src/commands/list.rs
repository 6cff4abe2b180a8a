//! List Command
//!
//! Lists objects known to the gateway.

use super::format_bytes;
use crate::client::GatewayClient;
use anyhow::{Context, Result};
use console::style;

/// Run list command
pub async fn run(client: &GatewayClient, long_format: bool) -> Result<()> {
    let objects = client
        .list_objects()
        .await
        .context("Failed to list objects")?;

    if objects.is_empty() {
        println!("{} No objects stored", style("Info:").cyan());
        return Ok(());
    }

    if long_format {
        println!(
            "{:<40} {:>12} {:>6} {:<26} {}",
            style("NAME").bold(),
            style("SIZE").bold(),
            style("k+m").bold(),
            style("UPLOADED").bold(),
            style("BLAKE3").bold()
        );
        println!("{}", "-".repeat(110));
    }

    let mut total_size: u64 = 0;
    for obj in &objects {
        total_size += obj.size;
        if long_format {
            println!(
                "{:<40} {:>12} {:>6} {:<26} {}",
                obj.name,
                format_bytes(obj.size),
                format!("{}+{}", obj.data_fragments, obj.parity_fragments),
                obj.uploaded_at,
                &obj.content_hash[..obj.content_hash.len().min(16)]
            );
        } else {
            println!("{}", obj.name);
        }
    }

    if long_format {
        println!();
        println!(
            "{} objects, {} total",
            style(objects.len()).cyan(),
            style(format_bytes(total_size)).cyan()
        );
    }

    Ok(())
}
