//! Upload Command
//!
//! Uploads one file; the gateway splits it into fragments.

use super::format_bytes;
use crate::client::GatewayClient;
use crate::symbols;
use anyhow::{Context, Result};
use console::style;
use indicatif::ProgressBar;
use std::path::Path;
use std::time::Duration;

/// Run upload command
pub async fn run(client: &GatewayClient, path: &Path) -> Result<()> {
    if !path.is_file() {
        anyhow::bail!("Not a file: {}", path.display());
    }

    let spinner = ProgressBar::new_spinner();
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Uploading {}", path.display()));

    let result = client.upload_file(path).await;
    spinner.finish_and_clear();
    let response = result.context("Failed to upload file")?;

    println!(
        "{} Uploaded {} ({})",
        style(symbols::CHECK).green(),
        style(&response.filename).bold(),
        format_bytes(response.size)
    );
    println!(
        "  Fragments: {} stored, {} failed",
        style(response.fragments_stored).cyan(),
        style(response.fragments_failed).cyan()
    );

    if response.degraded {
        println!(
            "{} Some fragments could not be stored; the file survives fewer node failures",
            style(symbols::WARN).yellow()
        );
    }

    Ok(())
}
