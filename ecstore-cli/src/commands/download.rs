//! Download Command
//!
//! Downloads one object, rebuilt by the gateway from its fragments.

use super::format_bytes;
use crate::client::{ClientError, GatewayClient};
use crate::symbols;
use anyhow::Result;
use console::style;
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Run download command
pub async fn run(client: &GatewayClient, name: &str, output: Option<&Path>) -> Result<()> {
    let file_path = match output {
        Some(path) if path.is_dir() => path.join(name),
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(name),
    };

    let spinner = ProgressBar::new_spinner();
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Downloading {}", name));

    let result = client.download(name).await;
    spinner.finish_and_clear();

    let data = match result {
        Ok(data) => data,
        Err(ClientError::NotFound(_)) => {
            anyhow::bail!("{} File not found: {}", symbols::CROSS, name);
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(parent) = file_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    fs::write(&file_path, &data).await?;

    println!(
        "{} Downloaded {} ({}) to {}",
        style(symbols::CHECK).green(),
        style(name).bold(),
        format_bytes(data.len() as u64),
        file_path.display()
    );

    Ok(())
}
