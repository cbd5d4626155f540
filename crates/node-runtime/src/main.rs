//! # ICode Node
//!
//! Binary entry point: load configuration, start the runtime, run until
//! Ctrl+C, shut down gracefully.

use anyhow::{Context, Result};
use tracing::info;

use node_runtime::{logging, NodeConfig, NodeRuntime};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init()?;

    let config = NodeConfig::from_env().context("Failed to load configuration")?;

    let mut runtime = NodeRuntime::new(config)?;
    runtime.start().await?;

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    runtime.shutdown().await;
    Ok(())
}
