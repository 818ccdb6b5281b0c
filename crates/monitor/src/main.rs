//! Fall Monitor - Main Entry Point

use anyhow::Context;
use monitor::{init_logging, run, MonitorSettings};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = MonitorSettings::load().context("failed to load settings")?;
    init_logging(&settings.log_level, settings.json_logs)?;

    info!("=== Fall Monitor v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Starting fall detection...");

    run(settings).await
}
