//! Somnolence Detection - Main Entry Point

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use somnolence::{init_logging, run, AppConfig};
use tracing::info;

fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("loading configuration")?;
    init_logging(&config.log_level)?;

    info!("=== Somnolence Detection v{} ===", env!("CARGO_PKG_VERSION"));

    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("installing Ctrl-C handler")?;

    let summary = run(&config, &stop)?;
    info!("Done: {}", serde_json::to_string(&summary)?);

    Ok(())
}
