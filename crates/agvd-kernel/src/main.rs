//! # agvd Kernel
//!
//! Runs the dispatcher against the configured plant.

use agvd_kernel::{Kernel, KernelConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🚀 agvd kernel starting...");

    let config = KernelConfig::load(std::env::args().nth(1))?;
    let kernel = Kernel::new(&config)?;
    let summary = kernel.run().await?;

    if summary.pending > 0 {
        info!("{} transport orders left unprocessed", summary.pending);
    }
    Ok(())
}
