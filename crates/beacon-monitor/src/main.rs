use anyhow::Result;
use beacon_monitor::{logging, Monitor, MonitorConfig};
use beacon_notify::plugin::ChannelRegistry;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init()?;

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/monitor.toml".to_string());

    let config = MonitorConfig::load(&config_path)?;
    tracing::info!(config = %config_path, "beacon-monitor starting");

    let registry = ChannelRegistry::default();
    let monitor = Monitor::from_config(&config, &registry)?;

    monitor
        .run(async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
        })
        .await;

    Ok(())
}
