// src/main.rs
use crate::config::AppConfig;
use crate::connectors::okx::{Credentials, OkxClient};
use crate::core::engine::{EngineSettings, RebalanceEngine};
use dotenvy::dotenv;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

mod config;
mod connectors;
mod core;
mod error;
mod logging;
mod types;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // 1. Load Configuration (invalid config never reaches the loop)
    let config = AppConfig::new()?;
    let _log_guard = logging::init_tracing(&config.log_dir)?;
    let settings = EngineSettings::from_config(&config)?;

    println!("========================================");
    println!("       THE REBALANCER - v0.1.0");
    println!("========================================");
    println!("Pair:      {}", settings.pair);
    println!("Threshold: {}", settings.unbalance_ratio);
    println!(
        "Mode:      {}",
        if config.simulated {
            "DEMO TRADING"
        } else {
            "LIVE TRADING"
        }
    );
    println!("========================================");

    // 2. Initialize Components
    let credentials = Credentials::new(config.api_key, config.secret_key, config.passphrase);
    let client = OkxClient::new(credentials, config.rest_url, config.simulated);
    let mut engine = RebalanceEngine::new(settings, Arc::new(client));

    // 3. Probe the account before trading
    engine.startup_report().await?;

    // 4. Ctrl+C stops the loop between cycles
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Cannot listen for Ctrl+C, stop the process externally");
            std::future::pending::<()>().await;
        }
        info!("Shutdown requested, finishing current cycle");
        let _ = shutdown_tx.send(true);
    });

    // 5. Run Engine
    engine.run(shutdown_rx).await;

    Ok(())
}
