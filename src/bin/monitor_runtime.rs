//! Monitor runtime - recovers persisted subscriptions and runs them
//!
//! Usage:
//!   cargo run --release --bin monitor_runtime
//!
//! Environment variables:
//!   TRENDWATCH_DB_PATH - SQLite database path (default: trendwatch.db)
//!   FETCH_MAX_ATTEMPTS - fetch attempts per tick (default: 3)
//!   FETCH_RETRY_DELAY_MS - delay between attempts (default: 5000)

use dotenv::dotenv;
use log::{error, info};
use std::sync::Arc;
use trendwatch::monitor::{MonitorConfig, MonitorRegistry, SqliteObservationStore};
use trendwatch::sources::SourceRegistry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv().ok();
    env_logger::init();

    info!("🚀 Trendwatch monitor runtime");

    let config = MonitorConfig::from_env();
    info!("   ├─ Database: {}", config.db_path);
    info!("   ├─ Fetch attempts: {}", config.max_attempts);
    info!("   └─ Retry delay: {}ms", config.retry_delay.as_millis());

    let store = Arc::new(SqliteObservationStore::open(&config.db_path)?);
    let factory = Arc::new(SourceRegistry::with_defaults());
    let registry = MonitorRegistry::new(store, factory, config.retry_policy());

    let report = registry.load_all().await?;
    info!(
        "✅ Recovered {} subscriptions ({} running)",
        report.loaded, report.resumed
    );
    for (domain, keyword, err) in &report.failed {
        error!("❌ Skipped {}/{}: {}", domain, keyword, err);
    }

    info!("🔄 Press CTRL+C to shutdown gracefully");
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("⚠️  Received CTRL+C, shutting down..."),
        Err(err) => error!("❌ Failed to listen for CTRL+C: {}", err),
    }

    // Join every poll loop so no fetch or persist happens after this point
    registry.stop_all().await;

    info!("✅ Monitor runtime stopped");
    Ok(())
}
