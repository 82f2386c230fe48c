// ABOUTME: Entry point for the simfeed engine binary.
// ABOUTME: Loads configuration, opens the store, and triggers agent batches on a fixed interval.

mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use simfeed_agent::{DeepSeekClient, Orchestrator, Registry};
use simfeed_store::SocialStore;

use crate::config::EngineConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "simfeed=info".parse().expect("static filter parses")),
        )
        .init();

    let config = EngineConfig::from_env().context("loading configuration")?;
    tracing::info!(
        db = %config.db_path.display(),
        turn_limit = config.turn_limit,
        interval_secs = config.batch_interval_secs,
        "simfeed engine starting up"
    );

    let store = SocialStore::open(&config.db_path).context("opening store")?;
    let registry = Registry::new().context("building tool registry")?;
    let model = Arc::new(DeepSeekClient::from_env().context("configuring model client")?);

    let orchestrator = Orchestrator::new(store, registry, model, config.turn_limit);

    let mut interval = tokio::time::interval(Duration::from_secs(config.batch_interval_secs));
    // The first tick fires immediately, so the first batch runs at startup.
    loop {
        interval.tick().await;
        if let Err(e) = orchestrator.run_batch().await {
            tracing::error!(error = %e, "batch failed");
        }
    }
}
