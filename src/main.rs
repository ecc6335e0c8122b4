//! One-shot runner: the manual stand-in for the external scheduling trigger.
//! Loads entity config, runs the pipeline once per entity against an
//! in-memory store, and prints each report as JSON.

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use review_radar::analyze::{client_from_env, Enricher};
use review_radar::ingest::config::load_entities_default;
use review_radar::{AdapterRegistry, MemoryStore};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let entities = load_entities_default()?;
    if entities.is_empty() {
        tracing::warn!("no entities configured; see config/entities.toml");
        return Ok(());
    }

    let registry = AdapterRegistry::with_builtin_adapters();
    let enricher = Enricher::new(client_from_env());
    let store = MemoryStore::new();

    for entity in &entities {
        let summary =
            review_radar::run_for_entity(&store, &registry, &enricher, entity).await?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(())
}
