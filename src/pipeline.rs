// src/pipeline.rs
//! End-to-end run for one tracked entity: fan out to sources, persist
//! annotated content, enrich (or skip on an empty union), persist the
//! report, trim retention. The external scheduler calls this once per
//! entity per cadence; the core never self-schedules.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::analyze::Enricher;
use crate::content::EntityConfig;
use crate::ingest::registry::AdapterRegistry;
use crate::ingest::types::SourceFetch;
use crate::sentiment::annotate;
use crate::store::{DocumentStore, StoredReport, REPORT_RETENTION};

/// What the caller gets back: the stored report plus the per-source
/// success/failure breakdown. Delivered best-effort even when every source
/// failed; only store unavailability is a hard error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub report: StoredReport,
    pub sources_ok: usize,
    pub sources_failed: usize,
}

pub async fn run_for_entity(
    store: &dyn DocumentStore,
    registry: &AdapterRegistry,
    enricher: &Enricher,
    entity: &EntityConfig,
) -> Result<RunSummary> {
    tracing::info!(entity = %entity.id, sources = entity.sources.len(), "starting run");

    // 1) Fan out; failures are captured inside the outcome, never raised.
    let aggregate = crate::ingest::aggregate(registry, &entity.sources).await;

    // 2) Persist annotated content under (platform, content_id).
    let annotated: Vec<_> = aggregate.all.iter().cloned().map(annotate).collect();
    store
        .upsert_contents(&entity.id, &annotated)
        .await
        .context("upserting contents")?;

    // 3) Enrichment is skipped entirely on an empty union; neither the AI
    //    endpoint nor the fallback may see an empty batch.
    let report = if aggregate.is_empty() {
        tracing::info!(entity = %entity.id, "no content fetched, skipping enrichment");
        None
    } else {
        Some(enricher.cross_source_report(&aggregate.by_source).await)
    };

    let stored = StoredReport {
        id: uuid::Uuid::new_v4().to_string(),
        entity_id: entity.id.clone(),
        entity_name: entity.name.clone(),
        created_at: Utc::now(),
        total_contents: aggregate.all.len(),
        by_source_counts: aggregate
            .by_source
            .iter()
            .map(|(p, v)| (*p, v.len()))
            .collect(),
        report,
        fetch_outcomes: aggregate.outcomes.clone(),
    };

    // 4) Persist and trim retention to the newest N.
    store
        .insert_report(stored.clone())
        .await
        .context("inserting report")?;
    trim_reports(store, &entity.id).await?;

    let (ok, failed) = count_outcomes(&aggregate.outcomes);
    tracing::info!(
        entity = %entity.id,
        contents = stored.total_contents,
        sources_ok = ok,
        sources_failed = failed,
        fallback = stored
            .report
            .as_ref()
            .map(|r| r.comprehensive.is_fallback)
            .unwrap_or(false),
        "run finished"
    );

    Ok(RunSummary {
        report: stored,
        sources_ok: ok,
        sources_failed: failed,
    })
}

/// Keep only the newest [`REPORT_RETENTION`] reports for one entity.
pub async fn trim_reports(store: &dyn DocumentStore, entity_id: &str) -> Result<()> {
    let reports = store
        .reports_for(entity_id)
        .await
        .context("listing reports for retention")?;
    if reports.len() <= REPORT_RETENTION {
        return Ok(());
    }
    let stale: Vec<String> = reports
        .iter()
        .skip(REPORT_RETENTION)
        .map(|r| r.id.clone())
        .collect();
    tracing::debug!(entity = entity_id, trimmed = stale.len(), "trimming old reports");
    store
        .delete_reports(&stale)
        .await
        .context("deleting stale reports")
}

fn count_outcomes(outcomes: &[SourceFetch]) -> (usize, usize) {
    let ok = outcomes.iter().filter(|o| o.success).count();
    (ok, outcomes.len() - ok)
}
