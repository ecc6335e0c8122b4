// src/ingest/mod.rs
pub mod config;
pub mod providers;
pub mod registry;
pub mod types;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;

use crate::content::{truncate_chars, SourceConfig, MAX_TEXT_CHARS};
use crate::ingest::registry::AdapterRegistry;
use crate::ingest::types::{AggregateOutcome, SourceFetch};

/// One-time metrics registration (so series show up on an exporter).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("radar_contents_fetched_total", "Contents fetched across all sources.");
        describe_counter!("radar_source_errors_total", "Per-source fetch failures (captured).");
        describe_counter!("radar_runs_total", "Aggregation runs started.");
        describe_histogram!("radar_fetch_ms", "Wall time of one full fan-out in milliseconds.");
        describe_gauge!("radar_last_run_ts", "Unix ts when the aggregator last ran.");
    });
}

/// Normalize provider text before the canonical cap: decode HTML entities,
/// strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}

/// Full normalization for review bodies: [`normalize_text`] plus the
/// canonical 1000-char cap. Applied after any provider-specific slicing.
pub fn normalize_content_text(s: &str) -> String {
    truncate_chars(&normalize_text(s), MAX_TEXT_CHARS)
}

/// Dispatch one fetch per enabled source concurrently and wait for all of
/// them to settle. A raised error is captured as a failed [`SourceFetch`];
/// one bad source never aborts its siblings, and there is no early exit.
pub async fn aggregate(registry: &AdapterRegistry, sources: &[SourceConfig]) -> AggregateOutcome {
    ensure_metrics_described();
    counter!("radar_runs_total").increment(1);
    let t0 = std::time::Instant::now();

    // Handles are keyed by platform so even a panicked dispatch can be
    // reported as a failed outcome for its source.
    let mut handles = Vec::new();
    for src in sources.iter().filter(|s| s.enabled) {
        let platform = src.source;
        let Some(adapter) = registry.get_enabled(platform) else {
            tracing::warn!(source = %platform, "skipping unknown or disabled source");
            continue;
        };
        let cfg = src.clone();
        let handle = tokio::spawn(async move {
            match adapter.fetch(&cfg).await {
                Ok(contents) => SourceFetch::ok(platform, contents),
                Err(e) => {
                    tracing::warn!(source = %platform, error = ?e, "source fetch failed");
                    counter!("radar_source_errors_total").increment(1);
                    SourceFetch::failed(platform, e.to_string())
                }
            }
        });
        handles.push((platform, handle));
    }

    let mut out = AggregateOutcome::default();
    for (platform, handle) in handles {
        let fetch = match handle.await {
            Ok(f) => f,
            // A panicked dispatch is captured like any other source failure.
            Err(e) => {
                tracing::error!(source = %platform, error = ?e, "source dispatch panicked");
                counter!("radar_source_errors_total").increment(1);
                SourceFetch::failed(platform, format!("source dispatch panicked: {e}"))
            }
        };
        counter!("radar_contents_fetched_total").increment(fetch.contents.len() as u64);
        out.by_source
            .entry(fetch.platform)
            .or_default()
            .extend(fetch.contents.iter().cloned());
        out.all.extend(fetch.contents.iter().cloned());
        out.outcomes.push(fetch);
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    metrics::histogram!("radar_fetch_ms").record(ms);
    gauge!("radar_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);

    tracing::info!(
        sources = out.outcomes.len(),
        failed = out.outcomes.iter().filter(|o| !o.success).count(),
        total = out.all.len(),
        "aggregation settled"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_strips_tags_and_entities() {
        let s = "  <b>Hello&nbsp;&nbsp;world</b>  ";
        assert_eq!(normalize_text(s), "Hello world");
    }

    #[test]
    fn content_text_is_capped_at_1000_chars() {
        let long = "好".repeat(1200);
        let out = normalize_content_text(&long);
        assert_eq!(out.chars().count(), 1000);
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize_content_text("<i>画面&amp;优化</i> 都不错   ");
        let twice = normalize_content_text(&once);
        assert_eq!(once, twice);
    }
}
