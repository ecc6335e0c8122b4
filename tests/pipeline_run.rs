// tests/pipeline_run.rs
//! End-to-end run against the in-memory store: persistence, the empty-batch
//! guard, and the best-effort contract when sources fail.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;

use review_radar::analyze::{AiClient, Enricher};
use review_radar::{
    run_for_entity, AdapterRegistry, Content, DocumentStore, EntityConfig, MemoryStore, Platform,
    SourceAdapter, SourceConfig,
};

struct FixedAdapter {
    platform: Platform,
    texts: Vec<(&'static str, f64)>,
}

#[async_trait]
impl SourceAdapter for FixedAdapter {
    async fn fetch(&self, _config: &SourceConfig) -> Result<Vec<Content>> {
        Ok(self
            .texts
            .iter()
            .enumerate()
            .map(|(i, (text, rating))| Content {
                platform: self.platform,
                content_id: format!("c{i}"),
                author: "a".into(),
                text: (*text).into(),
                rating: *rating,
                likes: 0,
                replies: 0,
                posted_at: Utc::now(),
                metadata: Default::default(),
            })
            .collect())
    }
    fn platform(&self) -> Platform {
        self.platform
    }
}

struct EmptyAdapter(Platform);

#[async_trait]
impl SourceAdapter for EmptyAdapter {
    async fn fetch(&self, _config: &SourceConfig) -> Result<Vec<Content>> {
        Ok(Vec::new())
    }
    fn platform(&self) -> Platform {
        self.0
    }
}

struct FailingAdapter(Platform);

#[async_trait]
impl SourceAdapter for FailingAdapter {
    async fn fetch(&self, _config: &SourceConfig) -> Result<Vec<Content>> {
        bail!("dns failure")
    }
    fn platform(&self) -> Platform {
        self.0
    }
}

/// Counts completions; the empty-batch guard test asserts it stays at zero.
struct CountingClient {
    calls: AtomicUsize,
}

#[async_trait]
impl AiClient for CountingClient {
    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("{\"sentiment\": \"positive\", \"score\": 90}".to_string())
    }
    fn name(&self) -> &'static str {
        "counting"
    }
}

fn entity(sources: Vec<SourceConfig>) -> EntityConfig {
    EntityConfig {
        id: "wukong".into(),
        name: "Black Myth: Wukong".into(),
        sources,
    }
}

fn cfg(platform: Platform) -> SourceConfig {
    SourceConfig {
        source: platform,
        enabled: true,
        config: Default::default(),
    }
}

#[tokio::test]
async fn run_persists_annotated_contents_and_a_report() {
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(FixedAdapter {
        platform: Platform::Steam,
        texts: vec![("好玩，推荐", 1.0), ("优化垃圾", 0.0)],
    }));
    let client = Arc::new(CountingClient {
        calls: AtomicUsize::new(0),
    });
    let enricher = Enricher::new(client.clone());
    let store = MemoryStore::new();

    let summary = run_for_entity(&store, &registry, &enricher, &entity(vec![cfg(Platform::Steam)]))
        .await
        .unwrap();

    assert_eq!(summary.sources_ok, 1);
    assert_eq!(summary.sources_failed, 0);
    assert_eq!(summary.report.total_contents, 2);
    assert_eq!(store.content_count(), 2);

    let report = summary.report.report.as_ref().unwrap();
    assert_eq!(report.total_contents, 2);
    assert!(!report.comprehensive.is_fallback);
    // one sentiment call for steam + one comprehensive call
    assert_eq!(client.calls.load(Ordering::SeqCst), 2);

    let stored = store.reports_for("wukong").await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].by_source_counts[&Platform::Steam], 2);
}

#[tokio::test]
async fn empty_union_skips_enrichment_entirely() {
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(EmptyAdapter(Platform::Steam)));
    registry.register(Arc::new(EmptyAdapter(Platform::Bilibili)));
    let client = Arc::new(CountingClient {
        calls: AtomicUsize::new(0),
    });
    let enricher = Enricher::new(client.clone());
    let store = MemoryStore::new();

    let summary = run_for_entity(
        &store,
        &registry,
        &enricher,
        &entity(vec![cfg(Platform::Steam), cfg(Platform::Bilibili)]),
    )
    .await
    .unwrap();

    // Neither the AI endpoint nor the fallback sees an empty batch.
    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    assert!(summary.report.report.is_none());
    assert_eq!(summary.sources_ok, 2);
}

#[tokio::test]
async fn all_sources_failing_still_yields_a_stored_report() {
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(FailingAdapter(Platform::Steam)));
    registry.register(Arc::new(FailingAdapter(Platform::Xiaoheihe)));
    let client = Arc::new(CountingClient {
        calls: AtomicUsize::new(0),
    });
    let enricher = Enricher::new(client.clone());
    let store = MemoryStore::new();

    let summary = run_for_entity(
        &store,
        &registry,
        &enricher,
        &entity(vec![cfg(Platform::Steam), cfg(Platform::Xiaoheihe)]),
    )
    .await
    .unwrap();

    assert_eq!(summary.sources_failed, 2);
    assert!(summary.report.report.is_none());
    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    // The run itself is not an error; the stored report carries the outcome.
    let stored = store.reports_for("wukong").await.unwrap();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].fetch_outcomes.iter().all(|o| !o.success));
}
