// tests/enrich_fallback.rs
//! The degrade chain: AI call → parse → statistical fallback. Callers always
//! receive a tagged result and branch on the tag, never on a caught error.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;

use review_radar::analyze::enrich::DisabledClient;
use review_radar::analyze::{AiClient, AnalysisKind, Consistency, Enricher};
use review_radar::sentiment::SentimentLabel;
use review_radar::{Content, Platform};

fn item(platform: Platform, rating: f64, text: &str) -> Content {
    Content {
        platform,
        content_id: format!("{platform}-{text}"),
        author: "t".into(),
        text: text.into(),
        rating,
        likes: 0,
        replies: 0,
        posted_at: Utc::now(),
        metadata: Default::default(),
    }
}

fn batch(platform: Platform, favorable: usize, unfavorable: usize) -> Vec<Content> {
    let mut out: Vec<Content> = (0..favorable)
        .map(|i| item(platform, 1.0, &format!("好评{i}")))
        .collect();
    out.extend((0..unfavorable).map(|i| item(platform, 0.0, &format!("差评{i}"))));
    out
}

/// Answers with a fixed body and counts invocations.
struct CannedClient {
    body: String,
    calls: AtomicUsize,
}

impl CannedClient {
    fn new(body: &str) -> Self {
        Self {
            body: body.to_string(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl AiClient for CannedClient {
    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.body.clone())
    }
    fn name(&self) -> &'static str {
        "canned"
    }
}

/// Fails every call, as a dead endpoint would.
struct BrokenClient;

#[async_trait]
impl AiClient for BrokenClient {
    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String> {
        bail!("503 service unavailable")
    }
    fn name(&self) -> &'static str {
        "broken"
    }
}

/// Sentiment keyed off the source tag present in the prompt; lets one test
/// drive different per-source labels through the cross-source fold.
struct KeyedClient {
    by_tag: Vec<(&'static str, &'static str)>,
}

#[async_trait]
impl AiClient for KeyedClient {
    async fn complete(&self, _system: &str, prompt: &str) -> Result<String> {
        for (tag, sentiment) in &self.by_tag {
            if prompt.contains(tag) {
                return Ok(format!("{{\"sentiment\": \"{sentiment}\", \"score\": 50}}"));
            }
        }
        Ok("{\"sentiment\": \"neutral\", \"score\": 50}".to_string())
    }
    fn name(&self) -> &'static str {
        "keyed"
    }
}

#[tokio::test]
async fn missing_credential_degrades_to_tagged_fallback() {
    let enricher = Enricher::new(std::sync::Arc::new(DisabledClient));
    let analysis = enricher
        .enrich(&batch(Platform::Steam, 7, 3), AnalysisKind::Comprehensive)
        .await;
    assert!(analysis.is_fallback());
    let report = analysis.report();
    assert!(report.is_fallback);
    assert_eq!(report.score, 70);
    assert_eq!(report.sentiment, SentimentLabel::Positive);
}

#[tokio::test]
async fn call_failure_degrades_to_tagged_fallback() {
    let enricher = Enricher::new(std::sync::Arc::new(BrokenClient));
    let analysis = enricher
        .enrich(&batch(Platform::Steam, 1, 9), AnalysisKind::Sentiment)
        .await;
    assert!(analysis.is_fallback());
    assert_eq!(analysis.report().score, 10);
    assert_eq!(analysis.report().sentiment, SentimentLabel::Negative);
}

#[tokio::test]
async fn successful_call_with_clean_json_is_enriched() {
    let client = std::sync::Arc::new(CannedClient::new(
        r#"Here you go: {"overall": "Loved", "sentiment": "positive", "score": 88,
            "common_praises": ["画面"]}"#,
    ));
    let enricher = Enricher::new(client.clone());
    let analysis = enricher
        .enrich(&batch(Platform::Steam, 3, 0), AnalysisKind::Comprehensive)
        .await;
    assert!(!analysis.is_fallback());
    let report = analysis.report();
    assert!(!report.is_fallback);
    assert_eq!(report.score, 88);
    assert_eq!(report.common_praises, vec!["画面"]);
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unstructured_response_degrades_to_minimal_report_not_error() {
    let enricher = Enricher::new(std::sync::Arc::new(CannedClient::new(
        "The players seem broadly happy with the game.",
    )));
    let analysis = enricher
        .enrich(&batch(Platform::Steam, 2, 1), AnalysisKind::Comprehensive)
        .await;
    // The call succeeded, so this is still the enriched path.
    assert!(!analysis.is_fallback());
    let report = analysis.report();
    assert_eq!(report.sentiment, SentimentLabel::Neutral);
    assert_eq!(report.score, 50);
    assert!(report.raw.as_deref().unwrap().contains("broadly happy"));
}

#[tokio::test]
async fn cross_source_report_skips_empty_sources_and_folds_consistency() {
    let client = std::sync::Arc::new(KeyedClient {
        by_tag: vec![("[STEAM]", "positive"), ("[BILIBILI]", "negative")],
    });
    let enricher = Enricher::new(client);

    let mut by_source = BTreeMap::new();
    by_source.insert(Platform::Steam, batch(Platform::Steam, 3, 0));
    by_source.insert(Platform::Bilibili, batch(Platform::Bilibili, 0, 3));
    by_source.insert(Platform::Xiaoheihe, Vec::new());

    let report = enricher.cross_source_report(&by_source).await;
    assert_eq!(report.source_count, 2);
    assert!(!report.per_source.contains_key(&Platform::Xiaoheihe));
    assert_eq!(report.total_contents, 6);
    // positive + negative across sources → low agreement
    assert_eq!(report.consistency, Consistency::Low);
}

#[tokio::test]
async fn agreeing_sources_fold_to_high_consistency() {
    let client = std::sync::Arc::new(KeyedClient {
        by_tag: vec![("[STEAM]", "positive"), ("[BILIBILI]", "positive")],
    });
    let enricher = Enricher::new(client);

    let mut by_source = BTreeMap::new();
    by_source.insert(Platform::Steam, batch(Platform::Steam, 3, 0));
    by_source.insert(Platform::Bilibili, batch(Platform::Bilibili, 3, 0));
    let report = enricher.cross_source_report(&by_source).await;
    assert_eq!(report.consistency, Consistency::High);
}

#[tokio::test]
async fn neutral_plus_one_polarity_folds_to_medium() {
    let client = std::sync::Arc::new(KeyedClient {
        by_tag: vec![("[STEAM]", "neutral"), ("[BILIBILI]", "positive")],
    });
    let enricher = Enricher::new(client);

    let mut by_source = BTreeMap::new();
    by_source.insert(Platform::Steam, batch(Platform::Steam, 2, 1));
    by_source.insert(Platform::Bilibili, batch(Platform::Bilibili, 3, 0));
    let report = enricher.cross_source_report(&by_source).await;
    assert_eq!(report.consistency, Consistency::Medium);
}
