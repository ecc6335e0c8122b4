// src/analyze/enrich.rs
//! AI enrichment: prompt assembly, the Moonshot (Kimi) chat client, lenient
//! structured-output parsing, and the degrade chain down to the statistical
//! fallback. No error ever crosses this boundary; callers always get a
//! tagged [`Analysis`] and branch on the tag.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::analyze::{
    consistency, fallback, AnalysisReport, CrossSourceReport, Risk, Severity, SourceInsight,
};
use crate::content::{truncate_chars, Content, Platform};
use crate::sentiment::SentimentLabel;

const KIMI_API_URL: &str = "https://api.moonshot.cn/v1/chat/completions";
const DEFAULT_MODEL: &str = "moonshot-v1-8k";
const SYSTEM_PROMPT: &str = "You are a senior game community analyst. You extract key findings \
from player feedback, flag risks early, and give practical advice. Be objective: weigh praise \
and criticism alike. Reply with exactly the JSON object the user asks for, no surrounding prose.";

/// Excerpt cap for sampled reviews inside the prompt.
const EXCERPT_CHARS: usize = 200;
const FAVORABLE_SAMPLES: usize = 3;
const UNFAVORABLE_SAMPLES: usize = 2;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("radar_enrich_calls_total", "AI enrichment calls attempted.");
        describe_counter!(
            "radar_enrich_fallback_total",
            "Enrichments that degraded to the statistical fallback."
        );
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    Comprehensive,
    Sentiment,
    Risk,
    Compare,
}

/// Tagged enrichment outcome. `Fallback` means the batch was analyzed
/// statistically because the AI call was unavailable or failed.
#[derive(Debug, Clone)]
pub enum Analysis {
    Enriched(AnalysisReport),
    Fallback(AnalysisReport),
}

impl Analysis {
    pub fn report(&self) -> &AnalysisReport {
        match self {
            Analysis::Enriched(r) | Analysis::Fallback(r) => r,
        }
    }

    pub fn into_report(self) -> AnalysisReport {
        match self {
            Analysis::Enriched(r) | Analysis::Fallback(r) => r,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Analysis::Fallback(_))
    }
}

/// Generative endpoint abstraction: one system instruction plus one user
/// prompt in, free text out. `Err` covers both transport and non-2xx
/// failures; an unavailable client (no credential) reports itself via
/// [`AiClient::available`] and is never called.
#[async_trait]
pub trait AiClient: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
    fn available(&self) -> bool {
        true
    }
    fn name(&self) -> &'static str;
}

/// Moonshot (Kimi) chat-completions client.
pub struct KimiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl KimiClient {
    pub fn new(api_key: String, model_override: Option<&str>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("review-radar/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key,
            model: model_override.unwrap_or(DEFAULT_MODEL).to_string(),
        }
    }
}

#[async_trait]
impl AiClient for KimiClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: system,
                },
                Msg {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.3,
            max_tokens: 2000,
        };

        let resp = self
            .http
            .post(KIMI_API_URL)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("kimi http post()")?;
        if !resp.status().is_success() {
            bail!("kimi api returned {}", resp.status());
        }
        let body: Resp = resp.json().await.context("kimi response json()")?;
        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        if content.is_empty() {
            bail!("kimi response had no choices");
        }
        Ok(content)
    }

    fn name(&self) -> &'static str {
        "kimi"
    }
}

/// Stands in when no credential is configured. Never called; `available`
/// routes straight to the fallback.
pub struct DisabledClient;

#[async_trait]
impl AiClient for DisabledClient {
    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String> {
        bail!("ai client disabled")
    }

    fn available(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Build a client from the environment: `KIMI_API_KEY` present → real
/// client (`KIMI_MODEL` optional), absent → disabled. A missing credential
/// is a configuration absence, not an error.
pub fn client_from_env() -> Arc<dyn AiClient> {
    match std::env::var("KIMI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => {
            let model = std::env::var("KIMI_MODEL").ok();
            Arc::new(KimiClient::new(key, model.as_deref()))
        }
        _ => {
            tracing::info!("KIMI_API_KEY not set, enrichment will use the statistical fallback");
            Arc::new(DisabledClient)
        }
    }
}

pub struct Enricher {
    client: Arc<dyn AiClient>,
}

impl Enricher {
    pub fn new(client: Arc<dyn AiClient>) -> Self {
        Self { client }
    }

    /// Enrich one batch. Degrade chain: unavailable/failed call → fallback
    /// (tagged); unparseable response → minimal report (still enriched —
    /// the call itself succeeded).
    pub async fn enrich(&self, contents: &[Content], kind: AnalysisKind) -> Analysis {
        debug_assert!(!contents.is_empty(), "enrich invoked on empty batch");
        ensure_metrics_described();

        if !self.client.available() {
            counter!("radar_enrich_fallback_total").increment(1);
            return Analysis::Fallback(fallback::analyze(contents));
        }

        counter!("radar_enrich_calls_total").increment(1);
        let prompt = build_prompt(contents, kind);
        match self.client.complete(SYSTEM_PROMPT, &prompt).await {
            Ok(text) => Analysis::Enriched(parse_response(&text)),
            Err(e) => {
                tracing::warn!(provider = self.client.name(), error = ?e, "ai call failed, using fallback");
                counter!("radar_enrich_fallback_total").increment(1);
                Analysis::Fallback(fallback::analyze(contents))
            }
        }
    }

    /// Per-source sentiment runs (zero-content sources skipped), one
    /// comprehensive run over the union, consistency folded across the
    /// per-source sentiment labels.
    pub async fn cross_source_report(
        &self,
        by_source: &BTreeMap<Platform, Vec<Content>>,
    ) -> CrossSourceReport {
        let mut per_source = BTreeMap::new();
        for (platform, contents) in by_source {
            if contents.is_empty() {
                continue;
            }
            let analysis = self.enrich(contents, AnalysisKind::Sentiment).await;
            per_source.insert(*platform, analysis.into_report());
        }

        let all: Vec<Content> = by_source.values().flatten().cloned().collect();
        let comprehensive = self
            .enrich(&all, AnalysisKind::Comprehensive)
            .await
            .into_report();

        let labels: Vec<SentimentLabel> = per_source.values().map(|r| r.sentiment).collect();
        CrossSourceReport {
            comprehensive,
            source_count: per_source.len(),
            per_source,
            total_contents: all.len(),
            consistency: consistency::consistency(&labels),
        }
    }
}

// ------------------------------------------------------------
// Prompt assembly
// ------------------------------------------------------------

struct SourceStats {
    count: usize,
    favorable: usize,
    unfavorable: usize,
}

fn per_source_stats(contents: &[Content]) -> BTreeMap<Platform, SourceStats> {
    let mut stats: BTreeMap<Platform, SourceStats> = BTreeMap::new();
    for c in contents {
        let s = stats.entry(c.platform).or_insert(SourceStats {
            count: 0,
            favorable: 0,
            unfavorable: 0,
        });
        s.count += 1;
        if c.is_favorable() {
            s.favorable += 1;
        } else {
            s.unfavorable += 1;
        }
    }
    stats
}

/// Representative excerpts: up to 3 favorable and 2 unfavorable per source,
/// each hard-capped at 200 chars.
fn sample_lines(contents: &[Content]) -> Vec<String> {
    let stats = per_source_stats(contents);
    let mut lines = Vec::new();
    for platform in stats.keys() {
        lines.push(format!("[{}]", platform.as_str().to_uppercase()));
        let favorable = contents
            .iter()
            .filter(|c| c.platform == *platform && c.is_favorable())
            .take(FAVORABLE_SAMPLES);
        let unfavorable = contents
            .iter()
            .filter(|c| c.platform == *platform && !c.is_favorable())
            .take(UNFAVORABLE_SAMPLES);
        for c in favorable.chain(unfavorable) {
            let mark = if c.is_favorable() { "+" } else { "-" };
            lines.push(format!("({mark}) {}", truncate_chars(&c.text, EXCERPT_CHARS)));
        }
    }
    lines
}

fn build_prompt(contents: &[Content], kind: AnalysisKind) -> String {
    let stats = per_source_stats(contents);
    let samples = sample_lines(contents);

    let mut overview = String::new();
    let _ = writeln!(overview, "Total items: {}", contents.len());
    for (platform, s) in &stats {
        let _ = writeln!(
            overview,
            "- {}: {} items ({} favorable, {} unfavorable)",
            platform, s.count, s.favorable, s.unfavorable
        );
    }

    match kind {
        AnalysisKind::Comprehensive => format!(
            "Analyze the following multi-source player feedback about one game.\n\n\
             [OVERVIEW]\n{overview}\n[SAMPLES]\n{}\n\n\
             Return a JSON object with this exact shape:\n\
             {{\n  \"overall\": \"overall verdict, 50 words max\",\n  \
             \"sentiment\": \"positive|neutral|negative\",\n  \
             \"score\": 0-100,\n  \
             \"platforms\": {{ \"<source>\": {{ \"sentiment\": \"short characterization\", \"key_issues\": [\"...\"] }} }},\n  \
             \"common_praises\": [\"...\"],\n  \"common_complaints\": [\"...\"],\n  \
             \"risks\": [{{\"type\": \"...\", \"description\": \"...\", \"severity\": \"low|medium|high|critical\"}}],\n  \
             \"suggestions\": [\"...\"]\n}}",
            samples.join("\n")
        ),
        AnalysisKind::Sentiment => format!(
            "Classify the sentiment of the following player feedback.\n\n{}\n\n\
             Return JSON: {{\"sentiment\": \"positive|neutral|negative\", \"score\": 0-100, \
             \"keywords\": [\"...\"]}}",
            samples
                .iter()
                .take(10)
                .cloned()
                .collect::<Vec<_>>()
                .join("\n")
        ),
        AnalysisKind::Risk => format!(
            "Identify risk signals in the following player feedback.\n\n{}\n\n\
             Return JSON: {{\"sentiment\": \"positive|neutral|negative\", \"score\": 0-100, \
             \"risks\": [{{\"type\": \"...\", \"description\": \"...\", \
             \"severity\": \"low|medium|high|critical\"}}], \"suggestions\": [\"...\"]}}",
            samples
                .iter()
                .take(15)
                .cloned()
                .collect::<Vec<_>>()
                .join("\n")
        ),
        AnalysisKind::Compare => format!(
            "Compare how the sources differ in their reception of this game and why.\n\n\
             [OVERVIEW]\n{overview}\n[SAMPLES]\n{}\n\n\
             Return a JSON object with \"overall\", \"sentiment\", \"score\" and a \
             \"platforms\" object keyed by source with {{\"sentiment\", \"key_issues\"}}.",
            samples.join("\n")
        ),
    }
}

// ------------------------------------------------------------
// Response parsing (lenient by design)
// ------------------------------------------------------------

/// First balanced `{...}` block in `text`, honoring JSON string literals.
fn extract_json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse a model response into a report. Any shortfall degrades to the
/// minimal shape, never to an error.
fn parse_response(text: &str) -> AnalysisReport {
    let Some(block) = extract_json_block(text) else {
        return AnalysisReport::minimal_from_raw(text);
    };
    let Ok(v) = serde_json::from_str::<serde_json::Value>(block) else {
        return AnalysisReport::minimal_from_raw(text);
    };

    let overall = v["overall"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| truncate_chars(text, 100));
    let sentiment = v["sentiment"]
        .as_str()
        .map(parse_sentiment)
        .unwrap_or(SentimentLabel::Neutral);
    let score = lenient_score(&v["score"]).unwrap_or(50);

    let mut per_source = BTreeMap::new();
    if let Some(platforms) = v["platforms"].as_object() {
        for (name, entry) in platforms {
            per_source.insert(
                name.clone(),
                SourceInsight {
                    sentiment: entry["sentiment"].as_str().unwrap_or_default().to_string(),
                    key_issues: string_list(&entry["key_issues"]),
                },
            );
        }
    }

    let risks = v["risks"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|r| {
                    // plain-string risks appear in sloppier model output
                    if let Some(s) = r.as_str() {
                        return Some(Risk {
                            kind: "general".to_string(),
                            description: s.to_string(),
                            severity: Severity::Medium,
                        });
                    }
                    let description = r["description"].as_str()?.to_string();
                    Some(Risk {
                        kind: r["type"].as_str().unwrap_or("general").to_string(),
                        description,
                        severity: Severity::parse_lenient(
                            r["severity"].as_str().unwrap_or_default(),
                        ),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    AnalysisReport {
        overall,
        sentiment,
        score,
        per_source,
        common_praises: string_list(&v["common_praises"]),
        common_complaints: string_list(&v["common_complaints"]),
        risks,
        suggestions: string_list(&v["suggestions"]),
        keywords: string_list(&v["keywords"]),
        raw: None,
        is_fallback: false,
    }
}

fn parse_sentiment(s: &str) -> SentimentLabel {
    match s.to_ascii_lowercase().as_str() {
        "positive" => SentimentLabel::Positive,
        "negative" => SentimentLabel::Negative,
        _ => SentimentLabel::Neutral,
    }
}

/// Models return the score as a number or a string; accept both.
fn lenient_score(v: &serde_json::Value) -> Option<u8> {
    let n = v
        .as_f64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse::<f64>().ok()))?;
    Some(n.round().clamp(0.0, 100.0) as u8)
}

fn string_list(v: &serde_json::Value) -> Vec<String> {
    v.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|x| x.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
