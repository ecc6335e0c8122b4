// src/analyze/mod.rs
//! Report types shared by the enrichment service and the fallback analyzer.

pub mod consistency;
pub mod enrich;
pub mod fallback;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::content::{truncate_chars, Platform};
use crate::sentiment::SentimentLabel;

pub use consistency::Consistency;
pub use enrich::{
    client_from_env, AiClient, Analysis, AnalysisKind, DisabledClient, Enricher, KimiClient,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn parse_lenient(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "low" => Severity::Low,
            "high" => Severity::High,
            "critical" => Severity::Critical,
            _ => Severity::Medium,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub severity: Severity,
}

/// Per-source slice of a report. `sentiment` is the model's free-text
/// characterization, not the canonical label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceInsight {
    pub sentiment: String,
    pub key_issues: Vec<String>,
}

/// Terminal analysis artifact of one run. Immutable once created; the next
/// run supersedes it rather than mutating it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Short overall verdict (≈50 tokens).
    pub overall: String,
    pub sentiment: SentimentLabel,
    /// 0–100.
    pub score: u8,
    #[serde(default)]
    pub per_source: BTreeMap<String, SourceInsight>,
    #[serde(default)]
    pub common_praises: Vec<String>,
    #[serde(default)]
    pub common_complaints: Vec<String>,
    #[serde(default)]
    pub risks: Vec<Risk>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Raw model text, kept only when structured parsing degraded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    /// Distinguishes statistically derived reports from AI-derived ones.
    pub is_fallback: bool,
}

impl AnalysisReport {
    /// Minimal valid shape wrapped around an unparseable model response.
    pub fn minimal_from_raw(raw: &str) -> Self {
        Self {
            overall: truncate_chars(raw, 100),
            sentiment: SentimentLabel::Neutral,
            score: 50,
            per_source: BTreeMap::new(),
            common_praises: Vec::new(),
            common_complaints: Vec::new(),
            risks: Vec::new(),
            suggestions: Vec::new(),
            keywords: Vec::new(),
            raw: Some(raw.to_string()),
            is_fallback: false,
        }
    }
}

/// The cross-source artifact: one comprehensive report, one per-source
/// sentiment report each, and the agreement signal folded across them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossSourceReport {
    pub comprehensive: AnalysisReport,
    pub per_source: BTreeMap<Platform, AnalysisReport>,
    pub total_contents: usize,
    pub source_count: usize,
    pub consistency: Consistency,
}
