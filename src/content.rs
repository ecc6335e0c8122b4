// src/content.rs
//! Canonical content model shared by every source adapter. Providers map
//! their wire formats into [`Content`] so everything downstream (sentiment,
//! enrichment, storage) works on one shape.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Review bodies are capped at this many chars after normalization.
pub const MAX_TEXT_CHARS: usize = 1000;

/// Feedback platforms the pipeline knows about. Taptap and Zhihu are
/// reserved names with no live adapter yet.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Steam,
    Xiaoheihe,
    Bilibili,
    Taptap,
    Zhihu,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Steam => "steam",
            Platform::Xiaoheihe => "xiaoheihe",
            Platform::Bilibili => "bilibili",
            Platform::Taptap => "taptap",
            Platform::Zhihu => "zhihu",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "steam" => Ok(Platform::Steam),
            "xiaoheihe" => Ok(Platform::Xiaoheihe),
            "bilibili" => Ok(Platform::Bilibili),
            "taptap" => Ok(Platform::Taptap),
            "zhihu" => Ok(Platform::Zhihu),
            other => Err(anyhow::anyhow!("unknown platform: {other}")),
        }
    }
}

/// One normalized piece of player feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub platform: Platform,
    /// Stable id within the platform; upserts dedupe on (platform, id).
    pub content_id: String,
    pub author: String,
    /// Normalized body, at most [`MAX_TEXT_CHARS`] chars.
    pub text: String,
    /// Normalized rating in [0, 1]. Binary sources map to 0.0 / 1.0.
    pub rating: f64,
    pub likes: u64,
    pub replies: u64,
    pub posted_at: chrono::DateTime<chrono::Utc>,
    /// Provider extras that survive normalization (avatars, playtime, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Content {
    /// Ratings at or above this count as favorable.
    pub const FAVORABLE_THRESHOLD: f64 = 0.5;

    pub fn is_favorable(&self) -> bool {
        self.rating >= Self::FAVORABLE_THRESHOLD
    }
}

/// One source entry under an entity: which platform, whether it runs, and
/// its provider-specific parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(rename = "type")]
    pub source: Platform,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub config: BTreeMap<String, serde_json::Value>,
}

impl SourceConfig {
    /// Fetch one config parameter as a string. Integers in TOML or JSON
    /// ("appid = 2358720") come back rendered, so callers never care which
    /// scalar type the file used.
    pub fn param_str(&self, key: &str) -> Option<String> {
        match self.config.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// One tracked game and the sources to pull feedback from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityConfig {
    pub id: String,
    pub name: String,
    #[serde(rename = "source", default)]
    pub sources: Vec<SourceConfig>,
}

/// Truncate to at most `max` chars without splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
