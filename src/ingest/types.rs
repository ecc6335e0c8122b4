// src/ingest/types.rs
use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::content::{Content, Platform, SourceConfig};

/// One external platform adapter. Implementations fetch the provider's raw
/// payload and normalize it into canonical [`Content`] records; they are the
/// only place that absorbs provider-shape variance.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn fetch(&self, config: &SourceConfig) -> Result<Vec<Content>>;
    fn platform(&self) -> Platform;
    /// Adapters for reserved platforms report `false` and are excluded from
    /// dispatch.
    fn enabled(&self) -> bool {
        true
    }
}

/// Settled outcome of one source dispatch. A failed fetch is captured here,
/// never propagated past the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFetch {
    pub platform: Platform,
    pub contents: Vec<Content>,
    pub success: bool,
    pub error: Option<String>,
}

impl SourceFetch {
    pub fn ok(platform: Platform, contents: Vec<Content>) -> Self {
        Self {
            platform,
            contents,
            success: true,
            error: None,
        }
    }

    pub fn failed(platform: Platform, error: String) -> Self {
        Self {
            platform,
            contents: Vec::new(),
            success: false,
            error: Some(error),
        }
    }
}

/// Merged result of one aggregation run: per-source batches, the flattened
/// union, and the raw outcomes (the latter feed user-facing status only).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregateOutcome {
    pub by_source: BTreeMap<Platform, Vec<Content>>,
    pub all: Vec<Content>,
    pub outcomes: Vec<SourceFetch>,
}

impl AggregateOutcome {
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}
