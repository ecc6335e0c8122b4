// src/store.rs
//! Document-store boundary. The core treats the store as an opaque
//! key-addressable sink: upsert by key, time-sorted listing, bulk delete.
//! A real deployment plugs in a database-backed implementation; the
//! in-memory one here backs tests and the one-shot runner.

use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analyze::CrossSourceReport;
use crate::content::Platform;
use crate::ingest::types::SourceFetch;
use crate::sentiment::AnnotatedContent;

/// Reports kept per entity after retention trimming.
pub const REPORT_RETENTION: usize = 30;

/// Persisted artifact of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredReport {
    pub id: String,
    pub entity_id: String,
    pub entity_name: String,
    pub created_at: DateTime<Utc>,
    pub total_contents: usize,
    pub by_source_counts: BTreeMap<Platform, usize>,
    /// Absent when the run produced zero content across all sources.
    pub report: Option<CrossSourceReport>,
    /// Raw per-source outcomes, for user-facing status.
    pub fetch_outcomes: Vec<SourceFetch>,
}

#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Upsert by `(platform, content_id)`; re-fetched items update in place.
    async fn upsert_contents(&self, entity_id: &str, items: &[AnnotatedContent]) -> Result<()>;
    async fn insert_report(&self, report: StoredReport) -> Result<()>;
    /// Reports for one entity, newest first.
    async fn reports_for(&self, entity_id: &str) -> Result<Vec<StoredReport>>;
    async fn delete_reports(&self, ids: &[String]) -> Result<()>;
}

type ContentKey = (String, Platform, String);

/// In-memory store. Interior mutability keeps the trait object shareable
/// across tasks without handing out mutable references.
#[derive(Default)]
pub struct MemoryStore {
    contents: Mutex<BTreeMap<ContentKey, AnnotatedContent>>,
    reports: Mutex<Vec<StoredReport>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content_count(&self) -> usize {
        self.contents.lock().expect("store mutex poisoned").len()
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn upsert_contents(&self, entity_id: &str, items: &[AnnotatedContent]) -> Result<()> {
        let mut map = self.contents.lock().expect("store mutex poisoned");
        for item in items {
            let key = (
                entity_id.to_string(),
                item.content.platform,
                item.content.content_id.clone(),
            );
            map.insert(key, item.clone());
        }
        Ok(())
    }

    async fn insert_report(&self, report: StoredReport) -> Result<()> {
        self.reports
            .lock()
            .expect("store mutex poisoned")
            .push(report);
        Ok(())
    }

    async fn reports_for(&self, entity_id: &str) -> Result<Vec<StoredReport>> {
        let mut out: Vec<StoredReport> = self
            .reports
            .lock()
            .expect("store mutex poisoned")
            .iter()
            .filter(|r| r.entity_id == entity_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn delete_reports(&self, ids: &[String]) -> Result<()> {
        self.reports
            .lock()
            .expect("store mutex poisoned")
            .retain(|r| !ids.contains(&r.id));
        Ok(())
    }
}
