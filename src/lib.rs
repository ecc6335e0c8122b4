// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod analyze;
pub mod content;
pub mod ingest;
pub mod pipeline;
pub mod sentiment;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::analyze::{Analysis, AnalysisKind, AnalysisReport, Consistency, Enricher};
pub use crate::content::{Content, EntityConfig, Platform, SourceConfig};
pub use crate::ingest::registry::AdapterRegistry;
pub use crate::ingest::types::{AggregateOutcome, SourceAdapter, SourceFetch};
pub use crate::pipeline::{run_for_entity, RunSummary};
pub use crate::store::{DocumentStore, MemoryStore, StoredReport};
