// src/ingest/registry.rs
//! Adapter registry: source identifier → fetch capability.
//!
//! Adding a platform is one adapter implementation plus one `register` call;
//! the orchestrator never changes.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{bail, Result};

use crate::content::{Content, Platform, SourceConfig};
use crate::ingest::providers::{BilibiliAdapter, SteamAdapter, XiaoheiheAdapter};
use crate::ingest::types::SourceAdapter;

#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: BTreeMap<Platform, Arc<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with all built-in adapters. Reserved platforms (TapTap,
    /// Zhihu) are present but disabled, so they show up as "known" while
    /// staying excluded from dispatch.
    pub fn with_builtin_adapters() -> Self {
        let mut r = Self::new();
        r.register(Arc::new(SteamAdapter::over_http()));
        r.register(Arc::new(XiaoheiheAdapter::over_http()));
        r.register(Arc::new(BilibiliAdapter::over_http()));
        r.register(Arc::new(ReservedAdapter(Platform::Taptap)));
        r.register(Arc::new(ReservedAdapter(Platform::Zhihu)));
        r
    }

    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        self.adapters.insert(adapter.platform(), adapter);
    }

    /// Adapter for dispatch; `None` for unknown or disabled platforms.
    pub fn get_enabled(&self, platform: Platform) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters
            .get(&platform)
            .filter(|a| a.enabled())
            .cloned()
    }

    /// Direct single-source fetch. Invoking a disabled or unregistered
    /// source is caller misuse and fails fast; it is not a runtime fault.
    pub async fn fetch_from_source(
        &self,
        platform: Platform,
        config: &SourceConfig,
    ) -> Result<Vec<Content>> {
        let Some(adapter) = self.get_enabled(platform) else {
            bail!("unknown or disabled source: {platform}");
        };
        tracing::debug!(source = %platform, "fetching from source");
        let contents = adapter.fetch(config).await?;
        tracing::info!(source = %platform, count = contents.len(), "fetched contents");
        Ok(contents)
    }

    /// Enabled platforms, for user-facing listings.
    pub fn supported_sources(&self) -> Vec<Platform> {
        self.adapters
            .iter()
            .filter(|(_, a)| a.enabled())
            .map(|(p, _)| *p)
            .collect()
    }
}

/// Placeholder for platforms the registry knows about but has no working
/// adapter for yet.
struct ReservedAdapter(Platform);

#[async_trait::async_trait]
impl SourceAdapter for ReservedAdapter {
    async fn fetch(&self, _config: &SourceConfig) -> Result<Vec<Content>> {
        bail!("adapter for {} is not implemented", self.0)
    }

    fn platform(&self) -> Platform {
        self.0
    }

    fn enabled(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_lists_only_enabled_sources() {
        let r = AdapterRegistry::with_builtin_adapters();
        let supported = r.supported_sources();
        assert!(supported.contains(&Platform::Steam));
        assert!(supported.contains(&Platform::Xiaoheihe));
        assert!(supported.contains(&Platform::Bilibili));
        assert!(!supported.contains(&Platform::Taptap));
        assert!(!supported.contains(&Platform::Zhihu));
    }

    #[tokio::test]
    async fn disabled_source_fails_fast() {
        let r = AdapterRegistry::with_builtin_adapters();
        let cfg = SourceConfig {
            source: Platform::Taptap,
            enabled: true,
            config: Default::default(),
        };
        let err = r
            .fetch_from_source(Platform::Taptap, &cfg)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown or disabled source"));
    }
}
