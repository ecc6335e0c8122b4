// src/ingest/providers/steam.rs
//! Steam storefront review adapter. The appreviews endpoint reports a
//! boolean recommend flag, which maps to rating 1.0 / 0.0.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::content::{Content, Platform, SourceConfig};
use crate::ingest::normalize_content_text;
use crate::ingest::providers::unix_to_utc;
use crate::ingest::types::SourceAdapter;

const REVIEWS_PER_PAGE: u32 = 100;

#[derive(Debug, Deserialize)]
struct Payload {
    success: i64,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    reviews: Vec<RawReview>,
}

#[derive(Debug, Deserialize)]
struct RawReview {
    recommendationid: String,
    author: RawAuthor,
    review: String,
    voted_up: bool,
    #[serde(default)]
    votes_up: u64,
    #[serde(default)]
    comment_count: u64,
    timestamp_created: i64,
    #[serde(default)]
    steam_purchase: bool,
}

#[derive(Debug, Deserialize)]
struct RawAuthor {
    steamid: String,
    #[serde(default)]
    playtime_forever: f64,
}

pub struct SteamAdapter {
    mode: Mode,
}

enum Mode {
    /// Raw payload handed in directly; exercises the parse path in tests.
    Fixture(String),
    Http {
        client: reqwest::Client,
    },
}

impl SteamAdapter {
    pub fn over_http() -> Self {
        Self {
            mode: Mode::Http {
                client: reqwest::Client::new(),
            },
        }
    }

    pub fn from_fixture(payload: &str) -> Self {
        Self {
            mode: Mode::Fixture(payload.to_string()),
        }
    }

    fn parse_payload(raw: &str) -> Result<Vec<Content>> {
        let payload: Payload = serde_json::from_str(raw).context("parsing steam payload")?;
        if payload.success != 1 {
            bail!(
                "steam api failed: {}",
                payload.error.as_deref().unwrap_or("unknown error")
            );
        }

        let out = payload
            .reviews
            .into_iter()
            .map(|r| {
                let mut metadata = BTreeMap::new();
                // playtime is reported in minutes; store whole hours
                metadata.insert(
                    "playtime".to_string(),
                    serde_json::json!((r.author.playtime_forever / 60.0).round() as i64),
                );
                metadata.insert(
                    "steam_purchase".to_string(),
                    serde_json::json!(r.steam_purchase),
                );
                Content {
                    platform: Platform::Steam,
                    content_id: r.recommendationid,
                    author: r.author.steamid,
                    text: normalize_content_text(&r.review),
                    rating: if r.voted_up { 1.0 } else { 0.0 },
                    likes: r.votes_up,
                    replies: r.comment_count,
                    posted_at: unix_to_utc(r.timestamp_created),
                    metadata,
                }
            })
            .collect();
        Ok(out)
    }
}

#[async_trait]
impl SourceAdapter for SteamAdapter {
    async fn fetch(&self, config: &SourceConfig) -> Result<Vec<Content>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_payload(s),
            Mode::Http { client } => {
                let appid = config
                    .param_str("appid")
                    .context("steam source requires an `appid` parameter")?;
                let url = format!(
                    "https://store.steampowered.com/appreviews/{appid}?json=1&language=schinese&num_per_page={REVIEWS_PER_PAGE}&filter=recent"
                );
                let body = client
                    .get(&url)
                    .send()
                    .await
                    .context("steam http get()")?
                    .text()
                    .await
                    .context("steam http .text()")?;
                Self::parse_payload(&body)
            }
        }
    }

    fn platform(&self) -> Platform {
        Platform::Steam
    }
}
