// src/ingest/providers/xiaoheihe.rs
//! Xiaoheihe adapter. There is no stable public API, so the adapter probes a
//! couple of candidate endpoints and takes the first well-formed payload.
//! It deliberately never raises: an exhausted probe sequence yields an empty
//! batch so one flaky source cannot destabilize the whole run.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;

use crate::content::{Content, Platform, SourceConfig};
use crate::ingest::normalize_content_text;
use crate::ingest::providers::unix_to_utc;
use crate::ingest::types::SourceAdapter;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(default)]
    reviews: Option<Vec<RawReview>>,
    #[serde(default)]
    data: Option<Inner>,
}

#[derive(Debug, Deserialize)]
struct Inner {
    #[serde(default)]
    reviews: Option<Vec<RawReview>>,
}

/// Field names drift between endpoint variants; everything that can be
/// missing is optional and resolved in `map_review`.
#[derive(Debug, Deserialize)]
struct RawReview {
    #[serde(default)]
    review_id: Option<serde_json::Value>,
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    user_id: Option<serde_json::Value>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    review: Option<String>,
    /// 0–10 scale when present.
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    is_recommend: Option<bool>,
    #[serde(default)]
    like_count: Option<u64>,
    #[serde(default)]
    reply_count: Option<u64>,
    #[serde(default)]
    create_time: Option<i64>,
    #[serde(default)]
    playtime_hours: Option<f64>,
    #[serde(default)]
    platform: Option<String>,
}

pub struct XiaoheiheAdapter {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { client: reqwest::Client },
}

impl XiaoheiheAdapter {
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

    fn candidate_urls(appid: &str) -> [String; 2] {
        [
            format!("https://api.xiaoheihe.cn/game/info?appid={appid}"),
            format!("https://api.xiaoheihe.cn/game/review?appid={appid}&limit=50"),
        ]
    }

    /// `None` when the payload does not carry a review list in either of the
    /// known shapes; the probe loop then moves on to the next candidate.
    fn parse_payload(raw: &str) -> Option<Vec<Content>> {
        let payload: Payload = serde_json::from_str(raw).ok()?;
        let reviews = payload
            .reviews
            .or_else(|| payload.data.and_then(|d| d.reviews))?;
        Some(reviews.into_iter().map(Self::map_review).collect())
    }

    fn map_review(r: RawReview) -> Content {
        let text_raw = r.content.or(r.review).unwrap_or_default();
        // 0–10 score divides by 10; otherwise fall back to the recommend flag
        let rating = match r.score {
            Some(s) => (s / 10.0).clamp(0.0, 1.0),
            None => {
                if r.is_recommend.unwrap_or(false) {
                    1.0
                } else {
                    0.0
                }
            }
        };

        let mut metadata = BTreeMap::new();
        if let Some(h) = r.playtime_hours {
            metadata.insert("playtime".to_string(), serde_json::json!(h));
        }
        if let Some(p) = r.platform {
            metadata.insert("platform".to_string(), serde_json::json!(p));
        }

        Content {
            platform: Platform::Xiaoheihe,
            content_id: value_to_id(r.review_id.or(r.id)),
            author: r
                .username
                .unwrap_or_else(|| value_to_id(r.user_id)),
            text: normalize_content_text(&text_raw),
            rating,
            likes: r.like_count.unwrap_or(0),
            replies: r.reply_count.unwrap_or(0),
            posted_at: unix_to_utc(r.create_time.unwrap_or(0)),
            metadata,
        }
    }
}

fn value_to_id(v: Option<serde_json::Value>) -> String {
    match v {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

#[async_trait]
impl SourceAdapter for XiaoheiheAdapter {
    async fn fetch(&self, config: &SourceConfig) -> Result<Vec<Content>> {
        match &self.mode {
            Mode::Fixture(s) => Ok(Self::parse_payload(s).unwrap_or_default()),
            Mode::Http { client } => {
                let Some(appid) = config.param_str("appid") else {
                    tracing::warn!("xiaoheihe source missing `appid`, returning empty");
                    return Ok(Vec::new());
                };

                for url in Self::candidate_urls(&appid) {
                    let resp = match client
                        .get(&url)
                        .header(reqwest::header::USER_AGENT, USER_AGENT)
                        .header(reqwest::header::ACCEPT, "application/json")
                        .send()
                        .await
                    {
                        Ok(r) if r.status().is_success() => r,
                        Ok(_) | Err(_) => continue,
                    };
                    let Ok(body) = resp.text().await else { continue };
                    if let Some(contents) = Self::parse_payload(&body) {
                        return Ok(contents);
                    }
                }

                // Indistinguishable from "no content today" by design; the
                // counter is the only signal that probing came up dry.
                tracing::warn!("xiaoheihe probe exhausted all candidates, returning empty");
                counter!("radar_source_errors_total").increment(1);
                Ok(Vec::new())
            }
        }
    }

    fn platform(&self) -> Platform {
        Platform::Xiaoheihe
    }
}
