// src/ingest/providers/bilibili.rs
//! Bilibili video-comment adapter. Two fetch modes depending on the input:
//! a `BV...` identifier fetches that video's comments directly; anything
//! else is treated as a keyword search whose top 3 video hits are fetched
//! one by one. Child fetch failures during the search fan-out are logged and
//! swallowed so partial results still come back.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::content::{Content, Platform, SourceConfig};
use crate::ingest::normalize_content_text;
use crate::ingest::providers::unix_to_utc;
use crate::ingest::types::SourceAdapter;

const SEARCH_FANOUT: usize = 3;
/// Comments with more likes than this count as an endorsement; the platform
/// has no per-comment rating signal.
const LIKE_RECOMMEND_THRESHOLD: u64 = 10;

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    code: i64,
    #[serde(default)]
    message: String,
    // no serde default here: it would force a `T: Default` bound, and a
    // missing field already deserializes to `None`
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct VideoInfo {
    aid: u64,
}

#[derive(Debug, Deserialize)]
struct ReplyData {
    #[serde(default)]
    replies: Option<Vec<RawReply>>,
}

#[derive(Debug, Deserialize)]
struct RawReply {
    rpid: u64,
    member: Member,
    content: ReplyContent,
    #[serde(default)]
    like: u64,
    #[serde(default)]
    rcount: u64,
    ctime: i64,
}

#[derive(Debug, Deserialize)]
struct Member {
    uname: String,
    #[serde(default)]
    avatar: Option<String>,
    #[serde(default)]
    level_info: Option<LevelInfo>,
}

#[derive(Debug, Deserialize)]
struct LevelInfo {
    current_level: i64,
}

#[derive(Debug, Deserialize)]
struct ReplyContent {
    message: String,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    #[serde(default)]
    result: Option<Vec<SearchHit>>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    bvid: String,
}

pub struct BilibiliAdapter {
    mode: Mode,
}

enum Mode {
    /// A reply-list payload handed in directly.
    Fixture(String),
    Http { client: reqwest::Client },
}

impl BilibiliAdapter {
    pub fn over_http() -> Self {
        Self {
            mode: Mode::Http {
                client: reqwest::Client::new(),
            },
        }
    }

    pub fn from_fixture(reply_payload: &str) -> Self {
        Self {
            mode: Mode::Fixture(reply_payload.to_string()),
        }
    }

    fn parse_replies(raw: &str) -> Result<Vec<Content>> {
        let envelope: ApiEnvelope<ReplyData> =
            serde_json::from_str(raw).context("parsing bilibili reply payload")?;
        if envelope.code != 0 {
            bail!("bilibili api error: {}", envelope.message);
        }
        let replies = envelope
            .data
            .and_then(|d| d.replies)
            .unwrap_or_default();

        Ok(replies.into_iter().map(Self::map_reply).collect())
    }

    fn map_reply(r: RawReply) -> Content {
        let mut metadata = BTreeMap::new();
        if let Some(avatar) = r.member.avatar {
            metadata.insert("avatar".to_string(), serde_json::json!(avatar));
        }
        if let Some(level) = r.member.level_info {
            metadata.insert("level".to_string(), serde_json::json!(level.current_level));
        }
        Content {
            platform: Platform::Bilibili,
            content_id: r.rpid.to_string(),
            author: r.member.uname,
            text: normalize_content_text(&r.content.message),
            rating: if r.like > LIKE_RECOMMEND_THRESHOLD {
                1.0
            } else {
                0.0
            },
            likes: r.like,
            replies: r.rcount,
            posted_at: unix_to_utc(r.ctime),
            metadata,
        }
    }

    async fn fetch_video_comments(client: &reqwest::Client, bvid: &str) -> Result<Vec<Content>> {
        let info_url = format!("https://api.bilibili.com/x/web-interface/view?bvid={bvid}");
        let info: ApiEnvelope<VideoInfo> = client
            .get(&info_url)
            .send()
            .await
            .context("bilibili view get()")?
            .json()
            .await
            .context("bilibili view json()")?;
        if info.code != 0 {
            bail!("bilibili api error: {}", info.message);
        }
        let aid = info
            .data
            .context("bilibili view payload missing data")?
            .aid;

        let reply_url = format!("https://api.bilibili.com/x/v2/reply?type=1&oid={aid}&ps=50");
        let body = client
            .get(&reply_url)
            .send()
            .await
            .context("bilibili reply get()")?
            .text()
            .await
            .context("bilibili reply .text()")?;
        Self::parse_replies(&body)
    }

    /// Keyword search resolved to a bounded number of videos, fetched
    /// sequentially; a failing child is logged and skipped.
    async fn search_and_fetch(client: &reqwest::Client, keyword: &str) -> Result<Vec<Content>> {
        let search_url = format!(
            "https://api.bilibili.com/x/web-interface/search/type?keyword={}&search_type=video&page=1",
            urlencode(keyword)
        );
        let search: ApiEnvelope<SearchData> = client
            .get(&search_url)
            .send()
            .await
            .context("bilibili search get()")?
            .json()
            .await
            .context("bilibili search json()")?;
        if search.code != 0 {
            bail!("bilibili api error: {}", search.message);
        }
        let hits = search.data.and_then(|d| d.result).unwrap_or_default();

        let mut all = Vec::new();
        for hit in hits.into_iter().take(SEARCH_FANOUT) {
            match Self::fetch_video_comments(client, &hit.bvid).await {
                Ok(mut comments) => all.append(&mut comments),
                Err(e) => {
                    tracing::warn!(bvid = %hit.bvid, error = ?e, "skipping video comments");
                }
            }
        }
        Ok(all)
    }
}

#[async_trait]
impl SourceAdapter for BilibiliAdapter {
    async fn fetch(&self, config: &SourceConfig) -> Result<Vec<Content>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_replies(s),
            Mode::Http { client } => {
                let Some(query) = config
                    .param_str("bvid")
                    .or_else(|| config.param_str("keyword"))
                else {
                    tracing::warn!("bilibili source missing `bvid`/`keyword`, returning empty");
                    return Ok(Vec::new());
                };

                let result = if query.starts_with("BV") {
                    Self::fetch_video_comments(client, &query).await
                } else {
                    Self::search_and_fetch(client, &query).await
                };
                // The adapter absorbs its own failures; the batch stays alive.
                match result {
                    Ok(contents) => Ok(contents),
                    Err(e) => {
                        tracing::warn!(error = ?e, "bilibili fetch failed, returning empty");
                        Ok(Vec::new())
                    }
                }
            }
        }
    }

    fn platform(&self) -> Platform {
        Platform::Bilibili
    }
}

/// Minimal percent-encoding for query values, enough for CJK keywords.
fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len() * 3);
    for b in s.as_bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(*b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}
