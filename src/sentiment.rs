// src/sentiment.rs
//! Lexicon-based sentiment and topic tagging. Pure functions, no I/O.
//!
//! The lexicon ships with the crate (`lexicon.json`) and is seeded with the
//! game-review vocabulary the monitored platforms actually use. Matching is
//! plain substring containment, which works for CJK text where whitespace
//! tokenization would lose more than it gains.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::content::Content;

#[derive(Debug, Deserialize)]
struct Lexicon {
    positive: Vec<String>,
    negative: Vec<String>,
    topics: Vec<String>,
}

static LEXICON: Lazy<Lexicon> = Lazy::new(|| {
    let raw = include_str!("../lexicon.json");
    serde_json::from_str(raw).expect("valid sentiment lexicon")
});

// Weights and bands in tenths. Accumulating in integers keeps the ±0.3
// band boundaries exact (0.5 - 0.8 must land *on* the band, not below it).
const POSITIVE_WEIGHT: i32 = 5;
const NEGATIVE_WEIGHT: i32 = 8;
const POSITIVE_BAND: i32 = 3;
const NEGATIVE_BAND: i32 = -3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub label: SentimentLabel,
    /// Accumulated lexicon score, clamped to [-1, 1].
    pub score: f64,
}

/// Score a text against the lexicon. Each positive term present adds 0.5,
/// each negative term subtracts 0.8; the sum is clamped to [-1, 1] and
/// bucketed at ±0.3. Empty text is neutral, never an error.
pub fn score(text: &str) -> SentimentScore {
    if text.is_empty() {
        return SentimentScore {
            label: SentimentLabel::Neutral,
            score: 0.0,
        };
    }

    let mut raw = 0i32;
    for w in &LEXICON.positive {
        if text.contains(w.as_str()) {
            raw += POSITIVE_WEIGHT;
        }
    }
    for w in &LEXICON.negative {
        if text.contains(w.as_str()) {
            raw -= NEGATIVE_WEIGHT;
        }
    }
    let clamped = raw.clamp(-10, 10);

    let label = if clamped > POSITIVE_BAND {
        SentimentLabel::Positive
    } else if clamped < NEGATIVE_BAND {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    };

    SentimentScore {
        label,
        score: f64::from(clamped) / 10.0,
    }
}

/// Topic terms found in `text`, in lexicon order.
pub fn topics(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    LEXICON
        .topics
        .iter()
        .filter(|t| text.contains(t.as_str()))
        .cloned()
        .collect()
}

/// Topic vocabulary in lexicon order, for frequency ranking elsewhere.
pub fn topic_vocabulary() -> &'static [String] {
    &LEXICON.topics
}

/// A content record plus its heuristic tags, the shape handed to the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatedContent {
    #[serde(flatten)]
    pub content: Content,
    pub sentiment: SentimentLabel,
    pub sentiment_score: f64,
    pub topics: Vec<String>,
}

pub fn annotate(content: Content) -> AnnotatedContent {
    let s = score(&content.text);
    let topics = topics(&content.text);
    AnnotatedContent {
        content,
        sentiment: s.label,
        sentiment_score: s.score,
        topics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_neutral() {
        let s = score("");
        assert_eq!(s.label, SentimentLabel::Neutral);
        assert_eq!(s.score, 0.0);
        assert!(topics("").is_empty());
    }

    #[test]
    fn single_positive_term_is_above_band() {
        // one positive hit: +0.5 > 0.3
        let s = score("非常好玩");
        assert_eq!(s.label, SentimentLabel::Positive);
        assert_eq!(s.score, 0.5);
    }

    #[test]
    fn single_negative_term_is_below_band() {
        // one negative hit: -0.8 < -0.3
        let s = score("太失望了");
        assert_eq!(s.label, SentimentLabel::Negative);
        assert_eq!(s.score, -0.8);
    }

    #[test]
    fn exact_band_boundary_is_neutral() {
        // +0.5 - 0.8 = -0.3: not strictly below the band, so neutral
        let s = score("好玩但是有点失望");
        assert!((s.score - (-0.3)).abs() < 1e-9);
        assert_eq!(s.label, SentimentLabel::Neutral);
    }

    #[test]
    fn upper_band_boundary_is_neutral() {
        // 7 positive (+3.5) and 4 negative (-3.2) terms land exactly on +0.3
        let s = score("推荐 好玩 不错 喜欢 值得 满意 棒 垃圾 烂 失望 差评");
        assert!((s.score - 0.3).abs() < 1e-9);
        assert_eq!(s.label, SentimentLabel::Neutral);
    }

    #[test]
    fn score_is_clamped_to_unit_interval() {
        let s = score("推荐 好玩 不错 喜欢 值得 满意");
        assert_eq!(s.score, 1.0);
        assert_eq!(s.label, SentimentLabel::Positive);

        let s = score("垃圾 烂 失望 差评 坑");
        assert_eq!(s.score, -1.0);
        assert_eq!(s.label, SentimentLabel::Negative);
    }

    #[test]
    fn topics_preserve_lexicon_order() {
        let t = topics("画面不错但是优化很差还有BUG");
        assert_eq!(t, vec!["优化", "BUG", "画面"]);
    }

    #[test]
    fn annotate_tags_content_with_heuristics() {
        let c = Content {
            platform: crate::content::Platform::Steam,
            content_id: "1".into(),
            author: "a".into(),
            text: "优化垃圾，太失望了".into(),
            rating: 0.0,
            likes: 0,
            replies: 0,
            posted_at: chrono::Utc::now(),
            metadata: Default::default(),
        };
        let a = annotate(c);
        assert_eq!(a.sentiment, SentimentLabel::Negative);
        assert_eq!(a.topics, vec!["优化"]);
    }
}
