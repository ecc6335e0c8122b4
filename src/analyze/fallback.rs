// src/analyze/fallback.rs
//! Deterministic statistical analysis used when the AI call is unavailable
//! or fails. Pure, no network. Must not be handed an empty batch; skipping
//! empty batches is the caller's contract.

use std::collections::HashMap;

use crate::analyze::{AnalysisReport, Risk, Severity};
use crate::content::Content;
use crate::sentiment::{self, SentimentLabel};

const POSITIVE_SCORE: u8 = 70;
const NEUTRAL_SCORE: u8 = 50;
const PRAISE_SCORE: u8 = 60;
const TOP_KEYWORDS: usize = 5;

pub fn analyze(contents: &[Content]) -> AnalysisReport {
    debug_assert!(!contents.is_empty(), "fallback invoked on empty batch");

    let total = contents.len().max(1);
    let favorable = contents.iter().filter(|c| c.is_favorable()).count();
    let score = ((favorable as f64 / total as f64) * 100.0).round() as u8;

    let sentiment = if score >= POSITIVE_SCORE {
        SentimentLabel::Positive
    } else if score >= NEUTRAL_SCORE {
        SentimentLabel::Neutral
    } else {
        SentimentLabel::Negative
    };

    let overall = match sentiment {
        SentimentLabel::Positive => "Overall reception is good; player satisfaction is high.",
        SentimentLabel::Neutral => "Reception is mixed; there is room for improvement.",
        SentimentLabel::Negative => "Reception skews negative and needs close attention.",
    }
    .to_string();

    // Topic-lexicon frequency over the batch, ranked descending, ties by
    // lexicon order.
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for c in contents {
        for kw in sentiment::topic_vocabulary() {
            if c.text.contains(kw.as_str()) {
                *counts.entry(kw.as_str()).or_default() += 1;
            }
        }
    }
    let mut ranked: Vec<(&str, usize)> = sentiment::topic_vocabulary()
        .iter()
        .filter_map(|kw| counts.get(kw.as_str()).map(|n| (kw.as_str(), *n)))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    let keywords = ranked
        .into_iter()
        .take(TOP_KEYWORDS)
        .map(|(kw, _)| kw.to_string())
        .collect();

    let risks = if score < NEUTRAL_SCORE {
        vec![Risk {
            kind: "reputation".to_string(),
            description: "Unfavorable review share is high.".to_string(),
            severity: Severity::High,
        }]
    } else {
        Vec::new()
    };

    AnalysisReport {
        overall,
        sentiment,
        score,
        per_source: Default::default(),
        common_praises: if score >= PRAISE_SCORE {
            vec!["Has an established player base.".to_string()]
        } else {
            Vec::new()
        },
        common_complaints: if score < PRAISE_SCORE {
            vec!["Player satisfaction is low.".to_string()]
        } else {
            Vec::new()
        },
        risks,
        suggestions: vec![
            "Keep collecting player feedback.".to_string(),
            "Focus on the most-reported issues.".to_string(),
        ],
        keywords,
        raw: None,
        is_fallback: true,
    }
}
