// src/analyze/consistency.rs
//! Cross-source agreement signal. Pure function of the label multiset,
//! order-independent.

use serde::{Deserialize, Serialize};

use crate::sentiment::SentimentLabel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consistency {
    High,
    Medium,
    Low,
}

/// High iff every source agrees; Low iff positive and negative both occur;
/// Medium otherwise (e.g. neutral plus one polarity).
pub fn consistency(labels: &[SentimentLabel]) -> Consistency {
    let all_same = labels.windows(2).all(|w| w[0] == w[1]);
    if all_same {
        return Consistency::High;
    }
    let has_positive = labels.contains(&SentimentLabel::Positive);
    let has_negative = labels.contains(&SentimentLabel::Negative);
    if has_positive && has_negative {
        Consistency::Low
    } else {
        Consistency::Medium
    }
}
