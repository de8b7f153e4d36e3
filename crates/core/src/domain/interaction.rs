use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One processed message turn, as handed to the write-only history sink.
/// Recorded for responding and non-responding turns alike.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatInteraction {
    pub chat_id: String,
    pub chat_label: Option<String>,
    pub context_snapshot: Vec<String>,
    pub detected_topic: Option<String>,
    pub sentiment: Option<f32>,
    pub response_text: Option<String>,
    pub responded: bool,
    pub participants_estimate: i64,
    pub recorded_at: DateTime<Utc>,
}

/// Coarse bucket over the [-1, 1] sentiment score, used by reporting queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn from_score(score: f32) -> Self {
        if score >= 0.25 {
            Self::Positive
        } else if score <= -0.25 {
            Self::Negative
        } else {
            Self::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}
