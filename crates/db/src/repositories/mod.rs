mod interaction;
mod memory;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use banter_core::domain::{ChatInteraction, SentimentLabel};

pub use interaction::SqliteInteractionRepository;
pub use memory::InMemoryInteractionRepository;

const TOP_TOPIC_LIMIT: usize = 5;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database failure: {0}")]
    Database(#[from] sqlx::Error),
    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Aggregate view over a chat's recorded history, consumed by reporting.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChatSummary {
    pub total_interactions: i64,
    pub responses_generated: i64,
    pub positive: i64,
    pub neutral: i64,
    pub negative: i64,
    pub top_topics: Vec<(String, i64)>,
}

impl ChatSummary {
    pub fn response_rate(&self) -> f64 {
        self.responses_generated as f64 / self.total_interactions.max(1) as f64
    }
}

#[async_trait]
pub trait InteractionRepository: Send + Sync {
    async fn record(&self, interaction: &ChatInteraction) -> Result<(), RepositoryError>;

    /// Most recent interactions for a chat, newest first.
    async fn recent_for_chat(
        &self,
        chat_id: &str,
        limit: i64,
    ) -> Result<Vec<ChatInteraction>, RepositoryError>;

    async fn chat_summary(
        &self,
        chat_id: &str,
        limit: i64,
    ) -> Result<ChatSummary, RepositoryError> {
        let records = self.recent_for_chat(chat_id, limit).await?;
        Ok(summarize(&records))
    }
}

pub fn summarize(records: &[ChatInteraction]) -> ChatSummary {
    let mut summary = ChatSummary {
        total_interactions: records.len() as i64,
        ..ChatSummary::default()
    };

    let mut topic_counts: HashMap<&str, i64> = HashMap::new();
    for record in records {
        if record.responded {
            summary.responses_generated += 1;
        }
        if let Some(score) = record.sentiment {
            match SentimentLabel::from_score(score) {
                SentimentLabel::Positive => summary.positive += 1,
                SentimentLabel::Neutral => summary.neutral += 1,
                SentimentLabel::Negative => summary.negative += 1,
            }
        }
        if let Some(topic) = record.detected_topic.as_deref() {
            *topic_counts.entry(topic).or_default() += 1;
        }
    }

    let mut topics = topic_counts
        .into_iter()
        .map(|(topic, count)| (topic.to_string(), count))
        .collect::<Vec<_>>();
    topics.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    topics.truncate(TOP_TOPIC_LIMIT);
    summary.top_topics = topics;

    summary
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use banter_core::domain::ChatInteraction;

    use super::summarize;

    fn interaction(topic: Option<&str>, sentiment: Option<f32>, responded: bool) -> ChatInteraction {
        ChatInteraction {
            chat_id: "chat-1".to_string(),
            chat_label: None,
            context_snapshot: vec!["a".to_string()],
            detected_topic: topic.map(str::to_owned),
            sentiment,
            response_text: responded.then(|| "ok".to_string()),
            responded,
            participants_estimate: 3,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn summary_counts_responses_sentiments_and_topics() {
        let records = vec![
            interaction(Some("приветствие"), Some(0.7), true),
            interaction(Some("приветствие"), Some(0.7), true),
            interaction(Some("поддержка"), Some(-0.5), false),
            interaction(None, Some(0.0), false),
            interaction(None, None, false),
        ];

        let summary = summarize(&records);
        assert_eq!(summary.total_interactions, 5);
        assert_eq!(summary.responses_generated, 2);
        assert_eq!(summary.positive, 2);
        assert_eq!(summary.neutral, 1);
        assert_eq!(summary.negative, 1);
        assert_eq!(
            summary.top_topics,
            vec![("приветствие".to_string(), 2), ("поддержка".to_string(), 1)]
        );
        assert!((summary.response_rate() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn empty_history_produces_an_empty_summary() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_interactions, 0);
        assert_eq!(summary.response_rate(), 0.0);
        assert!(summary.top_topics.is_empty());
    }
}
