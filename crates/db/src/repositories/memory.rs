use async_trait::async_trait;
use tokio::sync::RwLock;

use banter_core::domain::ChatInteraction;

use super::{InteractionRepository, RepositoryError};

/// In-memory repository for tests and offline runs.
#[derive(Default)]
pub struct InMemoryInteractionRepository {
    records: RwLock<Vec<ChatInteraction>>,
}

#[async_trait]
impl InteractionRepository for InMemoryInteractionRepository {
    async fn record(&self, interaction: &ChatInteraction) -> Result<(), RepositoryError> {
        self.records.write().await.push(interaction.clone());
        Ok(())
    }

    async fn recent_for_chat(
        &self,
        chat_id: &str,
        limit: i64,
    ) -> Result<Vec<ChatInteraction>, RepositoryError> {
        let records = self.records.read().await;
        let mut matching = records
            .iter()
            .filter(|record| record.chat_id == chat_id)
            .cloned()
            .collect::<Vec<_>>();
        matching.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        matching.truncate(limit.max(0) as usize);
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use banter_core::domain::ChatInteraction;

    use super::InMemoryInteractionRepository;
    use crate::repositories::InteractionRepository;

    #[tokio::test]
    async fn in_memory_round_trip_is_newest_first() {
        let repository = InMemoryInteractionRepository::default();
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();

        for index in 0..3 {
            repository
                .record(&ChatInteraction {
                    chat_id: "chat-1".to_string(),
                    chat_label: None,
                    context_snapshot: vec![format!("m-{index}")],
                    detected_topic: None,
                    sentiment: None,
                    response_text: None,
                    responded: false,
                    participants_estimate: 1,
                    recorded_at: base + Duration::seconds(index),
                })
                .await
                .expect("record should succeed");
        }

        let read = repository
            .recent_for_chat("chat-1", 2)
            .await
            .expect("read should succeed");
        assert_eq!(read.len(), 2);
        assert_eq!(read[0].context_snapshot, vec!["m-2".to_string()]);
        assert_eq!(read[1].context_snapshot, vec!["m-1".to_string()]);
    }
}
