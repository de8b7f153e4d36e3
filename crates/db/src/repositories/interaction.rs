use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;

use banter_core::domain::ChatInteraction;

use super::{InteractionRepository, RepositoryError};
use crate::DbPool;

pub struct SqliteInteractionRepository {
    pool: DbPool,
}

impl SqliteInteractionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InteractionRepository for SqliteInteractionRepository {
    async fn record(&self, interaction: &ChatInteraction) -> Result<(), RepositoryError> {
        let context_snapshot = serde_json::to_string(&interaction.context_snapshot)?;

        sqlx::query(
            "INSERT INTO chat_interactions \
             (recorded_at, chat_id, chat_label, context_snapshot, detected_topic, \
              sentiment, response_text, responded, participants_estimate) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(interaction.recorded_at)
        .bind(&interaction.chat_id)
        .bind(&interaction.chat_label)
        .bind(context_snapshot)
        .bind(&interaction.detected_topic)
        .bind(interaction.sentiment)
        .bind(&interaction.response_text)
        .bind(interaction.responded)
        .bind(interaction.participants_estimate)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent_for_chat(
        &self,
        chat_id: &str,
        limit: i64,
    ) -> Result<Vec<ChatInteraction>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT recorded_at, chat_id, chat_label, context_snapshot, detected_topic, \
                    sentiment, response_text, responded, participants_estimate \
             FROM chat_interactions \
             WHERE chat_id = ? \
             ORDER BY recorded_at DESC, id DESC \
             LIMIT ?",
        )
        .bind(chat_id)
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;

        let mut interactions = Vec::with_capacity(rows.len());
        for row in rows {
            let context_snapshot: String = row.try_get("context_snapshot")?;
            interactions.push(ChatInteraction {
                recorded_at: row.try_get::<DateTime<Utc>, _>("recorded_at")?,
                chat_id: row.try_get("chat_id")?,
                chat_label: row.try_get("chat_label")?,
                context_snapshot: serde_json::from_str(&context_snapshot)?,
                detected_topic: row.try_get("detected_topic")?,
                sentiment: row.try_get("sentiment")?,
                response_text: row.try_get("response_text")?,
                responded: row.try_get("responded")?,
                participants_estimate: row.try_get("participants_estimate")?,
            });
        }

        Ok(interactions)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use banter_core::domain::ChatInteraction;

    use super::SqliteInteractionRepository;
    use crate::connect_with_settings;
    use crate::migrations::run_pending;
    use crate::repositories::InteractionRepository;

    async fn repository() -> SqliteInteractionRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 5)
            .await
            .expect("in-memory pool should connect");
        run_pending(&pool).await.expect("migrations should apply");
        SqliteInteractionRepository::new(pool)
    }

    fn interaction(index: i64, responded: bool) -> ChatInteraction {
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        ChatInteraction {
            chat_id: "chat-1".to_string(),
            chat_label: Some("Общий чат".to_string()),
            context_snapshot: vec!["привет".to_string(), "как дела?".to_string()],
            detected_topic: responded.then(|| "приветствие".to_string()),
            sentiment: responded.then_some(0.7),
            response_text: responded.then(|| "Привет! Как дела? 👋".to_string()),
            responded,
            participants_estimate: 4,
            recorded_at: base + Duration::seconds(index),
        }
    }

    #[tokio::test]
    async fn record_and_read_back_round_trip() {
        let repository = repository().await;
        let written = interaction(0, true);

        repository.record(&written).await.expect("record should succeed");
        let read = repository
            .recent_for_chat("chat-1", 10)
            .await
            .expect("read should succeed");

        assert_eq!(read, vec![written]);
    }

    #[tokio::test]
    async fn recent_is_newest_first_and_limited() {
        let repository = repository().await;
        for index in 0..5 {
            repository
                .record(&interaction(index, index % 2 == 0))
                .await
                .expect("record should succeed");
        }

        let read = repository
            .recent_for_chat("chat-1", 3)
            .await
            .expect("read should succeed");

        assert_eq!(read.len(), 3);
        assert!(read[0].recorded_at > read[1].recorded_at);
        assert!(read[1].recorded_at > read[2].recorded_at);
    }

    #[tokio::test]
    async fn other_chats_are_not_returned() {
        let repository = repository().await;
        repository.record(&interaction(0, true)).await.expect("record should succeed");

        let read = repository
            .recent_for_chat("chat-2", 10)
            .await
            .expect("read should succeed");
        assert!(read.is_empty());
    }

    #[tokio::test]
    async fn summary_is_computed_over_recorded_history() {
        let repository = repository().await;
        for index in 0..4 {
            repository
                .record(&interaction(index, index == 0))
                .await
                .expect("record should succeed");
        }

        let summary = repository
            .chat_summary("chat-1", 100)
            .await
            .expect("summary should succeed");
        assert_eq!(summary.total_interactions, 4);
        assert_eq!(summary.responses_generated, 1);
        assert_eq!(summary.top_topics, vec![("приветствие".to_string(), 1)]);
    }
}
