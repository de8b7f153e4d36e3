use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use banter_agent::classifier::Classifier;
use banter_agent::fallback::FallbackClassifier;
use banter_agent::gate::EngagementGate;
use banter_agent::remote::RemoteClassifier;
use banter_agent::sink::{InteractionSink, SinkError};
use banter_core::clock::SystemClock;
use banter_core::config::{AppConfig, ConfigError, LoadOptions};
use banter_core::domain::ChatInteraction;
use banter_db::repositories::{InteractionRepository, SqliteInteractionRepository};
use banter_db::{connect_with_settings, migrations, DbPool};
use banter_telegram::{
    GroupMessageService, NoopUpdateTransport, PollingRunner, ReconnectPolicy,
};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub gate: Arc<EngagementGate>,
    pub runner: PollingRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("http client construction failed: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Bridges the gate's write-only history port onto the sqlite repository.
struct DbInteractionSink {
    repository: SqliteInteractionRepository,
}

#[async_trait]
impl InteractionSink for DbInteractionSink {
    async fn record(&self, interaction: ChatInteraction) -> Result<(), SinkError> {
        self.repository
            .record(&interaction)
            .await
            .map_err(|error| SinkError(error.to_string()))
    }
}

/// Exposes the gate as the transport-facing message service.
struct GateMessageService {
    gate: Arc<EngagementGate>,
}

#[async_trait]
impl GroupMessageService for GateMessageService {
    async fn process_incoming(
        &self,
        chat_id: &str,
        chat_label: Option<&str>,
        text: &str,
    ) -> Option<String> {
        self.gate.process_incoming(chat_id, chat_label, text).await
    }
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let classifier = build_classifier(&config)?;
    let sink = Arc::new(DbInteractionSink {
        repository: SqliteInteractionRepository::new(db_pool.clone()),
    });
    let gate = Arc::new(EngagementGate::new(
        config.engagement.clone(),
        classifier,
        sink,
        Arc::new(SystemClock),
    ));
    let runner = PollingRunner::new(
        Arc::new(NoopUpdateTransport),
        Arc::new(GateMessageService { gate: Arc::clone(&gate) }),
        ReconnectPolicy::default(),
    );

    Ok(Application { config, db_pool, gate, runner })
}

fn build_classifier(config: &AppConfig) -> Result<Arc<dyn Classifier>, BootstrapError> {
    let fallback = FallbackClassifier::new();

    if config.llm.api_key.is_some() {
        let remote = RemoteClassifier::new(
            &config.llm,
            config.engagement.classifier_timeout_secs,
            fallback,
        )
        .map_err(BootstrapError::HttpClient)?;
        info!(
            event_name = "system.bootstrap.classifier_remote",
            model = %config.llm.model,
            "remote classifier enabled with rule-based fallback"
        );
        Ok(Arc::new(remote))
    } else {
        info!(
            event_name = "system.bootstrap.classifier_offline",
            "no llm api key configured; running with the rule-based classifier only"
        );
        Ok(Arc::new(fallback))
    }
}

#[cfg(test)]
mod tests {
    use banter_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    fn valid_overrides(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                telegram_bot_token: Some("123456:test-token".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_a_bot_token() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("telegram.bot_token"));
    }

    #[tokio::test]
    async fn integration_smoke_covers_startup_and_one_offline_turn() {
        let app = bootstrap(valid_overrides("sqlite::memory:?cache=shared"))
            .await
            .expect("bootstrap should succeed with valid overrides");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name = 'chat_interactions'",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("interaction table should exist after bootstrap");
        assert_eq!(table_count, 1);

        // no api key configured, so this turn runs fully offline
        let first = app.gate.process_incoming("chat-1", Some("Тест"), "привет").await;
        assert_eq!(first, None, "one buffered message is below the context minimum");

        let second = app.gate.process_incoming("chat-1", Some("Тест"), "всем привет").await;
        assert!(second.is_some(), "the greeting rule should produce a reply");

        // the history write is fire-and-forget; give it a moment to land
        let mut recorded = 0;
        for _ in 0..100 {
            let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chat_interactions")
                .fetch_one(&app.db_pool)
                .await
                .expect("count query should succeed");
            recorded = count;
            if recorded >= 1 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(recorded >= 1, "the responding turn should be persisted");

        app.db_pool.close().await;
    }
}
