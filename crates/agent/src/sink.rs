use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use banter_core::domain::ChatInteraction;

#[derive(Debug, Error)]
#[error("interaction sink failure: {0}")]
pub struct SinkError(pub String);

/// Write-only history sink. The gate records every processed turn here,
/// fire-and-forget: failures are logged at the boundary and never affect
/// whether a response is sent.
#[async_trait]
pub trait InteractionSink: Send + Sync {
    async fn record(&self, interaction: ChatInteraction) -> Result<(), SinkError>;
}

#[derive(Default)]
pub struct NoopInteractionSink;

#[async_trait]
impl InteractionSink for NoopInteractionSink {
    async fn record(&self, _interaction: ChatInteraction) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Buffers records in memory. Used by tests and the offline simulator.
#[derive(Default)]
pub struct RecordingInteractionSink {
    records: RwLock<Vec<ChatInteraction>>,
}

impl RecordingInteractionSink {
    pub async fn records(&self) -> Vec<ChatInteraction> {
        self.records.read().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl InteractionSink for RecordingInteractionSink {
    async fn record(&self, interaction: ChatInteraction) -> Result<(), SinkError> {
        self.records.write().await.push(interaction);
        Ok(())
    }
}
