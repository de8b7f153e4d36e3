use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::update::{GroupMessageService, IncomingUpdate, NoopGroupMessageService};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport send failed: {0}")]
    Send(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Long-poll style connection to a messaging platform. `next_update`
/// returning `None` means the stream closed cleanly.
#[async_trait]
pub trait UpdateTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_update(&self) -> Result<Option<IncomingUpdate>, TransportError>;
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

#[derive(Default)]
pub struct NoopUpdateTransport;

#[async_trait]
impl UpdateTransport for NoopUpdateTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_update(&self) -> Result<Option<IncomingUpdate>, TransportError> {
        Ok(None)
    }

    async fn send_message(&self, _chat_id: &str, _text: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

pub struct PollingRunner {
    transport: Arc<dyn UpdateTransport>,
    service: Arc<dyn GroupMessageService>,
    reconnect_policy: ReconnectPolicy,
}

impl Default for PollingRunner {
    fn default() -> Self {
        Self {
            transport: Arc::new(NoopUpdateTransport),
            service: Arc::new(NoopGroupMessageService),
            reconnect_policy: ReconnectPolicy::default(),
        }
    }
}

impl PollingRunner {
    pub fn new(
        transport: Arc<dyn UpdateTransport>,
        service: Arc<dyn GroupMessageService>,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, service, reconnect_policy }
    }

    pub async fn start(&self) -> Result<()> {
        for attempt in 0..=self.reconnect_policy.max_retries {
            match self.connect_and_pump(attempt).await {
                Ok(()) => return Ok(()),
                Err(transport_error) => {
                    warn!(
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "update transport failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "update transport retries exhausted; continuing process without crash"
                        );
                        return Ok(());
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Ok(())
    }

    async fn connect_and_pump(&self, attempt: u32) -> Result<(), TransportError> {
        info!(attempt, "opening update transport connection");
        self.transport.connect().await?;
        info!(attempt, "update transport connected");

        loop {
            let Some(update) = self.transport.next_update().await? else {
                info!(attempt, "update transport stream closed");
                self.transport.disconnect().await?;
                return Ok(());
            };

            debug!(
                event_name = "ingress.update_received",
                update_id = update.update_id,
                chat_id = %update.chat_id,
                from_self = update.from_self,
                "received chat update"
            );

            if update.from_self {
                continue;
            }

            let reply = self
                .service
                .process_incoming(&update.chat_id, update.chat_label.as_deref(), &update.text)
                .await;

            let Some(reply) = reply else {
                continue;
            };

            if let Err(error) = self.transport.send_message(&update.chat_id, &reply).await {
                warn!(
                    event_name = "egress.send_failed",
                    update_id = update.update_id,
                    chat_id = %update.chat_id,
                    error = %error,
                    "failed to send reply; continuing update loop"
                );
            } else {
                info!(
                    event_name = "egress.reply_sent",
                    update_id = update.update_id,
                    chat_id = %update.chat_id,
                    "sent reply"
                );
            }
        }
    }
}
