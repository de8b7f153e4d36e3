use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use banter_core::clock::Clock;
use banter_core::config::EngagementConfig;
use banter_core::domain::{ChatInteraction, Message};
use banter_core::errors::DomainError;

use crate::classifier::{ClassificationResult, Classifier};
use crate::context::ContextWindow;
use crate::policy::{EngagementPolicy, EngagementState};
use crate::sink::InteractionSink;

/// Extra wait past the classifier timeout before the turn gives up and
/// stays silent; leaves room for the offline fallback path to finish.
const CLASSIFIER_GRACE_SECS: u64 = 3;

struct ChatState {
    window: ContextWindow,
    engagement: EngagementState,
}

struct ChatEntry {
    state: Arc<Mutex<ChatState>>,
    last_seen: DateTime<Utc>,
}

/// Orchestrates one message turn per chat: buffer, gate, classify, decide.
/// Turns for the same chat are serialized by a per-chat lock held for the
/// whole turn; distinct chats proceed independently.
pub struct EngagementGate {
    config: EngagementConfig,
    policy: EngagementPolicy,
    classifier: Arc<dyn Classifier>,
    sink: Arc<dyn InteractionSink>,
    clock: Arc<dyn Clock>,
    chats: RwLock<HashMap<String, ChatEntry>>,
}

impl EngagementGate {
    pub fn new(
        config: EngagementConfig,
        classifier: Arc<dyn Classifier>,
        sink: Arc<dyn InteractionSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let policy = EngagementPolicy::new(&config);
        Self { config, policy, classifier, sink, clock, chats: RwLock::new(HashMap::new()) }
    }

    /// Processes one incoming human message and returns the reply to send,
    /// if any. Never fails: every internal problem ends the turn in silence
    /// with per-chat state intact.
    pub async fn process_incoming(
        &self,
        chat_id: &str,
        chat_label: Option<&str>,
        text: &str,
    ) -> Option<String> {
        let state = self.chat_state(chat_id).await;
        let mut chat = state.lock().await;

        let now = self.clock.now();
        chat.window.append(Message::human(text, now));

        let context = chat.window.recent_human_texts(self.config.max_context_messages);
        if context.len() < self.config.min_context_messages {
            debug!(
                event_name = "gate.context.insufficient",
                chat_id,
                have = context.len(),
                need = self.config.min_context_messages,
                "not enough context to consider a response"
            );
            return None;
        }

        if !self.policy.permits(&chat.window, &chat.engagement, now) {
            debug!(
                event_name = "gate.policy.denied",
                chat_id, "engagement policy denied the turn"
            );
            self.record(chat_id, chat_label, chat.window.participants_estimate(), &context, None);
            return None;
        }

        let wait = Duration::from_secs(
            self.config.classifier_timeout_secs.saturating_add(CLASSIFIER_GRACE_SECS),
        );
        let result = match timeout(wait, self.classifier.decide(&context, chat_label)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    event_name = "gate.classifier.exceeded_bound",
                    chat_id,
                    wait_secs = wait.as_secs(),
                    "classification exceeded its bound; staying silent"
                );
                ClassificationResult::silent()
            }
        };

        if let Err(violation) = validate_classification(&result) {
            error!(
                event_name = "gate.result.invalid",
                chat_id,
                error = %violation,
                "classification result violated an invariant; aborting turn"
            );
            return None;
        }

        match result.outgoing_text() {
            Some(reply) => {
                let reply = reply.to_string();
                let sent_at = self.clock.now();
                chat.window.append(Message::bot(reply.clone(), sent_at));
                chat.engagement.note_bot_message(sent_at);

                info!(
                    event_name = "gate.turn.responded",
                    chat_id,
                    topic = result.topic.as_deref().unwrap_or("unknown"),
                    "emitting response"
                );
                self.record(
                    chat_id,
                    chat_label,
                    chat.window.participants_estimate(),
                    &context,
                    Some(&result),
                );
                Some(reply)
            }
            None => {
                debug!(
                    event_name = "gate.turn.silent",
                    chat_id, "classifier chose silence"
                );
                self.record(
                    chat_id,
                    chat_label,
                    chat.window.participants_estimate(),
                    &context,
                    Some(&result),
                );
                None
            }
        }
    }

    pub async fn tracked_chats(&self) -> usize {
        self.chats.read().await.len()
    }

    async fn chat_state(&self, chat_id: &str) -> Arc<Mutex<ChatState>> {
        let now = self.clock.now();
        let mut chats = self.chats.write().await;

        if let Some(entry) = chats.get_mut(chat_id) {
            entry.last_seen = now;
            return Arc::clone(&entry.state);
        }

        if chats.len() >= self.config.max_tracked_chats {
            // drop the least recently active chat; an in-flight turn keeps
            // its own state alive through the cloned Arc
            let oldest = chats
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                chats.remove(&oldest);
                info!(
                    event_name = "gate.chats.evicted",
                    chat_id = %oldest,
                    "evicted least recently active chat state"
                );
            }
        }

        let state = Arc::new(Mutex::new(ChatState {
            window: ContextWindow::new(self.config.buffer_capacity),
            engagement: EngagementState::default(),
        }));
        chats.insert(
            chat_id.to_owned(),
            ChatEntry { state: Arc::clone(&state), last_seen: now },
        );
        state
    }

    /// Fire-and-forget history write; the response path never waits on it.
    fn record(
        &self,
        chat_id: &str,
        chat_label: Option<&str>,
        participants_estimate: i64,
        context: &[String],
        classification: Option<&ClassificationResult>,
    ) {
        let responded =
            classification.map(|result| result.outgoing_text().is_some()).unwrap_or(false);
        let interaction = ChatInteraction {
            chat_id: chat_id.to_owned(),
            chat_label: chat_label.map(str::to_owned),
            context_snapshot: context.to_vec(),
            detected_topic: classification.and_then(|result| result.topic.clone()),
            sentiment: classification.map(|result| result.sentiment),
            response_text: classification.and_then(|result| {
                result.outgoing_text().map(str::to_owned)
            }),
            responded,
            participants_estimate,
            recorded_at: self.clock.now(),
        };

        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            if let Err(error) = sink.record(interaction).await {
                warn!(
                    event_name = "gate.sink.failed",
                    error = %error,
                    "interaction history write failed"
                );
            }
        });
    }
}

// Classifier variants are trusted to clamp their own output; a value outside
// the contract here means a bug, so the turn is dropped rather than emitted.
fn validate_classification(result: &ClassificationResult) -> Result<(), DomainError> {
    if !result.sentiment.is_finite() || !(-1.0..=1.0).contains(&result.sentiment) {
        return Err(DomainError::InvariantViolation(format!(
            "sentiment {} outside [-1, 1]",
            result.sentiment
        )));
    }
    Ok(())
}
