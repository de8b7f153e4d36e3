use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use banter_core::config::LlmConfig;

use crate::classifier::{ClassificationResult, Classifier};
use crate::fallback::FallbackClassifier;

/// How many trailing human texts are forwarded to the remote model.
const REMOTE_CONTEXT_LIMIT: usize = 5;
const MAX_COMPLETION_TOKENS: u32 = 500;
const COMPLETION_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Error)]
enum RemoteFailure {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("completion carried no choices")]
    EmptyCompletion,
    #[error("completion content did not parse as a decision")]
    MalformedDecision,
}

/// Classifier backed by an OpenAI-compatible chat-completions endpoint.
/// Every remote failure - timeout, transport, auth, wrong-shape payload -
/// fails closed into the offline fallback; the caller never sees an error.
pub struct RemoteClassifier {
    http: Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
    fallback: FallbackClassifier,
}

impl RemoteClassifier {
    pub fn new(
        llm: &LlmConfig,
        timeout_secs: u64,
        fallback: FallbackClassifier,
    ) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(Duration::from_secs(timeout_secs.max(1))).build()?;

        Ok(Self {
            http,
            base_url: llm.base_url.trim_end_matches('/').to_string(),
            model: llm.model.clone(),
            api_key: llm.api_key.clone(),
            fallback,
        })
    }

    async fn ask_remote(
        &self,
        texts: &[String],
        chat_label: Option<&str>,
    ) -> Result<ClassificationResult, RemoteFailure> {
        let recent = &texts[texts.len().saturating_sub(REMOTE_CONTEXT_LIMIT)..];
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                PromptMessage { role: "system", content: system_prompt(chat_label) },
                PromptMessage { role: "user", content: user_prompt(recent) },
            ],
            max_tokens: MAX_COMPLETION_TOKENS,
            temperature: COMPLETION_TEMPERATURE,
        };

        let mut request =
            self.http.post(format!("{}/chat/completions", self.base_url)).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|error| RemoteFailure::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteFailure::Status(status.as_u16()));
        }

        let completion = response
            .json::<ChatCompletion>()
            .await
            .map_err(|error| RemoteFailure::Transport(error.to_string()))?;

        let content = completion
            .choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .ok_or(RemoteFailure::EmptyCompletion)?;

        debug!(
            event_name = "classifier.remote.completion",
            content_len = content.len(),
            "received remote completion"
        );

        parse_decision(content).ok_or(RemoteFailure::MalformedDecision)
    }
}

#[async_trait]
impl Classifier for RemoteClassifier {
    async fn decide(&self, texts: &[String], chat_label: Option<&str>) -> ClassificationResult {
        match self.ask_remote(texts, chat_label).await {
            Ok(result) => result,
            Err(failure) => {
                warn!(
                    event_name = "classifier.remote.failed",
                    error = %failure,
                    "remote classification failed; using rule-based fallback"
                );
                self.fallback.decide(texts, chat_label).await
            }
        }
    }
}

fn system_prompt(chat_label: Option<&str>) -> String {
    format!(
        "Ты умный и полезный помощник в групповом чате \"{}\".\n\n\
         Твоя задача:\n\
         1. Проанализировать последние сообщения\n\
         2. Определить тему разговора\n\
         3. Оценить эмоциональный тон (sentiment от -1 до 1)\n\
         4. Решить, стоит ли отвечать (should_respond: true/false)\n\
         5. Если да - сгенерировать полезный и информативный ответ\n\n\
         На прямые вопросы отвечай подробно и по существу. Отвечай естественно, \
         как умный участник беседы, на русском языке.\n\n\
         Верни ответ строго в JSON формате:\n\
         {{\n\
             \"detected_topic\": \"тема разговора\",\n\
             \"sentiment\": число_от_-1_до_1,\n\
             \"should_respond\": true/false,\n\
             \"response\": \"твой ответ или null\"\n\
         }}",
        chat_label.unwrap_or("Группа")
    )
}

fn user_prompt(texts: &[String]) -> String {
    let mut prompt = String::from("Последние сообщения в чате:\n");
    for text in texts {
        prompt.push_str("- ");
        prompt.push_str(text);
        prompt.push('\n');
    }
    prompt.push_str("\nПроанализируй контекст и реши, стоит ли отвечать.");
    prompt
}

fn parse_decision(content: &str) -> Option<ClassificationResult> {
    let payload = strip_code_fence(content.trim());
    let decision = serde_json::from_str::<RemoteDecision>(payload).ok()?;

    Some(ClassificationResult {
        topic: decision.detected_topic.filter(|topic| !topic.trim().is_empty()),
        sentiment: decision.sentiment.clamp(-1.0, 1.0) as f32,
        should_respond: decision.should_respond,
        response: decision.response.filter(|response| !response.trim().is_empty()),
    })
}

// Models sometimes wrap the JSON object in a markdown fence.
fn strip_code_fence(content: &str) -> &str {
    let Some(rest) = content.strip_prefix("```") else {
        return content;
    };
    let rest = rest.trim_start_matches(|ch: char| ch.is_ascii_alphabetic());
    rest.trim_start_matches(['\r', '\n']).trim_end_matches('`').trim()
}

/// Exactly the four keys of the decision contract. `sentiment` and
/// `should_respond` are mandatory; anything else is a malformed decision.
#[derive(Debug, Deserialize)]
struct RemoteDecision {
    detected_topic: Option<String>,
    sentiment: f64,
    should_respond: bool,
    response: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<PromptMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct PromptMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: String,
}
