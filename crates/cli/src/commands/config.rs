use banter_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let engagement = &config.engagement;
    let llm_api_key = if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" };

    let lines = vec![
        "effective config (source precedence: env > file > default):".to_string(),
        format!("database.url = {}", config.database.url),
        format!("database.max_connections = {}", config.database.max_connections),
        format!("database.timeout_secs = {}", config.database.timeout_secs),
        format!(
            "telegram.bot_token = {}",
            redact_token(config.telegram.bot_token.expose_secret())
        ),
        format!("telegram.bot_name = {}", config.telegram.bot_name),
        format!("llm.api_key = {llm_api_key}"),
        format!("llm.base_url = {}", config.llm.base_url),
        format!("llm.model = {}", config.llm.model),
        format!("engagement.response_frequency = {}", engagement.response_frequency),
        format!("engagement.min_context_messages = {}", engagement.min_context_messages),
        format!("engagement.max_context_messages = {}", engagement.max_context_messages),
        format!("engagement.buffer_capacity = {}", engagement.buffer_capacity),
        format!("engagement.cooldown_secs = {}", engagement.cooldown_secs),
        format!("engagement.lookback_minutes = {}", engagement.lookback_minutes),
        format!("engagement.classifier_timeout_secs = {}", engagement.classifier_timeout_secs),
        format!("engagement.max_tracked_chats = {}", engagement.max_tracked_chats),
        format!("server.bind_address = {}", config.server.bind_address),
        format!("server.health_check_port = {}", config.server.health_check_port),
        format!("server.graceful_shutdown_secs = {}", config.server.graceful_shutdown_secs),
        format!("logging.level = {}", config.logging.level),
        format!("logging.format = {:?}", config.logging.format),
    ];

    lines.join("\n")
}

fn redact_token(token: &str) -> String {
    if token.chars().count() <= 6 {
        "<redacted>".to_string()
    } else {
        let prefix = token.chars().take(6).collect::<String>();
        format!("{prefix}***")
    }
}
