use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub telegram: TelegramConfig,
    pub llm: LlmConfig,
    pub engagement: EngagementConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct TelegramConfig {
    pub bot_token: SecretString,
    pub bot_name: String,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
}

/// Tunables consumed by the engagement gate. All fields have working
/// defaults; the gate never reads configuration from anywhere else.
#[derive(Clone, Debug)]
pub struct EngagementConfig {
    pub response_frequency: u32,
    pub min_context_messages: usize,
    pub max_context_messages: usize,
    pub buffer_capacity: usize,
    pub cooldown_secs: u64,
    pub lookback_minutes: u64,
    pub classifier_timeout_secs: u64,
    pub max_tracked_chats: usize,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_model: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

pub const PLACEHOLDER_BOT_TOKEN: &str = "your-telegram-bot-token";

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://banter.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            telegram: TelegramConfig {
                bot_token: String::new().into(),
                bot_name: "banter".to_string(),
            },
            llm: LlmConfig {
                api_key: None,
                base_url: "https://openrouter.ai/api/v1".to_string(),
                model: "meta-llama/llama-3.1-8b-instruct:free".to_string(),
            },
            engagement: EngagementConfig::default(),
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            response_frequency: 2,
            min_context_messages: 2,
            max_context_messages: 10,
            buffer_capacity: 20,
            cooldown_secs: 30,
            lookback_minutes: 10,
            classifier_timeout_secs: 12,
            max_tracked_chats: 1024,
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("banter.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(telegram) = patch.telegram {
            if let Some(bot_token_value) = telegram.bot_token {
                self.telegram.bot_token = secret_value(bot_token_value);
            }
            if let Some(bot_name) = telegram.bot_name {
                self.telegram.bot_name = bot_name;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
        }

        if let Some(engagement) = patch.engagement {
            if let Some(response_frequency) = engagement.response_frequency {
                self.engagement.response_frequency = response_frequency;
            }
            if let Some(min_context_messages) = engagement.min_context_messages {
                self.engagement.min_context_messages = min_context_messages;
            }
            if let Some(max_context_messages) = engagement.max_context_messages {
                self.engagement.max_context_messages = max_context_messages;
            }
            if let Some(buffer_capacity) = engagement.buffer_capacity {
                self.engagement.buffer_capacity = buffer_capacity;
            }
            if let Some(cooldown_secs) = engagement.cooldown_secs {
                self.engagement.cooldown_secs = cooldown_secs;
            }
            if let Some(lookback_minutes) = engagement.lookback_minutes {
                self.engagement.lookback_minutes = lookback_minutes;
            }
            if let Some(classifier_timeout_secs) = engagement.classifier_timeout_secs {
                self.engagement.classifier_timeout_secs = classifier_timeout_secs;
            }
            if let Some(max_tracked_chats) = engagement.max_tracked_chats {
                self.engagement.max_tracked_chats = max_tracked_chats;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("BANTER_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("BANTER_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("BANTER_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("BANTER_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("BANTER_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("BANTER_TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = secret_value(value);
        }
        if let Some(value) = read_env("BANTER_TELEGRAM_BOT_NAME") {
            self.telegram.bot_name = value;
        }

        if let Some(value) = read_env("BANTER_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("BANTER_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("BANTER_LLM_MODEL") {
            self.llm.model = value;
        }

        if let Some(value) = read_env("BANTER_ENGAGEMENT_RESPONSE_FREQUENCY") {
            self.engagement.response_frequency =
                parse_u32("BANTER_ENGAGEMENT_RESPONSE_FREQUENCY", &value)?;
        }
        if let Some(value) = read_env("BANTER_ENGAGEMENT_MIN_CONTEXT_MESSAGES") {
            self.engagement.min_context_messages =
                parse_usize("BANTER_ENGAGEMENT_MIN_CONTEXT_MESSAGES", &value)?;
        }
        if let Some(value) = read_env("BANTER_ENGAGEMENT_MAX_CONTEXT_MESSAGES") {
            self.engagement.max_context_messages =
                parse_usize("BANTER_ENGAGEMENT_MAX_CONTEXT_MESSAGES", &value)?;
        }
        if let Some(value) = read_env("BANTER_ENGAGEMENT_BUFFER_CAPACITY") {
            self.engagement.buffer_capacity =
                parse_usize("BANTER_ENGAGEMENT_BUFFER_CAPACITY", &value)?;
        }
        if let Some(value) = read_env("BANTER_ENGAGEMENT_COOLDOWN_SECS") {
            self.engagement.cooldown_secs = parse_u64("BANTER_ENGAGEMENT_COOLDOWN_SECS", &value)?;
        }
        if let Some(value) = read_env("BANTER_ENGAGEMENT_LOOKBACK_MINUTES") {
            self.engagement.lookback_minutes =
                parse_u64("BANTER_ENGAGEMENT_LOOKBACK_MINUTES", &value)?;
        }
        if let Some(value) = read_env("BANTER_ENGAGEMENT_CLASSIFIER_TIMEOUT_SECS") {
            self.engagement.classifier_timeout_secs =
                parse_u64("BANTER_ENGAGEMENT_CLASSIFIER_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("BANTER_ENGAGEMENT_MAX_TRACKED_CHATS") {
            self.engagement.max_tracked_chats =
                parse_usize("BANTER_ENGAGEMENT_MAX_TRACKED_CHATS", &value)?;
        }

        if let Some(value) = read_env("BANTER_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("BANTER_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port = parse_u16("BANTER_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("BANTER_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("BANTER_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level = read_env("BANTER_LOGGING_LEVEL").or_else(|| read_env("BANTER_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("BANTER_LOGGING_FORMAT").or_else(|| read_env("BANTER_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(bot_token) = overrides.telegram_bot_token {
            self.telegram.bot_token = secret_value(bot_token);
        }
        if let Some(api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(api_key));
        }
        if let Some(model) = overrides.llm_model {
            self.llm.model = model;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_telegram(&self.telegram)?;
        validate_llm(&self.llm)?;
        validate_engagement(&self.engagement)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("banter.toml"), PathBuf::from("config/banter.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_telegram(telegram: &TelegramConfig) -> Result<(), ConfigError> {
    let token = telegram.bot_token.expose_secret();
    if token.trim().is_empty() || token == PLACEHOLDER_BOT_TOKEN {
        return Err(ConfigError::Validation(
            "telegram.bot_token is required. Create a bot with @BotFather and set the token"
                .to_string(),
        ));
    }

    if telegram.bot_name.trim().is_empty() {
        return Err(ConfigError::Validation("telegram.bot_name must not be empty".to_string()));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if !llm.base_url.starts_with("http://") && !llm.base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "llm.base_url must start with http:// or https://".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    Ok(())
}

fn validate_engagement(engagement: &EngagementConfig) -> Result<(), ConfigError> {
    if engagement.response_frequency == 0 {
        return Err(ConfigError::Validation(
            "engagement.response_frequency must be greater than zero".to_string(),
        ));
    }

    if engagement.min_context_messages == 0 {
        return Err(ConfigError::Validation(
            "engagement.min_context_messages must be greater than zero".to_string(),
        ));
    }

    if engagement.max_context_messages < engagement.min_context_messages {
        return Err(ConfigError::Validation(
            "engagement.max_context_messages must be at least min_context_messages".to_string(),
        ));
    }

    if engagement.buffer_capacity < engagement.max_context_messages {
        return Err(ConfigError::Validation(
            "engagement.buffer_capacity must be at least max_context_messages".to_string(),
        ));
    }

    if engagement.classifier_timeout_secs == 0 || engagement.classifier_timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "engagement.classifier_timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if engagement.lookback_minutes == 0 {
        return Err(ConfigError::Validation(
            "engagement.lookback_minutes must be greater than zero".to_string(),
        ));
    }

    if engagement.max_tracked_chats == 0 {
        return Err(ConfigError::Validation(
            "engagement.max_tracked_chats must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    telegram: Option<TelegramPatch>,
    llm: Option<LlmPatch>,
    engagement: Option<EngagementPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct TelegramPatch {
    bot_token: Option<String>,
    bot_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EngagementPatch {
    response_frequency: Option<u32>,
    min_context_messages: Option<usize>,
    max_context_messages: Option<usize>,
    buffer_capacity: Option<usize>,
    cooldown_secs: Option<u64>,
    lookback_minutes: Option<u64>,
    classifier_timeout_secs: Option<u64>,
    max_tracked_chats: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
