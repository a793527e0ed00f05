// src/models/config.rs

//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Environment variable overriding `telegram.bot_token`.
pub const ENV_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
/// Environment variable overriding `telegram.chat_id`.
pub const ENV_CHAT_ID: &str = "TELEGRAM_CHAT_ID";

/// Config files probed, in order, when no path is given.
pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["yonhap_config.json", "config.json"];

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Bot credentials and API endpoint
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Dedup store location
    #[serde(default)]
    pub storage: StorageConfig,

    /// Upper bound on notifications sent per run
    #[serde(default = "defaults::max_articles_per_run")]
    pub max_articles_per_run: usize,

    /// Log level and optional log file
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Headline page and scraping settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Outbound message settings
    #[serde(default)]
    pub notifier: NotifierConfig,
}

impl Config {
    /// Load configuration from a JSON file, or TOML when the extension is `.toml`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            Ok(toml::from_str(&content)?)
        } else {
            Ok(serde_json::from_str(&content)?)
        }
    }

    /// Pick the config file to use: the explicit one, else the first default that exists.
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        DEFAULT_CONFIG_FILES
            .iter()
            .map(PathBuf::from)
            .find(|candidate| candidate.exists())
    }

    /// Override credentials from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Override credentials from an arbitrary lookup. Empty values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = non_empty(ENV_BOT_TOKEN) {
            self.telegram.bot_token = token.trim().to_string();
        }
        if let Some(chat_id) = non_empty(ENV_CHAT_ID) {
            self.telegram.chat_id = chat_id.trim().to_string();
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        self.telegram.validate()?;

        if self.source.timeout_secs == 0 {
            return Err(AppError::validation("source.timeout_secs must be > 0"));
        }
        if self.notifier.timeout_secs == 0 {
            return Err(AppError::validation("notifier.timeout_secs must be > 0"));
        }
        if self.source.max_candidates == 0 {
            return Err(AppError::validation("source.max_candidates must be > 0"));
        }
        if self.source.user_agent.trim().is_empty() {
            return Err(AppError::validation("source.user_agent is empty"));
        }
        url::Url::parse(&self.source.url)
            .map_err(|e| AppError::validation(format!("source.url is invalid: {e}")))?;
        url::Url::parse(&self.source.base_url)
            .map_err(|e| AppError::validation(format!("source.base_url is invalid: {e}")))?;
        if self.notifier.max_message_chars < 16 {
            return Err(AppError::validation(
                "notifier.max_message_chars must be >= 16",
            ));
        }
        if self.storage.processed_articles_file.as_os_str().is_empty() {
            return Err(AppError::validation(
                "storage.processed_articles_file is empty",
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            telegram: TelegramConfig::default(),
            storage: StorageConfig::default(),
            max_articles_per_run: defaults::max_articles_per_run(),
            logging: LoggingConfig::default(),
            source: SourceConfig::default(),
            notifier: NotifierConfig::default(),
        }
    }
}

/// Telegram bot credentials.
#[derive(Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Token issued by BotFather
    #[serde(default)]
    pub bot_token: String,

    /// Numeric chat id (negative for groups) or `@channel` name
    #[serde(default)]
    pub chat_id: String,

    /// Bot API root, overridable for self-hosted API servers
    #[serde(default = "defaults::api_base")]
    pub api_base: String,
}

impl TelegramConfig {
    /// Check that credentials look usable.
    pub fn validate(&self) -> Result<()> {
        if self.bot_token.trim().len() < 10 {
            return Err(AppError::config(format!(
                "bot token is missing or too short (set telegram.bot_token or {ENV_BOT_TOKEN})"
            )));
        }

        let chat_id = self.chat_id.trim();
        if chat_id.is_empty() {
            return Err(AppError::config(format!(
                "chat id is not set (set telegram.chat_id or {ENV_CHAT_ID})"
            )));
        }
        let is_channel_name = chat_id.len() > 1 && chat_id.starts_with('@');
        if !is_channel_name && chat_id.parse::<i64>().is_err() {
            return Err(AppError::config(format!(
                "chat id '{chat_id}' is neither an integer nor an @channel name"
            )));
        }

        if url::Url::parse(&self.api_base).is_err() {
            return Err(AppError::config(format!(
                "telegram.api_base '{}' is not a valid URL",
                self.api_base
            )));
        }
        Ok(())
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            api_base: defaults::api_base(),
        }
    }
}

// The token must never reach logs.
impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &if self.bot_token.is_empty() { "" } else { "***" })
            .field("chat_id", &self.chat_id)
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Dedup store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON file holding processed article hashes
    #[serde(default = "defaults::processed_articles_file")]
    pub processed_articles_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            processed_articles_file: defaults::processed_articles_file(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level name (`DEBUG`, `INFO`, `WARN`, `ERROR`), case-insensitive
    #[serde(default = "defaults::log_level")]
    pub level: String,

    /// File that log lines are appended to in addition to stderr
    #[serde(default = "defaults::log_file")]
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Level as an `env_logger` filter directive.
    pub fn filter(&self) -> String {
        match self.level.trim().to_lowercase().as_str() {
            "warning" => "warn".to_string(),
            "critical" | "fatal" => "error".to_string(),
            "" => "info".to_string(),
            other => other.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
            file: defaults::log_file(),
        }
    }
}

/// Headline page and scraping settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Outlet name stamped on every article
    #[serde(default = "defaults::source_name")]
    pub name: String,

    /// Headline listing page
    #[serde(default = "defaults::source_url")]
    pub url: String,

    /// Base for resolving relative links
    #[serde(default = "defaults::source_base_url")]
    pub base_url: String,

    /// User-Agent header for the page request
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::source_timeout")]
    pub timeout_secs: u64,

    /// Number of candidate containers examined per strategy
    #[serde(default = "defaults::max_candidates")]
    pub max_candidates: usize,

    /// Titles shorter than this (in characters) are navigation noise
    #[serde(default = "defaults::min_title_chars")]
    pub min_title_chars: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            name: defaults::source_name(),
            url: defaults::source_url(),
            base_url: defaults::source_base_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::source_timeout(),
            max_candidates: defaults::max_candidates(),
            min_title_chars: defaults::min_title_chars(),
        }
    }
}

/// How notified articles are packed into messages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// One message per article
    #[default]
    PerArticle,
    /// One combined message, split per article when too long
    Digest,
}

/// Outbound message settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Pause between consecutive sends in milliseconds
    #[serde(default = "defaults::send_delay")]
    pub send_delay_ms: u64,

    /// Per-request timeout in seconds
    #[serde(default = "defaults::notifier_timeout")]
    pub timeout_secs: u64,

    /// Messages longer than this many characters are truncated
    #[serde(default = "defaults::max_message_chars")]
    pub max_message_chars: usize,

    /// Message packing
    #[serde(default)]
    pub mode: DeliveryMode,

    /// Send a start message after the connectivity check
    #[serde(default)]
    pub announce_start: bool,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            send_delay_ms: defaults::send_delay(),
            timeout_secs: defaults::notifier_timeout(),
            max_message_chars: defaults::max_message_chars(),
            mode: DeliveryMode::default(),
            announce_start: false,
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn max_articles_per_run() -> usize {
        5
    }

    // Telegram defaults
    pub fn api_base() -> String {
        "https://api.telegram.org".into()
    }

    // Storage defaults
    pub fn processed_articles_file() -> PathBuf {
        PathBuf::from("processed_articles.json")
    }

    // Logging defaults
    pub fn log_level() -> String {
        "INFO".into()
    }
    pub fn log_file() -> Option<PathBuf> {
        Some(PathBuf::from("news_monitor.log"))
    }

    // Source defaults
    pub fn source_name() -> String {
        "연합뉴스".into()
    }
    pub fn source_url() -> String {
        "https://www.yna.co.kr/report/headline?site=wholemenu_headline".into()
    }
    pub fn source_base_url() -> String {
        "https://www.yna.co.kr".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".into()
    }
    pub fn source_timeout() -> u64 {
        30
    }
    pub fn max_candidates() -> usize {
        10
    }
    pub fn min_title_chars() -> usize {
        10
    }

    // Notifier defaults
    pub fn send_delay() -> u64 {
        2000
    }
    pub fn notifier_timeout() -> u64 {
        10
    }
    pub fn max_message_chars() -> usize {
        4090
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn with_credentials() -> Config {
        let mut config = Config::default();
        config.telegram.bot_token = "123456:ABCDEF-token".to_string();
        config.telegram.chat_id = "-1001234567".to_string();
        config
    }

    #[test]
    fn validate_default_config_requires_credentials() {
        let err = Config::default().validate().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn validate_accepts_credentials() {
        assert!(with_credentials().validate().is_ok());
    }

    #[test]
    fn validate_rejects_short_token() {
        let mut config = with_credentials();
        config.telegram.bot_token = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_chat_id_forms() {
        let mut config = with_credentials();
        config.telegram.chat_id = "@yonhap_alerts".to_string();
        assert!(config.validate().is_ok());

        config.telegram.chat_id = "not-a-number".to_string();
        assert!(config.validate().is_err());

        config.telegram.chat_id = "@".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_candidates() {
        let mut config = with_credentials();
        config.source.max_candidates = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overrides_take_precedence() {
        let mut config = with_credentials();
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_BOT_TOKEN, " 999:from-environment "),
            (ENV_CHAT_ID, "42"),
        ]);
        config.apply_overrides_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.telegram.bot_token, "999:from-environment");
        assert_eq!(config.telegram.chat_id, "42");
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut config = with_credentials();
        config.apply_overrides_from(|_| Some(String::new()));
        assert_eq!(config.telegram.chat_id, "-1001234567");
    }

    #[test]
    fn parses_partial_json() {
        let json = r#"{
            "telegram": {"bot_token": "123456:ABCDEF", "chat_id": "1"},
            "max_articles_per_run": 3,
            "notifier": {"mode": "digest"}
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.max_articles_per_run, 3);
        assert_eq!(config.notifier.mode, DeliveryMode::Digest);
        assert_eq!(config.notifier.send_delay_ms, 2000);
        assert_eq!(config.source.max_candidates, 10);
        assert_eq!(
            config.storage.processed_articles_file,
            PathBuf::from("processed_articles.json")
        );
    }

    #[test]
    fn load_picks_format_by_extension() {
        let dir = tempfile::TempDir::new().unwrap();

        let toml_path = dir.path().join("config.toml");
        fs::write(
            &toml_path,
            "max_articles_per_run = 7\n[telegram]\nchat_id = \"5\"\n",
        )
        .unwrap();
        let config = Config::load(&toml_path).unwrap();
        assert_eq!(config.max_articles_per_run, 7);
        assert_eq!(config.telegram.chat_id, "5");

        let json_path = dir.path().join("config.json");
        fs::write(&json_path, r#"{"storage": {"processed_articles_file": "x.json"}}"#).unwrap();
        let config = Config::load(&json_path).unwrap();
        assert_eq!(config.storage.processed_articles_file, PathBuf::from("x.json"));
    }

    #[test]
    fn debug_hides_token() {
        let config = with_credentials();
        let rendered = format!("{:?}", config.telegram);
        assert!(!rendered.contains("ABCDEF"));
    }

    #[test]
    fn log_level_filter_names() {
        let mut logging = LoggingConfig::default();
        assert_eq!(logging.filter(), "info");
        logging.level = "WARNING".to_string();
        assert_eq!(logging.filter(), "warn");
        logging.level = "Debug".to_string();
        assert_eq!(logging.filter(), "debug");
    }
}
