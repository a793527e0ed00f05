// src/services/telegram.rs

//! Telegram Bot API client.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::{AppError, Result};
use crate::models::{NotifierConfig, TelegramConfig};
use crate::utils::{http, truncate_message};

/// Outbound message channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Verify credentials and reachability. Returns the bot's display name.
    async fn check_connection(&self) -> Result<String>;

    /// Send one HTML-formatted message.
    async fn send_message(&self, text: &str) -> Result<()>;
}

/// Envelope shared by every Bot API response.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BotUser {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    first_name: String,
}

/// Body of a `sendMessage` call.
#[derive(Debug, Serialize, PartialEq)]
pub struct SendMessageRequest {
    pub chat_id: String,
    pub text: String,
    pub parse_mode: &'static str,
    pub disable_web_page_preview: bool,
}

/// Telegram bot bound to a single chat.
pub struct TelegramBot {
    api_base: String,
    bot_token: String,
    chat_id: String,
    max_message_chars: usize,
    client: reqwest::Client,
}

impl TelegramBot {
    /// Create a bot client from validated credentials.
    pub fn new(telegram: &TelegramConfig, notifier: &NotifierConfig) -> Result<Self> {
        let client = http::create_async_client(
            concat!("headline-monitor/", env!("CARGO_PKG_VERSION")),
            notifier.timeout_secs,
        )?;

        Ok(Self {
            api_base: telegram.api_base.trim_end_matches('/').to_string(),
            bot_token: telegram.bot_token.clone(),
            chat_id: telegram.chat_id.clone(),
            max_message_chars: notifier.max_message_chars,
            client,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    /// Build the `sendMessage` body, truncating over-long text.
    pub fn message_payload(&self, text: &str) -> SendMessageRequest {
        SendMessageRequest {
            chat_id: self.chat_id.clone(),
            text: truncate_message(text, self.max_message_chars),
            parse_mode: "HTML",
            disable_web_page_preview: false,
        }
    }

    /// Read the status and raw body of a Bot API response.
    async fn read_body(response: reqwest::Response) -> Result<(StatusCode, String)> {
        let status = response.status();
        let body = response.text().await.map_err(|e| e.without_url())?;
        Ok((status, body))
    }
}

/// Map a Bot API response to its `result`, or to a `status: description` message.
fn parse_response<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
) -> std::result::Result<T, String> {
    match serde_json::from_str::<ApiResponse<T>>(body) {
        Ok(ApiResponse {
            ok: true,
            result: Some(result),
            ..
        }) if status.is_success() => Ok(result),
        Ok(envelope) => Err(format!(
            "{}: {}",
            status,
            envelope.description.unwrap_or_else(|| "unknown error".into())
        )),
        Err(_) => Err(format!("{status}: unreadable response")),
    }
}

#[async_trait]
impl Notifier for TelegramBot {
    async fn check_connection(&self) -> Result<String> {
        let response = self
            .client
            .get(self.method_url("getMe"))
            .send()
            .await
            .map_err(|e| AppError::connectivity(e.without_url().to_string()))?;

        let (status, body) = Self::read_body(response)
            .await
            .map_err(|e| AppError::connectivity(e.to_string()))?;
        let user: BotUser = parse_response(status, &body).map_err(|e| AppError::connectivity(e))?;

        let name = user.username.unwrap_or(user.first_name);
        log::info!("Telegram bot connected: {}", name);
        Ok(name)
    }

    async fn send_message(&self, text: &str) -> Result<()> {
        let payload = self.message_payload(text);
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| e.without_url())?;

        let (status, body) = Self::read_body(response).await?;
        parse_response::<serde_json::Value>(status, &body).map_err(|e| AppError::telegram(e))?;
        log::debug!("Telegram message sent ({} chars)", payload.text.chars().count());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ELLIPSIS;

    fn bot() -> TelegramBot {
        let telegram = TelegramConfig {
            bot_token: "123456:SECRET".to_string(),
            chat_id: "-100777".to_string(),
            api_base: "https://api.telegram.org/".to_string(),
        };
        TelegramBot::new(&telegram, &NotifierConfig::default()).unwrap()
    }

    #[test]
    fn test_method_url() {
        assert_eq!(
            bot().method_url("getMe"),
            "https://api.telegram.org/bot123456:SECRET/getMe"
        );
    }

    #[test]
    fn test_payload_keeps_short_text() {
        let payload = bot().message_payload("<b>hi</b>");
        assert_eq!(payload.text, "<b>hi</b>");
        assert_eq!(payload.chat_id, "-100777");
        assert_eq!(payload.parse_mode, "HTML");
        assert!(!payload.disable_web_page_preview);
    }

    #[test]
    fn test_payload_truncates_long_text() {
        let text = "x".repeat(5000);
        let payload = bot().message_payload(&text);
        assert_eq!(payload.text.chars().count(), 4090 + ELLIPSIS.len());
        assert!(payload.text.ends_with(ELLIPSIS));
    }

    #[test]
    fn test_payload_serialization() {
        let json = serde_json::to_value(bot().message_payload("hello")).unwrap();
        assert_eq!(json["chat_id"], "-100777");
        assert_eq!(json["parse_mode"], "HTML");
        assert_eq!(json["disable_web_page_preview"], false);
    }

    #[test]
    fn test_parse_bot_user() {
        let body = r#"{"ok":true,"result":{"id":1,"is_bot":true,"first_name":"Bot","username":"news_bot"}}"#;
        let user: BotUser = parse_response(StatusCode::OK, body).unwrap();
        assert_eq!(user.username.as_deref(), Some("news_bot"));
        assert_eq!(user.first_name, "Bot");
    }

    #[test]
    fn test_parse_message_result() {
        let body = r#"{"ok":true,"result":{"message_id":42,"chat":{"id":-100777}}}"#;
        let message: serde_json::Value = parse_response(StatusCode::OK, body).unwrap();
        assert_eq!(message["message_id"], 42);
    }

    #[test]
    fn test_parse_api_error_keeps_description() {
        let body = r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#;
        let err = parse_response::<serde_json::Value>(StatusCode::BAD_REQUEST, body).unwrap_err();
        assert_eq!(err, "400 Bad Request: Bad Request: chat not found");
    }

    #[test]
    fn test_parse_non_success_status_without_description() {
        let body = r#"{"ok":true,"result":{}}"#;
        let err = parse_response::<serde_json::Value>(StatusCode::BAD_GATEWAY, body).unwrap_err();
        assert_eq!(err, "502 Bad Gateway: unknown error");
    }

    #[test]
    fn test_parse_ok_without_result() {
        let err = parse_response::<BotUser>(StatusCode::OK, r#"{"ok":true}"#).unwrap_err();
        assert_eq!(err, "200 OK: unknown error");
    }

    #[test]
    fn test_parse_unreadable_body() {
        let err = parse_response::<BotUser>(
            StatusCode::BAD_GATEWAY,
            "<html><body>502 Bad Gateway</body></html>",
        )
        .unwrap_err();
        assert_eq!(err, "502 Bad Gateway: unreadable response");
    }
}
