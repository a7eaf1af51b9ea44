//! Telegram Bot API client: `sendMessage` for fan-out and `getUpdates` long
//! polling for inbound commands.

use crate::error::{RelayError, RelayResult};
use crate::models::SubscriberId;
use crate::relay::ChatTransport;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SERVICE: &str = "telegram";
const LONG_POLL_SECS: u64 = 30;

#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // token stays out of logs
        f.debug_struct("TelegramClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    // Missing key is None; `#[serde(default)]` here would demand `T: Default`
    result: Option<T>,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

impl TelegramClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url("https://api.telegram.org", token)
    }

    pub fn with_base_url(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: Client::builder()
                // long polls hold the connection open for LONG_POLL_SECS
                .timeout(Duration::from_secs(LONG_POLL_SECS + 15))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn unwrap_response<T: for<'de> Deserialize<'de>>(
        resp: reqwest::Response,
    ) -> RelayResult<Option<T>> {
        let status = resp.status();
        let body: ApiResponse<T> = resp.json().await.map_err(|e| RelayError::Decode {
            service: SERVICE,
            reason: format!("status {status}: {e}"),
        })?;

        if !body.ok {
            return Err(RelayError::Telegram {
                description: body
                    .description
                    .unwrap_or_else(|| format!("status {status}")),
            });
        }
        Ok(body.result)
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> RelayResult<()> {
        let resp = self
            .http
            .post(self.api_url("sendMessage"))
            .json(&SendMessage {
                chat_id,
                text,
                disable_web_page_preview: false,
            })
            .send()
            .await
            .map_err(|source| RelayError::Http { service: SERVICE, source })?;

        Self::unwrap_response::<serde_json::Value>(resp).await?;
        Ok(())
    }

    /// The bot's own account, used to tell `/cmd@ThisBot` from other bots.
    pub async fn get_me(&self) -> RelayResult<User> {
        let resp = self
            .http
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|source| RelayError::Http { service: SERVICE, source })?;

        Self::unwrap_response(resp)
            .await?
            .ok_or_else(|| RelayError::Decode {
                service: SERVICE,
                reason: "getMe returned no result".to_string(),
            })
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(&self, offset: i64) -> RelayResult<Vec<Update>> {
        let resp = self
            .http
            .get(self.api_url("getUpdates"))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", LONG_POLL_SECS.to_string()),
                ("allowed_updates", "[\"message\"]".to_string()),
            ])
            .send()
            .await
            .map_err(|source| RelayError::Http { service: SERVICE, source })?;

        Ok(Self::unwrap_response(resp).await?.unwrap_or_default())
    }
}

#[async_trait]
impl ChatTransport for TelegramClient {
    async fn send(&self, to: SubscriberId, text: &str) -> RelayResult<()> {
        self.send_message(to, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_deserialize() {
        let raw = r#"{
            "ok": true,
            "result": [
                {"update_id": 10, "message": {"message_id": 1, "chat": {"id": 42, "type": "private"}, "from": {"id": 42, "is_bot": false, "first_name": "A"}, "text": "/start"}},
                {"update_id": 11, "edited_message": {"message_id": 1}}
            ]
        }"#;
        let body: ApiResponse<Vec<Update>> = serde_json::from_str(raw).unwrap();
        let updates = body.result.unwrap();
        assert_eq!(updates.len(), 2);
        let msg = updates[0].message.as_ref().unwrap();
        assert_eq!(msg.chat.id, 42);
        assert_eq!(msg.text.as_deref(), Some("/start"));
        assert!(updates[1].message.is_none());
    }

    #[test]
    fn test_generic_result_without_default() {
        #[derive(Debug, Deserialize)]
        struct NoDefault {
            id: i64,
        }

        let ok: ApiResponse<NoDefault> =
            serde_json::from_str(r#"{"ok": true, "result": {"id": 5}}"#).unwrap();
        assert_eq!(ok.result.unwrap().id, 5);

        let missing: ApiResponse<NoDefault> =
            serde_json::from_str(r#"{"ok": false, "description": "Bad Request"}"#).unwrap();
        assert!(missing.result.is_none());
    }

    #[test]
    fn test_error_response_deserialize() {
        let raw = r#"{"ok": false, "error_code": 403, "description": "Forbidden: bot was blocked by the user"}"#;
        let body: ApiResponse<serde_json::Value> = serde_json::from_str(raw).unwrap();
        assert!(!body.ok);
        assert!(body.description.unwrap().contains("blocked"));
    }

    #[test]
    fn test_debug_hides_token() {
        let client = TelegramClient::new("123:secret");
        assert!(!format!("{:?}", client).contains("secret"));
    }
}
