#[cfg(test)]
#[path = "client_test.rs"]
mod tests;

use async_trait::async_trait;
use eyre::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time;

use crate::config::constants::{POLL_TIMEOUT_SECS, TELEGRAM_ENDPOINT};
use crate::config::{TelegramConfig, user_agent};
use crate::models::{ChatId, MessageId};
use crate::telegram::{
    ApiResponse, BotCommand, ChatPlatform, File, Message, TelegramError, Update, User,
};

const PARSE_MODE: &str = "Markdown";

/// Thin Bot API client over HTTPS.
pub struct TelegramClient {
    endpoint: String,
    token: String,
    poll_timeout: time::Duration,
    client: reqwest::Client,
}

impl TelegramClient {
    pub fn new(token: &str) -> Self {
        Self {
            endpoint: TELEGRAM_ENDPOINT.to_string(),
            token: token.to_string(),
            poll_timeout: time::Duration::from_secs(POLL_TIMEOUT_SECS),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    pub fn with_poll_timeout(mut self, timeout: time::Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn poll_timeout(&self) -> time::Duration {
        self.poll_timeout
    }

    pub async fn get_me(&self) -> Result<User> {
        self.call("getMe", &json!({})).await
    }

    /// Long polls for new updates. The HTTP timeout is a little longer than
    /// the poll timeout so an empty poll is never reported as an error.
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>> {
        let mut params = json!({
            "timeout": self.poll_timeout.as_secs(),
            "allowed_updates": ["message"],
        });
        if let Some(offset) = offset {
            params["offset"] = json!(offset);
        }
        let timeout = self.poll_timeout + time::Duration::from_secs(10);
        self.call_with_timeout("getUpdates", &params, Some(timeout))
            .await
    }

    pub async fn delete_webhook(&self, drop_pending_updates: bool) -> Result<bool> {
        self.call(
            "deleteWebhook",
            &json!({ "drop_pending_updates": drop_pending_updates }),
        )
        .await
    }

    pub async fn set_my_commands(&self, commands: &[BotCommand]) -> Result<bool> {
        self.call("setMyCommands", &json!({ "commands": commands }))
            .await
    }

    pub async fn get_file(&self, file_id: &str) -> Result<File> {
        self.call("getFile", &json!({ "file_id": file_id })).await
    }

    pub async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        parse_mode: Option<&str>,
    ) -> Result<Message> {
        let mut params = json!({ "chat_id": chat_id, "text": text });
        if let Some(parse_mode) = parse_mode {
            params["parse_mode"] = json!(parse_mode);
        }
        self.call("sendMessage", &params).await
    }

    pub async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        parse_mode: Option<&str>,
    ) -> Result<()> {
        let mut params = json!({ "chat_id": chat_id, "message_id": message_id, "text": text });
        if let Some(parse_mode) = parse_mode {
            params["parse_mode"] = json!(parse_mode);
        }
        // The result is either the edited message or `true`.
        let _: serde_json::Value = self.call("editMessageText", &params).await?;
        Ok(())
    }

    pub async fn send_chat_action(&self, chat_id: ChatId, action: &str) -> Result<bool> {
        self.call(
            "sendChatAction",
            &json!({ "chat_id": chat_id, "action": action }),
        )
        .await
    }

    async fn call<T, P>(&self, method: &str, params: &P) -> Result<T>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        self.call_with_timeout(method, params, None).await
    }

    async fn call_with_timeout<T, P>(
        &self,
        method: &str,
        params: &P,
        timeout: Option<time::Duration>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let mut req = self
            .client
            .post(format!("{}/bot{}/{}", self.endpoint, self.token, method))
            .header("User-Agent", user_agent())
            .json(params);

        if let Some(timeout) = timeout {
            req = req.timeout(timeout);
        }

        let res = req
            .send()
            .await
            .wrap_err(format!("calling {}", method))?;

        let http_code = res.status().as_u16();
        let body = res
            .text()
            .await
            .wrap_err(format!("reading {} response", method))?;
        log::trace!("{} response: {}", method, body);

        let res = serde_json::from_str::<ApiResponse<T>>(&body)
            .wrap_err(format!("parsing {} response: {}", method, body))?;

        if !res.ok {
            return Err(TelegramError::Api {
                code: res.error_code.unwrap_or(http_code as i64),
                description: res.description.unwrap_or_default(),
            }
            .into());
        }

        match res.result {
            Some(result) => Ok(result),
            None => Err(TelegramError::EmptyResult(method.to_string()).into()),
        }
    }
}

impl From<&TelegramConfig> for TelegramClient {
    fn from(value: &TelegramConfig) -> Self {
        TelegramClient::new(&value.token)
            .with_endpoint(&value.endpoint)
            .with_poll_timeout(time::Duration::from_secs(value.poll_timeout_secs))
    }
}

#[async_trait]
impl ChatPlatform for TelegramClient {
    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<MessageId> {
        let message = self.send_text(chat_id, text, Some(PARSE_MODE)).await?;
        Ok(message.message_id)
    }

    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
    ) -> Result<()> {
        self.edit_text(chat_id, message_id, text, Some(PARSE_MODE))
            .await
    }

    async fn send_plain(&self, chat_id: ChatId, text: &str) -> Result<MessageId> {
        let message = self.send_text(chat_id, text, None).await?;
        Ok(message.message_id)
    }

    async fn edit_plain(&self, chat_id: ChatId, message_id: MessageId, text: &str) -> Result<()> {
        self.edit_text(chat_id, message_id, text, None).await
    }

    async fn send_typing(&self, chat_id: ChatId) -> Result<()> {
        self.send_chat_action(chat_id, "typing").await?;
        Ok(())
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>> {
        let file = self.get_file(file_id).await.wrap_err("getting file info")?;
        let path = file
            .file_path
            .ok_or_else(|| TelegramError::MissingFilePath(file_id.to_string()))?;

        let res = self
            .client
            .get(format!("{}/file/bot{}/{}", self.endpoint, self.token, path))
            .header("User-Agent", user_agent())
            .send()
            .await
            .wrap_err("downloading file")?;

        if !res.status().is_success() {
            return Err(TelegramError::Api {
                code: res.status().as_u16() as i64,
                description: format!("downloading {}", path),
            }
            .into());
        }

        let bytes = res.bytes().await.wrap_err("reading file body")?;
        Ok(bytes.to_vec())
    }
}
