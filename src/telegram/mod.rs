pub mod client;
pub mod error;
pub mod types;

pub use client::TelegramClient;
pub use error::TelegramError;
pub use types::*;

#[cfg(test)]
use mockall::automock;

use crate::models::{ChatId, MessageId};
use async_trait::async_trait;
use eyre::Result;
use std::sync::Arc;

/// The operations a turn needs from the chat platform.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChatPlatform {
    /// Sends a Markdown formatted message.
    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<MessageId>;
    /// Replaces the text of a message sent earlier. Markdown formatted.
    async fn edit_message(&self, chat_id: ChatId, message_id: MessageId, text: &str)
    -> Result<()>;
    /// Sends text without any parse mode.
    async fn send_plain(&self, chat_id: ChatId, text: &str) -> Result<MessageId>;
    /// Replaces the text of a message sent earlier, without any parse mode.
    async fn edit_plain(&self, chat_id: ChatId, message_id: MessageId, text: &str) -> Result<()>;
    async fn send_typing(&self, chat_id: ChatId) -> Result<()>;
    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>>;
}

pub type ArcChatPlatform = Arc<dyn ChatPlatform + Send + Sync>;
