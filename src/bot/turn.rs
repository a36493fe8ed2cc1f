#[cfg(test)]
#[path = "turn_test.rs"]
mod tests;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use eyre::{Context, Result};

use crate::bot::Bot;
use crate::bot::thread::{collect_thread, format_thread, is_addressed};
use crate::models::{ChatId, ChatMessage, GenerateRequest, Role};
use crate::state::{apply_preferred_prompt, resolve_system_prompt};
use crate::stream::stream_reply;
use crate::telegram::{Message, User};

impl Bot {
    /// Anything that is not a command. Private chats always get an answer,
    /// groups only when the bot is addressed, with the reply thread as prompt.
    pub(crate) async fn handle_message(&self, message: &Message, user: &User) -> Result<()> {
        let prompt = if message.chat.is_private() {
            message.text_or_caption().unwrap_or_default().to_string()
        } else if message.chat.is_group() && is_addressed(message, &self.me) {
            format_thread(&collect_thread(message), self.me.id)
        } else {
            return Ok(());
        };

        let images = self.download_images(message).await?;
        if prompt.trim().is_empty() && images.is_empty() {
            return Ok(());
        }

        self.run_turn(user, message.chat.id, prompt, images).await
    }

    /// One generation turn: extend the context, stream the reply and keep it.
    pub(crate) async fn run_turn(
        &self,
        user: &User,
        chat_id: ChatId,
        prompt: String,
        images: Vec<String>,
    ) -> Result<()> {
        if let Err(err) = self.chat.send_typing(chat_id).await {
            log::warn!("Could not send typing action to {}: {}", chat_id, err);
        }

        let persisted = resolve_system_prompt(&self.storage, user.id).await?;
        let (session_id, request) = self.store.with_context(user.id, |context| {
            apply_preferred_prompt(context, persisted);
            context.push_message(ChatMessage::new_user(prompt.as_str()).with_images(images));
            (
                context.active_session_id().map(str::to_string),
                GenerateRequest::from(&*context),
            )
        });

        self.storage
            .save_turn(user.id, session_id.clone(), Role::User, &prompt)
            .await
            .wrap_err("saving user turn")?;

        log::info!(
            "Generating with {} for {} ({})",
            request.model(),
            user.full_name(),
            user.id
        );
        let reply = stream_reply(&self.backend, &self.chat, chat_id, request).await?;
        if reply.is_empty() {
            log::warn!("Empty reply for user {}", user.id);
            return Ok(());
        }
        log::debug!("Reply for {}: {}", user.id, reply);

        self.store.with_context(user.id, |context| {
            context.push_message(ChatMessage::new_assistant(reply.as_str()));
        });
        self.storage
            .save_turn(user.id, session_id, Role::Assistant, &reply)
            .await
            .wrap_err("saving assistant turn")?;

        Ok(())
    }

    async fn download_images(&self, message: &Message) -> Result<Vec<String>> {
        let Some(photo) = message.largest_photo() else {
            return Ok(vec![]);
        };
        let bytes = self
            .chat
            .download_file(&photo.file_id)
            .await
            .wrap_err("downloading photo")?;
        Ok(vec![STANDARD.encode(bytes)])
    }
}
