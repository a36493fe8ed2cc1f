#[cfg(test)]
#[path = "handler_test.rs"]
mod tests;

use eyre::{Context, Result};

use crate::bot::{Bot, Command};
use crate::models::prompt::{DEFAULT_PROMPT_KEY, PREDEFINED_PROMPTS};
use crate::models::{ChatId, ChatMessage, PredefinedPrompt, Role, UserId};
use crate::state::apply_system_prompt;
use crate::telegram::User;

impl Bot {
    pub(crate) async fn dispatch(&self, chat_id: ChatId, user: &User, command: Command) -> Result<()> {
        log::debug!("User {} runs {:?}", user.id, command);
        match command {
            Command::Start => self.start(chat_id, user).await,
            Command::History => self.history(chat_id, user.id).await,
            Command::Reset => self.reset(chat_id, user.id).await,
            Command::Prompts => self.prompts(chat_id).await,
            Command::Prompt(key) => self.select_prompt(chat_id, user.id, &key).await,
            Command::Chats => self.chats(chat_id, user.id).await,
            Command::NewChat(name) => self.new_chat(chat_id, user.id, &name).await,
            Command::SwitchChat(id) => self.switch_chat(chat_id, user.id, &id).await,
            Command::DeleteChat(id) => self.delete_chat(chat_id, user.id, &id).await,
            Command::AddUser { id, name } => self.add_user(chat_id, id, name).await,
            Command::RemoveUser(id) => self.remove_user(chat_id, id).await,
            Command::ListUsers => self.list_users(chat_id).await,
            Command::AddPrompt { name, prompt } => self.add_prompt(chat_id, &name, &prompt).await,
            Command::RemovePrompt(id) => self.remove_prompt(chat_id, id).await,
            Command::Model(model) => self.switch_model(chat_id, &model).await,
        }
    }

    pub(crate) async fn start(&self, chat_id: ChatId, user: &User) -> Result<()> {
        self.reply(chat_id, &format!("Welcome, {}!", user.full_name()))
            .await
    }

    async fn history(&self, chat_id: ChatId, user_id: UserId) -> Result<()> {
        let Some(context) = self.store.get(user_id) else {
            return self
                .reply(chat_id, "No chat history available for this user")
                .await;
        };

        let history: String = context
            .messages()
            .iter()
            .map(|m| format!("{}: {}\n", role_label(m.role()), m.content()))
            .collect();
        self.reply(chat_id, &history).await
    }

    async fn reset(&self, chat_id: ChatId, user_id: UserId) -> Result<()> {
        self.start_fresh_context(user_id, None, vec![]).await?;
        log::info!("Chat has been reset for {}", user_id);
        self.reply(chat_id, "✅ Chat reset. You are now in a temporary chat.")
            .await
    }

    async fn prompts(&self, chat_id: ChatId) -> Result<()> {
        let global = self
            .storage
            .list_global_prompts()
            .await
            .wrap_err("listing global prompts")?;

        let mut text = String::from("Select a system prompt with /prompt <key|id>:\n\n");
        for prompt in PREDEFINED_PROMPTS {
            text.push_str(&format!("🤖 {}: {}\n", prompt.key, prompt.name));
        }
        for prompt in global {
            text.push_str(&format!("👤 {}: {}\n", prompt.id, prompt.name));
        }
        self.reply(chat_id, &text).await
    }

    /// Global prompts and the default one are remembered across restarts.
    /// Any other predefined prompt only lives in the current context.
    async fn select_prompt(&self, chat_id: ChatId, user_id: UserId, key: &str) -> Result<()> {
        if let Ok(id) = key.parse::<i64>() {
            let Some(prompt) = self
                .storage
                .get_global_prompt(id)
                .await
                .wrap_err("getting global prompt")?
            else {
                return self
                    .reply(chat_id, &format!("⚠️ Prompt {} not found.", id))
                    .await;
            };
            return self
                .persist_prompt(chat_id, user_id, Some(id), &prompt.name)
                .await;
        }

        let Some(predefined) = PredefinedPrompt::find(key) else {
            return self
                .reply(chat_id, &format!("⚠️ Unknown prompt: {}", key))
                .await;
        };

        if predefined.key == DEFAULT_PROMPT_KEY {
            return self
                .persist_prompt(chat_id, user_id, None, predefined.name)
                .await;
        }

        self.store.with_context(user_id, |context| {
            context.set_session_prompt(Some(predefined.prompt.to_string()));
            apply_system_prompt(context.messages_mut(), predefined.prompt);
        });
        self.reply(
            chat_id,
            &format!("✅ Switched to: {} (session only)", predefined.name),
        )
        .await
    }

    async fn persist_prompt(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        prompt_id: Option<i64>,
        name: &str,
    ) -> Result<()> {
        self.storage
            .set_selected_prompt(user_id, prompt_id)
            .await
            .wrap_err("saving selected prompt")?;
        self.store
            .with_context(user_id, |context| context.set_session_prompt(None));
        self.store
            .ensure_system_prompt(&self.storage, user_id)
            .await?;
        self.reply(
            chat_id,
            &format!("✅ System prompt changed to: {} (persistent)", name),
        )
        .await
    }

    async fn chats(&self, chat_id: ChatId, user_id: UserId) -> Result<()> {
        let sessions = self
            .storage
            .list_sessions(user_id)
            .await
            .wrap_err("listing chats")?;
        let active = self
            .store
            .get(user_id)
            .and_then(|c| c.active_session_id().map(str::to_string));

        let mut text = String::from("💬 Chat Management\n\n");
        if sessions.is_empty() {
            text.push_str("No saved chats yet.\n");
        }
        for session in &sessions {
            let marker = if active.as_deref() == Some(session.id.as_str()) {
                " (active)"
            } else {
                ""
            };
            text.push_str(&format!("- {}{}: {}\n", session.name, marker, session.id));
        }

        if sessions.len() < self.context.max_sessions {
            text.push_str("\n➕ /newchat <name> starts a saved chat.");
        } else {
            text.push_str("\n⚠️ Chats limit reached.");
        }
        text.push_str("\n/switchchat <id> loads one.");
        self.reply(chat_id, &text).await
    }

    async fn new_chat(&self, chat_id: ChatId, user_id: UserId, name: &str) -> Result<()> {
        let sessions = self
            .storage
            .list_sessions(user_id)
            .await
            .wrap_err("listing chats")?;
        if sessions.len() >= self.context.max_sessions {
            return self
                .reply(chat_id, "⚠️ Chats limit reached. Delete a chat first.")
                .await;
        }

        let session = self
            .storage
            .create_session(user_id, name)
            .await
            .wrap_err("creating chat")?;
        self.start_fresh_context(user_id, Some(session.id), vec![])
            .await?;
        self.reply(
            chat_id,
            &format!(
                "✅ Chat '{}' created. This conversation will now be saved.",
                session.name
            ),
        )
        .await
    }

    async fn switch_chat(&self, chat_id: ChatId, user_id: UserId, session_id: &str) -> Result<()> {
        let Some(session) = self
            .storage
            .get_session(user_id, session_id)
            .await
            .wrap_err("getting chat")?
        else {
            return self.reply(chat_id, "⚠️ Chat not found.").await;
        };

        let history = self
            .storage
            .load_recent_turns(&session.id, self.context.history_token_budget)
            .await
            .wrap_err("loading chat history")?
            .into_iter()
            .map(|turn| ChatMessage::new(turn.role, turn.content))
            .collect();
        self.start_fresh_context(user_id, Some(session.id), history)
            .await?;
        self.reply(
            chat_id,
            &format!("✅ Chat '{}' loaded successfully.", session.name),
        )
        .await
    }

    async fn delete_chat(&self, chat_id: ChatId, user_id: UserId, session_id: &str) -> Result<()> {
        let deleted = self
            .storage
            .delete_session(user_id, session_id)
            .await
            .wrap_err("deleting chat")?;
        if !deleted {
            return self.reply(chat_id, "⚠️ Failed to delete chat.").await;
        }

        let was_active = self
            .store
            .get(user_id)
            .is_some_and(|c| c.active_session_id() == Some(session_id));
        if was_active {
            self.start_fresh_context(user_id, None, vec![]).await?;
        }
        self.reply(chat_id, "✅ Chat deleted successfully.").await
    }

    async fn add_user(&self, chat_id: ChatId, id: UserId, name: Option<String>) -> Result<()> {
        let name = name.unwrap_or_else(|| format!("User {}", id));
        let added = self
            .storage
            .add_user(id, &name)
            .await
            .wrap_err("adding user")?;
        let text = if added {
            format!("✅ User {} ({}) has been added to the allowlist.", name, id)
        } else {
            format!("⚠️ User {} is already in the allowlist.", id)
        };
        self.reply(chat_id, &text).await
    }

    async fn remove_user(&self, chat_id: ChatId, id: UserId) -> Result<()> {
        let removed = self
            .storage
            .remove_user(id)
            .await
            .wrap_err("removing user")?;
        let text = if removed {
            format!("✅ User {} has been removed from the allowlist.", id)
        } else {
            format!("⚠️ User {} was not found in the allowlist.", id)
        };
        self.reply(chat_id, &text).await
    }

    async fn list_users(&self, chat_id: ChatId) -> Result<()> {
        let users = self.storage.list_users().await.wrap_err("listing users")?;
        if users.is_empty() {
            return self
                .reply(chat_id, "No users found in the allowlist.")
                .await;
        }

        let mut text = String::from("👥 Allowed Users:\n\n");
        for user in users {
            text.push_str(&format!("- {}: {}\n", user.id, user.name));
        }
        self.reply(chat_id, &text).await
    }

    async fn add_prompt(&self, chat_id: ChatId, name: &str, prompt: &str) -> Result<()> {
        let id = self
            .storage
            .add_global_prompt(name, prompt)
            .await
            .wrap_err("adding global prompt")?;
        self.reply(
            chat_id,
            &format!("✅ Prompt '{}' added with id {}.", name, id),
        )
        .await
    }

    async fn remove_prompt(&self, chat_id: ChatId, id: i64) -> Result<()> {
        let deleted = self
            .storage
            .delete_global_prompt(id)
            .await
            .wrap_err("deleting global prompt")?;
        let text = if deleted {
            format!("✅ Prompt {} deleted.", id)
        } else {
            format!("⚠️ Prompt {} not found.", id)
        };
        self.reply(chat_id, &text).await
    }

    async fn switch_model(&self, chat_id: ChatId, model: &str) -> Result<()> {
        self.store.set_default_model(model);
        log::info!("Model changed to {}", model);
        self.reply(chat_id, &format!("✅ Model changed to: {}", model))
            .await
    }

    /// Replaces the user's context with `history` under `session_id`,
    /// dropping any session-only prompt.
    async fn start_fresh_context(
        &self,
        user_id: UserId,
        session_id: Option<String>,
        history: Vec<ChatMessage>,
    ) -> Result<()> {
        self.store.with_context(user_id, |context| {
            *context.messages_mut() = history;
            context.set_active_session_id(session_id);
            context.set_session_prompt(None);
        });
        self.store
            .ensure_system_prompt(&self.storage, user_id)
            .await
    }
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::System => "System",
        Role::User => "User",
        Role::Assistant => "Assistant",
    }
}
