pub mod auth;
pub mod command;
pub mod handler;
pub mod poller;
pub mod thread;
pub mod turn;

pub use auth::{Access, Authorizer};
pub use command::{BOT_COMMANDS, Command, UsageError};
pub use poller::Poller;

#[cfg(test)]
#[path = "bot_test.rs"]
mod tests;

use eyre::{Context, Result};

use crate::backend::ArcBackend;
use crate::config::ContextConfig;
use crate::models::ChatId;
use crate::state::{ChatStore, Ticket, TurnGate};
use crate::storage::ArcStorage;
use crate::stream::chunk_message;
use crate::telegram::{ArcChatPlatform, Message, Update, User};

/// An update holding its sender's place in line.
pub struct Queued {
    update: Update,
    ticket: Option<Ticket>,
}

/// Routes Telegram updates to commands or to a generation turn.
pub struct Bot {
    me: User,
    chat: ArcChatPlatform,
    backend: ArcBackend,
    storage: ArcStorage,
    store: ChatStore,
    gate: TurnGate,
    authorizer: Authorizer,
    context: ContextConfig,
}

impl Bot {
    pub fn new(
        me: User,
        chat: ArcChatPlatform,
        backend: ArcBackend,
        storage: ArcStorage,
        default_model: &str,
    ) -> Self {
        Self {
            me,
            chat,
            backend,
            authorizer: Authorizer::new(storage.clone()),
            storage,
            store: ChatStore::new(default_model),
            gate: TurnGate::new(),
            context: ContextConfig::default(),
        }
    }

    pub fn with_authorizer(mut self, authorizer: Authorizer) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn with_context_config(mut self, context: ContextConfig) -> Self {
        self.context = context;
        self
    }

    pub fn me(&self) -> &User {
        &self.me
    }

    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    /// Handles one update end to end. Failures are logged and reported to
    /// the chat as a single plain text message.
    pub async fn handle_update(&self, update: Update) {
        self.handle(self.enqueue(update)).await
    }

    /// Reserves the sender's place in line. Updates of one user are handled
    /// in the order they were enqueued.
    pub fn enqueue(&self, update: Update) -> Queued {
        let ticket = update
            .message
            .as_ref()
            .and_then(|message| message.from.as_ref())
            .map(|user| self.gate.enter(user.id));
        Queued { update, ticket }
    }

    /// Handles an enqueued update once the sender's earlier updates are done.
    pub async fn handle(&self, queued: Queued) {
        let Queued { update, ticket } = queued;
        let (Some(message), Some(ticket)) = (update.message, ticket) else {
            return;
        };
        let Some(user) = message.from.clone() else {
            return;
        };
        let chat_id = message.chat.id;

        let _turn = ticket.wait().await;
        if let Err(err) = self.process(&message, &user).await {
            log::error!("Failed to handle update {}: {:?}", update.update_id, err);
            let text = format!("Something went wrong: {}", err);
            if let Err(err) = self.chat.send_plain(chat_id, &text).await {
                log::error!("Failed to report error to chat {}: {:?}", chat_id, err);
            }
        }
    }

    async fn process(&self, message: &Message, user: &User) -> Result<()> {
        let chat_id = message.chat.id;
        let command = message
            .text
            .as_deref()
            .and_then(|text| Command::parse(text, self.me.username.as_deref()));

        // Anyone may be greeted.
        if let Some(Ok(Command::Start)) = command {
            return self.start(chat_id, user).await;
        }

        let access = self.authorizer.check(user, &message.chat).await?;
        if let Access::Denied { notify } = access {
            return self.deny(chat_id, notify).await;
        }

        match command {
            Some(Ok(command)) => {
                if command.is_admin_only() && !access.is_admin() {
                    log::info!("User {} is not allowed to use {:?}", user.id, command);
                    return self.deny(chat_id, message.chat.is_private()).await;
                }
                self.dispatch(chat_id, user, command).await
            }
            Some(Err(usage)) => self.reply(chat_id, &usage.to_string()).await,
            None => self.handle_message(message, user).await,
        }
    }

    async fn deny(&self, chat_id: ChatId, notify: bool) -> Result<()> {
        if notify {
            self.reply(chat_id, auth::ACCESS_DENIED).await?;
        }
        Ok(())
    }

    /// Sends `text` as plain text, split into as many messages as needed.
    async fn reply(&self, chat_id: ChatId, text: &str) -> Result<()> {
        for chunk in chunk_message(text) {
            self.chat
                .send_plain(chat_id, &chunk)
                .await
                .wrap_err("sending reply")?;
        }
        Ok(())
    }
}
