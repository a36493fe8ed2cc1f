#[cfg(test)]
#[path = "store_test.rs"]
mod tests;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};

use eyre::{Context, Result};

use crate::models::{ChatMessage, ConversationContext, PredefinedPrompt, Role, UserId};
use crate::storage::ArcStorage;

pub type Chats = HashMap<UserId, ConversationContext>;

/// In-memory conversation contexts keyed by user. Every access goes through
/// one mutex which is only ever held inside synchronous closures, never
/// across an await point.
pub struct ChatStore {
    default_model: RwLock<String>,
    chats: Mutex<Chats>,
}

impl ChatStore {
    pub fn new(default_model: impl Into<String>) -> Self {
        Self {
            default_model: RwLock::new(default_model.into()),
            chats: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, user_id: UserId) -> Option<ConversationContext> {
        self.lock().get(&user_id).cloned()
    }

    pub fn set(&self, user_id: UserId, context: ConversationContext) {
        self.lock().insert(user_id, context);
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.lock().contains_key(&user_id)
    }

    /// Exclusive access to the whole mapping for compound updates.
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut Chats) -> R) -> R {
        let mut chats = self.lock();
        f(&mut chats)
    }

    /// Runs `f` on the user's context, creating an empty one with the
    /// current default model on first use.
    pub fn with_context<R>(&self, user_id: UserId, f: impl FnOnce(&mut ConversationContext) -> R) -> R {
        let model = self.default_model();
        self.with_lock(|chats| {
            let context = chats
                .entry(user_id)
                .or_insert_with(|| ConversationContext::new(model));
            f(context)
        })
    }

    pub fn default_model(&self) -> String {
        self.default_model
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Switches the model used by new contexts and by every existing one.
    pub fn set_default_model(&self, model: &str) {
        *self
            .default_model
            .write()
            .unwrap_or_else(PoisonError::into_inner) = model.to_string();
        self.with_lock(|chats| {
            for context in chats.values_mut() {
                context.set_model(model);
            }
        });
    }

    /// Resolves the user's prompt and writes it into their context. A prompt
    /// picked for the session only wins over the persisted preference.
    pub async fn ensure_system_prompt(&self, storage: &ArcStorage, user_id: UserId) -> Result<()> {
        let persisted = resolve_system_prompt(storage, user_id).await?;
        self.with_context(user_id, |context| apply_preferred_prompt(context, persisted));
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Chats> {
        self.chats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Makes `prompt` the leading system message, overwriting the existing one
/// instead of adding a second.
pub fn apply_system_prompt(messages: &mut Vec<ChatMessage>, prompt: &str) {
    match messages.first_mut() {
        Some(first) if first.role() == Role::System => first.set_content(prompt),
        _ => messages.insert(0, ChatMessage::new_system(prompt)),
    }
}

/// Applies the session-only prompt of `context`, or `persisted` when it
/// has none.
pub fn apply_preferred_prompt(context: &mut ConversationContext, persisted: String) {
    let prompt = context
        .session_prompt()
        .map(str::to_string)
        .unwrap_or(persisted);
    apply_system_prompt(context.messages_mut(), &prompt);
}

/// The persisted prompt preference of a user: the selected global prompt,
/// or the default one when nothing (or something since deleted) is selected.
pub async fn resolve_system_prompt(storage: &ArcStorage, user_id: UserId) -> Result<String> {
    let default = PredefinedPrompt::default_prompt().prompt.to_string();

    let Some(prompt_id) = storage
        .get_selected_prompt(user_id)
        .await
        .wrap_err("getting selected prompt")?
    else {
        return Ok(default);
    };

    match storage
        .get_global_prompt(prompt_id)
        .await
        .wrap_err("getting global prompt")?
    {
        Some(prompt) => Ok(prompt.prompt),
        None => {
            log::warn!(
                "User {} selected prompt {} which no longer exists",
                user_id,
                prompt_id
            );
            Ok(default)
        }
    }
}
