pub mod sqlite;

use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

use crate::{
    config::StorageConfig,
    models::{
        GlobalPrompt, Role, UserId,
        storage::{AllowedUser, Session, Turn},
    },
};
use async_trait::async_trait;
use eyre::Result;
use sqlite::Sqlite;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Storage {
    /// Does nothing when `session_id` is `None`: temporary chats are never
    /// written to disk.
    async fn save_turn(
        &self,
        user_id: UserId,
        session_id: Option<String>,
        role: Role,
        content: &str,
    ) -> Result<()>;
    /// Most recent turns of a session that fit in `token_budget`, oldest first.
    async fn load_recent_turns(&self, session_id: &str, token_budget: usize) -> Result<Vec<Turn>>;

    async fn get_selected_prompt(&self, user_id: UserId) -> Result<Option<i64>>;
    async fn set_selected_prompt(&self, user_id: UserId, prompt_id: Option<i64>) -> Result<()>;

    async fn add_user(&self, user_id: UserId, name: &str) -> Result<bool>;
    async fn remove_user(&self, user_id: UserId) -> Result<bool>;
    async fn list_users(&self) -> Result<Vec<AllowedUser>>;
    async fn is_user_allowed(&self, user_id: UserId) -> Result<bool>;

    async fn add_global_prompt(&self, name: &str, prompt: &str) -> Result<i64>;
    async fn list_global_prompts(&self) -> Result<Vec<GlobalPrompt>>;
    async fn get_global_prompt(&self, id: i64) -> Result<Option<GlobalPrompt>>;
    async fn delete_global_prompt(&self, id: i64) -> Result<bool>;

    async fn create_session(&self, user_id: UserId, name: &str) -> Result<Session>;
    async fn get_session(&self, user_id: UserId, session_id: &str) -> Result<Option<Session>>;
    async fn list_sessions(&self, user_id: UserId) -> Result<Vec<Session>>;
    async fn delete_session(&self, user_id: UserId, session_id: &str) -> Result<bool>;
}

pub type ArcStorage = Arc<dyn Storage + Send + Sync>;

pub async fn new_storage(config: &StorageConfig) -> Result<ArcStorage> {
    let storage = match config {
        StorageConfig::Sqlite(sqlite_config) => Arc::new(Sqlite::new(sqlite_config.path()).await?),
    };
    Ok(storage)
}
