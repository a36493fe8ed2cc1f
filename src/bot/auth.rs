#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;

use eyre::{Context, Result};

use crate::config::TelegramConfig;
use crate::models::UserId;
use crate::storage::ArcStorage;
use crate::telegram::{Chat, User};

pub const ACCESS_DENIED: &str = "Access Denied";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Admin,
    Allowed,
    /// `notify` is false where a denial should stay silent.
    Denied { notify: bool },
}

impl Access {
    pub fn is_admin(&self) -> bool {
        matches!(self, Access::Admin)
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Access::Denied { .. })
    }
}

pub struct Authorizer {
    admin_ids: Vec<UserId>,
    allow_all_users_in_groups: bool,
    storage: ArcStorage,
}

impl Authorizer {
    pub fn new(storage: ArcStorage) -> Self {
        Self {
            admin_ids: vec![],
            allow_all_users_in_groups: false,
            storage,
        }
    }

    pub fn with_admin_ids(mut self, admin_ids: Vec<UserId>) -> Self {
        self.admin_ids = admin_ids;
        self
    }

    pub fn with_allow_all_users_in_groups(mut self, allow: bool) -> Self {
        self.allow_all_users_in_groups = allow;
        self
    }

    pub fn from_config(config: &TelegramConfig, storage: ArcStorage) -> Self {
        Self::new(storage)
            .with_admin_ids(config.admin_ids.clone())
            .with_allow_all_users_in_groups(config.allow_all_users_in_groups)
    }

    pub fn is_admin(&self, user_id: UserId) -> bool {
        self.admin_ids.contains(&user_id)
    }

    pub async fn check(&self, user: &User, chat: &Chat) -> Result<Access> {
        if self.is_admin(user.id) {
            return Ok(Access::Admin);
        }

        if chat.is_group() && self.allow_all_users_in_groups {
            return Ok(Access::Allowed);
        }

        let allowed = self
            .storage
            .is_user_allowed(user.id)
            .await
            .wrap_err("checking allowlist")?;
        if allowed {
            return Ok(Access::Allowed);
        }

        log::info!("Denied access to user {} in chat {}", user.id, chat.id);
        Ok(Access::Denied {
            notify: !chat.is_group(),
        })
    }
}
