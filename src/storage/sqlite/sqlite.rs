#[cfg(test)]
#[path = "sqlite_test.rs"]
mod tests;

use std::str::FromStr;

use async_trait::async_trait;
use eyre::{Context, Result};
use tokio_rusqlite::{Connection, OpenFlags, named_params, params};

use crate::models::{
    GlobalPrompt, Role, UserId,
    storage::{AllowedUser, Session, Turn},
};
use crate::storage::Storage;

use super::migration::MIGRATION;

pub struct Sqlite {
    conn: Connection,
}

impl Sqlite {
    pub async fn new(path: Option<&str>) -> Result<Self> {
        let conn = match path {
            Some(path) => Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
            )
            .await
            .wrap_err(format!("opening database path: {}", path))?,
            None => Connection::open_in_memory()
                .await
                .wrap_err("opening in-memory database")?,
        };

        let ret = Self { conn };
        ret.run_migration().await.wrap_err("running migration")?;
        Ok(ret)
    }

    async fn run_migration(&self) -> Result<()> {
        self.conn
            .call(|conn| Ok(conn.execute_batch(MIGRATION)?))
            .await
            .wrap_err("executing migration")?;
        Ok(())
    }
}

#[async_trait]
impl Storage for Sqlite {
    async fn save_turn(
        &self,
        user_id: UserId,
        session_id: Option<String>,
        role: Role,
        content: &str,
    ) -> Result<()> {
        let Some(session_id) = session_id else {
            return Ok(());
        };

        let content = content.to_string();
        let created_at = chrono::Utc::now().timestamp_millis();
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO chats (session_id, user_id, role, content, created_at)
                VALUES (:session_id, :user_id, :role, :content, :created_at)"#,
                    named_params! {
                        ":session_id": session_id,
                        ":user_id": user_id,
                        ":role": role.as_str(),
                        ":content": content,
                        ":created_at": created_at,
                    },
                )?;
                Ok(())
            })
            .await
            .wrap_err("saving chat turn")?;
        Ok(())
    }

    async fn load_recent_turns(&self, session_id: &str, token_budget: usize) -> Result<Vec<Turn>> {
        let session_id = session_id.to_string();
        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare("SELECT role, content FROM chats WHERE session_id = ? ORDER BY id DESC")?;
                let mut rows = stmt.query(params![session_id])?;

                let mut turns: Vec<(String, String)> = vec![];
                while let Some(row) = rows.next()? {
                    turns.push((row.get(0)?, row.get(1)?));
                }
                Ok(turns)
            })
            .await
            .wrap_err("loading chat history")?;

        let mut total_tokens = 0;
        let mut history = vec![];
        for (role, content) in rows {
            let tokens = approximate_tokens(&content);
            if total_tokens + tokens > token_budget {
                break;
            }
            total_tokens += tokens;

            match Role::from_str(&role) {
                Ok(role) => history.push(Turn::new(role, content)),
                Err(err) => log::warn!("Skipping stored turn: {}", err),
            }
        }

        history.reverse();
        Ok(history)
    }

    async fn get_selected_prompt(&self, user_id: UserId) -> Result<Option<i64>> {
        let selected = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare("SELECT selected_prompt_id FROM users WHERE id = ?")?;
                let mut rows = stmt.query(params![user_id])?;
                let selected: Option<i64> = match rows.next()? {
                    Some(row) => row.get(0)?,
                    None => None,
                };
                Ok(selected)
            })
            .await
            .wrap_err("getting selected prompt")?;
        Ok(selected)
    }

    async fn set_selected_prompt(&self, user_id: UserId, prompt_id: Option<i64>) -> Result<()> {
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                // Admins are not necessarily in the users table.
                tx.execute(
                    "INSERT OR IGNORE INTO users (id, name) VALUES (?, ?)",
                    params![user_id, format!("User {}", user_id)],
                )?;
                tx.execute(
                    "UPDATE users SET selected_prompt_id = ? WHERE id = ?",
                    params![prompt_id, user_id],
                )?;
                Ok(tx.commit()?)
            })
            .await
            .wrap_err("setting selected prompt")?;
        Ok(())
    }

    async fn add_user(&self, user_id: UserId, name: &str) -> Result<bool> {
        let name = name.to_string();
        let affected_rows = self
            .conn
            .call(move |conn| {
                Ok(conn.execute(
                    "INSERT OR IGNORE INTO users (id, name) VALUES (?, ?)",
                    params![user_id, name],
                )?)
            })
            .await
            .wrap_err("adding user")?;
        Ok(affected_rows > 0)
    }

    async fn remove_user(&self, user_id: UserId) -> Result<bool> {
        let affected_rows = self
            .conn
            .call(move |conn| Ok(conn.execute("DELETE FROM users WHERE id = ?", params![user_id])?))
            .await
            .wrap_err("removing user")?;
        Ok(affected_rows > 0)
    }

    async fn list_users(&self) -> Result<Vec<AllowedUser>> {
        let users = self
            .conn
            .call(|conn| {
                let mut stmt =
                    conn.prepare("SELECT id, name, selected_prompt_id FROM users ORDER BY id")?;
                let mut rows = stmt.query([])?;

                let mut users = vec![];
                while let Some(row) = rows.next()? {
                    users.push(AllowedUser {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        selected_prompt_id: row.get(2)?,
                    });
                }
                Ok(users)
            })
            .await
            .wrap_err("listing users")?;
        Ok(users)
    }

    async fn is_user_allowed(&self, user_id: UserId) -> Result<bool> {
        let allowed = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare("SELECT 1 FROM users WHERE id = ?")?;
                Ok(stmt.exists(params![user_id])?)
            })
            .await
            .wrap_err("checking user")?;
        Ok(allowed)
    }

    async fn add_global_prompt(&self, name: &str, prompt: &str) -> Result<i64> {
        let name = name.to_string();
        let prompt = prompt.to_string();
        let created_at = chrono::Utc::now().timestamp_millis();
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO system_prompts (name, prompt, is_global, created_at)
                VALUES (:name, :prompt, 1, :created_at)"#,
                    named_params! {
                        ":name": name,
                        ":prompt": prompt,
                        ":created_at": created_at,
                    },
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .wrap_err("adding global prompt")?;
        Ok(id)
    }

    async fn list_global_prompts(&self) -> Result<Vec<GlobalPrompt>> {
        let prompts = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, name, prompt FROM system_prompts WHERE is_global = 1 ORDER BY id",
                )?;
                let mut rows = stmt.query([])?;

                let mut prompts = vec![];
                while let Some(row) = rows.next()? {
                    prompts.push(GlobalPrompt {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        prompt: row.get(2)?,
                    });
                }
                Ok(prompts)
            })
            .await
            .wrap_err("listing global prompts")?;
        Ok(prompts)
    }

    async fn get_global_prompt(&self, id: i64) -> Result<Option<GlobalPrompt>> {
        let prompt = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, name, prompt FROM system_prompts WHERE id = ? AND is_global = 1",
                )?;
                let mut rows = stmt.query(params![id])?;

                let mut prompt = None;
                if let Some(row) = rows.next()? {
                    prompt = Some(GlobalPrompt {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        prompt: row.get(2)?,
                    });
                }
                Ok(prompt)
            })
            .await
            .wrap_err("getting global prompt")?;
        Ok(prompt)
    }

    async fn delete_global_prompt(&self, id: i64) -> Result<bool> {
        let affected_rows = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let affected_rows =
                    tx.execute("DELETE FROM system_prompts WHERE id = ?", params![id])?;
                tx.execute(
                    "UPDATE users SET selected_prompt_id = NULL WHERE selected_prompt_id = ?",
                    params![id],
                )?;
                tx.commit()?;
                Ok(affected_rows)
            })
            .await
            .wrap_err("deleting global prompt")?;
        Ok(affected_rows > 0)
    }

    async fn create_session(&self, user_id: UserId, name: &str) -> Result<Session> {
        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
        };
        let id = session.id.clone();
        let name = session.name.clone();
        let created_at = chrono::Utc::now().timestamp_millis();
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO chat_sessions (session_id, user_id, name, created_at)
                VALUES (:session_id, :user_id, :name, :created_at)"#,
                    named_params! {
                        ":session_id": id,
                        ":user_id": user_id,
                        ":name": name,
                        ":created_at": created_at,
                    },
                )?;
                Ok(())
            })
            .await
            .wrap_err("creating chat session")?;
        Ok(session)
    }

    async fn get_session(&self, user_id: UserId, session_id: &str) -> Result<Option<Session>> {
        let session_id = session_id.to_string();
        let session = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT session_id, name FROM chat_sessions WHERE session_id = ? AND user_id = ?",
                )?;
                let mut rows = stmt.query(params![session_id, user_id])?;

                let mut session = None;
                if let Some(row) = rows.next()? {
                    session = Some(Session {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    });
                }
                Ok(session)
            })
            .await
            .wrap_err("getting chat session")?;
        Ok(session)
    }

    async fn list_sessions(&self, user_id: UserId) -> Result<Vec<Session>> {
        let sessions = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT session_id, name FROM chat_sessions WHERE user_id = ?
                ORDER BY created_at DESC, rowid DESC"#,
                )?;
                let mut rows = stmt.query(params![user_id])?;

                let mut sessions = vec![];
                while let Some(row) = rows.next()? {
                    sessions.push(Session {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    });
                }
                Ok(sessions)
            })
            .await
            .wrap_err("listing chat sessions")?;
        Ok(sessions)
    }

    async fn delete_session(&self, user_id: UserId, session_id: &str) -> Result<bool> {
        let session_id = session_id.to_string();
        let affected_rows = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "DELETE FROM chats WHERE session_id = ? AND user_id = ?",
                    params![session_id, user_id],
                )?;
                let affected_rows = tx.execute(
                    "DELETE FROM chat_sessions WHERE session_id = ? AND user_id = ?",
                    params![session_id, user_id],
                )?;
                tx.commit()?;
                Ok(affected_rows)
            })
            .await
            .wrap_err("deleting chat session")?;
        Ok(affected_rows > 0)
    }
}

/// Rough token estimate of a stored turn: 1.33 tokens per word.
pub(crate) fn approximate_tokens(content: &str) -> usize {
    (content.split_whitespace().count() as f64 * 1.33) as usize
}
