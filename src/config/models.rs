use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::constants::{
    CONNECT_TIMEOUT_SECS, DB_FILE_PATH, HISTORY_TOKEN_BUDGET, MAX_SESSIONS_PER_USER,
    OLLAMA_ENDPOINT, POLL_TIMEOUT_SECS, REQUEST_TIMEOUT_SECS, TELEGRAM_ENDPOINT,
};

#[cfg(not(test))]
use super::CONFIG;

use super::defaults::*;

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct Configuration {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub context: ContextConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct GeneralConfig {
    #[serde(default)]
    pub verbose: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LogConfig {
    #[serde(default = "log_level")]
    pub level: Option<String>,

    #[serde(default)]
    pub filters: Option<Vec<LogFilter>>,

    /// Logs go to stderr when no file is configured.
    #[serde(default)]
    pub file: Option<LogFile>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LogFilter {
    #[serde(default)]
    pub module: Option<String>,

    #[serde(default)]
    pub level: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LogFile {
    pub path: String,

    #[serde(default)]
    pub append: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TelegramConfig {
    #[serde(default)]
    pub token: String,

    #[serde(default = "telegram_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub admin_ids: Vec<i64>,

    #[serde(default)]
    pub allow_all_users_in_groups: bool,

    #[serde(default = "poll_timeout_secs")]
    pub poll_timeout_secs: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct BackendConfig {
    #[serde(default = "ollama_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub default_model: Option<String>,

    #[serde(default = "request_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub enum StorageConfig {
    #[serde(rename = "sqlite")]
    Sqlite(SqliteStorage),
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SqliteStorage {
    #[serde(default = "db_file_path")]
    pub path: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ContextConfig {
    #[serde(default = "history_token_budget")]
    pub history_token_budget: usize,

    #[serde(default = "max_sessions")]
    pub max_sessions: usize,
}

impl Configuration {
    #[cfg(not(test))]
    pub fn instance() -> &'static Configuration {
        // Library users that never call init get the defaults.
        static FALLBACK: std::sync::OnceLock<Configuration> = std::sync::OnceLock::new();
        CONFIG
            .get()
            .unwrap_or_else(|| FALLBACK.get_or_init(Configuration::default))
    }

    #[cfg(not(test))]
    pub fn init(config: Configuration) -> Result<()> {
        CONFIG
            .set(config)
            .map_err(|_| eyre::eyre!("Config already initialized"))?;
        Ok(())
    }

    #[cfg(test)]
    pub fn instance() -> &'static Configuration {
        use super::TEST_CONFIG;
        TEST_CONFIG.with(|config| *config.borrow())
    }

    #[cfg(test)]
    pub fn init(config: Configuration) -> Result<()> {
        use super::TEST_CONFIG;
        TEST_CONFIG.with(|test_config| {
            *test_config.borrow_mut() = Box::leak(Box::new(config));
        });
        Ok(())
    }

    /// Overrides settings with the environment variables the bot has
    /// always been deployed with.
    pub fn with_env(self) -> Result<Self> {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(token) = lookup("TOKEN") {
            self.telegram.token = token;
        }

        if let Some(ids) = lookup("ADMIN_IDS") {
            self.telegram.admin_ids = parse_ids(&ids).wrap_err("parsing ADMIN_IDS")?;
        }

        if let Some(flag) = lookup("ALLOW_ALL_USERS_IN_GROUPS") {
            self.telegram.allow_all_users_in_groups = flag.trim() == "1";
        }

        if let Some(host) = lookup("OLLAMA_BASE_URL") {
            let port = lookup("OLLAMA_PORT").unwrap_or_else(|| "11434".to_string());
            self.backend.endpoint = format!("http://{}:{}", host, port);
        }

        if let Some(model) = lookup("INITMODEL") {
            self.backend.default_model = Some(model);
        }

        if let Some(timeout) = lookup("TIMEOUT") {
            self.backend.timeout_secs = timeout
                .trim()
                .parse()
                .wrap_err(format!("parsing TIMEOUT {}", timeout))?;
        }

        Ok(self)
    }
}

fn parse_ids(raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i64>().wrap_err(format!("invalid id {}", s)))
        .collect()
}

impl SqliteStorage {
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Some("info".to_string()),
            filters: None,
            file: None,
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            endpoint: TELEGRAM_ENDPOINT.to_string(),
            admin_ids: vec![],
            allow_all_users_in_groups: false,
            poll_timeout_secs: POLL_TIMEOUT_SECS,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: OLLAMA_ENDPOINT.to_string(),
            default_model: None,
            timeout_secs: REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Sqlite(SqliteStorage::default())
    }
}

impl Default for SqliteStorage {
    fn default() -> Self {
        Self {
            path: Some(DB_FILE_PATH.to_string()),
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            history_token_budget: HISTORY_TOKEN_BUDGET,
            max_sessions: MAX_SESSIONS_PER_USER,
        }
    }
}
