/// Maximum number of text units in a single outgoing Telegram message.
pub const MAX_MESSAGE_LENGTH: usize = 4000;

/// Approximate token budget used when a saved chat is loaded back.
pub const HISTORY_TOKEN_BUDGET: usize = 4096;

/// Saved chats a single user may keep.
pub const MAX_SESSIONS_PER_USER: usize = 10;

/// Upper bound of messages collected when walking a reply chain.
pub const MAX_THREAD_DEPTH: usize = 20;

pub const OLLAMA_ENDPOINT: &str = "http://localhost:11434";

pub const TELEGRAM_ENDPOINT: &str = "https://api.telegram.org";

pub const DB_FILE_PATH: &str = "users.db";

pub const REQUEST_TIMEOUT_SECS: u64 = 3000;

pub const CONNECT_TIMEOUT_SECS: u64 = 10;

pub const POLL_TIMEOUT_SECS: u64 = 50;

pub const SHUTDOWN_TIMEOUT_SECS: u64 = 15;
