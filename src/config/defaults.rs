use super::constants::*;

pub(crate) fn log_level() -> Option<String> {
    Some("info".to_string())
}

pub(crate) fn ollama_endpoint() -> String {
    OLLAMA_ENDPOINT.to_string()
}

pub(crate) fn telegram_endpoint() -> String {
    TELEGRAM_ENDPOINT.to_string()
}

pub(crate) fn request_timeout_secs() -> u64 {
    REQUEST_TIMEOUT_SECS
}

pub(crate) fn connect_timeout_secs() -> u64 {
    CONNECT_TIMEOUT_SECS
}

pub(crate) fn poll_timeout_secs() -> u64 {
    POLL_TIMEOUT_SECS
}

pub(crate) fn history_token_budget() -> usize {
    HISTORY_TOKEN_BUDGET
}

pub(crate) fn max_sessions() -> usize {
    MAX_SESSIONS_PER_USER
}

pub(crate) fn db_file_path() -> Option<String> {
    Some(DB_FILE_PATH.to_string())
}
