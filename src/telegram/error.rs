use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("telegram api error ({code}): {description}")]
    Api { code: i64, description: String },

    #[error("telegram api returned no result for {0}")]
    EmptyResult(String),

    #[error("file {0} has no download path")]
    MissingFilePath(String),
}
