use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    /// Connecting to the server failed or the request timed out.
    #[error("backend unavailable: {0}")]
    Unavailable(#[from] reqwest::Error),

    #[error("backend stream interrupted: {0}")]
    Interrupted(#[from] std::io::Error),

    #[error("backend returned status {status}: {body}")]
    Protocol { status: u16, body: String },

    #[error("malformed stream line {line:?}: {source}")]
    MalformedLine {
        line: String,
        source: serde_json::Error,
    },

    #[error("backend error: {0}")]
    Remote(String),

    #[error("backend stream ended before the final increment")]
    IncompleteStream,
}
