use serde::{Deserialize, Serialize};

/// One NDJSON frame of a streaming chat response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationIncrement {
    #[serde(default)]
    pub message: Option<IncrementMessage>,
    #[serde(default)]
    pub done: bool,
    /// Nanoseconds, only present on the final frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncrementMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: String,
}

impl GenerationIncrement {
    pub fn delta(text: impl Into<String>) -> Self {
        Self {
            message: Some(IncrementMessage {
                role: Some("assistant".to_string()),
                content: text.into(),
            }),
            done: false,
            total_duration: None,
        }
    }

    pub fn done(total_duration: u64) -> Self {
        Self {
            message: Some(IncrementMessage {
                role: Some("assistant".to_string()),
                content: String::new(),
            }),
            done: true,
            total_duration: Some(total_duration),
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.message.as_ref().map(|m| m.content.as_str())
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.total_duration.unwrap_or_default() as f64 / 1e9
    }
}
