#[cfg(test)]
#[path = "ollama_test.rs"]
mod tests;

use crate::backend::{ArcBackend, Backend, BackendError, IncrementStream};
use crate::config::constants::OLLAMA_ENDPOINT;
use crate::config::{BackendConfig, user_agent};
use crate::models::{ChatMessage, GenerateRequest, GenerationIncrement};
use async_trait::async_trait;
use eyre::{Context, Result, bail};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time;
use tokio::io::AsyncBufReadExt;
use tokio_util::io::StreamReader;

pub struct Ollama {
    alias: String,
    endpoint: String,
    timeout: Option<time::Duration>,
    connect_timeout: Option<time::Duration>,
}

#[async_trait]
impl Backend for Ollama {
    fn name(&self) -> &str {
        &self.alias
    }

    async fn generate(&self, request: GenerateRequest) -> Result<IncrementStream> {
        if request.model().is_empty() {
            bail!("no model is set");
        }

        let chat_req = ChatRequest::from(&request);

        let mut client = reqwest::Client::builder();
        if let Some(connect_timeout) = self.connect_timeout {
            client = client.connect_timeout(connect_timeout);
        }
        let client = client.build().wrap_err("building http client")?;

        let mut req = client
            .post(format!("{}/api/chat", self.endpoint))
            .header("Content-Type", "application/json")
            .header("User-Agent", user_agent());

        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }

        log::debug!(
            "Sending chat request: model={} messages={}",
            chat_req.model,
            chat_req.messages.len()
        );

        let res = req
            .json(&chat_req)
            .send()
            .await
            .map_err(BackendError::Unavailable)?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            log::error!("Error response: {} - {}", status, body);
            return Err(BackendError::Protocol { status, body }.into());
        }

        let stream = res.bytes_stream().map_err(|e| {
            let err_msg = e.to_string();
            std::io::Error::new(std::io::ErrorKind::Interrupted, err_msg)
        });

        let line_readers = StreamReader::new(stream).lines();

        let increments = futures::stream::unfold(line_readers, |mut lines| async move {
            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => return None,
                    Err(err) => return Some((Err(BackendError::Interrupted(err).into()), lines)),
                };

                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                log::trace!("streaming response: {}", line);
                return Some((parse_line(line), lines));
            }
        });

        Ok(Box::pin(increments))
    }
}

fn parse_line(line: &str) -> Result<GenerationIncrement> {
    let data = match serde_json::from_str::<ChatResponseLine>(line) {
        Ok(data) => data,
        Err(source) => {
            log::error!("Problematic line: {}", line);
            return Err(BackendError::MalformedLine {
                line: line.to_string(),
                source,
            }
            .into());
        }
    };

    if let Some(err) = data.error {
        log::error!("Backend reported an error: {}", err);
        return Err(BackendError::Remote(err).into());
    }

    Ok(data.increment)
}

impl From<Ollama> for ArcBackend {
    fn from(value: Ollama) -> Self {
        Arc::new(value)
    }
}

impl From<&BackendConfig> for Ollama {
    fn from(value: &BackendConfig) -> Self {
        Ollama::default()
            .with_endpoint(&value.endpoint)
            .with_timeout(time::Duration::from_secs(value.timeout_secs))
            .with_connect_timeout(time::Duration::from_secs(value.connect_timeout_secs))
    }
}

impl Ollama {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = alias.to_string();
        self
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: time::Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: time::Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Option<time::Duration> {
        self.timeout
    }

    pub fn connect_timeout(&self) -> Option<time::Duration> {
        self.connect_timeout
    }
}

impl Default for Ollama {
    fn default() -> Self {
        Self {
            alias: "Ollama".to_string(),
            endpoint: OLLAMA_ENDPOINT.to_string(),
            timeout: None,
            connect_timeout: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatRequest {
    model: String,
    messages: Vec<MessageRequest>,
    stream: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MessageRequest {
    role: String,
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseLine {
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    increment: GenerationIncrement,
}

impl From<&GenerateRequest> for ChatRequest {
    fn from(req: &GenerateRequest) -> Self {
        Self {
            model: req.model().to_string(),
            messages: req.messages().iter().map(MessageRequest::from).collect(),
            stream: true,
        }
    }
}

impl From<&ChatMessage> for MessageRequest {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role().to_string(),
            content: msg.content().to_string(),
            images: msg.images().to_vec(),
        }
    }
}
