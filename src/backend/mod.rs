pub mod error;
pub mod ollama;

pub use error::BackendError;
pub use ollama::Ollama;

#[cfg(test)]
use mockall::automock;

use crate::{
    config::{BackendConfig, verbose},
    models::{GenerateRequest, GenerationIncrement},
};
use async_trait::async_trait;
use eyre::Result;
use futures::Stream;
use std::{pin::Pin, sync::Arc};

/// Lazy sequence of increments for one generation. Dropping it closes the
/// underlying connection.
pub type IncrementStream = Pin<Box<dyn Stream<Item = Result<GenerationIncrement>> + Send>>;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Backend {
    fn name(&self) -> &str;
    async fn generate(&self, request: GenerateRequest) -> Result<IncrementStream>;
}

pub type ArcBackend = Arc<dyn Backend + Send + Sync>;

pub fn new_backend(config: &BackendConfig) -> Result<ArcBackend> {
    if config.endpoint.trim().is_empty() {
        eyre::bail!("No backend endpoint configured");
    }

    let ollama = Ollama::from(config);
    verbose!("  [+] Using backend: {} ({})", ollama.name(), ollama.endpoint());
    log::debug!("Backend endpoint: {}", ollama.endpoint());
    Ok(Arc::new(ollama))
}
