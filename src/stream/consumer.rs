#[cfg(test)]
#[path = "consumer_test.rs"]
mod tests;

use eyre::{Context, Result};
use futures::StreamExt;

use crate::backend::{ArcBackend, BackendError, IncrementStream};
use crate::models::{GenerateRequest, GenerationIncrement};

/// Pulls increments off a backend stream and keeps the text generated so
/// far. Dropping the consumer drops the response body, which closes the
/// connection to the backend.
pub struct GenerationConsumer {
    stream: IncrementStream,
    accumulated: String,
    finished: bool,
}

/// One yielded increment together with everything generated up to and
/// including it.
#[derive(Debug)]
pub struct Step<'a> {
    pub accumulated: &'a str,
    pub increment: GenerationIncrement,
}

impl Step<'_> {
    pub fn delta(&self) -> &str {
        self.increment.text().unwrap_or_default()
    }

    pub fn is_final(&self) -> bool {
        self.increment.done
    }
}

impl GenerationConsumer {
    pub async fn consume(backend: &ArcBackend, request: GenerateRequest) -> Result<Self> {
        let stream = backend
            .generate(request)
            .await
            .wrap_err("starting generation")?;
        Ok(Self::new(stream))
    }

    pub fn new(stream: IncrementStream) -> Self {
        Self {
            stream,
            accumulated: String::new(),
            finished: false,
        }
    }

    /// Returns the next increment carrying content, or the final one.
    /// Frames without a message are skipped. After the final increment
    /// this keeps returning `None`.
    pub async fn next(&mut self) -> Result<Option<Step<'_>>> {
        if self.finished {
            return Ok(None);
        }

        while let Some(increment) = self.stream.next().await {
            let increment = match increment {
                Ok(increment) => increment,
                Err(err) => {
                    self.finished = true;
                    return Err(err);
                }
            };

            if !increment.done && increment.message.is_none() {
                log::trace!("skipping control frame");
                continue;
            }

            if let Some(text) = increment.text() {
                self.accumulated.push_str(text);
            }
            self.finished = increment.done;
            return Ok(Some(Step {
                accumulated: &self.accumulated,
                increment,
            }));
        }

        self.finished = true;
        Err(BackendError::IncompleteStream.into())
    }

    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
