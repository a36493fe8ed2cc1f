pub mod consumer;
pub mod render;
pub mod split;

pub use consumer::{GenerationConsumer, Step};
pub use render::{Phase, RenderDriver, RenderState};
pub use split::{chunk, chunk_message, find_split};

use eyre::Result;

use crate::backend::ArcBackend;
use crate::models::{ChatId, GenerateRequest};
use crate::telegram::ArcChatPlatform;

/// Streams one generation into `chat_id` and returns the complete reply,
/// trimmed, once the final increment has been delivered.
pub async fn stream_reply(
    backend: &ArcBackend,
    chat: &ArcChatPlatform,
    chat_id: ChatId,
    request: GenerateRequest,
) -> Result<String> {
    let model = request.model().to_string();
    let mut consumer = GenerationConsumer::consume(backend, request).await?;
    let mut driver = RenderDriver::new(chat, chat_id, &model);

    while let Some(step) = consumer.next().await? {
        if step.is_final() {
            driver
                .finish(step.delta(), step.increment.elapsed_secs())
                .await;
            break;
        }
        driver.on_increment(step.delta()).await;
    }

    Ok(consumer.accumulated().trim().to_string())
}
