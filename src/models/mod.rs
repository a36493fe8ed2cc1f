pub mod backend;
pub mod context;
pub mod increment;
pub mod message;
pub mod prompt;
pub mod storage;

pub use backend::GenerateRequest;
pub use context::ConversationContext;
pub use increment::{GenerationIncrement, IncrementMessage};
pub use message::{ChatMessage, Role};
pub use prompt::{GlobalPrompt, PredefinedPrompt};

/// Telegram user identifier.
pub type UserId = i64;

/// Telegram chat identifier.
pub type ChatId = i64;

/// Identifier of a message sent to a chat.
pub type MessageId = i64;
