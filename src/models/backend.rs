use crate::models::{ChatMessage, ConversationContext};

/// Everything the backend needs to produce one reply.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![],
        }
    }

    pub fn with_messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages = messages;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }
}

impl From<&ConversationContext> for GenerateRequest {
    fn from(ctx: &ConversationContext) -> Self {
        GenerateRequest::new(ctx.model()).with_messages(ctx.messages().to_vec())
    }
}
