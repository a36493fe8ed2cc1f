use crate::models::{ChatMessage, Role};

/// Per-user conversation state kept in memory for the lifetime of the
/// process. At most one system message exists and it is always the first one.
#[derive(Debug, Clone)]
pub struct ConversationContext {
    active_session_id: Option<String>,
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    /// Prompt picked for this context only, never written to storage.
    session_prompt: Option<String>,
}

impl ConversationContext {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            active_session_id: None,
            model: model.into(),
            messages: vec![],
            stream: true,
            session_prompt: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.active_session_id = Some(session_id.into());
        self
    }

    pub fn with_messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages = messages;
        self
    }

    pub fn active_session_id(&self) -> Option<&str> {
        self.active_session_id.as_deref()
    }

    pub fn set_active_session_id(&mut self, session_id: Option<String>) {
        self.active_session_id = session_id;
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    pub fn stream(&self) -> bool {
        self.stream
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn messages_mut(&mut self) -> &mut Vec<ChatMessage> {
        &mut self.messages
    }

    pub fn push_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn session_prompt(&self) -> Option<&str> {
        self.session_prompt.as_deref()
    }

    pub fn set_session_prompt(&mut self, prompt: Option<String>) {
        self.session_prompt = prompt;
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .first()
            .filter(|m| m.role() == Role::System)
            .map(|m| m.content())
    }
}
