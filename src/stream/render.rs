#[cfg(test)]
#[path = "render_test.rs"]
mod tests;

use tokio::time::{Duration, Instant};

use crate::config::constants::MAX_MESSAGE_LENGTH;
use crate::models::{ChatId, MessageId};
use crate::stream::split::{char_len, chunk, find_split};
use crate::telegram::ArcChatPlatform;

pub const SPINNER_FRAMES: [&str; 3] = [".", "..", "..."];

/// Minimum time between two mid-stream edits.
pub const EDIT_INTERVAL: Duration = Duration::from_secs(4);

/// Shorter interval used when an increment closes a paragraph.
pub const PARAGRAPH_EDIT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing was sent yet.
    Idle,
    /// One message is being edited in place.
    Streaming,
    /// The current message is full and its text is moving into new ones.
    Overflowing,
    /// The final text has been delivered.
    Done,
}

/// Per-turn bookkeeping of what is displayed in the chat.
#[derive(Debug)]
pub struct RenderState {
    /// Text not yet flushed into a finished message.
    pub full_response: String,
    pub sent_message: Option<MessageId>,
    pub last_edit_time: Instant,
    pub spinner_phase: usize,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            full_response: String::new(),
            sent_message: None,
            last_edit_time: Instant::now(),
            spinner_phase: 0,
        }
    }
}

/// Mirrors a generation into the chat by sending one message and editing it
/// as text arrives, starting a fresh message whenever the current one would
/// outgrow the size ceiling.
pub struct RenderDriver<'a> {
    chat: &'a ArcChatPlatform,
    chat_id: ChatId,
    model: String,
    max_length: usize,
    phase: Phase,
    state: RenderState,
}

impl<'a> RenderDriver<'a> {
    pub fn new(chat: &'a ArcChatPlatform, chat_id: ChatId, model: &str) -> Self {
        Self {
            chat,
            chat_id,
            model: model.to_string(),
            max_length: MAX_MESSAGE_LENGTH,
            phase: Phase::Idle,
            state: RenderState::default(),
        }
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    /// Handles one non-final increment. Chat failures are logged and never
    /// stop the stream.
    pub async fn on_increment(&mut self, delta: &str) {
        self.state.full_response.push_str(delta);

        if self.phase == Phase::Idle {
            if !delta.is_empty() {
                self.open_message().await;
                self.phase = Phase::Streaming;
            }
            return;
        }

        let now = Instant::now();
        if !should_edit(delta, now.duration_since(self.state.last_edit_time)) {
            return;
        }

        let display = self.state.full_response.trim();
        if display.is_empty() {
            return;
        }

        let text = format!("{}\n\n`{}`", display, SPINNER_FRAMES[self.state.spinner_phase]);
        self.state.spinner_phase = (self.state.spinner_phase + 1) % SPINNER_FRAMES.len();

        if char_len(&text) > self.max_length {
            self.overflow().await;
        } else {
            self.show(&text).await;
        }
        self.state.last_edit_time = now;
    }

    /// Handles the final increment: appends its content, decorates the
    /// reply with the model and duration footer and delivers it in as many
    /// messages as needed.
    pub async fn finish(&mut self, delta: &str, elapsed_secs: f64) {
        self.state.full_response.push_str(delta);

        let final_text = format!(
            "{}\n\n⚡ `{} in {:.1}s.`",
            self.state.full_response.trim(),
            self.model,
            elapsed_secs
        );

        let mut chunks = chunk(&final_text, self.max_length).into_iter();
        if let Some(first) = chunks.next() {
            let edited = match self.state.sent_message {
                Some(message_id) => self.edit(message_id, &first).await,
                None => false,
            };
            // A reply that cannot land in the streamed message gets a new one.
            if !edited {
                self.send(&first).await;
            }
        }

        for chunk in chunks {
            self.send(&chunk).await;
        }

        self.phase = Phase::Done;
    }

    /// Flushes the head of the raw buffer into the current message and
    /// continues in a new one, until what is left fits again.
    async fn overflow(&mut self) {
        self.phase = Phase::Overflowing;
        loop {
            let raw = &self.state.full_response;
            let pos = find_split(raw, self.max_length);
            let head = raw[..pos].trim().to_string();
            let rest = raw[pos..].to_string();

            log::debug!(
                "Message {:?} is full, continuing in a new one",
                self.state.sent_message
            );
            if !head.is_empty() {
                self.show(&head).await;
            }
            self.open_message().await;
            self.state.full_response = rest;

            if char_len(&self.state.full_response) <= self.max_length {
                break;
            }
        }
        self.phase = Phase::Streaming;
    }

    /// Sends the spinner placeholder that later edits fill in. Without it the
    /// next flush sends its text as a new message instead.
    async fn open_message(&mut self) {
        let placeholder = format!("`{}`", SPINNER_FRAMES[0]);
        self.send(&placeholder).await;
        self.state.last_edit_time = Instant::now();
        self.state.spinner_phase = 1;
    }

    /// Puts `text` into the current message, or into a new one when there
    /// is none.
    async fn show(&mut self, text: &str) {
        match self.state.sent_message {
            Some(message_id) => {
                self.edit(message_id, text).await;
            }
            None => {
                self.send(text).await;
            }
        }
    }

    /// Sends `text` as a new current message. Text Telegram refuses to parse
    /// as Markdown goes out plain.
    async fn send(&mut self, text: &str) -> bool {
        let sent = match self.chat.send_message(self.chat_id, text).await {
            Ok(message_id) => Ok(message_id),
            Err(err) => {
                log::warn!("Could not send Markdown message, retrying as plain text: {:?}", err);
                self.chat.send_plain(self.chat_id, text).await
            }
        };

        match sent {
            Ok(message_id) => {
                self.state.sent_message = Some(message_id);
                true
            }
            Err(err) => {
                log::warn!("Could not send message to chat {}: {:?}", self.chat_id, err);
                self.state.sent_message = None;
                false
            }
        }
    }

    /// Edits a message sent earlier, falling back to plain text. Failures,
    /// such as the message having been deleted meanwhile, only cost this
    /// one update.
    async fn edit(&self, message_id: MessageId, text: &str) -> bool {
        let Err(err) = self.chat.edit_message(self.chat_id, message_id, text).await else {
            return true;
        };
        log::warn!(
            "Could not edit message {} as Markdown, retrying as plain text: {:?}",
            message_id,
            err
        );

        match self.chat.edit_plain(self.chat_id, message_id, text).await {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Could not edit message {}: {:?}", message_id, err);
                false
            }
        }
    }
}

/// Edit after [`EDIT_INTERVAL`], or after [`PARAGRAPH_EDIT_INTERVAL`] when
/// the increment contains a paragraph break.
pub fn should_edit(delta: &str, elapsed: Duration) -> bool {
    elapsed >= EDIT_INTERVAL || (delta.contains("\n\n") && elapsed >= PARAGRAPH_EDIT_INTERVAL)
}
