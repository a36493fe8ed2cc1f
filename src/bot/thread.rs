#[cfg(test)]
#[path = "thread_test.rs"]
mod tests;

use crate::config::constants::MAX_THREAD_DEPTH;
use crate::telegram::{Message, User};

const NO_TEXT: &str = "[No text content]";

/// The reply chain ending at `message`, oldest first. At most
/// [`MAX_THREAD_DEPTH`] messages are collected.
pub fn collect_thread(message: &Message) -> Vec<&Message> {
    let mut thread = vec![];
    let mut current = Some(message);
    while let Some(msg) = current {
        if thread.len() >= MAX_THREAD_DEPTH {
            break;
        }
        thread.push(msg);
        current = msg.reply_to_message.as_deref();
    }
    thread.reverse();
    thread
}

/// Renders a reply chain as a prompt, labelling each message with who wrote it.
pub fn format_thread(thread: &[&Message], bot_id: i64) -> String {
    let mut prompt = String::from("Conversation thread:\n\n");
    for msg in thread {
        let sender = match msg.sender_id() {
            Some(id) if id == bot_id => "Bot",
            _ => "User",
        };
        let text = msg.text_or_caption().unwrap_or(NO_TEXT);
        prompt.push_str(&format!("{}: {}\n\n", sender, text));
    }
    prompt.push_str("History:");
    prompt
}

/// Whether a group message is meant for the bot: it starts with the bot's
/// mention or replies to one of the bot's messages.
pub fn is_addressed(message: &Message, me: &User) -> bool {
    let mentioned = match (message.text_or_caption(), me.mention()) {
        (Some(text), Some(mention)) => text.trim_start().starts_with(&mention),
        _ => false,
    };

    let replied = message
        .reply_to_message
        .as_ref()
        .and_then(|reply| reply.sender_id())
        .is_some_and(|id| id == me.id);

    mentioned || replied
}
