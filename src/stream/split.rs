#[cfg(test)]
#[path = "split_test.rs"]
mod tests;

use crate::config::constants::MAX_MESSAGE_LENGTH;

/// Delimiters in order of preference, paired with how far past the match
/// the cut is placed. A code fence is cut right after its leading newline so
/// the fence opens the next piece.
const SPLIT_DELIMITERS: &[(&str, usize)] = &[
    ("\n```", 1),
    ("\n\n", 2),
    ("\n", 1),
    (". ", 1),
    (" ", 1),
];

/// Finds the byte offset at which `text` can be cut so that the first part
/// holds at most `max_length` characters.
///
/// Returns `text.len()` when the whole text fits. Otherwise the rightmost
/// delimiter inside the first `max_length` characters wins, in the order of
/// [`SPLIT_DELIMITERS`]; without any delimiter the text is cut hard at
/// `max_length`, possibly inside a word. The result is always a char
/// boundary and never zero for a non-empty text that does not fit.
pub fn find_split(text: &str, max_length: usize) -> usize {
    // A zero limit could never make progress.
    let max_length = max_length.max(1);

    let limit = match text.char_indices().nth(max_length) {
        Some((idx, _)) => idx,
        None => return text.len(),
    };

    let window = &text[..limit];
    SPLIT_DELIMITERS
        .iter()
        .find_map(|(delimiter, advance)| window.rfind(delimiter).map(|pos| pos + advance))
        .unwrap_or(limit)
}

/// Splits a finished response into pieces that each fit into one chat
/// message. Whitespace around every cut is dropped, nothing else is.
pub fn chunk(text: &str, max_length: usize) -> Vec<String> {
    if char_len(text) <= max_length {
        return vec![text.to_string()];
    }

    let mut chunks = vec![];
    let mut rest = text;
    while char_len(rest) > max_length {
        let pos = find_split(rest, max_length);
        if pos == 0 || pos > rest.len() {
            panic!(
                "split invariant violated: position {} for {} bytes",
                pos,
                rest.len()
            );
        }

        let piece = rest[..pos].trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }
        rest = rest[pos..].trim_start();
    }

    if !rest.trim().is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}

/// [`chunk`] with the Telegram message ceiling.
pub fn chunk_message(text: &str) -> Vec<String> {
    chunk(text, MAX_MESSAGE_LENGTH)
}

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}
