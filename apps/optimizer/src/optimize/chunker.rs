use std::sync::OnceLock;

use regex::Regex;

/// Default upper bound on a single chunk sent to the LLM.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 50_000;

fn paragraph_break() -> &'static Regex {
    static PARAGRAPH_BREAK: OnceLock<Regex> = OnceLock::new();
    PARAGRAPH_BREAK.get_or_init(|| Regex::new(r"\n\n+").expect("static regex is valid"))
}

/// Splits a CV into chunks of roughly `max_chars` characters along paragraph
/// breaks, preserving order.
///
/// Text that already fits is returned untouched as a single chunk. Otherwise
/// paragraphs are packed greedily, joined by a blank line. The separator in
/// front of the paragraph that opened a chunk is not counted, so a packed
/// chunk can overshoot `max_chars` by those two characters. A paragraph that
/// is longer than `max_chars` on its own is not split further and becomes an
/// oversized chunk.
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for section in paragraph_break().split(text) {
        let section_len = section.chars().count();
        if current_len + section_len > max_chars && !current.trim().is_empty() {
            push_trimmed(&mut chunks, &current);
            current = section.to_string();
            current_len = section_len;
        } else {
            current.push_str("\n\n");
            current.push_str(section);
            current_len += section_len + 2;
        }
    }
    push_trimmed(&mut chunks, &current);

    chunks
}

fn push_trimmed(chunks: &mut Vec<String>, chunk: &str) {
    let trimmed = chunk.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}
