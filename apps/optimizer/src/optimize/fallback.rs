use std::sync::OnceLock;

use regex::{Captures, Regex};

fn weak_phrases() -> &'static Regex {
    static WEAK_PHRASES: OnceLock<Regex> = OnceLock::new();
    WEAK_PHRASES.get_or_init(|| {
        Regex::new(r"(?i)\b(managed|responsible for|worked on)\b").expect("static regex is valid")
    })
}

fn inline_whitespace() -> &'static Regex {
    static INLINE_WHITESPACE: OnceLock<Regex> = OnceLock::new();
    INLINE_WHITESPACE.get_or_init(|| Regex::new(r"[ \t]+").expect("static regex is valid"))
}

/// Rule-based rewrite used for a chunk the LLM could not produce.
///
/// Swaps weak phrasing for action verbs and collapses runs of spaces. Line
/// structure is kept so the chunk still reads as part of the document.
pub fn fallback_rewrite(chunk: &str) -> String {
    let strengthened = weak_phrases().replace_all(chunk, |caps: &Captures| {
        let replacement = match caps[1].to_lowercase().as_str() {
            "managed" => "Led",
            "responsible for" => "Spearheaded",
            "worked on" => "Developed",
            _ => return caps[0].to_string(),
        };
        replacement.to_string()
    });

    inline_whitespace()
        .replace_all(&strengthened, " ")
        .trim()
        .to_string()
}
