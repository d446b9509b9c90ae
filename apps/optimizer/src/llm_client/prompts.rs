// Shared prompt fragments. Each service that needs LLM calls defines its own
// prompts.rs alongside it; this file holds the cross-cutting pieces.

/// Appended to every rewrite prompt so the response can be spliced back into
/// a document without post-processing.
pub const PLAIN_OUTPUT_INSTRUCTION: &str = "\
    Return ONLY the rewritten text. \
    Do NOT add introductions, explanations, notes or closing remarks. \
    Do NOT wrap the answer in code fences.";

/// Polish counterpart of `PLAIN_OUTPUT_INSTRUCTION`.
pub const PLAIN_OUTPUT_INSTRUCTION_PL: &str = "\
    Zwróć WYŁĄCZNIE przepisany tekst. \
    NIE dodawaj wstępów, wyjaśnień, uwag ani podsumowań. \
    NIE otaczaj odpowiedzi blokami kodu.";
