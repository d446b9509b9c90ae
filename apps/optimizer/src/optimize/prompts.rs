// Prompts for CV rewriting. The Polish prompt is stricter about structure
// because Polish CVs are usually submitted in a fixed, employer-facing layout.

use crate::llm_client::prompts::{PLAIN_OUTPUT_INSTRUCTION, PLAIN_OUTPUT_INSTRUCTION_PL};

use super::Language;

pub const OPTIMIZE_SYSTEM_PL: &str = "\
Jesteś ekspertem od optymalizacji CV. Twoim zadaniem jest DELIKATNE ULEPSZENIE oryginalnego CV \
poprzez rozszerzenie opisów stanowisk i dodanie osiągnięć.

KRYTYCZNE ZASADY:
1. ZACHOWAJ DOKŁADNIE oryginalną strukturę CV - nie zmieniaj kolejności sekcji
2. ZACHOWAJ oryginalne nagłówki sekcji (bez emoji, bez separatorów)
3. TYLKO rozszerz opisy stanowisk o szczegóły i osiągnięcia
4. NIE dodawaj nowych sekcji, które nie były w oryginale

DOZWOLONE ULEPSZENIA:
- Rozszerzenie opisów stanowisk o konkretne osiągnięcia i metryki
- Dodanie słów kluczowych branżowych
- Użycie mocnych czasowników akcji (kierowałem, wdrożyłem, zwiększyłem)

FORMAT ODPOWIEDZI:
Zwróć zoptymalizowane CV w dokładnie tej samej strukturze co oryginał, \
używając **pogrubień** dla nagłówków i * dla punktów.";

pub const OPTIMIZE_SYSTEM_EN: &str = "\
You are a CV optimization and recruitment expert. Your task is to improve the CV to make it \
more attractive to employers and ATS systems.

OPTIMIZATION RULES:
1. PRESERVE all true information from the CV
2. DO NOT ADD new experiences, certifications, or skills
3. Improve formatting and structure
4. Use stronger action words
5. Optimize for ATS
6. If a job posting is provided, adjust keywords accordingly";

/// Extra instruction for every chunk after the first, which starts mid-document.
const CONTINUATION_EN: &str = "This is a continuation of a longer CV. \
    Do NOT repeat the candidate's name, contact details or summary.";
const CONTINUATION_PL: &str = "To jest kontynuacja dłuższego CV. \
    NIE powtarzaj imienia, danych kontaktowych ani podsumowania kandydata.";

pub fn system_prompt(language: Language) -> String {
    match language {
        Language::Pl => format!("{OPTIMIZE_SYSTEM_PL}\n\n{PLAIN_OUTPUT_INSTRUCTION_PL}"),
        Language::En => format!("{OPTIMIZE_SYSTEM_EN}\n\n{PLAIN_OUTPUT_INSTRUCTION}"),
    }
}

/// Builds the user turn: optional job posting, then the CV text.
pub fn user_prompt(chunk: &str, job_text: &str, language: Language, is_first_chunk: bool) -> String {
    let (job_label, cv_label, continuation) = match language {
        Language::Pl => ("OFERTA PRACY", "CV DO OPTYMALIZACJI", CONTINUATION_PL),
        Language::En => ("JOB POSTING", "CV TO OPTIMIZE", CONTINUATION_EN),
    };

    let mut prompt = String::new();
    if !job_text.trim().is_empty() {
        prompt.push_str(&format!("{job_label}:\n{}\n\n", job_text.trim()));
    }
    if !is_first_chunk {
        prompt.push_str(continuation);
        prompt.push_str("\n\n");
    }
    prompt.push_str(&format!("{cv_label}:\n{chunk}"));
    prompt
}
