//! Language-specific prompt construction.
//!
//! The instruction text and the expected `LABEL: value` reply format are
//! written in the language being summarised. The text snippet is truncated
//! to a per-language character budget: Sinhala gets a markedly smaller one
//! because its script tokenizes to roughly twice the tokens per character,
//! and both must stay inside the service's per-minute token ceiling.

use crate::models::Language;

/// Snippet budget for Latin-script circulars (≈500 tokens).
const CHAR_BUDGET_LATIN: usize = 1500;
/// Snippet budget for Sinhala-script circulars.
const CHAR_BUDGET_SINHALA: usize = 600;

/// Listing titles are untrusted page text; keep them short in the prompt.
const TITLE_BUDGET: usize = 200;

pub fn char_budget(language: Language) -> usize {
    match language {
        Language::Sinhala | Language::Tamil => CHAR_BUDGET_SINHALA,
        Language::English => CHAR_BUDGET_LATIN,
    }
}

/// Truncate on a character boundary (never mid code point).
fn truncate_chars(text: &str, budget: usize) -> String {
    text.chars().take(budget).collect()
}

pub fn build_prompt(
    number: &str,
    date: &str,
    title: &str,
    text: &str,
    language: Language,
) -> String {
    let snippet = truncate_chars(text, char_budget(language));
    let title = truncate_chars(title, TITLE_BUDGET);
    match language {
        Language::Sinhala => sinhala_prompt(number, date, &title, &snippet),
        _ => english_prompt(number, date, &title, &snippet),
    }
}

fn english_prompt(number: &str, date: &str, title: &str, snippet: &str) -> String {
    format!(
        "You are analysing a Sri Lanka government circular.\n\
         Reply with EXACTLY these labelled lines and nothing else. \
         Write null where a value is unknown.\n\
         \n\
         CIRCULAR_NUMBER: the official circular number\n\
         ISSUED_DATE: date in YYYY-MM-DD format, or null\n\
         ISSUED_BY: name of the ministry or authority\n\
         TOPIC: short topic title in English\n\
         SUMMARY: 2-3 sentence summary in English\n\
         INSTRUCTION: one key instruction (repeat this line for each)\n\
         APPLIES_TO: who this circular applies to\n\
         DEADLINE: any deadline mentioned, or null\n\
         \n\
         Number: {number}\n\
         Date: {date}\n\
         Title: {title}\n\
         \n\
         Circular text:\n{snippet}"
    )
}

fn sinhala_prompt(number: &str, date: &str, title: &str, snippet: &str) -> String {
    format!(
        "ඔබ ශ්‍රී ලංකා රජයේ චක්‍රලේඛ විශ්ලේෂණය කරන විශේෂඥයෙකි.\n\
         සිංහල භාෂාවෙන් පමණක් පිළිතුරු දෙන්න.\n\
         පහත ලේබල් පේළි ආකෘතියෙන් පමණක් පිළිතුරු දෙන්න (වෙනත් කිසිවක් නොලියන්න). \
         නොදන්නා අගයක් සඳහා null ලියන්න.\n\
         \n\
         CIRCULAR_NUMBER: චක්‍රලේඛ අංකය\n\
         ISSUED_DATE: YYYY-MM-DD ආකෘතියෙන් දිනය, නොමැති නම් null\n\
         ISSUED_BY: නිකුත් කළ අමාත්‍යාංශය හෝ අධිකාරිය\n\
         TOPIC: කෙටි මාතෘකාව සිංහලෙන්\n\
         SUMMARY: චක්‍රලේඛයේ සාරාංශය සිංහලෙන් (වාක්‍ය 2-3)\n\
         INSTRUCTION: ප්‍රධාන උපදෙසක් (එක් උපදෙසකට එක් පේළියක්)\n\
         APPLIES_TO: අදාළ වන්නේ කාටද (සිංහලෙන්)\n\
         DEADLINE: අවසාන දිනය හෝ null\n\
         \n\
         චක්‍රලේඛ අංකය: {number}\n\
         දිනය: {date}\n\
         මාතෘකාව: {title}\n\
         \n\
         චක්‍රලේඛ පෙළ:\n{snippet}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sinhala_budget_markedly_lower() {
        assert_eq!(char_budget(Language::English), 1500);
        assert_eq!(char_budget(Language::Sinhala), 600);
        assert!(char_budget(Language::Sinhala) < char_budget(Language::English) / 2);
    }

    #[test]
    fn english_snippet_truncated_to_budget() {
        let text = "a".repeat(5000);
        let prompt = build_prompt("10/2025", "2025-03-01", "Title", &text, Language::English);
        let snippet_len = prompt.split("Circular text:\n").nth(1).unwrap().chars().count();
        assert_eq!(snippet_len, 1500);
    }

    #[test]
    fn sinhala_snippet_truncated_to_budget() {
        let text = "ක".repeat(5000);
        let prompt = build_prompt("10/2025", "2025-03-01", "Title", &text, Language::Sinhala);
        let snippet_len = prompt
            .split("චක්‍රලේඛ පෙළ:\n")
            .nth(1)
            .unwrap()
            .chars()
            .count();
        assert_eq!(snippet_len, 600);
    }

    #[test]
    fn truncation_is_char_safe_for_multibyte() {
        // Must never panic splitting a multi-byte Sinhala code point.
        let text = "සිංහල".repeat(1000);
        let _ = build_prompt("10/2025", "2025-03-01", "T", &text, Language::Sinhala);
    }

    #[test]
    fn sinhala_instructions_in_sinhala() {
        let prompt = build_prompt("10/2025", "2025-03-01", "T", "text", Language::Sinhala);
        assert!(prompt.contains("සිංහල භාෂාවෙන් පමණක්"));
        assert!(prompt.contains("TOPIC:"));
    }

    #[test]
    fn english_prompt_lists_all_labels() {
        let prompt = build_prompt("10/2025", "2025-03-01", "T", "text", Language::English);
        for label in [
            "CIRCULAR_NUMBER:",
            "ISSUED_DATE:",
            "ISSUED_BY:",
            "TOPIC:",
            "SUMMARY:",
            "INSTRUCTION:",
            "APPLIES_TO:",
            "DEADLINE:",
        ] {
            assert!(prompt.contains(label), "missing {label}");
        }
    }

    #[test]
    fn metadata_embedded_in_prompt() {
        let prompt = build_prompt("22/2025", "2025-07-30", "Combined allowance", "t", Language::English);
        assert!(prompt.contains("22/2025"));
        assert!(prompt.contains("2025-07-30"));
        assert!(prompt.contains("Combined allowance"));
    }

    #[test]
    fn long_title_truncated() {
        let title = "T".repeat(500);
        let prompt = build_prompt("1/2025", "2025-01-01", &title, "t", Language::English);
        assert!(!prompt.contains(&"T".repeat(201)));
    }
}
