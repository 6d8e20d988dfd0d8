//! Garbled Sinhala detection.
//!
//! Badly-encoded embedded fonts decompose Sinhala words into isolated
//! code points separated by spaces. When more than a quarter of the
//! whitespace tokens are single Sinhala characters, the text is font
//! corruption rather than a genuine extraction. Used by the reprocessing
//! path, not the main ingestion loop.

/// Sinhala Unicode block.
const SINHALA_START: char = '\u{0D80}';
const SINHALA_END: char = '\u{0DFF}';

pub fn is_sinhala_char(c: char) -> bool {
    (SINHALA_START..=SINHALA_END).contains(&c)
}

/// Count of Sinhala code points in the text.
pub fn sinhala_chars(text: &str) -> usize {
    text.chars().filter(|c| is_sinhala_char(*c)).count()
}

/// Fraction of characters that are Sinhala (0.0 for empty text).
pub fn sinhala_ratio(text: &str) -> f64 {
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }
    sinhala_chars(text) as f64 / total as f64
}

/// True when more than 25% of whitespace-delimited tokens are single
/// isolated Sinhala characters.
pub fn is_garbled(text: &str) -> bool {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return false;
    }
    let single_sinhala = words
        .iter()
        .filter(|w| {
            let mut chars = w.chars();
            matches!((chars.next(), chars.next()), (Some(c), None) if is_sinhala_char(c))
        })
        .count();
    single_sinhala as f64 / words.len() as f64 > 0.25
}
