//! Tolerant parser for completion replies.
//!
//! The reply is treated as a sequence of `LABEL: value` lines, not
//! structured data. The tolerance is a contract, not an accident: the
//! upstream service's formatting is not guaranteed, so unknown labels are
//! ignored, missing labels leave fields empty, and the literal `null`
//! maps to an absent value. Parsing never hard-fails.

use crate::models::CircularRecord;

/// Parsed completion fields — all optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CircularSummary {
    pub circular_number: Option<String>,
    pub issued_date: Option<String>,
    pub issued_by: Option<String>,
    pub topic: Option<String>,
    pub summary: Option<String>,
    pub key_instructions: Vec<String>,
    pub applies_to: Option<String>,
    pub deadline: Option<String>,
}

impl CircularSummary {
    /// No recognized label carried a value.
    pub fn is_empty(&self) -> bool {
        self.circular_number.is_none()
            && self.issued_date.is_none()
            && self.issued_by.is_none()
            && self.topic.is_none()
            && self.summary.is_none()
            && self.key_instructions.is_empty()
            && self.applies_to.is_none()
            && self.deadline.is_none()
    }
}

/// Parse a raw reply into a summary. Any label present is recorded; a
/// reply with nothing recognizable yields an all-empty summary.
pub fn parse_completion_reply(raw: &str) -> CircularSummary {
    let mut parsed = CircularSummary::default();

    for line in raw.lines() {
        let Some((label, value)) = line.split_once(':') else {
            continue;
        };
        // Models love decorating labels with bullets and bold markers.
        let label = label
            .trim()
            .trim_start_matches(['-', '*', '#', ' '])
            .trim_end_matches('*')
            .trim()
            .to_uppercase();
        let Some(value) = clean_value(value) else {
            continue;
        };

        match label.as_str() {
            "CIRCULAR_NUMBER" => parsed.circular_number = Some(value),
            "ISSUED_DATE" => parsed.issued_date = Some(value),
            "ISSUED_BY" => parsed.issued_by = Some(value),
            "TOPIC" => parsed.topic = Some(value),
            "SUMMARY" => parsed.summary = Some(value),
            "INSTRUCTION" | "KEY_INSTRUCTION" => parsed.key_instructions.push(value),
            "APPLIES_TO" => parsed.applies_to = Some(value),
            "DEADLINE" => parsed.deadline = Some(value),
            _ => {}
        }
    }

    parsed
}

/// Trim and map the literal `null` (and empty values) to absent.
fn clean_value(value: &str) -> Option<String> {
    let value = value.trim().trim_matches('*').trim();
    if value.is_empty() || value.eq_ignore_ascii_case("null") {
        return None;
    }
    Some(value.to_string())
}

/// Merge parsed fields with the listing metadata into a persistable row.
/// The listing number and date back-fill what the model omitted.
pub fn into_record(
    summary: CircularSummary,
    fallback_number: &str,
    fallback_date: &str,
    language: crate::models::Language,
    pdf_path: Option<String>,
    txt_path: Option<String>,
) -> CircularRecord {
    CircularRecord {
        circular_number: fallback_number.to_string(),
        issued_date: summary.issued_date.or_else(|| {
            if fallback_date.is_empty() {
                None
            } else {
                Some(fallback_date.to_string())
            }
        }),
        issued_by: summary.issued_by,
        topic: summary.topic,
        summary: summary.summary,
        key_instructions: summary.key_instructions,
        applies_to: summary.applies_to,
        deadline: summary.deadline,
        language,
        pdf_path,
        txt_path,
        processed_at: chrono::Local::now().to_rfc3339(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_reply_parses_all_fields() {
        let raw = "CIRCULAR_NUMBER: 10/2025\n\
                   ISSUED_DATE: 2025-03-01\n\
                   ISSUED_BY: Ministry of Public Administration\n\
                   TOPIC: Combined allowance revision\n\
                   SUMMARY: The combined allowance is revised upward.\n\
                   INSTRUCTION: Update salary records.\n\
                   INSTRUCTION: Inform all district offices.\n\
                   APPLIES_TO: All public officers\n\
                   DEADLINE: 2025-06-30";
        let parsed = parse_completion_reply(raw);
        assert_eq!(parsed.circular_number.as_deref(), Some("10/2025"));
        assert_eq!(parsed.issued_date.as_deref(), Some("2025-03-01"));
        assert_eq!(
            parsed.issued_by.as_deref(),
            Some("Ministry of Public Administration")
        );
        assert_eq!(parsed.topic.as_deref(), Some("Combined allowance revision"));
        assert_eq!(
            parsed.key_instructions,
            vec![
                "Update salary records.".to_string(),
                "Inform all district offices.".to_string()
            ]
        );
        assert_eq!(parsed.deadline.as_deref(), Some("2025-06-30"));
    }

    #[test]
    fn topic_only_reply_is_not_an_error() {
        let parsed = parse_completion_reply("TOPIC: X");
        assert_eq!(parsed.topic.as_deref(), Some("X"));
        assert!(parsed.summary.is_none());
        assert!(parsed.issued_by.is_none());
        assert!(parsed.key_instructions.is_empty());
        assert!(!parsed.is_empty());
    }

    #[test]
    fn null_literal_maps_to_absent() {
        let parsed = parse_completion_reply("DEADLINE: null\nTOPIC: Real topic\nISSUED_BY: NULL");
        assert!(parsed.deadline.is_none());
        assert!(parsed.issued_by.is_none());
        assert_eq!(parsed.topic.as_deref(), Some("Real topic"));
    }

    #[test]
    fn unrecognized_labels_ignored() {
        let parsed = parse_completion_reply(
            "NOTE: ignore me\nTOPIC: Kept\nCONFIDENCE: high\nhttp://example.com: not a label",
        );
        assert_eq!(parsed.topic.as_deref(), Some("Kept"));
        assert!(parsed.summary.is_none());
    }

    #[test]
    fn unlabelled_prose_ignored() {
        let raw = "Here is my analysis of the circular.\n\
                   TOPIC: Transfer policy\n\
                   I hope that helps!";
        let parsed = parse_completion_reply(raw);
        assert_eq!(parsed.topic.as_deref(), Some("Transfer policy"));
    }

    #[test]
    fn decorated_labels_still_recognized() {
        let raw = "- TOPIC: Bulleted\n**SUMMARY**: Bolded summary\n  DEADLINE : 2025-01-01";
        let parsed = parse_completion_reply(raw);
        assert_eq!(parsed.topic.as_deref(), Some("Bulleted"));
        assert_eq!(parsed.summary.as_deref(), Some("Bolded summary"));
        assert_eq!(parsed.deadline.as_deref(), Some("2025-01-01"));
    }

    #[test]
    fn lowercase_labels_recognized() {
        let parsed = parse_completion_reply("topic: lower case\nsummary: also lower");
        assert_eq!(parsed.topic.as_deref(), Some("lower case"));
        assert_eq!(parsed.summary.as_deref(), Some("also lower"));
    }

    #[test]
    fn value_containing_colon_kept_whole() {
        let parsed = parse_completion_reply("SUMMARY: Effective date: 2025-06-01 onwards.");
        assert_eq!(
            parsed.summary.as_deref(),
            Some("Effective date: 2025-06-01 onwards.")
        );
    }

    #[test]
    fn repeated_scalar_label_last_wins() {
        let parsed = parse_completion_reply("TOPIC: First\nTOPIC: Second");
        assert_eq!(parsed.topic.as_deref(), Some("Second"));
    }

    #[test]
    fn sinhala_values_preserved() {
        let parsed = parse_completion_reply("TOPIC: රාජ්‍ය සේවකයින්ගේ වැටුප් සංශෝධනය");
        assert_eq!(
            parsed.topic.as_deref(),
            Some("රාජ්‍ය සේවකයින්ගේ වැටුප් සංශෝධනය")
        );
    }

    #[test]
    fn garbage_reply_yields_empty_summary() {
        let parsed = parse_completion_reply("complete nonsense with no labels at all");
        assert!(parsed.is_empty());
    }

    #[test]
    fn empty_reply_yields_empty_summary() {
        assert!(parse_completion_reply("").is_empty());
    }

    #[test]
    fn record_backfills_number_and_date() {
        let parsed = parse_completion_reply("TOPIC: X");
        let record = into_record(
            parsed,
            "10/2025",
            "2025-03-01",
            crate::models::Language::English,
            None,
            None,
        );
        assert_eq!(record.circular_number, "10/2025");
        assert_eq!(record.issued_date.as_deref(), Some("2025-03-01"));
        assert_eq!(record.topic.as_deref(), Some("X"));
    }

    #[test]
    fn record_prefers_model_issued_date() {
        let parsed = parse_completion_reply("ISSUED_DATE: 2025-02-28");
        let record = into_record(
            parsed,
            "10/2025",
            "2025-03-01",
            crate::models::Language::English,
            None,
            None,
        );
        assert_eq!(record.issued_date.as_deref(), Some("2025-02-28"));
    }
}
