//! Circular repository — idempotent persistence keyed by (number, language).

use std::collections::{HashMap, HashSet};

use rusqlite::{params, Connection, OptionalExtension};

use super::DatabaseError;
use crate::models::{CircularRecord, Language};

/// A stored Sinhala row, as needed by the reprocessing path.
#[derive(Debug, Clone)]
pub struct SinhalaRow {
    pub circular_number: String,
    pub issued_date: Option<String>,
    pub topic: Option<String>,
    pub summary: Option<String>,
    pub pdf_path: Option<String>,
    pub txt_path: Option<String>,
}

pub struct CircularRepository {
    conn: Connection,
}

impl CircularRepository {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Full-row replace keyed by `(circular_number, language)`.
    ///
    /// Reprocessing a circular overwrites its previous summary entirely;
    /// there is no field-level merge and no history.
    pub fn upsert(&self, record: &CircularRecord) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO circulars
             (circular_number, issued_date, issued_by, topic, summary,
              key_instructions, applies_to, deadline, language,
              pdf_path, txt_path, processed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                record.circular_number,
                record.issued_date,
                record.issued_by,
                record.topic,
                record.summary,
                serde_json::to_string(&record.key_instructions).unwrap_or_default(),
                record.applies_to,
                record.deadline,
                record.language.code(),
                record.pdf_path,
                record.txt_path,
                record.processed_at,
            ],
        )?;
        Ok(())
    }

    /// All `(circular_number, language)` pairs currently persisted.
    ///
    /// Recomputed fresh at the start of every run; never cached across runs.
    pub fn known_pairs(&self) -> Result<HashSet<(String, Language)>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT circular_number, language FROM circulars")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut pairs = HashSet::new();
        for row in rows {
            let (number, code) = row?;
            let language =
                Language::from_code(&code).ok_or_else(|| DatabaseError::InvalidEnum {
                    field: "language".into(),
                    value: code,
                })?;
            pairs.insert((number, language));
        }
        Ok(pairs)
    }

    /// Stored English topics by circular number, for the title-change signal.
    pub fn english_topics(&self) -> Result<HashMap<String, String>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT circular_number, topic FROM circulars
             WHERE language = 'E' AND topic IS NOT NULL",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut topics = HashMap::new();
        for row in rows {
            let (number, topic) = row?;
            topics.insert(number, topic);
        }
        Ok(topics)
    }

    /// All Sinhala rows; the reprocessing path filters these for garbled text.
    pub fn sinhala_rows(&self) -> Result<Vec<SinhalaRow>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT circular_number, issued_date, topic, summary, pdf_path, txt_path
             FROM circulars WHERE language = 'S'",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(SinhalaRow {
                circular_number: row.get(0)?,
                issued_date: row.get(1)?,
                topic: row.get(2)?,
                summary: row.get(3)?,
                pdf_path: row.get(4)?,
                txt_path: row.get(5)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn count(&self) -> Result<i64, DatabaseError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM circulars", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Fetch one row's topic (test helper and sanity queries).
    pub fn topic_of(
        &self,
        number: &str,
        language: Language,
    ) -> Result<Option<String>, DatabaseError> {
        let topic = self
            .conn
            .query_row(
                "SELECT topic FROM circulars WHERE circular_number = ?1 AND language = ?2",
                params![number, language.code()],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;
        Ok(topic.flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn record(number: &str, language: Language, topic: &str) -> CircularRecord {
        CircularRecord {
            circular_number: number.to_string(),
            issued_date: Some("2025-03-14".into()),
            issued_by: Some("Ministry of Public Administration".into()),
            topic: Some(topic.to_string()),
            summary: Some("A summary.".into()),
            key_instructions: vec!["Apply before the deadline.".into()],
            applies_to: Some("All public officers".into()),
            deadline: None,
            language,
            pdf_path: Some("downloads/2025/English/10-2025.pdf".into()),
            txt_path: Some("extracted_text/2025/English/10-2025.txt".into()),
            processed_at: "2025-03-15T09:00:00+05:30".into(),
        }
    }

    fn repo() -> CircularRepository {
        CircularRepository::new(open_memory_database().unwrap())
    }

    #[test]
    fn upsert_then_known_pairs() {
        let repo = repo();
        repo.upsert(&record("10/2025", Language::English, "Salaries")).unwrap();
        repo.upsert(&record("10/2025", Language::Sinhala, "වැටුප්")).unwrap();

        let pairs = repo.known_pairs().unwrap();
        assert_eq!(pairs.len(), 2);
        assert!(pairs.contains(&("10/2025".to_string(), Language::English)));
        assert!(pairs.contains(&("10/2025".to_string(), Language::Sinhala)));
    }

    #[test]
    fn upsert_replaces_whole_row() {
        let repo = repo();
        repo.upsert(&record("10/2025", Language::English, "Old topic")).unwrap();

        let mut updated = record("10/2025", Language::English, "New topic");
        updated.deadline = Some("2025-06-30".into());
        repo.upsert(&updated).unwrap();

        assert_eq!(repo.count().unwrap(), 1);
        assert_eq!(
            repo.topic_of("10/2025", Language::English).unwrap(),
            Some("New topic".to_string())
        );
    }

    #[test]
    fn upsert_twice_is_idempotent() {
        let repo = repo();
        let rec = record("11/2025", Language::English, "Leave policy");
        repo.upsert(&rec).unwrap();
        repo.upsert(&rec).unwrap();
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn english_topics_only_english_rows() {
        let repo = repo();
        repo.upsert(&record("10/2025", Language::English, "Salaries")).unwrap();
        repo.upsert(&record("10/2025", Language::Sinhala, "වැටුප්")).unwrap();

        let topics = repo.english_topics().unwrap();
        assert_eq!(topics.len(), 1);
        assert_eq!(topics.get("10/2025").map(String::as_str), Some("Salaries"));
    }

    #[test]
    fn sinhala_rows_returned() {
        let repo = repo();
        repo.upsert(&record("10/2025", Language::Sinhala, "topic")).unwrap();
        repo.upsert(&record("11/2025", Language::English, "topic")).unwrap();

        let rows = repo.sinhala_rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].circular_number, "10/2025");
    }

    #[test]
    fn key_instructions_stored_as_json() {
        let repo = repo();
        repo.upsert(&record("12/2025", Language::English, "t")).unwrap();
        let raw: String = repo
            .conn
            .query_row(
                "SELECT key_instructions FROM circulars WHERE circular_number='12/2025'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        let parsed: Vec<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, vec!["Apply before the deadline.".to_string()]);
    }
}
