//! Core domain types: languages and circular records.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Language of one published rendition of a circular.
///
/// The listing site encodes the language as a single-letter path segment in
/// each PDF link; the same letter is what the database stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    English,
    Sinhala,
    Tamil,
}

impl Language {
    /// Single-letter code used by the source site and the database.
    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "E",
            Self::Sinhala => "S",
            Self::Tamil => "T",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "E" => Some(Self::English),
            "S" => Some(Self::Sinhala),
            "T" => Some(Self::Tamil),
            _ => None,
        }
    }

    /// Folder name used under downloads/ and the extracted-text mirror.
    pub fn folder_name(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Sinhala => "Sinhala",
            Self::Tamil => "Tamil",
        }
    }

    /// Language hints passed to the cloud OCR engine.
    pub fn ocr_hints(&self) -> &'static [&'static str] {
        match self {
            Self::English => &["en"],
            Self::Sinhala => &["si", "en"],
            Self::Tamil => &["ta", "en"],
        }
    }

    /// Traineddata name for the local Tesseract engine.
    pub fn tesseract_lang(&self) -> &'static str {
        match self {
            Self::English => "eng",
            Self::Sinhala => "sin",
            Self::Tamil => "tam",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One row scraped from the paginated listing table.
#[derive(Debug, Clone, Serialize)]
pub struct ListedCircular {
    pub number: String,
    pub title: String,
    pub date: NaiveDate,
    pub detail_url: Option<String>,
}

impl ListedCircular {
    pub fn year(&self) -> i32 {
        use chrono::Datelike;
        self.date.year()
    }
}

/// A listed circular the detector decided needs processing, annotated with
/// which tracked language versions are missing from the repository.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub listing: ListedCircular,
    pub needs: Vec<Language>,
}

/// One authoritative snapshot of a summarised circular, keyed by
/// `(circular_number, language)`. Reprocessing replaces the whole row.
#[derive(Debug, Clone)]
pub struct CircularRecord {
    pub circular_number: String,
    pub issued_date: Option<String>,
    pub issued_by: Option<String>,
    pub topic: Option<String>,
    pub summary: Option<String>,
    pub key_instructions: Vec<String>,
    pub applies_to: Option<String>,
    pub deadline: Option<String>,
    pub language: Language,
    pub pdf_path: Option<String>,
    pub txt_path: Option<String>,
    pub processed_at: String,
}
