//! Garbled-Sinhala repair path.
//!
//! Sinhala rows summarised from font-corrupted extractions carry either
//! garbled script or plain English where Sinhala should be. This pass
//! re-extracts their PDFs through the full ladder (now allowed to spend
//! OCR budget), re-summarises, and replaces the row wholesale.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::budget::BudgetLedger;
use crate::config::Config;
use crate::db::{CircularRepository, SinhalaRow};
use crate::extract::{is_garbled, sinhala_chars, ExtractionLadder};
use crate::fetch::{pdf_cache_path, txt_cache_path};
use crate::models::Language;
use crate::pipeline::PipelineError;
use crate::summarize::{into_record, Summarizer};

/// Minimum Sinhala code points for a re-extraction to be worth
/// re-summarising.
const MIN_SINHALA_CHARS: usize = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReprocessStats {
    pub candidates: u32,
    pub fixed: u32,
    pub skipped: u32,
    pub failed: u32,
}

/// Does this stored row need the repair pass?
pub fn needs_repair(row: &SinhalaRow) -> bool {
    let combined = format!(
        "{} {}",
        row.topic.as_deref().unwrap_or(""),
        row.summary.as_deref().unwrap_or("")
    );
    let trimmed = combined.trim();
    if trimmed.is_empty() {
        return true;
    }
    sinhala_chars(trimmed) <= 5 || is_garbled(trimmed)
}

/// Locate the Sinhala PDF for a stored row: the recorded path first, then
/// the deterministic cache location derived from the circular number.
pub fn locate_pdf(row: &SinhalaRow, download_dir: &Path) -> Option<PathBuf> {
    if let Some(stored) = &row.pdf_path {
        let path = PathBuf::from(stored.replace('\\', "/"));
        if path.exists() {
            return Some(path);
        }
    }
    let year = year_from_number(&row.circular_number)?;
    let path = pdf_cache_path(download_dir, year, Language::Sinhala, &row.circular_number);
    path.exists().then_some(path)
}

/// First four-digit year embedded in the circular number, e.g.
/// `06/2025 (Letter)` → 2025.
fn year_from_number(number: &str) -> Option<i32> {
    let re = Regex::new(r"20\d\d").ok()?;
    re.find(number)?.as_str().parse().ok()
}

pub struct Reprocessor<'a> {
    pub repo: &'a CircularRepository,
    pub ladder: &'a ExtractionLadder,
    pub ledger: &'a mut BudgetLedger,
    pub summarizer: &'a Summarizer,
    pub config: &'a Config,
}

impl Reprocessor<'_> {
    pub fn run(&mut self) -> Result<ReprocessStats, PipelineError> {
        let rows = self.repo.sinhala_rows()?;
        let garbled: Vec<SinhalaRow> = rows.into_iter().filter(needs_repair).collect();

        let mut stats = ReprocessStats {
            candidates: garbled.len() as u32,
            ..ReprocessStats::default()
        };
        tracing::info!(candidates = stats.candidates, "Garbled Sinhala rows to repair");

        for row in &garbled {
            match self.repair_row(row) {
                Ok(true) => stats.fixed += 1,
                Ok(false) => stats.skipped += 1,
                Err(e) => {
                    tracing::warn!(number = %row.circular_number, error = %e, "Repair failed");
                    stats.failed += 1;
                }
            }
        }

        tracing::info!(
            fixed = stats.fixed,
            skipped = stats.skipped,
            failed = stats.failed,
            "Reprocess pass complete"
        );
        Ok(stats)
    }

    /// Ok(true) = row replaced; Ok(false) = skipped (no PDF on disk).
    fn repair_row(&mut self, row: &SinhalaRow) -> Result<bool, PipelineError> {
        let Some(pdf_path) = locate_pdf(row, &self.config.download_dir) else {
            tracing::warn!(number = %row.circular_number, "No PDF on disk, skipping");
            return Ok(false);
        };

        let document =
            self.ladder
                .extract_file(&pdf_path, Language::Sinhala, self.ledger)?;

        let si_chars = sinhala_chars(&document.full_text);
        tracing::info!(
            number = %row.circular_number,
            chars = document.text_chars,
            sinhala = si_chars,
            native = document.tally.native,
            cloud = document.tally.cloud,
            local = document.tally.local,
            "Re-extracted"
        );

        if si_chars < MIN_SINHALA_CHARS {
            return Err(PipelineError::NoUsableText);
        }

        let year = year_from_number(&row.circular_number).unwrap_or(chrono_year());
        let txt_path = txt_cache_path(
            &self.config.text_dir,
            year,
            Language::Sinhala,
            &row.circular_number,
        );
        if let Some(parent) = txt_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&txt_path, &document.full_text)?;

        let date = row.issued_date.clone().unwrap_or_default();
        let summary = self.summarizer.summarize(
            &row.circular_number,
            &date,
            row.topic.as_deref().unwrap_or(""),
            &document.full_text,
            Language::Sinhala,
        )?;

        let record = into_record(
            summary,
            &row.circular_number,
            &date,
            Language::Sinhala,
            Some(pdf_path.display().to_string()),
            Some(txt_path.display().to_string()),
        );
        self.repo.upsert(&record)?;
        Ok(true)
    }
}

fn chrono_year() -> i32 {
    use chrono::Datelike;
    chrono::Local::now().year()
}
