//! The sequential driver loop: detect → fetch → extract → summarise →
//! persist, one circular at a time.
//!
//! Single-threaded on purpose: the completion service has a strict rate
//! ceiling and the cloud OCR tier a strict monthly quota, so parallel
//! fan-out would only complicate the accounting. No circular's failure
//! blocks another's processing; rows already committed survive later
//! failures in the same run.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::budget::{BudgetError, BudgetLedger};
use crate::config::Config;
use crate::db::{open_database, CircularRepository, DatabaseError};
use crate::detect::{write_report, ChangeDetector, ChangeReport, SiteListing};
use crate::extract::{
    ExtractionError, ExtractionLadder, PageRenderer, PdfNativeText, PdfiumRenderer, TesseractOcr,
    VisionOcr,
};
use crate::fetch::{txt_cache_path, DocumentFetcher};
use crate::models::{Candidate, Language, ListedCircular};
use crate::scrape::{HttpFetcher, ScrapeError};
use crate::summarize::{into_record, GroqClient, Summarizer, SummarizeError};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("GROQ_API_KEY not configured; no circular can be summarised without it")]
    MissingCompletionCredential,

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error(transparent)]
    Budget(#[from] BudgetError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Summarize(#[from] SummarizeError),

    #[error("Extraction produced no usable text")]
    NoUsableText,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run-level tallies surfaced at the end of every run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub found: u32,
    pub downloaded: u32,
    pub summarized: u32,
    pub failed: u32,
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "found: {}  downloaded: {}  summarised: {}  failed: {}",
            self.found, self.downloaded, self.summarized, self.failed
        )
    }
}

pub struct Pipeline {
    config: Config,
    fetcher: HttpFetcher,
    repo: CircularRepository,
    ledger: BudgetLedger,
    ladder: ExtractionLadder,
    summarizer: Summarizer,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").finish_non_exhaustive()
    }
}

/// Assemble the production extraction ladder from the configuration.
///
/// The cloud tier is appended only when the Vision credential is present;
/// its absence is the documented graceful degradation, not an error.
pub fn build_ladder(config: &Config) -> ExtractionLadder {
    let renderer: Arc<dyn PageRenderer> = Arc::new(PdfiumRenderer);
    let mut ladder = ExtractionLadder::new(Box::new(PdfNativeText), renderer);

    match &config.vision_api_key {
        Some(key) => match VisionOcr::new(key, config.request_timeout) {
            Ok(engine) => ladder = ladder.with_cloud(Arc::new(engine)),
            Err(e) => {
                tracing::warn!(error = %e, "Cloud OCR client unavailable, continuing without it");
            }
        },
        None => {
            tracing::warn!("GOOGLE_VISION_API_KEY not set; OCR pages will use the local engine");
        }
    }

    ladder.with_local(Arc::new(TesseractOcr::new()))
}

impl Pipeline {
    /// Construct every collaborator once per run. The completion credential
    /// is mandatory and checked here, before any work begins.
    pub fn build(config: &Config) -> Result<Self, PipelineError> {
        let groq_key = config
            .groq_api_key
            .as_deref()
            .ok_or(PipelineError::MissingCompletionCredential)?;

        let fetcher = HttpFetcher::new(config.request_timeout, config.download_timeout)?;
        let repo = CircularRepository::new(open_database(&config.db_path)?);
        let ledger = BudgetLedger::load(
            &config.ledger_path,
            config.monthly_cap,
            config.safety_buffer,
        );
        let ladder = build_ladder(config);
        let client = GroqClient::new(groq_key, &config.completion_model, config.request_timeout)?;
        let summarizer =
            Summarizer::new(Box::new(client)).with_inter_request_delay(config.completion_delay);

        Ok(Self::from_parts(
            config.clone(),
            fetcher,
            repo,
            ledger,
            ladder,
            summarizer,
        ))
    }

    /// Wire a pipeline from externally built parts (tests substitute
    /// fakes here).
    pub fn from_parts(
        config: Config,
        fetcher: HttpFetcher,
        repo: CircularRepository,
        ledger: BudgetLedger,
        ladder: ExtractionLadder,
        summarizer: Summarizer,
    ) -> Self {
        Self {
            config,
            fetcher,
            repo,
            ledger,
            ladder,
            summarizer,
        }
    }

    pub fn ledger(&self) -> &BudgetLedger {
        &self.ledger
    }

    pub fn repo(&self) -> &CircularRepository {
        &self.repo
    }

    /// The full detect → fetch → extract → summarise → persist pass.
    pub fn run(&mut self) -> Result<(RunStats, ChangeReport), PipelineError> {
        let known = self.repo.known_pairs()?;
        let topics = self.repo.english_topics()?;
        tracing::info!(known_pairs = known.len(), "Starting pipeline run");

        let listing = SiteListing::new(self.fetcher.clone(), &self.config.base_url);
        let detector = ChangeDetector::new(&listing, &self.config);
        let (candidates, report) = detector.scan(&known, &topics);

        if let Err(e) = write_report(&report, &self.config.report_path) {
            tracing::warn!(error = %e, "Could not write scan report");
        }

        let mut stats = RunStats {
            found: candidates.len() as u32,
            ..RunStats::default()
        };

        for candidate in &candidates {
            self.process_candidate(candidate, &mut stats);
        }

        tracing::info!(%stats, "Pipeline run complete");
        Ok((stats, report))
    }

    /// Run the garbled-Sinhala repair pass over stored rows.
    pub fn reprocess(&mut self) -> Result<crate::reprocess::ReprocessStats, PipelineError> {
        let mut reprocessor = crate::reprocess::Reprocessor {
            repo: &self.repo,
            ladder: &self.ladder,
            ledger: &mut self.ledger,
            summarizer: &self.summarizer,
            config: &self.config,
        };
        reprocessor.run()
    }

    /// Failures here are contained: logged, counted, and the loop moves on.
    fn process_candidate(&mut self, candidate: &Candidate, stats: &mut RunStats) {
        let number = candidate.listing.number.clone();
        tracing::info!(
            %number,
            date = %candidate.listing.date,
            needs = ?candidate.needs,
            "Processing circular"
        );

        let document_fetcher = DocumentFetcher::new(&self.fetcher, &self.config.download_dir);
        let outcome = match document_fetcher.fetch_documents(&candidate.listing, &candidate.needs) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(%number, error = %e, "Document fetch failed, skipping circular");
                stats.failed += 1;
                return;
            }
        };
        stats.downloaded += outcome.downloaded;

        if outcome.paths.is_empty() {
            tracing::warn!(%number, "No documents found for needed languages");
            return;
        }

        for language in &candidate.needs {
            let Some(pdf_path) = outcome.paths.get(language) else {
                continue;
            };
            match self.process_language(&candidate.listing, *language, pdf_path) {
                Ok(()) => stats.summarized += 1,
                Err(e) => {
                    tracing::warn!(%number, %language, error = %e, "Processing failed");
                    stats.failed += 1;
                }
            }
        }
    }

    /// Extract, cache the text artifact, summarise, and persist one
    /// language version.
    fn process_language(
        &mut self,
        listing: &ListedCircular,
        language: Language,
        pdf_path: &Path,
    ) -> Result<(), PipelineError> {
        let document = self
            .ladder
            .extract_file(pdf_path, language, &mut self.ledger)?;

        if !document.has_usable_text() {
            return Err(PipelineError::NoUsableText);
        }

        let txt_path = txt_cache_path(
            &self.config.text_dir,
            listing.year(),
            language,
            &listing.number,
        );
        if let Some(parent) = txt_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&txt_path, &document.full_text)?;

        let date = listing.date.format("%Y-%m-%d").to_string();
        let summary = self.summarizer.summarize(
            &listing.number,
            &date,
            &listing.title,
            &document.full_text,
            language,
        )?;

        let record = into_record(
            summary,
            &listing.number,
            &date,
            language,
            Some(pdf_path.display().to_string()),
            Some(txt_path.display().to_string()),
        );
        self.repo.upsert(&record)?;
        Ok(())
    }
}
