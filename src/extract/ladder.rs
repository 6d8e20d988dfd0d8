//! The extraction ladder: native text → cloud OCR → local OCR.
//!
//! Modeled as an ordered list of tiers, each with a predicate ("can this
//! tier run given current budget/credentials?") and an executor. Pages walk
//! the list in order and take the first applicable successful result, so a
//! future tier (say a second cloud provider) is an additive change.
//!
//! Cost rules enforced here:
//! - A page whose native text passes the per-language minimum never
//!   triggers any OCR call.
//! - The cloud tier runs only while `ledger.remaining() > 0`, and the
//!   ledger is incremented only after a confirmed result.
//! - Any cloud failure falls through to the local tier at zero cost.

use std::path::Path;
use std::sync::Arc;

use super::garbled::sinhala_ratio;
use super::renderer::DEFAULT_RENDER_DPI;
use super::types::{
    CloudOcrEngine, ExtractedDocument, LocalOcrEngine, NativePageSource, PageRenderer, PageTier,
    TierTally,
};
use super::ExtractionError;
use crate::budget::BudgetLedger;
use crate::models::Language;

/// Minimum trimmed characters for a native Latin-script page.
const MIN_NATIVE_CHARS: usize = 50;
/// Sinhala pages need more text and a minimum script ratio: badly-encoded
/// fonts yield long runs of Latin mojibake that would otherwise pass.
const MIN_NATIVE_CHARS_SINHALA: usize = 100;
const MIN_SINHALA_RATIO: f64 = 0.05;

/// Everything a tier needs to know about the page in front of it.
pub struct PageContext<'a> {
    pub pdf_bytes: &'a [u8],
    pub page_index: usize,
    pub native_text: &'a str,
    pub language: Language,
}

pub trait ExtractionTier {
    fn tier(&self) -> PageTier;

    fn applicable(&self, ctx: &PageContext<'_>, ledger: &BudgetLedger) -> bool;

    fn run(
        &self,
        ctx: &PageContext<'_>,
        ledger: &mut BudgetLedger,
    ) -> Result<String, ExtractionError>;
}

/// Is the embedded text layer good enough to skip OCR entirely?
pub fn native_text_usable(text: &str, language: Language) -> bool {
    let trimmed = text.trim();
    match language {
        Language::Sinhala => {
            trimmed.chars().count() >= MIN_NATIVE_CHARS_SINHALA
                && sinhala_ratio(trimmed) >= MIN_SINHALA_RATIO
        }
        _ => trimmed.chars().count() >= MIN_NATIVE_CHARS,
    }
}

struct NativeTier;

impl ExtractionTier for NativeTier {
    fn tier(&self) -> PageTier {
        PageTier::Native
    }

    fn applicable(&self, ctx: &PageContext<'_>, _ledger: &BudgetLedger) -> bool {
        native_text_usable(ctx.native_text, ctx.language)
    }

    fn run(
        &self,
        ctx: &PageContext<'_>,
        _ledger: &mut BudgetLedger,
    ) -> Result<String, ExtractionError> {
        Ok(ctx.native_text.trim().to_string())
    }
}

struct CloudTier {
    renderer: Arc<dyn PageRenderer>,
    engine: Arc<dyn CloudOcrEngine>,
    dpi: u32,
}

impl ExtractionTier for CloudTier {
    fn tier(&self) -> PageTier {
        PageTier::CloudOcr
    }

    fn applicable(&self, _ctx: &PageContext<'_>, ledger: &BudgetLedger) -> bool {
        ledger.remaining() > 0
    }

    fn run(
        &self,
        ctx: &PageContext<'_>,
        ledger: &mut BudgetLedger,
    ) -> Result<String, ExtractionError> {
        let png = self
            .renderer
            .render_page(ctx.pdf_bytes, ctx.page_index, self.dpi)?;
        let text = self.engine.recognize(&png, ctx.language.ocr_hints())?;

        // Confirmed result — count the page now, never speculatively.
        if let Err(e) = ledger.record_success() {
            tracing::warn!(error = %e, "Cloud OCR usage could not be persisted");
        }
        Ok(text)
    }
}

struct LocalTier {
    renderer: Arc<dyn PageRenderer>,
    engine: Arc<dyn LocalOcrEngine>,
    dpi: u32,
}

impl ExtractionTier for LocalTier {
    fn tier(&self) -> PageTier {
        PageTier::LocalOcr
    }

    fn applicable(&self, _ctx: &PageContext<'_>, _ledger: &BudgetLedger) -> bool {
        true
    }

    fn run(
        &self,
        ctx: &PageContext<'_>,
        _ledger: &mut BudgetLedger,
    ) -> Result<String, ExtractionError> {
        let png = self
            .renderer
            .render_page(ctx.pdf_bytes, ctx.page_index, self.dpi)?;
        self.engine
            .recognize(&png, ctx.language.tesseract_lang())
    }
}

pub struct ExtractionLadder {
    native: Box<dyn NativePageSource>,
    renderer: Arc<dyn PageRenderer>,
    tiers: Vec<Box<dyn ExtractionTier>>,
}

impl ExtractionLadder {
    /// A ladder that starts with the native tier; OCR tiers are appended
    /// in walk order with `with_cloud` / `with_local`.
    pub fn new(native: Box<dyn NativePageSource>, renderer: Arc<dyn PageRenderer>) -> Self {
        Self {
            native,
            renderer,
            tiers: vec![Box::new(NativeTier)],
        }
    }

    /// Append the costed cloud tier. Only call when the credential is
    /// configured — absence of this tier is the "no credential" degradation.
    pub fn with_cloud(mut self, engine: Arc<dyn CloudOcrEngine>) -> Self {
        self.tiers.push(Box::new(CloudTier {
            renderer: self.renderer.clone(),
            engine,
            dpi: DEFAULT_RENDER_DPI,
        }));
        self
    }

    /// Append the always-available local tier.
    pub fn with_local(mut self, engine: Arc<dyn LocalOcrEngine>) -> Self {
        self.tiers.push(Box::new(LocalTier {
            renderer: self.renderer.clone(),
            engine,
            dpi: DEFAULT_RENDER_DPI,
        }));
        self
    }

    pub fn extract_file(
        &self,
        pdf_path: &Path,
        language: Language,
        ledger: &mut BudgetLedger,
    ) -> Result<ExtractedDocument, ExtractionError> {
        let pdf_bytes = std::fs::read(pdf_path)?;
        self.extract_document(&pdf_bytes, language, ledger)
    }

    /// Extract every page of a PDF, walking the tier list per page.
    pub fn extract_document(
        &self,
        pdf_bytes: &[u8],
        language: Language,
        ledger: &mut BudgetLedger,
    ) -> Result<ExtractedDocument, ExtractionError> {
        let native_pages = match self.native.page_texts(pdf_bytes) {
            Ok(pages) if !pages.is_empty() => pages,
            Ok(_) => self.blank_pages(pdf_bytes)?,
            Err(e) => {
                tracing::warn!(error = %e, "Native text layer unreadable, OCR-only extraction");
                self.blank_pages(pdf_bytes)?
            }
        };

        let mut tally = TierTally::default();
        let mut parts = Vec::with_capacity(native_pages.len());
        let mut text_chars = 0usize;

        for (index, native_text) in native_pages.iter().enumerate() {
            let ctx = PageContext {
                pdf_bytes,
                page_index: index,
                native_text,
                language,
            };
            let (tier, text) = self.extract_page(&ctx, ledger);
            tally.record(tier);
            text_chars += text.trim().chars().count();
            tracing::debug!(
                page = index + 1,
                tier = %tier,
                chars = text.chars().count(),
                remaining_cloud = ledger.remaining(),
                "Page extracted"
            );
            parts.push(format!("\n--- Page {} [{}] ---\n{}", index + 1, tier, text));
        }

        let page_count = native_pages.len();
        tracing::info!(
            pages = page_count,
            native = tally.native,
            cloud = tally.cloud,
            local = tally.local,
            %language,
            "Document extraction complete"
        );

        Ok(ExtractedDocument {
            full_text: parts.concat(),
            tally,
            page_count,
            text_chars,
        })
    }

    fn extract_page(&self, ctx: &PageContext<'_>, ledger: &mut BudgetLedger) -> (PageTier, String) {
        for tier in &self.tiers {
            if !tier.applicable(ctx, ledger) {
                continue;
            }
            match tier.run(ctx, ledger) {
                Ok(text) => return (tier.tier(), text),
                Err(e) => {
                    tracing::warn!(
                        page = ctx.page_index + 1,
                        tier = %tier.tier(),
                        error = %e,
                        "Tier failed, falling through"
                    );
                }
            }
        }
        tracing::warn!(page = ctx.page_index + 1, "No tier produced text for page");
        (PageTier::LocalOcr, String::new())
    }

    fn blank_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        let count = self.renderer.page_count(pdf_bytes)?;
        Ok(vec![String::new(); count])
    }
}
