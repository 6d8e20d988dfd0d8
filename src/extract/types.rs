use serde::Serialize;

use super::ExtractionError;

/// Which rung of the extraction ladder produced a page's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PageTier {
    Native,
    CloudOcr,
    LocalOcr,
}

impl PageTier {
    /// Short name used in page markers and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::CloudOcr => "cloud",
            Self::LocalOcr => "local",
        }
    }
}

impl std::fmt::Display for PageTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-tier page counts for one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierTally {
    pub native: u32,
    pub cloud: u32,
    pub local: u32,
}

impl TierTally {
    pub fn record(&mut self, tier: PageTier) {
        match tier {
            PageTier::Native => self.native += 1,
            PageTier::CloudOcr => self.cloud += 1,
            PageTier::LocalOcr => self.local += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.native + self.cloud + self.local
    }
}

/// Full concatenated text of one document plus its tier usage.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// Page texts joined with `--- Page N [tier] ---` markers.
    pub full_text: String,
    pub tally: TierTally,
    pub page_count: usize,
    /// Characters of actual page text, excluding the markers. Zero means
    /// no tier produced anything usable.
    pub text_chars: usize,
}

impl ExtractedDocument {
    /// Did extraction produce anything worth sending to the completion
    /// service?
    pub fn has_usable_text(&self) -> bool {
        self.text_chars > 0
    }
}

/// Per-page native text layer of a PDF.
pub trait NativePageSource {
    fn page_texts(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError>;
}

/// Rasterises PDF pages to PNG for the OCR tiers.
pub trait PageRenderer {
    fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize, ExtractionError>;

    fn render_page(
        &self,
        pdf_bytes: &[u8],
        page_index: usize,
        dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError>;
}

/// Costed cloud OCR engine (quota-gated by the ladder).
pub trait CloudOcrEngine {
    fn recognize(&self, png: &[u8], language_hints: &[&str]) -> Result<String, ExtractionError>;
}

/// Zero-cost local OCR engine — the always-available bottom rung.
pub trait LocalOcrEngine {
    fn recognize(&self, png: &[u8], lang: &str) -> Result<String, ExtractionError>;
}
