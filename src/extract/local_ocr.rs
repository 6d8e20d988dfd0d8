//! Local Tesseract OCR — the always-available bottom rung of the ladder.
//!
//! Gated behind the `ocr` cargo feature because it links the system
//! Tesseract libraries. Without the feature the engine degrades to an
//! empty-text stub so the rest of the pipeline still runs everywhere.

use super::types::LocalOcrEngine;
use super::ExtractionError;

#[cfg(feature = "ocr")]
pub struct TesseractOcr {
    tessdata_dir: Option<std::path::PathBuf>,
}

#[cfg(feature = "ocr")]
impl TesseractOcr {
    pub fn new() -> Self {
        Self { tessdata_dir: None }
    }

    /// Point at a specific tessdata directory instead of the system default.
    pub fn with_tessdata_dir(mut self, dir: &std::path::Path) -> Self {
        self.tessdata_dir = Some(dir.to_path_buf());
        self
    }
}

#[cfg(feature = "ocr")]
impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "ocr")]
impl LocalOcrEngine for TesseractOcr {
    fn recognize(&self, png: &[u8], lang: &str) -> Result<String, ExtractionError> {
        let datapath = match &self.tessdata_dir {
            Some(dir) => Some(dir.to_str().ok_or_else(|| {
                ExtractionError::OcrInit("Invalid tessdata path".into())
            })?),
            None => None,
        };

        let tess = tesseract::Tesseract::new(datapath, Some(lang))
            .map_err(|e| ExtractionError::OcrInit(format!("{e:?}")))?;

        let mut tess = tess
            .set_image_from_mem(png)
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;

        tess.get_text()
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))
    }
}

#[cfg(not(feature = "ocr"))]
pub struct TesseractOcr;

#[cfg(not(feature = "ocr"))]
impl TesseractOcr {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(not(feature = "ocr"))]
impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(feature = "ocr"))]
impl LocalOcrEngine for TesseractOcr {
    fn recognize(&self, _png: &[u8], lang: &str) -> Result<String, ExtractionError> {
        tracing::warn!(lang, "Compiled without the ocr feature; local OCR returns no text");
        Ok(String::new())
    }
}

/// Mock local OCR engine returning configured text. Call counts are
/// observable through a shared `Arc`, matching how the ladder holds its
/// engines.
pub struct MockLocalOcr {
    text: String,
    fail: bool,
    calls: std::sync::atomic::AtomicU32,
}

impl MockLocalOcr {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            fail: false,
            calls: std::sync::atomic::AtomicU32::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            text: String::new(),
            fail: true,
            calls: std::sync::atomic::AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl LocalOcrEngine for MockLocalOcr {
    fn recognize(&self, _png: &[u8], _lang: &str) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.fail {
            return Err(ExtractionError::OcrProcessing("engine unavailable".into()));
        }
        Ok(self.text.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_counts_calls() {
        let ocr = MockLocalOcr::new("text");
        ocr.recognize(b"png", "sin").unwrap();
        ocr.recognize(b"png", "sin").unwrap();
        assert_eq!(ocr.calls(), 2);
    }

    #[test]
    fn failing_mock_errors() {
        let ocr = MockLocalOcr::failing();
        assert!(ocr.recognize(b"png", "eng").is_err());
        assert_eq!(ocr.calls(), 1);
    }

    #[cfg(not(feature = "ocr"))]
    #[test]
    fn stub_returns_empty_text() {
        let ocr = TesseractOcr::new();
        assert_eq!(ocr.recognize(b"png", "sin").unwrap(), "");
    }
}
