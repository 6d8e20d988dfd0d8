pub mod cloud;
pub mod garbled;
pub mod ladder;
pub mod local_ocr;
pub mod native;
pub mod renderer;
pub mod types;

pub use cloud::*;
pub use garbled::*;
pub use ladder::*;
pub use local_ocr::*;
pub use native::*;
pub use renderer::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("PDF rendering failed on page {page}: {reason}")]
    PdfRendering { page: usize, reason: String },

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("OCR initialization failed: {0}")]
    OcrInit(String),

    #[error("OCR processing failed: {0}")]
    OcrProcessing(String),

    #[error("Cloud OCR error: {0}")]
    CloudOcr(String),
}
