//! Native text layer extraction via pdf-extract.
//!
//! Handles digital PDFs with an embedded text layer. Scanned pages come
//! back empty or near-empty, which is what routes them to the OCR tiers.

use super::types::NativePageSource;
use super::ExtractionError;

pub struct PdfNativeText;

impl NativePageSource for PdfNativeText {
    fn page_texts(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
            .map_err(|e| ExtractionError::PdfParsing(e.to_string()))
    }
}

/// Mock native source returning configured per-page texts.
pub struct MockNativeSource {
    pages: Vec<String>,
    fail: bool,
}

impl MockNativeSource {
    pub fn new(pages: Vec<&str>) -> Self {
        Self {
            pages: pages.into_iter().map(String::from).collect(),
            fail: false,
        }
    }

    /// A source that always errors, as corrupt PDFs do.
    pub fn failing() -> Self {
        Self {
            pages: Vec::new(),
            fail: true,
        }
    }
}

impl NativePageSource for MockNativeSource {
    fn page_texts(&self, _pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        if self.fail {
            return Err(ExtractionError::PdfParsing("unreadable xref table".into()));
        }
        Ok(self.pages.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Generate a valid one-page PDF with text using lopdf (the library
    /// pdf-extract uses internally).
    fn make_test_pdf(text: &str) -> Vec<u8> {
        use lopdf::dictionary;
        use lopdf::{Document, Object, Stream};

        let mut doc = Document::with_version("1.4");

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let content = format!("BT /F1 12 Tf 100 700 Td ({text}) Tj ET");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

        let resources = dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        };

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => resources,
        });

        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        });

        if let Ok(Object::Dictionary(dict)) = doc.get_object_mut(page_id) {
            dict.set("Parent", pages_id);
        }

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn extracts_text_from_digital_pdf() {
        let pdf = make_test_pdf("Public Administration Circular 10/2025");
        let pages = PdfNativeText.page_texts(&pdf).unwrap();
        assert_eq!(pages.len(), 1);
        assert!(pages[0].contains("Public Administration Circular"));
    }

    #[test]
    fn garbage_bytes_are_a_parse_error() {
        let result = PdfNativeText.page_texts(b"not a pdf at all");
        assert!(matches!(result, Err(ExtractionError::PdfParsing(_))));
    }

    #[test]
    fn mock_returns_configured_pages() {
        let source = MockNativeSource::new(vec!["page one", "page two"]);
        let pages = source.page_texts(b"ignored").unwrap();
        assert_eq!(pages, vec!["page one".to_string(), "page two".to_string()]);
    }

    #[test]
    fn failing_mock_errors() {
        assert!(MockNativeSource::failing().page_texts(b"x").is_err());
    }
}
