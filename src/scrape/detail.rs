//! Detail-page scan for per-language PDF links.
//!
//! Document links live under `images/circulars/` and encode the language as
//! the second-to-last path segment, e.g.
//! `/images/circulars/2025/E/10-2025.pdf`. A language with no discoverable
//! link is simply absent from the result — not an error.

use std::collections::HashMap;

use scraper::{Html, Selector};

use super::client::resolve_url;
use super::ScrapeError;
use crate::models::Language;

const DOCUMENT_PATH_MARKER: &str = "images/circulars/";

/// Scan a detail page for PDF links, keyed by language.
///
/// When the same language appears twice the last link wins, matching the
/// site's habit of listing a corrected upload below the original.
pub fn find_document_links(
    html: &str,
    page_url: &str,
) -> Result<HashMap<Language, String>, ScrapeError> {
    let document = Html::parse_document(html);
    let link_sel = Selector::parse("a[href]")
        .map_err(|e| ScrapeError::HtmlStructure(format!("bad selector: {e}")))?;

    let mut links = HashMap::new();
    for anchor in document.select(&link_sel) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if !href.contains(DOCUMENT_PATH_MARKER) || !href.to_lowercase().ends_with(".pdf") {
            continue;
        }
        let Some(language) = language_from_href(href) else {
            continue;
        };
        if let Ok(absolute) = resolve_url(page_url, href) {
            links.insert(language, absolute);
        }
    }
    Ok(links)
}

/// The language code is the second-to-last path segment of the href.
fn language_from_href(href: &str) -> Option<Language> {
    let trimmed = href.trim_end_matches('/');
    let mut segments = trimmed.rsplit('/');
    segments.next()?; // file name
    let code = segments.next()?;
    Language::from_code(&code.to_uppercase())
}
