//! Document fetcher — per-language PDF discovery and disk-cached download.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::models::{Language, ListedCircular};
use crate::scrape::{find_document_links, HttpFetcher, ScrapeError};

/// Result of fetching one circular's documents.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Local path per language actually available on disk.
    pub paths: HashMap<Language, PathBuf>,
    /// How many files were downloaded this call (vs already cached).
    pub downloaded: u32,
}

/// Make a circular number safe as a file stem: `06/2025 (Letter)` →
/// `06-2025 (Letter)`.
pub fn sanitize_number(number: &str) -> String {
    number
        .replace(['/', '\\'], "-")
        .chars()
        .filter(|c| !matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Deterministic PDF cache path: `downloads/<year>/<language>/<number>.pdf`.
pub fn pdf_cache_path(download_dir: &Path, year: i32, language: Language, number: &str) -> PathBuf {
    download_dir
        .join(year.to_string())
        .join(language.folder_name())
        .join(format!("{}.pdf", sanitize_number(number)))
}

/// Parallel text-artifact path mirroring the PDF layout.
pub fn txt_cache_path(text_dir: &Path, year: i32, language: Language, number: &str) -> PathBuf {
    text_dir
        .join(year.to_string())
        .join(language.folder_name())
        .join(format!("{}.txt", sanitize_number(number)))
}

pub struct DocumentFetcher<'a> {
    fetcher: &'a HttpFetcher,
    download_dir: &'a Path,
}

impl<'a> DocumentFetcher<'a> {
    pub fn new(fetcher: &'a HttpFetcher, download_dir: &'a Path) -> Self {
        Self {
            fetcher,
            download_dir,
        }
    }

    /// Discover and fetch the circular's PDFs for the needed languages.
    ///
    /// Idempotent re-entry: a cached file short-circuits the network fetch.
    /// A single failed download skips that language; a failed detail-page
    /// fetch is this circular's failure and propagates to the caller.
    pub fn fetch_documents(
        &self,
        circular: &ListedCircular,
        needed: &[Language],
    ) -> Result<FetchOutcome, ScrapeError> {
        let mut outcome = FetchOutcome::default();

        let Some(detail_url) = circular.detail_url.as_deref() else {
            tracing::warn!(number = %circular.number, "No detail link on listing row");
            return Ok(outcome);
        };

        let html = self.fetcher.get_html(detail_url)?;
        let links = find_document_links(&html, detail_url)?;

        for language in needed {
            let Some(url) = links.get(language) else {
                tracing::debug!(number = %circular.number, %language, "No document link for language");
                continue;
            };

            let path = pdf_cache_path(self.download_dir, circular.year(), *language, &circular.number);
            if path.exists() {
                tracing::debug!(path = %path.display(), "Already cached, skipping download");
                outcome.paths.insert(*language, path);
                continue;
            }

            match self.fetcher.download(url, &path) {
                Ok(_) => {
                    outcome.downloaded += 1;
                    outcome.paths.insert(*language, path);
                }
                Err(e) => {
                    tracing::warn!(number = %circular.number, %language, error = %e, "Download failed");
                }
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_slashes() {
        assert_eq!(sanitize_number("10/2025"), "10-2025");
        assert_eq!(sanitize_number(r"10\2025"), "10-2025");
    }

    #[test]
    fn sanitize_strips_reserved_characters() {
        assert_eq!(sanitize_number("06/2025 (Letter)"), "06-2025 (Letter)");
        assert_eq!(sanitize_number("a:b*c?d\"e<f>g|h"), "abcdefgh");
    }

    #[test]
    fn pdf_path_layout() {
        let path = pdf_cache_path(Path::new("downloads"), 2025, Language::Sinhala, "10/2025");
        assert_eq!(
            path,
            Path::new("downloads/2025/Sinhala/10-2025.pdf")
        );
    }

    #[test]
    fn txt_path_mirrors_pdf_layout() {
        let path = txt_cache_path(Path::new("extracted_text"), 2025, Language::English, "10/2025");
        assert_eq!(
            path,
            Path::new("extracted_text/2025/English/10-2025.txt")
        );
    }

    #[test]
    fn same_number_different_language_distinct_paths() {
        let en = pdf_cache_path(Path::new("d"), 2025, Language::English, "10/2025");
        let si = pdf_cache_path(Path::new("d"), 2025, Language::Sinhala, "10/2025");
        assert_ne!(en, si);
    }
}
