//! Change detector — diffs the live listing against the repository.
//!
//! Walks the listing from offset 0 in page-size steps. The listing is
//! date-ordered newest first, so the walk stops after the first page
//! containing a row outside the target-year window: once history is
//! reached no further unseen targets remain. A page-fetch error ends the
//! walk but keeps candidates already collected from earlier pages.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde::Serialize;

use crate::config::Config;
use crate::models::{Candidate, Language, ListedCircular};
use crate::scrape::{listing_url, parse_listing, HttpFetcher, ScrapeError};

/// One page of listing HTML, by pagination offset.
pub trait ListingSource {
    fn fetch_page(&self, offset: u32) -> Result<String, ScrapeError>;
    fn page_url(&self, offset: u32) -> String;
}

/// Production listing source backed by the public site.
pub struct SiteListing {
    fetcher: HttpFetcher,
    base_url: String,
}

impl SiteListing {
    pub fn new(fetcher: HttpFetcher, base_url: &str) -> Self {
        Self {
            fetcher,
            base_url: base_url.to_string(),
        }
    }
}

impl ListingSource for SiteListing {
    fn fetch_page(&self, offset: u32) -> Result<String, ScrapeError> {
        self.fetcher.get_html(&self.page_url(offset))
    }

    fn page_url(&self, offset: u32) -> String {
        listing_url(&self.base_url, offset)
    }
}

/// A row whose scraped title no longer matches the stored English topic.
/// Best-effort amendment signal; drives reporting only, never reprocessing.
#[derive(Debug, Clone, Serialize)]
pub struct TitleChange {
    pub number: String,
    pub site_title: String,
    pub stored_topic: String,
}

/// Scan report in the shape downstream tooling consumes.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ChangeReport {
    pub scanned_at: String,
    pub new: Vec<ListedCircular>,
    pub missing_lang: Vec<MissingLanguages>,
    pub title_changed: Vec<TitleChange>,
    pub up_to_date: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MissingLanguages {
    #[serde(flatten)]
    pub listing: ListedCircular,
    pub missing: Vec<Language>,
}

impl ChangeReport {
    /// New or incomplete circulars warrant a pipeline run (and a non-zero
    /// exit for external scheduling logic).
    pub fn actionable(&self) -> usize {
        self.new.len() + self.missing_lang.len()
    }
}

pub struct ChangeDetector<'a, S: ListingSource> {
    source: &'a S,
    target_years: &'a [i32],
    languages: &'a [Language],
    page_size: u32,
    page_delay: Duration,
}

impl<'a, S: ListingSource> ChangeDetector<'a, S> {
    pub fn new(source: &'a S, config: &'a Config) -> Self {
        Self {
            source,
            target_years: &config.target_years,
            languages: &config.languages,
            page_size: config.page_size,
            page_delay: config.page_delay,
        }
    }

    /// Override the inter-page delay (tests use zero).
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    /// Walk the listing and produce candidates (listing order, newest
    /// first) plus the classification report.
    pub fn scan(
        &self,
        known_pairs: &HashSet<(String, Language)>,
        english_topics: &HashMap<String, String>,
    ) -> (Vec<Candidate>, ChangeReport) {
        let mut candidates = Vec::new();
        let mut report = ChangeReport {
            scanned_at: chrono::Local::now().to_rfc3339(),
            ..ChangeReport::default()
        };

        let known_numbers: HashSet<&str> =
            known_pairs.iter().map(|(n, _)| n.as_str()).collect();

        let mut offset = 0u32;
        loop {
            let html = match self.source.fetch_page(offset) {
                Ok(html) => html,
                Err(e) => {
                    tracing::warn!(offset, error = %e, "Listing page fetch failed, stopping scan");
                    break;
                }
            };

            let rows = match parse_listing(&html, &self.source.page_url(offset)) {
                Ok(rows) => rows,
                Err(e) => {
                    tracing::warn!(offset, error = %e, "Listing page unparsable, stopping scan");
                    break;
                }
            };
            if rows.is_empty() {
                break;
            }

            let mut saw_old = false;
            let mut in_window = 0u32;
            for row in rows {
                if !self.target_years.contains(&row.year()) {
                    saw_old = true;
                    continue;
                }
                in_window += 1;
                self.classify_row(row, known_pairs, &known_numbers, english_topics,
                    &mut candidates, &mut report);
            }

            tracing::debug!(offset, in_window, "Scanned listing page");
            if saw_old {
                break;
            }
            offset += self.page_size;
            if !self.page_delay.is_zero() {
                std::thread::sleep(self.page_delay);
            }
        }

        (candidates, report)
    }

    fn classify_row(
        &self,
        row: ListedCircular,
        known_pairs: &HashSet<(String, Language)>,
        known_numbers: &HashSet<&str>,
        english_topics: &HashMap<String, String>,
        candidates: &mut Vec<Candidate>,
        report: &mut ChangeReport,
    ) {
        let needs: Vec<Language> = self
            .languages
            .iter()
            .copied()
            .filter(|lang| !known_pairs.contains(&(row.number.clone(), *lang)))
            .collect();

        let is_new = !known_numbers.contains(row.number.as_str());

        if let Some(stored_topic) = english_topics.get(&row.number) {
            if title_changed(&row.title, stored_topic) {
                report.title_changed.push(TitleChange {
                    number: row.number.clone(),
                    site_title: row.title.clone(),
                    stored_topic: stored_topic.clone(),
                });
            }
        }

        if is_new {
            tracing::info!(number = %row.number, date = %row.date, title = %row.title, "New circular");
            report.new.push(row.clone());
        } else if !needs.is_empty() {
            tracing::info!(
                number = %row.number,
                missing = ?needs,
                "Known circular missing language versions"
            );
            report.missing_lang.push(MissingLanguages {
                listing: row.clone(),
                missing: needs.clone(),
            });
        } else {
            report.up_to_date += 1;
        }

        if !needs.is_empty() {
            candidates.push(Candidate { listing: row, needs });
        }
    }
}

/// Mutual substring containment between the stored English topic and the
/// freshly scraped title, lowercased. Fails ⇒ possible amendment.
fn title_changed(site_title: &str, stored_topic: &str) -> bool {
    let site = site_title.trim().to_lowercase();
    let stored = stored_topic.trim().to_lowercase();
    if site.is_empty() || stored.is_empty() {
        return false;
    }
    !site.contains(&stored) && !stored.contains(&site)
}

/// Write the scan report as JSON for downstream use.
pub fn write_report(report: &ChangeReport, path: &std::path::Path) -> std::io::Result<()> {
    let raw = serde_json::to_string_pretty(report)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    std::fs::write(path, raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Canned pages keyed by offset; pages past the end return an error or
    /// an empty body depending on construction.
    struct FakeListing {
        pages: Vec<String>,
        fail_from: Option<usize>,
        fetches: RefCell<u32>,
    }

    impl FakeListing {
        fn new(pages: Vec<String>) -> Self {
            Self {
                pages,
                fail_from: None,
                fetches: RefCell::new(0),
            }
        }

        fn failing_from(mut self, page_index: usize) -> Self {
            self.fail_from = Some(page_index);
            self
        }
    }

    impl ListingSource for FakeListing {
        fn fetch_page(&self, offset: u32) -> Result<String, ScrapeError> {
            *self.fetches.borrow_mut() += 1;
            let index = (offset / 10) as usize;
            if self.fail_from.is_some_and(|f| index >= f) {
                return Err(ScrapeError::HtmlStructure("connection reset".into()));
            }
            Ok(self.pages.get(index).cloned().unwrap_or_else(|| {
                "<html><body><table></table></body></html>".to_string()
            }))
        }

        fn page_url(&self, _offset: u32) -> String {
            "https://pubad.gov.lk/web/index.php".to_string()
        }
    }

    fn page(rows: &[(&str, &str, &str)]) -> String {
        let body: String = rows
            .iter()
            .map(|(number, title, date)| {
                format!(
                    "<tr><td>{number}</td>\
                     <td><a href=\"/web/index.php?id=1\">{title}</a></td>\
                     <td>{date}</td></tr>"
                )
            })
            .collect();
        format!(
            "<html><body><table><tr><td>nav</td></tr></table>\
             <table>{body}</table></body></html>"
        )
    }

    fn config() -> Config {
        let mut config = Config::from_env();
        config.target_years = vec![2025, 2026];
        config.page_delay = Duration::ZERO;
        config
    }

    fn known(pairs: &[(&str, Language)]) -> HashSet<(String, Language)> {
        pairs.iter().map(|(n, l)| (n.to_string(), *l)).collect()
    }

    #[test]
    fn unseen_circular_needs_all_languages() {
        let listing = FakeListing::new(vec![page(&[("10/2025", "Salary revision", "2025-03-01")])]);
        let config = config();
        let detector = ChangeDetector::new(&listing, &config);
        let (candidates, report) = detector.scan(&HashSet::new(), &HashMap::new());

        assert_eq!(candidates.len(), 1);
        assert_eq!(
            candidates[0].needs,
            vec![Language::English, Language::Sinhala]
        );
        assert_eq!(report.new.len(), 1);
        assert_eq!(report.actionable(), 1);
    }

    #[test]
    fn missing_language_detected() {
        // English stored, Sinhala missing.
        let listing = FakeListing::new(vec![page(&[("10/2025", "Salary revision", "2025-03-01")])]);
        let config = config();
        let detector = ChangeDetector::new(&listing, &config);
        let known = known(&[("10/2025", Language::English)]);
        let (candidates, report) = detector.scan(&known, &HashMap::new());

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].needs, vec![Language::Sinhala]);
        assert!(report.new.is_empty());
        assert_eq!(report.missing_lang.len(), 1);
        assert_eq!(report.missing_lang[0].missing, vec![Language::Sinhala]);
    }

    #[test]
    fn complete_circular_not_emitted() {
        let listing = FakeListing::new(vec![page(&[("10/2025", "Salary revision", "2025-03-01")])]);
        let config = config();
        let detector = ChangeDetector::new(&listing, &config);
        let known = known(&[
            ("10/2025", Language::English),
            ("10/2025", Language::Sinhala),
        ]);
        let (candidates, report) = detector.scan(&known, &HashMap::new());

        assert!(candidates.is_empty());
        assert_eq!(report.up_to_date, 1);
        assert_eq!(report.actionable(), 0);
    }

    #[test]
    fn old_entry_halts_pagination_keeps_earlier_candidates() {
        // Page 1 has a current circular; page 2 mixes one current row with
        // one from 2023, so pagination must stop after page 2.
        let listing = FakeListing::new(vec![
            page(&[("12/2025", "Newest", "2025-06-01")]),
            page(&[
                ("11/2025", "Still current", "2025-01-10"),
                ("44/2023", "History", "2023-02-02"),
            ]),
            page(&[("43/2023", "Never fetched", "2023-01-01")]),
        ]);
        let config = config();
        let detector = ChangeDetector::new(&listing, &config);
        let (candidates, _) = detector.scan(&HashSet::new(), &HashMap::new());

        let numbers: Vec<_> = candidates.iter().map(|c| c.listing.number.as_str()).collect();
        assert_eq!(numbers, vec!["12/2025", "11/2025"]);
        assert_eq!(*listing.fetches.borrow(), 2, "third page must not be fetched");
    }

    #[test]
    fn fetch_error_keeps_partial_results() {
        let listing = FakeListing::new(vec![
            page(&[("12/2025", "Newest", "2025-06-01")]),
            page(&[("11/2025", "Unreachable page", "2025-05-01")]),
        ])
        .failing_from(1);
        let config = config();
        let detector = ChangeDetector::new(&listing, &config);
        let (candidates, _) = detector.scan(&HashSet::new(), &HashMap::new());

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].listing.number, "12/2025");
    }

    #[test]
    fn candidates_in_listing_order() {
        let listing = FakeListing::new(vec![page(&[
            ("12/2025", "Newest", "2025-06-01"),
            ("11/2025", "Older", "2025-05-01"),
        ])]);
        let config = config();
        let detector = ChangeDetector::new(&listing, &config);
        let (candidates, _) = detector.scan(&HashSet::new(), &HashMap::new());
        let numbers: Vec<_> = candidates.iter().map(|c| c.listing.number.as_str()).collect();
        assert_eq!(numbers, vec!["12/2025", "11/2025"]);
    }

    #[test]
    fn title_change_reported_but_not_reprocessed() {
        let listing = FakeListing::new(vec![page(&[(
            "10/2025",
            "Salary revision (amended)",
            "2025-03-01",
        )])]);
        let config = config();
        let detector = ChangeDetector::new(&listing, &config);
        let known = known(&[
            ("10/2025", Language::English),
            ("10/2025", Language::Sinhala),
        ]);
        let mut topics = HashMap::new();
        topics.insert("10/2025".to_string(), "Completely different".to_string());

        let (candidates, report) = detector.scan(&known, &topics);
        assert!(candidates.is_empty(), "title change alone never reprocesses");
        assert_eq!(report.title_changed.len(), 1);
        assert_eq!(report.title_changed[0].number, "10/2025");
    }

    #[test]
    fn title_containment_either_direction_is_unchanged() {
        assert!(!title_changed("Salary revision 2025", "Salary revision"));
        assert!(!title_changed("Salary revision", "Salary revision 2025"));
        assert!(!title_changed("SALARY REVISION", "salary revision"));
        assert!(title_changed("Leave policy", "Salary revision"));
    }

    #[test]
    fn empty_stored_topic_never_flags() {
        assert!(!title_changed("Anything", ""));
        assert!(!title_changed("", "Anything"));
    }

    #[test]
    fn report_serializes_to_json() {
        let listing = FakeListing::new(vec![page(&[("10/2025", "Salary revision", "2025-03-01")])]);
        let config = config();
        let detector = ChangeDetector::new(&listing, &config);
        let (_, report) = detector.scan(&HashSet::new(), &HashMap::new());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_report(&report, &path).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["new"][0]["number"], "10/2025");
    }
}
