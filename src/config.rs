//! Run-wide configuration.
//!
//! One `Config` is constructed in `main` and passed to each component —
//! no module-level globals. Secrets come from the environment only.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Datelike;

use crate::models::Language;

pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> &'static str {
    "circulars=info"
}

/// The listing site rejects requests without a browser User-Agent.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the circular listing site.
    pub base_url: String,
    /// Years considered current; older rows halt pagination.
    pub target_years: Vec<i32>,
    /// Language versions the pipeline tracks.
    pub languages: Vec<Language>,

    pub download_dir: PathBuf,
    pub text_dir: PathBuf,
    pub db_path: PathBuf,
    pub ledger_path: PathBuf,
    pub report_path: PathBuf,

    /// Cloud OCR free-tier cap (pages per month) and reserved headroom.
    pub monthly_cap: u32,
    pub safety_buffer: u32,

    /// Listing pagination step (rows per page).
    pub page_size: u32,
    /// Delay between listing page fetches.
    pub page_delay: Duration,
    pub request_timeout: Duration,
    pub download_timeout: Duration,

    /// Completion service model and pacing.
    pub completion_model: String,
    /// Delay after each successful completion call (steady-state TPM limit).
    pub completion_delay: Duration,

    pub groq_api_key: Option<String>,
    pub vision_api_key: Option<String>,
}

impl Config {
    /// Build the default configuration, reading secrets and overrides from
    /// the environment.
    pub fn from_env() -> Self {
        let current_year = chrono::Local::now().year();
        let target_years = std::env::var("CIRCULARS_TARGET_YEARS")
            .ok()
            .map(|raw| parse_years(&raw))
            .filter(|years| !years.is_empty())
            .unwrap_or_else(|| vec![current_year, current_year + 1]);

        Self {
            base_url: std::env::var("CIRCULARS_BASE_URL")
                .unwrap_or_else(|_| "https://pubad.gov.lk".to_string()),
            target_years,
            languages: vec![Language::English, Language::Sinhala],
            download_dir: PathBuf::from("downloads"),
            text_dir: PathBuf::from("extracted_text"),
            db_path: PathBuf::from("circulars.db"),
            ledger_path: PathBuf::from("vision_usage.json"),
            report_path: PathBuf::from("new_circulars_report.json"),
            monthly_cap: 1000,
            safety_buffer: 50,
            page_size: 10,
            page_delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
            download_timeout: Duration::from_secs(60),
            completion_model: "llama-3.1-8b-instant".to_string(),
            completion_delay: Duration::from_secs(10),
            groq_api_key: non_empty_env("GROQ_API_KEY"),
            vision_api_key: non_empty_env("GOOGLE_VISION_API_KEY"),
        }
    }

    /// Re-root all data paths under the given directory.
    pub fn with_data_dir(mut self, dir: &std::path::Path) -> Self {
        self.download_dir = dir.join("downloads");
        self.text_dir = dir.join("extracted_text");
        self.db_path = dir.join("circulars.db");
        self.ledger_path = dir.join("vision_usage.json");
        self.report_path = dir.join("new_circulars_report.json");
        self
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_years(raw: &str) -> Vec<i32> {
    raw.split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect()
}
