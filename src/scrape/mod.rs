pub mod client;
pub mod detail;
pub mod listing;

pub use client::*;
pub use detail::*;
pub use listing::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Unexpected page structure: {0}")]
    HtmlStructure(String),
}
