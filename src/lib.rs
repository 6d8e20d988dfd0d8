//! Batch ingestion pipeline for bilingual Sri Lanka government circulars.
//!
//! Detects new or incomplete circulars on the public listing, downloads
//! their per-language PDFs, extracts text through a three-tier ladder
//! (native text → quota-gated cloud OCR → local OCR), summarises via a
//! chat-completion service, and persists structured rows into SQLite.

pub mod budget;
pub mod config;
pub mod db;
pub mod detect;
pub mod extract;
pub mod fetch;
pub mod models;
pub mod pipeline;
pub mod reprocess;
pub mod scrape;
pub mod summarize;
