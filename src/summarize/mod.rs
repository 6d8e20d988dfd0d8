pub mod client;
pub mod orchestrator;
pub mod parser;
pub mod prompt;
pub mod retry;

pub use client::*;
pub use orchestrator::*;
pub use parser::*;
pub use prompt::*;
pub use retry::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SummarizeError {
    #[error("Completion service credential not configured")]
    MissingCredential,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Completion API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Unparsable completion response: {0}")]
    ResponseParsing(String),

    #[error("Rate limit persisted through {0} attempts")]
    RetriesExhausted(u32),
}
