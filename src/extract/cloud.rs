//! Cloud OCR via the Google Vision `images:annotate` endpoint.
//!
//! The costed tier of the ladder. Every call is one billable page, so the
//! ladder checks the budget ledger before invoking this engine and records
//! usage only after a confirmed result.

use std::time::Duration;

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::types::CloudOcrEngine;
use super::ExtractionError;

const DEFAULT_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

pub struct VisionOcr {
    api_key: String,
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl VisionOcr {
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self, ExtractionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExtractionError::CloudOcr(format!("HTTP client build failed: {e}")))?;
        Ok(Self {
            api_key: api_key.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            client,
        })
    }

    /// Override the endpoint (integration tests against a local server).
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
struct AnnotateRequest {
    requests: Vec<ImageRequest>,
}

#[derive(Serialize)]
struct ImageRequest {
    image: ImageContent,
    features: Vec<Feature>,
    #[serde(rename = "imageContext")]
    image_context: ImageContext,
}

#[derive(Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ImageContext {
    #[serde(rename = "languageHints")]
    language_hints: Vec<String>,
}

#[derive(Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<PageResponse>,
}

#[derive(Deserialize, Default)]
struct PageResponse {
    #[serde(rename = "fullTextAnnotation")]
    full_text_annotation: Option<FullTextAnnotation>,
    error: Option<ApiStatus>,
}

#[derive(Deserialize)]
struct FullTextAnnotation {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ApiStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

impl CloudOcrEngine for VisionOcr {
    fn recognize(&self, png: &[u8], language_hints: &[&str]) -> Result<String, ExtractionError> {
        let body = AnnotateRequest {
            requests: vec![ImageRequest {
                image: ImageContent {
                    content: base64::engine::general_purpose::STANDARD.encode(png),
                },
                features: vec![Feature {
                    kind: "DOCUMENT_TEXT_DETECTION",
                }],
                image_context: ImageContext {
                    language_hints: language_hints.iter().map(|h| h.to_string()).collect(),
                },
            }],
        };

        let url = format!("{}?key={}", self.endpoint, self.api_key);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| ExtractionError::CloudOcr(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ExtractionError::CloudOcr(format!(
                "HTTP {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let parsed: AnnotateResponse = response
            .json()
            .map_err(|e| ExtractionError::CloudOcr(format!("Unparsable response: {e}")))?;

        let page = parsed.responses.into_iter().next().unwrap_or_default();
        if let Some(err) = page.error {
            return Err(ExtractionError::CloudOcr(format!(
                "API error {}: {}",
                err.code, err.message
            )));
        }

        // A successful call with no annotation is a blank page, not an
        // error — it still counts against the quota.
        Ok(page
            .full_text_annotation
            .map(|a| a.text)
            .unwrap_or_default())
    }
}

/// Mock cloud OCR engine with observable call counts.
pub struct MockCloudOcr {
    text: String,
    fail: bool,
    calls: std::sync::atomic::AtomicU32,
}

impl MockCloudOcr {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            fail: false,
            calls: std::sync::atomic::AtomicU32::new(0),
        }
    }

    /// An engine that always errors, as on quota or auth failure.
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

impl CloudOcrEngine for MockCloudOcr {
    fn recognize(&self, _png: &[u8], _hints: &[&str]) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.fail {
            return Err(ExtractionError::CloudOcr("quota exceeded".into()));
        }
        Ok(self.text.clone())
    }
}
