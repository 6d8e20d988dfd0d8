//! Completion service client (Groq, OpenAI-compatible chat completions).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::SummarizeError;

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Output token ceiling per completion call.
const MAX_COMPLETION_TOKENS: u32 = 400;

pub trait CompletionClient {
    fn complete(&self, prompt: &str) -> Result<String, SummarizeError>;
}

pub struct GroqClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::blocking::Client,
}

impl GroqClient {
    pub fn new(api_key: &str, model: &str, timeout: Duration) -> Result<Self, SummarizeError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SummarizeError::Http(format!("HTTP client build failed: {e}")))?;
        Ok(Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
        })
    }

    /// Override the endpoint (integration tests against a local server).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// The service signals throttling with 429, payload-too-large 413, or a
/// `rate_limit` code in the error body.
fn is_rate_limit(status: u16, body: &str) -> bool {
    status == 429 || status == 413 || body.contains("rate_limit")
}

impl CompletionClient for GroqClient {
    fn complete(&self, prompt: &str) -> Result<String, SummarizeError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: MAX_COMPLETION_TOKENS,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| SummarizeError::Http(e.to_string()))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().unwrap_or_default();
            if is_rate_limit(status, &body) {
                return Err(SummarizeError::RateLimited(format!("HTTP {status}")));
            }
            return Err(SummarizeError::Api {
                status,
                body: body.chars().take(300).collect(),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| SummarizeError::ResponseParsing(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| SummarizeError::ResponseParsing("empty choices array".into()))
    }
}

/// One scripted mock reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    RateLimited,
    ApiError(u16),
}

impl MockReply {
    fn to_result(&self) -> Result<String, SummarizeError> {
        match self {
            Self::Text(text) => Ok(text.clone()),
            Self::RateLimited => Err(SummarizeError::RateLimited("HTTP 429".into())),
            Self::ApiError(status) => Err(SummarizeError::Api {
                status: *status,
                body: "mock error".into(),
            }),
        }
    }
}

/// Mock completion client — scripted replies and observable prompts.
pub struct MockCompletionClient {
    replies: std::sync::Mutex<Vec<MockReply>>,
    prompts: std::sync::Mutex<Vec<String>>,
}

impl MockCompletionClient {
    /// Always answers with the same reply.
    pub fn new(reply: &str) -> Self {
        Self::scripted(vec![MockReply::Text(reply.to_string())])
    }

    /// Answers from the script in order; the last entry repeats.
    pub fn scripted(replies: Vec<MockReply>) -> Self {
        Self {
            replies: std::sync::Mutex::new(replies),
            prompts: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Always rate-limited, as under a sustained throttle.
    pub fn always_rate_limited() -> Self {
        Self::scripted(vec![MockReply::RateLimited])
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt lock").clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().expect("prompt lock").len()
    }
}

impl CompletionClient for MockCompletionClient {
    fn complete(&self, prompt: &str) -> Result<String, SummarizeError> {
        self.prompts
            .lock()
            .expect("prompt lock")
            .push(prompt.to_string());

        let mut replies = self.replies.lock().expect("reply lock");
        if replies.is_empty() {
            return Err(SummarizeError::ResponseParsing("script exhausted".into()));
        }
        if replies.len() > 1 {
            replies.remove(0).to_result()
        } else {
            replies[0].to_result()
        }
    }
}
