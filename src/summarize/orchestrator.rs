//! Completion orchestrator: prompt → bounded-retry call → tolerant parse.

use std::time::Duration;

use super::client::CompletionClient;
use super::parser::{parse_completion_reply, CircularSummary};
use super::prompt::build_prompt;
use super::retry::{RetryPolicy, Sleeper, ThreadSleeper};
use super::SummarizeError;
use crate::models::Language;

pub struct Summarizer {
    client: Box<dyn CompletionClient>,
    policy: RetryPolicy,
    sleeper: Box<dyn Sleeper>,
    /// Enforced after each successful call to stay under the service's
    /// steady-state rate ceiling. Distinct from retry backoff.
    inter_request_delay: Duration,
}

impl Summarizer {
    pub fn new(client: Box<dyn CompletionClient>) -> Self {
        Self {
            client,
            policy: RetryPolicy::completion_default(),
            sleeper: Box::new(ThreadSleeper),
            inter_request_delay: Duration::from_secs(10),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Box<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_inter_request_delay(mut self, delay: Duration) -> Self {
        self.inter_request_delay = delay;
        self
    }

    /// Summarise one circular's extracted text.
    ///
    /// Rate-limit errors retry on the policy's escalating backoff; any
    /// other error aborts immediately and surfaces to the caller.
    pub fn summarize(
        &self,
        number: &str,
        date: &str,
        title: &str,
        text: &str,
        language: Language,
    ) -> Result<CircularSummary, SummarizeError> {
        let prompt = build_prompt(number, date, title, text, language);

        let mut attempt = 0u32;
        loop {
            match self.client.complete(&prompt) {
                Ok(raw) => {
                    let parsed = parse_completion_reply(&raw);
                    if parsed.is_empty() {
                        tracing::warn!(number, %language, "Reply carried no recognizable labels");
                    }
                    tracing::info!(
                        number,
                        %language,
                        topic = parsed.topic.as_deref().unwrap_or(""),
                        "Summarised"
                    );
                    self.sleeper.sleep(self.inter_request_delay);
                    return Ok(parsed);
                }
                Err(SummarizeError::RateLimited(msg)) => {
                    attempt += 1;
                    if attempt >= self.policy.max_attempts {
                        tracing::warn!(number, attempts = attempt, "Rate limit retries exhausted");
                        return Err(SummarizeError::RetriesExhausted(attempt));
                    }
                    let wait = self.policy.backoff(attempt - 1);
                    tracing::warn!(
                        number,
                        wait_secs = wait.as_secs(),
                        attempt,
                        max = self.policy.max_attempts,
                        %msg,
                        "Rate limited, backing off"
                    );
                    self.sleeper.sleep(wait);
                }
                Err(e) => {
                    tracing::warn!(number, error = %e, "Completion call failed");
                    return Err(e);
                }
            }
        }
    }
}
