//! Retry policy for the completion service.
//!
//! The policy is a value object and sleeping goes through a trait, so
//! tests exercise the exact backoff schedule without real delays.

use std::time::Duration;

pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Production sleeper — blocks the (single) pipeline thread.
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Records requested sleeps instead of performing them.
#[derive(Default)]
pub struct RecordingSleeper {
    slept: std::sync::Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().expect("sleeper lock").clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.slept.lock().expect("sleeper lock").push(duration);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Backoff grows linearly: `base × (attempt + 1)`.
    pub backoff_base: Duration,
}

impl RetryPolicy {
    /// The completion service's schedule: 3 attempts, 20 s base.
    pub fn completion_default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(20),
        }
    }

    /// Wait before retry number `attempt + 1` (attempt is 0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base * (attempt + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_escalates_linearly() {
        let policy = RetryPolicy::completion_default();
        assert_eq!(policy.backoff(0), Duration::from_secs(20));
        assert_eq!(policy.backoff(1), Duration::from_secs(40));
        assert_eq!(policy.backoff(2), Duration::from_secs(60));
    }

    #[test]
    fn default_allows_three_attempts() {
        assert_eq!(RetryPolicy::completion_default().max_attempts, 3);
    }

    #[test]
    fn recording_sleeper_collects_durations() {
        let sleeper = RecordingSleeper::new();
        sleeper.sleep(Duration::from_secs(20));
        sleeper.sleep(Duration::from_secs(40));
        assert_eq!(
            sleeper.slept(),
            vec![Duration::from_secs(20), Duration::from_secs(40)]
        );
    }
}
