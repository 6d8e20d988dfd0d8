//! Monthly cloud-OCR budget ledger.
//!
//! Persists a single `{month, pages_used, last_updated}` record and enforces
//! nothing itself — the extraction ladder checks `remaining()` before every
//! costed call. The counter is incremented only after a confirmed successful
//! cloud OCR response, and never decremented. Month rollover is detected
//! lazily on load; a corrupt or missing file starts a fresh month at zero.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BudgetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ledger serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LedgerState {
    month: String,
    pages_used: u32,
    last_updated: String,
}

pub struct BudgetLedger {
    path: PathBuf,
    state: LedgerState,
    effective_cap: u32,
}

impl BudgetLedger {
    /// Load the ledger for the current month, resetting if the stored month
    /// key differs. This lazy check is the sole reset mechanism.
    pub fn load(
        path: &std::path::Path,
        monthly_cap: u32,
        safety_buffer: u32,
    ) -> Self {
        Self::load_for_month(path, monthly_cap, safety_buffer, &current_month_key())
    }

    fn load_for_month(
        path: &std::path::Path,
        monthly_cap: u32,
        safety_buffer: u32,
        month_key: &str,
    ) -> Self {
        let effective_cap = monthly_cap.saturating_sub(safety_buffer);
        let stored: Option<LedgerState> = fs::read_to_string(path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok());

        let state = match stored {
            Some(state) if state.month == month_key => state,
            Some(state) => {
                tracing::info!(
                    old_month = %state.month,
                    new_month = %month_key,
                    "Month rolled over, resetting cloud OCR usage"
                );
                fresh_state(month_key)
            }
            None => {
                if path.exists() {
                    tracing::warn!(path = %path.display(), "Ledger file unreadable, starting fresh");
                }
                fresh_state(month_key)
            }
        };

        Self {
            path: path.to_path_buf(),
            state,
            effective_cap,
        }
    }

    /// Pages still available under the effective cap this month.
    pub fn remaining(&self) -> u32 {
        self.effective_cap.saturating_sub(self.state.pages_used)
    }

    pub fn pages_used(&self) -> u32 {
        self.state.pages_used
    }

    pub fn month(&self) -> &str {
        &self.state.month
    }

    pub fn effective_cap(&self) -> u32 {
        self.effective_cap
    }

    /// Record one confirmed successful cloud OCR call and persist.
    ///
    /// Call this only after the engine returned a result — never
    /// speculatively before the request.
    pub fn record_success(&mut self) -> Result<(), BudgetError> {
        self.state.pages_used += 1;
        self.state.last_updated = now_rfc3339();
        self.persist()
    }

    /// Write-then-rename so a crash never leaves a truncated ledger.
    fn persist(&self) -> Result<(), BudgetError> {
        let raw = serde_json::to_string_pretty(&self.state)?;
        let tmp = self.path.with_extension("json.tmp");
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Human-readable usage report backing the `status` CLI mode.
    pub fn status_report(&self, monthly_cap: u32) -> String {
        let used = self.state.pages_used;
        let remaining = self.remaining();
        let bar_filled = (used as usize * 30 / monthly_cap.max(1) as usize).min(30);
        let bar: String =
            "█".repeat(bar_filled) + &"░".repeat(30 - bar_filled);

        let verdict = if remaining == 0 {
            "CAP REACHED — all OCR pages will use the local engine"
        } else if remaining <= 100 {
            "Running low"
        } else {
            "Within free tier"
        };

        format!(
            "Month          : {}\n\
             Used           : {} pages\n\
             Effective cap  : {}  (cap {} - buffer {})\n\
             Remaining      : {} pages\n\
             [{}] {}/{}\n\
             {}",
            self.state.month,
            used,
            self.effective_cap,
            monthly_cap,
            monthly_cap - self.effective_cap,
            remaining,
            bar,
            used,
            monthly_cap,
            verdict,
        )
    }
}

impl fmt::Debug for BudgetLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BudgetLedger")
            .field("month", &self.state.month)
            .field("pages_used", &self.state.pages_used)
            .field("effective_cap", &self.effective_cap)
            .finish()
    }
}

fn fresh_state(month_key: &str) -> LedgerState {
    LedgerState {
        month: month_key.to_string(),
        pages_used: 0,
        last_updated: now_rfc3339(),
    }
}

fn current_month_key() -> String {
    chrono::Local::now().format("%Y-%m").to_string()
}

fn now_rfc3339() -> String {
    chrono::Local::now().to_rfc3339()
}
