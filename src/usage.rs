//! Cumulative token usage and cost, persisted in `.isy/token_usage.json`
//!
//! The ledger is a plain value: a session loads it once, records every
//! completion into it and saves it after each call. There is a single
//! writer, so no locking is involved.

use crate::error::Result;
use crate::utils::atomic_write;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use tracing::trace;

/// USD per million prompt tokens
pub const INPUT_COST_PER_MILLION: f64 = 2.50;

/// USD per million completion tokens
pub const OUTPUT_COST_PER_MILLION: f64 = 10.0;

/// Token counts and cost accumulated across sessions
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageLedger {
    /// Prompt tokens sent
    pub token_input: u64,
    /// Completion tokens received
    pub token_output: u64,
    /// Cost in USD
    pub total_cost: f64,
}

impl UsageLedger {
    /// Load the ledger, starting from zero when the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read(path) {
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist the ledger atomically
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        atomic_write(path, &json)
    }

    /// Add one completion's usage
    pub fn record(&mut self, prompt_tokens: u64, completion_tokens: u64) {
        self.token_input += prompt_tokens;
        self.token_output += completion_tokens;
        self.total_cost += cost_of(prompt_tokens, completion_tokens);
        trace!(
            "Recorded {} prompt / {} completion tokens",
            prompt_tokens,
            completion_tokens
        );
    }

    /// Usage accumulated since `earlier`
    pub fn since(&self, earlier: &UsageLedger) -> UsageLedger {
        UsageLedger {
            token_input: self.token_input.saturating_sub(earlier.token_input),
            token_output: self.token_output.saturating_sub(earlier.token_output),
            total_cost: (self.total_cost - earlier.total_cost).max(0.0),
        }
    }
}

/// Cost in USD of one completion
pub fn cost_of(prompt_tokens: u64, completion_tokens: u64) -> f64 {
    prompt_tokens as f64 / 1_000_000.0 * INPUT_COST_PER_MILLION
        + completion_tokens as f64 / 1_000_000.0 * OUTPUT_COST_PER_MILLION
}
