//! Query interpretation: a generative interpreter first, catalog patterns
//! when it fails. Both paths produce the same [`InterpretationResult`].

mod generative;
mod pattern;
mod strategy;

pub use generative::{ChatCompletionsInterpreter, GenerativeInterpreter};
pub use pattern::interpret_with_patterns;
pub use strategy::InterpreterStrategy;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::filter::{FilterError, FilterExpr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// A metadata filter restricts the search.
    Filtered,
    /// Relevance ranking over the whole collection.
    Semantic,
    /// The pattern path produced the result after the generative path failed.
    Fallback,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Filtered => "filtered",
            Mode::Semantic => "semantic",
            Mode::Fallback => "fallback",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterpretationResult {
    pub intent: String,
    pub filter: Option<FilterExpr>,
    pub explanation: String,
    pub mode: Mode,
    /// A caller-supplied date range was inverted and has been swapped.
    pub range_corrected: bool,
    /// Why the generative path was abandoned, for fallback results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

/// Failures of the generative path. None of these reach the caller; each
/// one sends the request down the pattern path instead.
#[derive(Error, Debug)]
pub enum InterpretError {
    #[error("interpreter request failed: {0}")]
    Transport(String),

    #[error("interpreter did not answer within {0:?}")]
    Timeout(Duration),

    #[error("interpretation was cancelled")]
    Cancelled,

    #[error("malformed interpreter output: {0}")]
    Malformed(String),

    #[error("interpreter produced an invalid filter: {0}")]
    InvalidFilter(#[from] FilterError),

    #[error("interpreter broke its contract: {0}")]
    ContractViolation(String),
}

impl From<reqwest::Error> for InterpretError {
    fn from(err: reqwest::Error) -> Self {
        InterpretError::Transport(err.to_string())
    }
}
