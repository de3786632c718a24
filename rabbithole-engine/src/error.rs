//! Error types surfaced by the engine.
//!
//! Malformed content never produces these; see the permissive defaults in
//! [`crate::condition`] and [`crate::outcome`].

use thiserror::Error;

/// Errors raised while parsing base content or content packs.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to parse {source_name}: {source}")]
    Parse {
        source_name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("content pack {source_name} is missing required field `{field}`")]
    MissingField {
        source_name: String,
        field: &'static str,
    },
    #[error("content pack id `{id}` appears more than once in this import")]
    DuplicatePack { id: String },
}

/// Errors raised when engine configuration invariants are violated.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid engine config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("log_capacity must be at least 1")]
    ZeroLogCapacity,
    #[error("{field} must be at least {min:.2} (got {value:.2})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
}

/// Programmer errors: calls that are invalid for the current run state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("cannot resolve a choice: the run is {lifecycle}")]
    RunNotActive { lifecycle: &'static str },
    #[error("unknown manual candidate `{id}`")]
    UnknownCandidate { id: String },
}
