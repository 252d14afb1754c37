//! Error types for syncpds-engine
//!
//! Caller-facing failures. Timeouts are not errors: they are reported
//! as [`crate::features::sync_pds::SolverStatus::TimedOut`].

use crate::config::ConfigError;
use thiserror::Error;

/// Main error type for syncpds-engine operations
#[derive(Debug, Error)]
pub enum SyncPdsError {
    /// Query rejected before seeding
    #[error("Malformed query {query}: {reason}")]
    MalformedQuery { query: String, reason: String },

    /// Engine configured for a single root query
    #[error("Engine already solved a root query and allow_multiple_queries is disabled")]
    MultipleQueriesDisallowed,

    /// Handle does not name a live solver
    #[error("Unknown solver handle: {0}")]
    UnknownSolver(u32),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Analysis error
    #[error("Analysis error: {0}")]
    Analysis(String),
}

impl SyncPdsError {
    /// Create a malformed-query error
    pub fn malformed(query: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        SyncPdsError::MalformedQuery {
            query: query.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        SyncPdsError::Analysis(msg.into())
    }
}

/// Result type alias for syncpds-engine operations
pub type Result<T> = std::result::Result<T, SyncPdsError>;
