//! Error types for arbor-core
//!
//! Covers the failure domains of the core:
//! - Session registry lookups
//! - Chat model collaborator failures
//! - Tool invocation
//! - Structured-response classification

use crate::types::BranchId;

/// Session registry errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Referenced branch is not a session member
    #[error("branch not found in session: {0}")]
    UnknownBranch(BranchId),
}

/// Chat model collaborator errors
///
/// Propagated unmodified through the core; no retry or backoff at this layer.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The model call itself failed
    #[error("model request failed: {0}")]
    Request(String),

    /// The model is not reachable
    #[error("model unavailable: {0}")]
    Unavailable(String),
}

/// Tool invocation errors
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The tool rejected its arguments
    #[error("invalid tool arguments: {0}")]
    Arguments(String),

    /// The tool call itself failed
    #[error("tool call failed: {0}")]
    Call(String),
}

/// Core branch operation errors
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Failure from the chat model
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// Structured response carried a nested-instruction payload that
    /// could not be decoded
    #[error("malformed structured response: {0}")]
    MalformedResponse(String),
}
