//! Error types for arbor-ops
//!
//! Operations fail in four ways:
//! - Invalid argument combinations, raised before any branch is touched
//! - Choice-set normalization failures (select)
//! - Session registry errors surfaced by forking
//! - Core/model failures propagated unmodified

use arbor_core::{CoreError, SessionError};

/// Operation-level errors
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    /// Invalid flag or argument combination
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Choice set could not be reduced to (key, representation) pairs
    #[error("choice normalization failed: {0}")]
    Normalization(String),

    /// Session registry failure
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Branch operation failure
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Form persistence I/O failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Form (de)serialization failure
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = OperationError::InvalidArgument("auto_explore requires auto_run".to_string());
        assert!(err.to_string().contains("invalid argument"));

        let err = OperationError::Normalization("mixed types".to_string());
        assert!(err.to_string().contains("normalization"));
    }
}
