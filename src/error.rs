//! Typed error kinds for the engine.
//!
//! Most of the pipeline propagates `anyhow::Error`; this enum exists for the
//! handful of call sites — the CLI exit code and the tick fault boundary —
//! that need to branch on *kind* rather than just log-and-continue.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("upstream transient error: {0}")]
    UpstreamTransient(String),

    #[error("upstream permanent error: {0}")]
    UpstreamPermanent(String),

    #[error("normalization error: {0}")]
    Normalization(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("notifier error: {0}")]
    Notifier(String),

    #[error("cancelled")]
    Cancelled,
}

impl EngineError {
    /// Process exit code for this error kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::Config(_) => 1,
            EngineError::UpstreamTransient(_) | EngineError::UpstreamPermanent(_) => 2,
            EngineError::Normalization(_) => 2,
            EngineError::Database(_) => 3,
            EngineError::Notifier(_) => 2,
            EngineError::Cancelled => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_contract() {
        assert_eq!(EngineError::Config("x".into()).exit_code(), 1);
        assert_eq!(EngineError::UpstreamTransient("x".into()).exit_code(), 2);
        assert_eq!(EngineError::Database("x".into()).exit_code(), 3);
        assert_eq!(EngineError::Cancelled.exit_code(), 4);
    }
}
