//! Error types for cvtailor.
//!
//! Library crates use [`TailorError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all cvtailor operations.
#[derive(Debug, thiserror::Error)]
pub enum TailorError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error during retrieval or model calls.
    #[error("network error: {0}")]
    Network(String),

    /// Model output could not be parsed into the expected structure.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Chat-completions API error (status, auth, empty choice list).
    #[error("llm error: {0}")]
    Llm(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input validation error (missing file, template placeholder, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// HTML-to-Markdown conversion error.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// A fatal stage ran out of attempts without an accepted result.
    #[error("{stage} stage failed after {attempts} attempts: {reason}")]
    StageExhausted {
        stage: String,
        attempts: u32,
        reason: String,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TailorError>;

impl TailorError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error aborts a pipeline run.
    pub fn is_fatal_stage_failure(&self) -> bool {
        matches!(self, Self::StageExhausted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = TailorError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = TailorError::validation("resume file is empty");
        assert!(err.to_string().contains("resume file is empty"));
    }

    #[test]
    fn stage_exhausted_display() {
        let err = TailorError::StageExhausted {
            stage: "parse".into(),
            attempts: 3,
            reason: "profile has no experience".into(),
        };
        assert_eq!(
            err.to_string(),
            "parse stage failed after 3 attempts: profile has no experience"
        );
        assert!(err.is_fatal_stage_failure());
        assert!(!TailorError::Network("boom".into()).is_fatal_stage_failure());
    }
}
