use std::path::PathBuf;

use thiserror::Error;

use crate::corpus::markup::MarkupError;

/// Errors that can occur during Jmenovka core operations.
#[derive(Debug, Error)]
pub enum JmenovkaError {
    /// The corpus file could not be opened or read.
    #[error("failed to read {path:?}: {source}")]
    Io {
        /// The file being read.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A corpus line is not well-formed markup.
    #[error("malformed markup on line {line}: {source}")]
    Malformed {
        /// 1-based line number in the corpus file (0 for a standalone line).
        line: usize,
        #[source]
        source: MarkupError,
    },

    /// An entity element carries no `type` attribute.
    #[error("entity element on line {line} has no `type` attribute")]
    MissingType {
        /// 1-based line number in the corpus file (0 for a standalone line).
        line: usize,
    },

    /// A span does not fit the text it annotates.
    #[error("span {start}..{end} is invalid for text of {len} characters")]
    InvalidSpan {
        /// Span start (characters).
        start: usize,
        /// Span end (characters, exclusive).
        end: usize,
        /// Text length in characters.
        len: usize,
    },

    /// A regex pattern failed to compile (should not happen with static patterns).
    #[error("regex compilation error: {0}")]
    Regex(#[from] regex::Error),

    /// Training settings are out of range.
    #[error("invalid training config: {0}")]
    InvalidConfig(String),

    /// Tag decoding failed (dimension mismatch, unknown tag index).
    #[error("tag decoding error: {0}")]
    Decode(String),

    /// JSON (de)serialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Jmenovka operations.
pub type Result<T> = std::result::Result<T, JmenovkaError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::markup::MarkupErrorKind;

    #[test]
    fn error_display_messages() {
        let err = JmenovkaError::MissingType { line: 3 };
        assert_eq!(
            err.to_string(),
            "entity element on line 3 has no `type` attribute"
        );

        let err = JmenovkaError::Malformed {
            line: 7,
            source: MarkupError {
                column: 12,
                kind: MarkupErrorKind::UnexpectedEof,
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("line 7"));
        assert!(msg.contains("column 12"));

        let err = JmenovkaError::InvalidSpan {
            start: 4,
            end: 9,
            len: 6,
        };
        assert!(err.to_string().contains("4..9"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<JmenovkaError>();
    }
}
