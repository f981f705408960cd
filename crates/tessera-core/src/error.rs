//! Error types for the core domain.
//!
//! Everything in this crate that can fail returns [`Result<T>`], whose
//! error is [`CoreError`]. The resolution engine wraps these errors in its
//! own taxonomy; callers of the core crate alone only ever see these.
//!
//! # Example
//!
//! ```
//! use tessera_core::{Application, CoreError};
//!
//! let err = Application::parse("").unwrap_err();
//! assert!(matches!(err, CoreError::InvalidApplication { .. }));
//! ```

use std::io;
use thiserror::Error;

/// Error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Application name is invalid or empty.
    #[error("invalid application name '{name}': {reason}")]
    InvalidApplication {
        /// The rejected name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// Profile name is invalid.
    #[error("invalid profile '{name}': {reason}")]
    InvalidProfile {
        /// The rejected profile
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// Label (branch/tag/commit) is invalid.
    #[error("invalid label '{name}': {reason}")]
    InvalidLabel {
        /// The rejected label
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// Content could not be parsed.
    #[error("failed to parse '{source_name}': {message}")]
    Parse {
        /// Where the content came from (file name, format name)
        source_name: String,
        /// Description of the failure
        message: String,
        /// Underlying error, if any
        #[source]
        cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A configuration map could not be serialized.
    #[error("failed to serialize to {format}: {message}")]
    Serialize {
        /// Target format name
        format: &'static str,
        /// Description of the failure
        message: String,
    },

    /// The file extension does not map to a known format.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CoreError {
    /// Creates an InvalidApplication error.
    pub fn invalid_application(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidApplication {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates an InvalidProfile error.
    pub fn invalid_profile(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidProfile {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates an InvalidLabel error.
    pub fn invalid_label(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidLabel {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a Parse error without a cause.
    pub fn parse(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            source_name: source_name.into(),
            message: message.into(),
            cause: None,
        }
    }

    /// Creates a Parse error that keeps the underlying error as its source.
    pub fn parse_with_cause<E>(
        source_name: impl Into<String>,
        message: impl Into<String>,
        cause: E,
    ) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Parse {
            source_name: source_name.into(),
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }

    /// Creates a Serialize error.
    pub fn serialize(format: &'static str, message: impl Into<String>) -> Self {
        Self::Serialize {
            format,
            message: message.into(),
        }
    }

    /// Returns the same error with the parse source renamed.
    ///
    /// Parsers report the format they were parsing; the file reader
    /// knows the actual path and swaps it in.
    pub fn with_source_name(self, name: impl Into<String>) -> Self {
        match self {
            Self::Parse { message, cause, .. } => Self::Parse {
                source_name: name.into(),
                message,
                cause,
            },
            other => other,
        }
    }

    /// Returns true if this is a parse error.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }

    /// Returns true if the request coordinates were rejected.
    pub fn is_invalid_request(&self) -> bool {
        matches!(
            self,
            Self::InvalidApplication { .. } | Self::InvalidProfile { .. } | Self::InvalidLabel { .. }
        )
    }
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_parse_error_display() {
        let err = CoreError::parse("svc1.yml", "unexpected end of stream");
        let msg = err.to_string();

        assert!(msg.contains("svc1.yml"));
        assert!(msg.contains("unexpected end of stream"));
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_with_source_name_replaces_only_parse_name() {
        let err = CoreError::parse("yaml", "bad indent").with_source_name("config/app.yml");
        assert_eq!(
            err.to_string(),
            "failed to parse 'config/app.yml': bad indent"
        );

        let err = CoreError::UnsupportedFormat("txt".into()).with_source_name("a.txt");
        assert_eq!(err.to_string(), "unsupported format: txt");
    }

    #[test]
    fn test_parse_error_keeps_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::InvalidData, "not utf-8");
        let err = CoreError::parse_with_cause("app.properties", "could not read", io);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: CoreError = io.into();
        assert!(matches!(err, CoreError::Io(_)));
    }

    #[test]
    fn test_invalid_request_classification() {
        assert!(CoreError::invalid_application("", "empty").is_invalid_request());
        assert!(CoreError::invalid_label("a..b", "dots").is_invalid_request());
        assert!(!CoreError::parse("x", "y").is_invalid_request());
    }
}
