//! Error types for repository resolution.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tessera_core::CoreError;

use crate::vcs::VcsError;

/// Errors that can occur while resolving configuration from repositories.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// No configured descriptor accepts the request.
    #[error("no repository matches application '{application}' with profiles '{profiles}'")]
    NoDescriptorMatched {
        application: String,
        profiles: String,
    },

    /// The remote could not be reached (network, authentication, gone).
    #[error("repository '{repository}' is unavailable: {reason}")]
    RepositoryUnavailable { repository: String, reason: String },

    /// The requested label does not exist in the remote or the local copy.
    #[error("label '{label}' not found in repository '{repository}'")]
    RefNotFound { repository: String, label: String },

    /// A property file could not be read or parsed.
    #[error("parse error in {path}: {reason}")]
    PropertySourceParse { path: PathBuf, reason: String },

    /// Waited too long for another request to finish synchronizing.
    #[error("timed out after {}s waiting for repository '{repository}' to synchronize", .waited.as_secs())]
    ConcurrentSyncTimeout { repository: String, waited: Duration },

    /// The request coordinates were rejected.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The settings are inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An I/O error occurred on the local working copy.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// How a front end should report an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    Unavailable,
    BadRequest,
    Internal,
}

impl ErrorClass {
    /// Returns the conventional HTTP status code for this class.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::Unavailable => 503,
            Self::BadRequest => 400,
            Self::Internal => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not-found",
            Self::Unavailable => "unavailable",
            Self::BadRequest => "bad-request",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ResolveError {
    /// Creates a new repository unavailable error.
    pub fn unavailable(repository: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RepositoryUnavailable {
            repository: repository.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new ref not found error.
    pub fn ref_not_found(repository: impl Into<String>, label: impl Into<String>) -> Self {
        Self::RefNotFound {
            repository: repository.into(),
            label: label.into(),
        }
    }

    /// Creates a new parse error.
    pub fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::PropertySourceParse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new invalid configuration error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// Maps a version-control failure on `repository` into the resolution taxonomy.
    pub fn from_vcs(repository: &str, err: VcsError) -> Self {
        match err {
            VcsError::RefNotFound(label) => Self::ref_not_found(repository, label),
            VcsError::Unreachable(reason) => Self::unavailable(repository, reason),
            VcsError::RemoteGone(reason) => {
                Self::unavailable(repository, format!("remote repository is gone: {reason}"))
            },
            VcsError::Command { command, message } => {
                Self::unavailable(repository, format!("{command} failed: {message}"))
            },
            VcsError::Io(e) => Self::Io(e),
        }
    }

    /// Returns the response class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NoDescriptorMatched { .. } | Self::RefNotFound { .. } => ErrorClass::NotFound,
            Self::RepositoryUnavailable { .. } | Self::ConcurrentSyncTimeout { .. } => {
                ErrorClass::Unavailable
            },
            Self::InvalidRequest(_) => ErrorClass::BadRequest,
            Self::PropertySourceParse { .. } | Self::InvalidConfig(_) | Self::Io(_) => {
                ErrorClass::Internal
            },
        }
    }

    /// Returns true if this is a transient error that might succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RepositoryUnavailable { .. } | Self::ConcurrentSyncTimeout { .. }
        )
    }
}

impl From<CoreError> for ResolveError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Parse {
                source_name,
                message,
                ..
            } => Self::parse(source_name, message),
            CoreError::Io(e) => Self::Io(e),
            other if other.is_invalid_request() => Self::InvalidRequest(other.to_string()),
            other => Self::InvalidConfig(other.to_string()),
        }
    }
}
