//! Version-control capability.
//!
//! The synchronizer never talks to a VCS client directly. It drives a
//! [`VersionControl`] implementation chosen per descriptor by its
//! [`BackendKind`]: [`GitClient`] for Git remotes and [`SvnCli`] for
//! Subversion. Implementations are blocking; the synchronizer runs them on
//! the blocking thread pool and guarantees that no two calls mutate the
//! same local path at the same time.

mod git;
mod refs;
mod svn;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use git::GitClient;
pub use refs::{RefKind, RefSpec, ResolvedRef};
pub use svn::SvnCli;

use crate::credentials::BoundTransport;

/// The kind of repository behind a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Git,
    Svn,
}

impl BackendKind {
    /// The label used when neither the request nor the settings name one.
    pub fn default_label(&self) -> &'static str {
        match self {
            Self::Git => "main",
            Self::Svn => "trunk",
        }
    }

    /// Prefix of property-source names read from this kind of repository.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Git => "git",
            Self::Svn => "svn",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures reported by a [`VersionControl`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum VcsError {
    /// The remote could not be reached or refused the credentials.
    #[error("remote unreachable: {0}")]
    Unreachable(String),

    /// The remote answered that the repository does not exist.
    #[error("remote repository gone: {0}")]
    RemoteGone(String),

    /// The label does not name a branch, tag or commit.
    #[error("ref not found: {0}")]
    RefNotFound(String),

    /// The client ran but failed for another reason.
    #[error("{command} failed: {message}")]
    Command { command: String, message: String },

    /// The client could not be started or the working copy is unreadable.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VcsError {
    pub fn command(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Command {
            command: command.into(),
            message: message.into(),
        }
    }
}

/// Outcome of a checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkout {
    /// The concrete revision now on disk.
    pub revision: String,
    /// Directory holding the checked-out files. Usually the working copy
    /// root; for Subversion it is the branch or tag subdirectory.
    pub content_root: PathBuf,
}

/// Clone, fetch, resolve and checkout against one kind of remote.
///
/// Every method may block on the network or the filesystem.
pub trait VersionControl: Send + Sync {
    /// Which descriptors this implementation serves.
    fn kind(&self) -> BackendKind;

    /// Creates a new working copy of `uri` at `local_path`.
    fn clone_repository(
        &self,
        uri: &str,
        local_path: &Path,
        transport: &BoundTransport,
    ) -> Result<(), VcsError>;

    /// Brings the working copy's knowledge of remote refs up to date.
    fn fetch(&self, local_path: &Path, transport: &BoundTransport) -> Result<(), VcsError>;

    /// Looks `label` up in the local copy without touching the network.
    ///
    /// Returns `Ok(None)` when the label is unknown locally.
    fn resolve_ref(&self, local_path: &Path, label: &str) -> Result<Option<ResolvedRef>, VcsError>;

    /// Puts the files of `target` on disk.
    fn checkout(&self, local_path: &Path, target: &ResolvedRef) -> Result<Checkout, VcsError>;
}

/// Maps the stderr of a failed client command to a failure class.
pub(crate) fn classify_stderr(command: &str, stderr: &str) -> VcsError {
    const GONE: &[&str] = &[
        "repository not found",
        "does not appear to be a git repository",
        "' does not exist",
        "the requested url returned error: 404",
        "path not found",
        "e170000",
    ];
    const UNREACHABLE: &[&str] = &[
        "could not resolve host",
        "connection refused",
        "connection timed out",
        "operation timed out",
        "authentication failed",
        "permission denied",
        "could not read from remote repository",
        "unable to access",
        "ssl certificate",
        "e170013",
        "e215004",
    ];

    let lowered = stderr.to_lowercase();
    let message = stderr.trim().to_string();

    if GONE.iter().any(|needle| lowered.contains(needle)) {
        VcsError::RemoteGone(message)
    } else if UNREACHABLE.iter().any(|needle| lowered.contains(needle)) {
        VcsError::Unreachable(message)
    } else {
        VcsError::command(command, message)
    }
}
