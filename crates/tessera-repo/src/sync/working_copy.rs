use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::OwnedRwLockReadGuard;

use crate::vcs::BackendKind;

/// A working copy checked out at a label, with a shared lease on it.
///
/// While any clone of a `WorkingCopy` is alive, no synchronization of the
/// same copy can start, so the files under [`content_root`] stay at
/// [`revision`]. Drop it once the property files have been read.
///
/// [`content_root`]: WorkingCopy::content_root
/// [`revision`]: WorkingCopy::revision
#[derive(Clone)]
pub struct WorkingCopy {
    identity: String,
    repository: String,
    kind: BackendKind,
    local_path: PathBuf,
    content_root: PathBuf,
    label: String,
    revision: String,
    lease: Arc<OwnedRwLockReadGuard<()>>,
}

impl WorkingCopy {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        identity: impl Into<String>,
        repository: impl Into<String>,
        kind: BackendKind,
        local_path: PathBuf,
        content_root: PathBuf,
        label: impl Into<String>,
        revision: impl Into<String>,
        lease: OwnedRwLockReadGuard<()>,
    ) -> Self {
        Self {
            identity: identity.into(),
            repository: repository.into(),
            kind,
            local_path,
            content_root,
            label: label.into(),
            revision: revision.into(),
            lease: Arc::new(lease),
        }
    }

    /// Descriptor name and expanded URI.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Name of the descriptor this copy belongs to.
    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Directory the search paths are relative to.
    pub fn content_root(&self) -> &Path {
        &self.content_root
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn revision(&self) -> &str {
        &self.revision
    }

    /// Number of live handles sharing this lease.
    pub fn lease_holders(&self) -> usize {
        Arc::strong_count(&self.lease)
    }
}

impl fmt::Debug for WorkingCopy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkingCopy")
            .field("identity", &self.identity)
            .field("kind", &self.kind)
            .field("content_root", &self.content_root)
            .field("label", &self.label)
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}
