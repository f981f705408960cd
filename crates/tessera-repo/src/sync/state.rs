//! Working-copy state tracking.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::vcs::{Checkout, RefKind, ResolvedRef};

/// Lifecycle of a working copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Nothing on disk yet, or the copy was discarded.
    Uninitialized,
    /// First clone in progress.
    Cloning,
    /// Checked out at a known label.
    Ready,
    /// Fetch or checkout in progress on an existing copy.
    Syncing,
    /// The last synchronization failed; the files on disk are those of the
    /// last good label.
    Error,
}

/// Point-in-time view of a working copy.
#[derive(Debug, Clone)]
pub struct CopyStatus {
    pub state: SyncState,
    /// Label of the last successful checkout.
    pub label: Option<String>,
    pub ref_kind: Option<RefKind>,
    pub revision: Option<String>,
    pub content_root: Option<PathBuf>,
    /// When the remote was last fetched successfully.
    pub last_fetch: Option<Instant>,
    pub last_error: Option<String>,
    /// Number of consecutive failures.
    pub failure_count: u32,
    /// Incremented by every successful synchronization.
    pub generation: u64,
}

impl CopyStatus {
    fn new() -> Self {
        Self {
            state: SyncState::Uninitialized,
            label: None,
            ref_kind: None,
            revision: None,
            content_root: None,
            last_fetch: None,
            last_error: None,
            failure_count: 0,
            generation: 0,
        }
    }

    /// Returns true if the copy has been checked out at least once.
    pub fn is_initialized(&self) -> bool {
        self.revision.is_some()
    }

    /// Returns true if the last synchronization succeeded.
    pub fn is_healthy(&self) -> bool {
        self.state == SyncState::Ready && self.last_error.is_none()
    }

    /// Returns true if the remote was never fetched or `interval` elapsed
    /// since. A zero interval is always due.
    pub fn needs_refresh(&self, interval: Duration) -> bool {
        match self.last_fetch {
            Some(at) => at.elapsed() >= interval,
            None => true,
        }
    }

    /// Returns true if the copy is ready at `label`.
    pub fn is_ready_at(&self, label: &str) -> bool {
        self.state == SyncState::Ready && self.label.as_deref() == Some(label)
    }
}

/// Shared, internally synchronized [`CopyStatus`].
#[derive(Debug)]
pub struct CopyState {
    status: RwLock<CopyStatus>,
}

impl CopyState {
    pub fn new() -> Self {
        Self {
            status: RwLock::new(CopyStatus::new()),
        }
    }

    pub fn snapshot(&self) -> CopyStatus {
        self.status.read().clone()
    }

    pub fn state(&self) -> SyncState {
        self.status.read().state
    }

    pub fn generation(&self) -> u64 {
        self.status.read().generation
    }

    pub fn set_state(&self, state: SyncState) {
        self.status.write().state = state;
    }

    /// Records a successful fetch of the remote.
    pub fn mark_fetched(&self) {
        self.status.write().last_fetch = Some(Instant::now());
    }

    /// Records a successful checkout.
    pub fn record_success(&self, target: &ResolvedRef, checkout: &Checkout) {
        let mut status = self.status.write();
        status.state = SyncState::Ready;
        status.label = Some(target.label.clone());
        status.ref_kind = Some(target.kind);
        status.revision = Some(checkout.revision.clone());
        status.content_root = Some(checkout.content_root.clone());
        status.last_error = None;
        status.failure_count = 0;
        status.generation += 1;
    }

    /// Records a failed synchronization. The last good label is kept.
    pub fn record_failure(&self, error: impl Into<String>) {
        let mut status = self.status.write();
        status.state = SyncState::Error;
        status.last_error = Some(error.into());
        status.failure_count += 1;
    }

    /// Forgets everything; the next request clones again.
    pub fn reset(&self) {
        let mut status = self.status.write();
        let generation = status.generation;
        *status = CopyStatus::new();
        status.generation = generation;
    }
}

impl Default for CopyState {
    fn default() -> Self {
        Self::new()
    }
}
