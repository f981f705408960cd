//! Per-identity synchronization of working copies.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::state::{CopyState, CopyStatus, SyncState};
use super::WorkingCopy;
use crate::credentials::BoundTransport;
use crate::error::ResolveError;
use crate::settings::{Settings, StalePolicy};
use crate::vcs::{Checkout, VcsError, VersionControl};

/// Length of the URI hash suffix in working-copy directory names.
const PATH_HASH_LEN: usize = 12;

/// What to synchronize: one expanded remote of one descriptor.
#[derive(Clone)]
pub struct SyncTarget {
    identity: String,
    name: String,
    uri: String,
    transport: Arc<BoundTransport>,
    vcs: Arc<dyn VersionControl>,
}

impl SyncTarget {
    /// Pairs a descriptor's expanded remote with the transport bound to it
    /// and the client that speaks its protocol.
    pub fn new(
        name: impl Into<String>,
        uri: impl Into<String>,
        transport: Arc<BoundTransport>,
        vcs: Arc<dyn VersionControl>,
    ) -> Self {
        let name = name.into();
        let uri = uri.into();
        Self {
            identity: format!("{name}@{uri}"),
            name,
            uri,
            transport,
            vcs,
        }
    }

    /// `<descriptor name>@<expanded uri>`.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Name of the descriptor this remote was expanded from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The remote with every placeholder substituted.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Credentials and transport settings used to reach the remote.
    pub fn transport(&self) -> &Arc<BoundTransport> {
        &self.transport
    }
}

impl fmt::Debug for SyncTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncTarget")
            .field("identity", &self.identity)
            .field("kind", &self.vcs.kind())
            .field("transport", &self.transport)
            .finish()
    }
}

/// The part of [`Settings`] the synchronizer reads.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub basedir: PathBuf,
    pub refresh_rate: Duration,
    pub lock_wait_timeout: Duration,
    pub force_pull: bool,
    pub stale_policy: StalePolicy,
}

impl From<&Settings> for SyncOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            basedir: settings.basedir.clone(),
            refresh_rate: settings.refresh_rate,
            lock_wait_timeout: settings.lock_wait_timeout,
            force_pull: settings.force_pull,
            stale_policy: settings.stale_policy,
        }
    }
}

struct Entry {
    lock: Arc<RwLock<()>>,
    state: CopyState,
    local_path: PathBuf,
}

/// Keeps working copies in step with their remotes.
///
/// Each working-copy identity owns a read/write lock. A synchronization
/// holds the write half for the whole clone, fetch and checkout, then
/// downgrades it to the read lease carried by the returned
/// [`WorkingCopy`]. Requests that find the copy current take a read lease
/// directly and run in parallel. Nothing is shared between identities.
///
/// One entry is kept per identity ever requested; [`Synchronizer::discard`]
/// drops it again. The set of identities is bounded by the descriptors and
/// the placeholder values requests substitute into their URIs.
pub struct Synchronizer {
    options: SyncOptions,
    entries: Mutex<HashMap<String, Arc<Entry>>>,
}

impl Synchronizer {
    /// Creates a synchronizer with no working copies known yet.
    pub fn new(options: SyncOptions) -> Self {
        Self {
            options,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Settings shared by every working copy.
    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Deterministic location of a working copy:
    /// `<basedir>/<name>-<hash of uri>`.
    pub fn local_path_for(&self, name: &str, uri: &str) -> PathBuf {
        let safe_name: String = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let hash = blake3::hash(uri.as_bytes()).to_hex();
        self.options
            .basedir
            .join(format!("{safe_name}-{}", &hash[..PATH_HASH_LEN]))
    }

    fn entry(&self, target: &SyncTarget) -> Arc<Entry> {
        let mut entries = self.entries.lock();
        let entry = entries.entry(target.identity.clone()).or_insert_with(|| {
            Arc::new(Entry {
                lock: Arc::new(RwLock::new(())),
                state: CopyState::new(),
                local_path: self.local_path_for(&target.name, &target.uri),
            })
        });
        Arc::clone(entry)
    }

    /// Returns true if a copy in `status` can serve `label` without
    /// touching the remote.
    fn is_current(&self, status: &CopyStatus, label: &str, local_path: &Path) -> bool {
        if self.options.force_pull || !status.is_ready_at(label) || !local_path.is_dir() {
            return false;
        }
        match status.ref_kind {
            Some(kind) if !kind.is_moving() => true,
            _ => {
                !self.options.refresh_rate.is_zero()
                    && !status.needs_refresh(self.options.refresh_rate)
            },
        }
    }

    /// Brings the working copy of `target` to `label` and leases it.
    ///
    /// Clones on first use, fetches when the label may have moved, and
    /// checks the label out. Concurrent requests for the same copy share
    /// one synchronization.
    ///
    /// # Errors
    ///
    /// - `RefNotFound` if the label is unknown even after a fetch
    /// - `RepositoryUnavailable` if the remote cannot be reached or is gone
    /// - `ConcurrentSyncTimeout` if another synchronization held the copy
    ///   longer than the lock wait timeout
    pub async fn prepare(
        &self,
        target: &Arc<SyncTarget>,
        label: &str,
    ) -> Result<WorkingCopy, ResolveError> {
        let entry = self.entry(target);

        if let Ok(lease) = Arc::clone(&entry.lock).try_read_owned() {
            let status = entry.state.snapshot();
            if self.is_current(&status, label, &entry.local_path)
                && let Some(checkout) = checked_out(&status)
            {
                debug!(repository = %target.name, label, "Working copy is current");
                return Ok(leased_copy(target, &entry, label, checkout, lease));
            }
        }

        let observed = entry.state.generation();
        let started = Instant::now();
        let write = match timeout(
            self.options.lock_wait_timeout,
            Arc::clone(&entry.lock).write_owned(),
        )
        .await
        {
            Ok(guard) => guard,
            Err(_) => {
                warn!(
                    repository = %target.name,
                    label,
                    waited_ms = started.elapsed().as_millis() as u64,
                    "Timed out waiting for working copy synchronization"
                );
                return Err(ResolveError::ConcurrentSyncTimeout {
                    repository: target.name.clone(),
                    waited: self.options.lock_wait_timeout,
                });
            },
        };

        let status = entry.state.snapshot();
        let coalesced = status.is_ready_at(label)
            && entry.local_path.is_dir()
            && (status.generation != observed || self.is_current(&status, label, &entry.local_path));
        if coalesced && let Some(checkout) = checked_out(&status) {
            debug!(repository = %target.name, label, "Reusing concurrent synchronization");
            return Ok(leased_copy(target, &entry, label, checkout, write.downgrade()));
        }

        let task = tokio::spawn(run_sync(
            Arc::clone(&entry),
            Arc::clone(target),
            label.to_string(),
            self.options.clone(),
            write,
        ));
        task.await
            .map_err(|e| ResolveError::Io(io::Error::other(format!("synchronization task failed: {e}"))))?
    }

    /// Deletes the working copy of `identity` and forgets its state.
    ///
    /// The entry itself is dropped unless another request is already
    /// waiting on it, in which case it stays behind reset.
    /// Returns false if the identity was never synchronized.
    pub async fn discard(&self, identity: &str) -> Result<bool, ResolveError> {
        let Some(entry) = self.entries.lock().get(identity).cloned() else {
            return Ok(false);
        };

        let _write = timeout(self.options.lock_wait_timeout, Arc::clone(&entry.lock).write_owned())
            .await
            .map_err(|_| ResolveError::ConcurrentSyncTimeout {
                repository: identity.to_string(),
                waited: self.options.lock_wait_timeout,
            })?;

        let path = entry.local_path.clone();
        tokio::task::spawn_blocking(move || remove_dir(&path))
            .await
            .map_err(|e| ResolveError::Io(io::Error::other(e.to_string())))??;
        entry.state.reset();

        {
            let mut entries = self.entries.lock();
            // The map and this function hold the only references.
            if entries
                .get(identity)
                .is_some_and(|held| Arc::ptr_eq(held, &entry) && Arc::strong_count(&entry) == 2)
            {
                entries.remove(identity);
            }
        }

        info!(identity, path = %entry.local_path.display(), "Discarded working copy");
        Ok(true)
    }

    /// Current state of the copy of `identity`, if it was ever requested.
    pub fn status(&self, identity: &str) -> Option<CopyStatus> {
        self.entries.lock().get(identity).map(|e| e.state.snapshot())
    }

    /// State of every known copy, sorted by identity.
    pub fn statuses(&self) -> Vec<(String, CopyStatus)> {
        let entries = self.entries.lock();
        let mut all: Vec<_> = entries
            .iter()
            .map(|(identity, entry)| (identity.clone(), entry.state.snapshot()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }
}

impl fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synchronizer")
            .field("options", &self.options)
            .field("copies", &self.entries.lock().len())
            .finish()
    }
}

/// The checkout recorded in `status`, if the copy has one.
fn checked_out(status: &CopyStatus) -> Option<Checkout> {
    Some(Checkout {
        revision: status.revision.clone()?,
        content_root: status.content_root.clone()?,
    })
}

fn leased_copy(
    target: &SyncTarget,
    entry: &Entry,
    label: &str,
    checkout: Checkout,
    lease: OwnedRwLockReadGuard<()>,
) -> WorkingCopy {
    WorkingCopy::new(
        target.identity.clone(),
        target.name.clone(),
        target.vcs.kind(),
        entry.local_path.clone(),
        checkout.content_root,
        label,
        checkout.revision,
        lease,
    )
}

/// Body of the detached synchronization task. Owns the write guard, so
/// the copy stays locked until the task ends whatever the caller does.
async fn run_sync(
    entry: Arc<Entry>,
    target: Arc<SyncTarget>,
    label: String,
    options: SyncOptions,
    write: OwnedRwLockWriteGuard<()>,
) -> Result<WorkingCopy, ResolveError> {
    let blocking_entry = Arc::clone(&entry);
    let blocking_target = Arc::clone(&target);
    let blocking_label = label.clone();
    let checkout = tokio::task::spawn_blocking(move || {
        sync_blocking(&blocking_entry, &blocking_target, &blocking_label, &options)
    })
    .await
    .map_err(|e| ResolveError::Io(io::Error::other(format!("synchronization panicked: {e}"))))??;

    Ok(leased_copy(&target, &entry, &label, checkout, write.downgrade()))
}

fn sync_blocking(
    entry: &Entry,
    target: &SyncTarget,
    label: &str,
    options: &SyncOptions,
) -> Result<Checkout, ResolveError> {
    let state = &entry.state;
    let local_path = entry.local_path.as_path();
    let vcs = target.vcs.as_ref();
    let transport = target.transport.as_ref();
    let mut fetched = false;

    if state.state() == SyncState::Uninitialized || !local_path.is_dir() {
        state.set_state(SyncState::Cloning);
        info!(
            repository = %target.name,
            uri = %target.uri,
            path = %local_path.display(),
            "Cloning working copy"
        );
        remove_dir(local_path).map_err(|e| fail_io(state, target, e))?;
        if let Err(e) = vcs.clone_repository(&target.uri, local_path, transport) {
            if let Err(cleanup) = remove_dir(local_path) {
                warn!(path = %local_path.display(), error = %cleanup, "Failed to remove partial clone");
            }
            return Err(fail(state, target, e));
        }
        state.mark_fetched();
        fetched = true;
    } else {
        state.set_state(SyncState::Syncing);
    }

    let mut resolved = vcs
        .resolve_ref(local_path, label)
        .map_err(|e| fail(state, target, e))?;

    let due = options.force_pull
        || match &resolved {
            None => true,
            Some(found) => {
                found.kind.is_moving() && state.snapshot().needs_refresh(options.refresh_rate)
            },
        };

    if !fetched && due {
        debug!(repository = %target.name, label, "Fetching remote");
        match vcs.fetch(local_path, transport) {
            Ok(()) => {
                state.mark_fetched();
                resolved = vcs
                    .resolve_ref(local_path, label)
                    .map_err(|e| fail(state, target, e))?;
            },
            Err(VcsError::RemoteGone(reason)) => {
                warn!(
                    repository = %target.name,
                    uri = %target.uri,
                    reason = %reason,
                    "Remote repository is gone, deleting working copy"
                );
                remove_dir(local_path).map_err(|e| fail_io(state, target, e))?;
                state.reset();
                return Err(ResolveError::unavailable(
                    &target.name,
                    format!("remote repository is gone: {reason}"),
                ));
            },
            Err(e) if options.stale_policy == StalePolicy::ServeStale && resolved.is_some() => {
                warn!(
                    repository = %target.name,
                    label,
                    error = %e,
                    "Fetch failed, serving label as last fetched"
                );
            },
            Err(e) => return Err(fail(state, target, e)),
        }
    }

    let Some(found) = resolved else {
        let err = ResolveError::ref_not_found(&target.name, label);
        state.record_failure(err.to_string());
        warn!(repository = %target.name, label, "Label not found");
        return Err(err);
    };

    let checkout = vcs
        .checkout(local_path, &found)
        .map_err(|e| fail(state, target, e))?;
    state.record_success(&found, &checkout);

    info!(
        repository = %target.name,
        label,
        kind = ?found.kind,
        revision = %checkout.revision,
        "Working copy ready"
    );
    Ok(checkout)
}

fn fail(state: &CopyState, target: &SyncTarget, err: VcsError) -> ResolveError {
    let err = ResolveError::from_vcs(&target.name, err);
    warn!(repository = %target.name, error = %err, "Synchronization failed");
    state.record_failure(err.to_string());
    err
}

fn fail_io(state: &CopyState, target: &SyncTarget, err: io::Error) -> ResolveError {
    warn!(repository = %target.name, error = %err, "Working copy directory is unusable");
    state.record_failure(err.to_string());
    ResolveError::Io(err)
}

fn remove_dir(path: &Path) -> io::Result<()> {
    match std::fs::remove_dir_all(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcs::{BackendKind, RefKind, ResolvedRef};

    /// Clones into an empty directory with a single `main` branch, or fails.
    struct OneBranch {
        clone_error: fn() -> VcsError,
        fail_clone: bool,
    }

    impl VersionControl for OneBranch {
        fn kind(&self) -> BackendKind {
            BackendKind::Git
        }

        fn clone_repository(&self, _: &str, path: &Path, _: &BoundTransport) -> Result<(), VcsError> {
            std::fs::create_dir_all(path)?;
            std::fs::write(path.join("partial"), "x")?;
            if self.fail_clone {
                return Err((self.clone_error)());
            }
            Ok(())
        }

        fn fetch(&self, _: &Path, _: &BoundTransport) -> Result<(), VcsError> {
            Ok(())
        }

        fn resolve_ref(&self, _: &Path, label: &str) -> Result<Option<ResolvedRef>, VcsError> {
            Ok((label == "main").then(|| ResolvedRef {
                label: label.into(),
                name: "main".into(),
                kind: RefKind::Branch,
                revision: "r1".into(),
            }))
        }

        fn checkout(&self, path: &Path, target: &ResolvedRef) -> Result<Checkout, VcsError> {
            Ok(Checkout {
                revision: target.revision.clone(),
                content_root: path.to_path_buf(),
            })
        }
    }

    fn synchronizer(basedir: &Path) -> Synchronizer {
        Synchronizer::new(SyncOptions {
            basedir: basedir.to_path_buf(),
            refresh_rate: Duration::ZERO,
            lock_wait_timeout: Duration::from_secs(5),
            force_pull: false,
            stale_policy: StalePolicy::Fail,
        })
    }

    fn target(vcs: OneBranch) -> Arc<SyncTarget> {
        Arc::new(SyncTarget::new(
            "A",
            "file:///srv/a",
            Arc::new(BoundTransport::anonymous("file:///srv/a")),
            Arc::new(vcs),
        ))
    }

    #[test]
    fn test_local_path_is_deterministic() {
        let sync = synchronizer(Path::new("/var/tessera"));
        let first = sync.local_path_for("team repo", "https://git.example.com/a.git");
        let again = sync.local_path_for("team repo", "https://git.example.com/a.git");
        let other = sync.local_path_for("team repo", "https://git.example.com/b.git");

        assert_eq!(first, again);
        assert_ne!(first, other);
        let dir = first.file_name().unwrap().to_str().unwrap();
        assert!(dir.starts_with("team_repo-"));
        assert_eq!(dir.len(), "team_repo-".len() + PATH_HASH_LEN);
    }

    #[tokio::test]
    async fn test_failed_clone_removes_partial_directory() {
        let basedir = tempfile::tempdir().unwrap();
        let sync = synchronizer(basedir.path());
        let target = target(OneBranch {
            clone_error: || VcsError::Unreachable("connection refused".into()),
            fail_clone: true,
        });

        let err = sync.prepare(&target, "main").await.unwrap_err();
        assert!(matches!(err, ResolveError::RepositoryUnavailable { .. }));
        assert!(!sync.local_path_for("A", "file:///srv/a").exists());

        let status = sync.status(target.identity()).unwrap();
        assert_eq!(status.state, SyncState::Error);
        assert_eq!(status.failure_count, 1);
    }

    #[tokio::test]
    async fn test_prepare_and_discard() {
        let basedir = tempfile::tempdir().unwrap();
        let sync = synchronizer(basedir.path());
        let target = target(OneBranch {
            clone_error: || VcsError::RemoteGone("not found".into()),
            fail_clone: false,
        });

        let copy = sync.prepare(&target, "main").await.unwrap();
        assert_eq!(copy.revision(), "r1");
        assert_eq!(copy.label(), "main");
        assert!(copy.local_path().is_dir());
        let path = copy.local_path().to_path_buf();
        drop(copy);

        assert!(sync.discard(target.identity()).await.unwrap());
        assert!(!path.exists());
        assert!(sync.status(target.identity()).is_none());
        assert!(sync.statuses().is_empty());
        assert!(!sync.discard(target.identity()).await.unwrap());
        assert!(!sync.discard("unknown@nowhere").await.unwrap());

        let copy = sync.prepare(&target, "main").await.unwrap();
        assert_eq!(copy.revision(), "r1");
        assert_eq!(sync.status(target.identity()).unwrap().state, SyncState::Ready);
    }

    #[tokio::test]
    async fn test_unusable_copy_path_is_recorded_as_failure() {
        let basedir = tempfile::tempdir().unwrap();
        let sync = synchronizer(basedir.path());
        let target = target(OneBranch {
            clone_error: || VcsError::RemoteGone("not found".into()),
            fail_clone: false,
        });
        let path = sync.local_path_for("A", "file:///srv/a");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not a directory").unwrap();

        let err = sync.prepare(&target, "main").await.unwrap_err();
        assert!(matches!(err, ResolveError::Io(_)));

        let status = sync.status(target.identity()).unwrap();
        assert_eq!(status.state, SyncState::Error);
        assert_eq!(status.failure_count, 1);
        assert!(status.last_error.is_some());
    }

    #[tokio::test]
    async fn test_unknown_label_keeps_previous_checkout() {
        let basedir = tempfile::tempdir().unwrap();
        let sync = synchronizer(basedir.path());
        let target = target(OneBranch {
            clone_error: || VcsError::RemoteGone("not found".into()),
            fail_clone: false,
        });

        drop(sync.prepare(&target, "main").await.unwrap());
        let err = sync.prepare(&target, "release-2").await.unwrap_err();
        assert!(matches!(err, ResolveError::RefNotFound { label, .. } if label == "release-2"));

        let status = sync.status(target.identity()).unwrap();
        assert_eq!(status.state, SyncState::Error);
        assert_eq!(status.label.as_deref(), Some("main"));
    }
}
