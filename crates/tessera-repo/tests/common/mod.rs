//! Shared fixtures for the tessera-repo integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tessera_repo::vcs::{Checkout, RefKind, ResolvedRef};
use tessera_repo::{
    BackendKind, BoundTransport, DescriptorSettings, MultiRepositoryResolver, Settings, VcsError,
    VersionControl,
};

/// One ref of a fake remote and the files it holds.
#[derive(Debug, Clone)]
pub struct FakeRef {
    pub kind: RefKind,
    pub revision: String,
    pub files: Vec<(String, String)>,
}

#[derive(Debug, Default)]
struct FakeRemote {
    refs: HashMap<String, FakeRef>,
    unreachable: bool,
    gone: bool,
}

/// An in-memory [`VersionControl`].
///
/// Remotes live in memory; clone and fetch copy their refs into a
/// per-path snapshot, and checkout writes the files of a ref to disk.
/// Every mutating call is counted and checked for overlap with another
/// call on the same path.
#[derive(Default)]
pub struct FakeVcs {
    remotes: Mutex<HashMap<String, FakeRemote>>,
    local: Mutex<HashMap<PathBuf, HashMap<String, FakeRef>>>,
    in_flight: Mutex<HashSet<PathBuf>>,
    clones: AtomicUsize,
    fetches: AtomicUsize,
    checkouts: AtomicUsize,
    overlaps: AtomicUsize,
    delay: Duration,
}

struct InFlight<'a> {
    vcs: &'a FakeVcs,
    path: PathBuf,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.vcs.in_flight.lock().remove(&self.path);
    }
}

impl FakeVcs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every clone, fetch and checkout sleeps for `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_ref(&self, uri: &str, label: &str, kind: RefKind, revision: &str, files: &[(&str, &str)]) {
        self.remotes.lock().entry(uri.to_string()).or_default().refs.insert(
            label.to_string(),
            FakeRef {
                kind,
                revision: revision.to_string(),
                files: files.iter().map(|(p, c)| (p.to_string(), c.to_string())).collect(),
            },
        );
    }

    pub fn branch(&self, uri: &str, label: &str, revision: &str, files: &[(&str, &str)]) {
        self.set_ref(uri, label, RefKind::Branch, revision, files);
    }

    pub fn tag(&self, uri: &str, label: &str, revision: &str, files: &[(&str, &str)]) {
        self.set_ref(uri, label, RefKind::Tag, revision, files);
    }

    pub fn set_unreachable(&self, uri: &str, unreachable: bool) {
        self.remotes.lock().entry(uri.to_string()).or_default().unreachable = unreachable;
    }

    pub fn set_gone(&self, uri: &str, gone: bool) {
        self.remotes.lock().entry(uri.to_string()).or_default().gone = gone;
    }

    pub fn clones(&self) -> usize {
        self.clones.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn checkouts(&self) -> usize {
        self.checkouts.load(Ordering::SeqCst)
    }

    /// Number of mutating calls that started while another one was running
    /// on the same path.
    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    fn enter(&self, path: &Path) -> InFlight<'_> {
        if !self.in_flight.lock().insert(path.to_path_buf()) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        InFlight {
            vcs: self,
            path: path.to_path_buf(),
        }
    }

    fn remote_refs(&self, uri: &str) -> Result<HashMap<String, FakeRef>, VcsError> {
        let remotes = self.remotes.lock();
        let remote = remotes
            .get(uri)
            .ok_or_else(|| VcsError::RemoteGone(format!("repository '{uri}' not found")))?;
        if remote.gone {
            return Err(VcsError::RemoteGone(format!("repository '{uri}' not found")));
        }
        if remote.unreachable {
            return Err(VcsError::Unreachable(format!("could not resolve host for '{uri}'")));
        }
        Ok(remote.refs.clone())
    }

    fn origin_of(&self, path: &Path) -> Result<String, VcsError> {
        Ok(std::fs::read_to_string(path.join(".origin"))?)
    }
}

impl VersionControl for FakeVcs {
    fn kind(&self) -> BackendKind {
        BackendKind::Git
    }

    fn clone_repository(&self, uri: &str, local_path: &Path, _transport: &BoundTransport) -> Result<(), VcsError> {
        let _guard = self.enter(local_path);
        std::fs::create_dir_all(local_path)?;
        std::fs::write(local_path.join(".origin"), uri)?;
        let refs = self.remote_refs(uri)?;
        self.local.lock().insert(local_path.to_path_buf(), refs);
        self.clones.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn fetch(&self, local_path: &Path, _transport: &BoundTransport) -> Result<(), VcsError> {
        let _guard = self.enter(local_path);
        let refs = self.remote_refs(&self.origin_of(local_path)?)?;
        self.local.lock().insert(local_path.to_path_buf(), refs);
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn resolve_ref(&self, local_path: &Path, label: &str) -> Result<Option<ResolvedRef>, VcsError> {
        let local = self.local.lock();
        let Some(refs) = local.get(local_path) else {
            return Ok(None);
        };
        if let Some(found) = refs.get(label) {
            return Ok(Some(ResolvedRef {
                label: label.to_string(),
                name: label.to_string(),
                kind: found.kind,
                revision: found.revision.clone(),
            }));
        }
        Ok(refs.values().find(|r| r.revision == label).map(|r| ResolvedRef {
            label: label.to_string(),
            name: label.to_string(),
            kind: RefKind::Commit,
            revision: r.revision.clone(),
        }))
    }

    fn checkout(&self, local_path: &Path, target: &ResolvedRef) -> Result<Checkout, VcsError> {
        let _guard = self.enter(local_path);
        let files = {
            let local = self.local.lock();
            local
                .get(local_path)
                .and_then(|refs| refs.values().find(|r| r.revision == target.revision).cloned())
                .ok_or_else(|| VcsError::RefNotFound(target.label.clone()))?
                .files
        };

        for entry in std::fs::read_dir(local_path)? {
            let path = entry?.path();
            if path.file_name().is_some_and(|n| n == ".origin") {
                continue;
            }
            if path.is_dir() {
                std::fs::remove_dir_all(&path)?;
            } else {
                std::fs::remove_file(&path)?;
            }
        }
        for (relative, content) in files {
            let path = local_path.join(relative);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, content)?;
        }

        self.checkouts.fetch_add(1, Ordering::SeqCst);
        Ok(Checkout {
            revision: target.revision.clone(),
            content_root: local_path.to_path_buf(),
        })
    }
}

pub const REPO_A: &str = "file:///srv/config-a";
pub const SHARED: &str = "file:///srv/config-shared";

/// Descriptor `A` (svc1, label `main`) and a shared fallback.
pub fn two_repo_settings(basedir: &Path) -> Settings {
    Settings::builder()
        .basedir(basedir)
        .repo(DescriptorSettings::new("A", REPO_A).pattern("svc1").default_label("main"))
        .repo(DescriptorSettings::new("fallback", SHARED))
        .build()
}

pub fn resolver_with(settings: Settings, vcs: &Arc<FakeVcs>) -> MultiRepositoryResolver {
    MultiRepositoryResolver::builder(settings)
        .with_backend(Arc::clone(vcs) as Arc<dyn VersionControl>)
        .build()
        .unwrap()
}

/// A fake with `A` holding `svc1.yml` on `main` and the shared repository
/// holding `application.yml` on `main`.
pub fn seeded_vcs() -> FakeVcs {
    let vcs = FakeVcs::new();
    vcs.branch(REPO_A, "main", "a1", &[("svc1.yml", "server:\n  port: 8080\n")]);
    vcs.branch(SHARED, "main", "s1", &[("application.yml", "shared: true\n")]);
    vcs
}
