//! Git working copies.
//!
//! Clone, fetch, ref lookup and checkout all run in-process with gix.
//! Credentials and transport settings reach gix as in-memory configuration
//! overrides of the repository being cloned or fetched, so they never touch
//! the working copy's config file.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use gix::remote::Direction;
use gix::remote::fetch::Tags;
use tracing::{debug, warn};

use super::{BackendKind, Checkout, RefKind, RefSpec, ResolvedRef, VcsError, VersionControl, classify_stderr};
use crate::credentials::{BoundTransport, Credentials};

/// [`VersionControl`] for Git remotes.
#[derive(Debug, Clone)]
pub struct GitClient {
    clean_on_checkout: bool,
}

impl Default for GitClient {
    fn default() -> Self {
        Self {
            clean_on_checkout: true,
        }
    }
}

impl GitClient {
    /// Creates a client that deletes untracked files on checkout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether to delete untracked files after each checkout.
    pub fn clean_on_checkout(mut self, clean: bool) -> Self {
        self.clean_on_checkout = clean;
        self
    }

    fn open(local_path: &Path, transport: Option<&BoundTransport>) -> Result<gix::Repository, VcsError> {
        let mut options = gix::open::Options::default();
        if let Some(transport) = transport {
            options = options.config_overrides(overrides(transport));
        }
        gix::open_opts(local_path, options).map_err(|e| VcsError::command("open repository", e.to_string()))
    }

    fn resolve_symbolic(
        repo: &gix::Repository,
        label: &str,
        spec: &RefSpec,
    ) -> Result<Option<ResolvedRef>, VcsError> {
        let peel = |full_name: &str| -> Result<Option<String>, VcsError> {
            match repo.find_reference(full_name) {
                Ok(reference) => reference
                    .into_fully_peeled_id()
                    .map(|id| Some(id.to_string()))
                    .map_err(|e| VcsError::command("peel reference", e.to_string())),
                Err(_) => Ok(None),
            }
        };

        if spec.allows(RefKind::Branch) {
            for candidate in [
                format!("refs/remotes/origin/{}", spec.name),
                format!("refs/heads/{}", spec.name),
            ] {
                if let Some(revision) = peel(&candidate)? {
                    return Ok(Some(ResolvedRef {
                        label: label.to_string(),
                        name: candidate,
                        kind: RefKind::Branch,
                        revision,
                    }));
                }
            }
        }

        if spec.allows(RefKind::Tag) {
            let candidate = format!("refs/tags/{}", spec.name);
            if let Some(revision) = peel(&candidate)? {
                return Ok(Some(ResolvedRef {
                    label: label.to_string(),
                    name: candidate,
                    kind: RefKind::Tag,
                    revision,
                }));
            }
        }

        Ok(None)
    }

    /// Full or abbreviated commit ids. Ambiguous prefixes resolve to nothing.
    fn resolve_commit(repo: &gix::Repository, label: &str, spec: &RefSpec) -> Option<ResolvedRef> {
        if !spec.could_be_commit() {
            return None;
        }
        let expression = format!("{}^{{commit}}", spec.name);
        let id = repo.rev_parse_single(expression.as_str()).ok()?;

        Some(ResolvedRef {
            label: label.to_string(),
            name: spec.name.clone(),
            kind: RefKind::Commit,
            revision: id.to_string(),
        })
    }

    /// Removes what the previous checkout left behind.
    fn clear_worktree(&self, repo: &gix::Repository, workdir: &Path) -> Result<(), VcsError> {
        if self.clean_on_checkout {
            for entry in std::fs::read_dir(workdir)? {
                let entry = entry?;
                if entry.file_name() == ".git" {
                    continue;
                }
                if entry.file_type()?.is_dir() {
                    std::fs::remove_dir_all(entry.path())?;
                } else {
                    std::fs::remove_file(entry.path())?;
                }
            }
            return Ok(());
        }

        // Without an index nothing was checked out yet.
        let Ok(index) = repo.open_index() else {
            return Ok(());
        };
        for entry in index.entries() {
            let path = workdir.join(gix::path::from_bstr(entry.path(&index)));
            match std::fs::remove_file(&path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
                _ => {},
            }
        }
        Ok(())
    }
}

/// Configuration overrides carrying the credentials and transport settings.
fn config_entries(transport: &BoundTransport) -> Vec<(String, String)> {
    let settings = transport.settings();
    let timeout = transport.timeout_secs().to_string();
    let mut entries = vec![
        ("http.lowSpeedLimit".to_string(), "1000".to_string()),
        ("http.lowSpeedTime".to_string(), timeout.clone()),
    ];

    if let Some(proxy) = &settings.proxy {
        entries.push(("http.proxy".into(), proxy.clone()));
    }
    if settings.skip_ssl_verification {
        entries.push(("http.sslVerify".into(), "false".into()));
    }

    let mut ssh = format!("ssh -o ConnectTimeout={timeout} -o BatchMode=yes");
    match transport.credentials() {
        Credentials::Anonymous => {},
        Credentials::Basic { username, password } => {
            let encoded = STANDARD.encode(format!("{username}:{password}"));
            entries.push(("http.extraHeader".into(), format!("Authorization: Basic {encoded}")));
        },
        Credentials::Token { token } => {
            entries.push(("http.extraHeader".into(), format!("Authorization: Bearer {token}")));
        },
        Credentials::SshKey {
            private_key,
            passphrase,
        } => {
            if passphrase.is_some() {
                warn!(
                    uri = transport.uri(),
                    "SSH key passphrases cannot be passed to ssh; load the key into an agent"
                );
            }
            ssh.push_str(&format!(
                " -o IdentitiesOnly=yes -i '{}'",
                private_key.display()
            ));
        },
        Credentials::Custom { options } => {
            entries.extend(options.iter().map(|(k, v)| (k.clone(), v.clone())));
        },
    }
    entries.push(("core.sshCommand".into(), ssh));

    entries
}

/// `key=value` form of [`config_entries`].
fn overrides(transport: &BoundTransport) -> Vec<String> {
    config_entries(transport)
        .into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect()
}

/// Classifies a gix failure by the messages of its whole source chain.
fn transport_error(operation: &str, err: &(dyn std::error::Error + 'static)) -> VcsError {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>()
            && matches!(
                io.kind(),
                std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::TimedOut
            )
        {
            return VcsError::Unreachable(format!("{message}: {io}"));
        }
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    classify_stderr(operation, &message)
}

impl VersionControl for GitClient {
    fn kind(&self) -> BackendKind {
        BackendKind::Git
    }

    fn clone_repository(
        &self,
        uri: &str,
        local_path: &Path,
        transport: &BoundTransport,
    ) -> Result<(), VcsError> {
        if let Some(parent) = local_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let url = gix::url::parse(uri.into())
            .map_err(|e| VcsError::command("parse url", format!("{uri}: {e}")))?;
        if url.scheme == gix::url::Scheme::File && !gix::path::from_bstring(url.path.clone()).exists() {
            return Err(VcsError::RemoteGone(format!("repository '{uri}' does not exist")));
        }

        debug!(uri, ?local_path, "Cloning");
        let mut prepare = gix::prepare_clone(url, local_path)
            .map_err(|e| transport_error("git clone", &e))?
            .with_in_memory_config_overrides(overrides(transport))
            .configure_remote(|remote| Ok(remote.with_fetch_tags(Tags::All)));

        prepare
            .fetch_only(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
            .map_err(|e| transport_error("git clone", &e))?;
        Ok(())
    }

    fn fetch(&self, local_path: &Path, transport: &BoundTransport) -> Result<(), VcsError> {
        let repo = Self::open(local_path, Some(transport))?;
        let remote = repo
            .find_default_remote(Direction::Fetch)
            .ok_or_else(|| VcsError::command("git fetch", "no default remote"))?
            .map_err(|e| VcsError::command("git fetch", e.to_string()))?
            .with_fetch_tags(Tags::All);

        debug!(?local_path, "Fetching");
        remote
            .connect(Direction::Fetch)
            .map_err(|e| transport_error("git fetch", &e))?
            .prepare_fetch(gix::progress::Discard, Default::default())
            .map_err(|e| transport_error("git fetch", &e))?
            .receive(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
            .map_err(|e| transport_error("git fetch", &e))?;
        Ok(())
    }

    fn resolve_ref(&self, local_path: &Path, label: &str) -> Result<Option<ResolvedRef>, VcsError> {
        let repo = Self::open(local_path, None)?;
        let spec = RefSpec::parse(label);

        if let Some(resolved) = Self::resolve_symbolic(&repo, label, &spec)? {
            return Ok(Some(resolved));
        }
        Ok(Self::resolve_commit(&repo, label, &spec))
    }

    fn checkout(&self, local_path: &Path, target: &ResolvedRef) -> Result<Checkout, VcsError> {
        let repo = Self::open(local_path, None)?;
        let workdir = repo
            .workdir()
            .ok_or_else(|| VcsError::command("git checkout", "repository has no worktree"))?
            .to_path_buf();

        let oid = gix::ObjectId::from_hex(target.revision.as_bytes())
            .map_err(|_| VcsError::RefNotFound(target.revision.clone()))?;
        let tree = repo
            .find_object(oid)
            .map_err(|_| VcsError::RefNotFound(target.revision.clone()))?
            .peel_to_tree()
            .map_err(|e| VcsError::command("git checkout", e.to_string()))?
            .id;

        self.clear_worktree(&repo, &workdir)?;

        let mut index = repo
            .index_from_tree(&tree)
            .map_err(|e| VcsError::command("git checkout", e.to_string()))?;
        let mut options = repo
            .checkout_options(gix::worktree::stack::state::attributes::Source::IdMapping)
            .map_err(|e| VcsError::command("git checkout", e.to_string()))?;
        options.destination_is_initially_empty = self.clean_on_checkout;
        options.overwrite_existing = true;

        let objects = repo.objects.clone().into_arc()?;
        let outcome = gix::worktree::state::checkout(
            &mut index,
            &workdir,
            objects,
            &gix::progress::Discard,
            &gix::progress::Discard,
            &gix::interrupt::IS_INTERRUPTED,
            options,
        )
        .map_err(|e| VcsError::command("git checkout", e.to_string()))?;

        if let Some(failed) = outcome.errors.first() {
            return Err(VcsError::command(
                "git checkout",
                format!("{}: {}", failed.path, failed.error),
            ));
        }
        if let Some(collision) = outcome.collisions.first() {
            return Err(VcsError::command(
                "git checkout",
                format!("{}: {:?}", collision.path, collision.error_kind),
            ));
        }

        index
            .write(Default::default())
            .map_err(|e| VcsError::command("write index", e.to_string()))?;
        std::fs::write(repo.git_dir().join("HEAD"), format!("{oid}\n"))?;
        debug!(revision = %oid, files = outcome.files_updated, "Checked out");

        Ok(Checkout {
            revision: target.revision.clone(),
            content_root: workdir,
        })
    }
}
