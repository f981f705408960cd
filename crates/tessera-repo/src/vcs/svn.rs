//! Subversion working copies.
//!
//! The whole repository is checked out once; labels are directories in
//! it (`trunk`, `branches/<label>`, `tags/<label>`). A checkout therefore
//! only moves the content root, and `fetch` is an `svn update`.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use super::{BackendKind, Checkout, RefKind, ResolvedRef, VcsError, VersionControl, classify_stderr};
use crate::credentials::{BoundTransport, Credentials};

/// [`VersionControl`] for Subversion remotes.
#[derive(Debug, Clone)]
pub struct SvnCli {
    program: PathBuf,
}

impl Default for SvnCli {
    fn default() -> Self {
        Self {
            program: PathBuf::from("svn"),
        }
    }
}

impl SvnCli {
    /// Uses the `svn` found on `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses another `svn` executable.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    fn run(
        &self,
        subcommand: &str,
        args: &[&str],
        transport: Option<&BoundTransport>,
    ) -> Result<String, VcsError> {
        let label = format!("svn {subcommand}");
        let mut command = Command::new(&self.program);
        command
            .arg(subcommand)
            .args(["--non-interactive", "--no-auth-cache"]);

        if let Some(transport) = transport {
            apply_transport(&mut command, transport);
        }
        command.args(args);

        debug!(command = %label, "Running svn");
        let output = command.output()?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(classify_stderr(&label, &String::from_utf8_lossy(&output.stderr)))
        }
    }

    fn last_changed_revision(&self, dir: &Path) -> Result<String, VcsError> {
        self.run(
            "info",
            &["--show-item", "last-changed-revision", path_arg(dir)?],
            None,
        )
    }
}

fn apply_transport(command: &mut Command, transport: &BoundTransport) {
    let settings = transport.settings();
    command.args([
        "--config-option".to_string(),
        format!("servers:global:http-timeout={}", transport.timeout_secs()),
    ]);

    if let Some(proxy) = &settings.proxy {
        let (host, port) = split_proxy(proxy);
        command.args(["--config-option".to_string(), format!("servers:global:http-proxy-host={host}")]);
        if let Some(port) = port {
            command.args(["--config-option".to_string(), format!("servers:global:http-proxy-port={port}")]);
        }
    }
    if settings.skip_ssl_verification {
        command.arg("--trust-server-cert-failures=unknown-ca,cn-mismatch,expired,not-yet-valid,other");
    }

    match transport.credentials() {
        Credentials::Basic { username, password } => {
            command.args(["--username", username.as_str(), "--password", password.as_str()]);
        },
        Credentials::Token { token } => {
            command.args(["--password", token.as_str()]);
        },
        Credentials::SshKey { private_key, .. } => {
            command.env(
                "SVN_SSH",
                format!(
                    "ssh -o BatchMode=yes -o IdentitiesOnly=yes -o ConnectTimeout={} -i '{}'",
                    transport.timeout_secs(),
                    private_key.display()
                ),
            );
        },
        Credentials::Custom { options } => {
            for (key, value) in options {
                command.args(["--config-option".to_string(), format!("{key}={value}")]);
            }
        },
        Credentials::Anonymous => {},
    }
}

fn split_proxy(proxy: &str) -> (&str, Option<&str>) {
    let without_scheme = proxy.split_once("://").map_or(proxy, |(_, rest)| rest);
    let authority = without_scheme.trim_end_matches('/');
    match authority.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => (host, Some(port)),
        _ => (authority, None),
    }
}

fn path_arg(path: &Path) -> Result<&str, VcsError> {
    path.to_str().ok_or_else(|| {
        VcsError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("working copy path is not valid UTF-8: {}", path.display()),
        ))
    })
}

/// Directories a label may live in, in lookup order.
fn candidates(label: &str) -> Vec<(String, RefKind)> {
    let mut dirs = Vec::new();
    if label == "trunk" {
        dirs.push(("trunk".to_string(), RefKind::Branch));
    }
    dirs.push((format!("branches/{label}"), RefKind::Branch));
    dirs.push((format!("tags/{label}"), RefKind::Tag));
    dirs
}

impl VersionControl for SvnCli {
    fn kind(&self) -> BackendKind {
        BackendKind::Svn
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
        self.run("checkout", &[uri, path_arg(local_path)?], Some(transport))?;
        Ok(())
    }

    fn fetch(&self, local_path: &Path, transport: &BoundTransport) -> Result<(), VcsError> {
        self.run("update", &[path_arg(local_path)?], Some(transport))?;
        Ok(())
    }

    fn resolve_ref(&self, local_path: &Path, label: &str) -> Result<Option<ResolvedRef>, VcsError> {
        for (dir, kind) in candidates(label) {
            let candidate = local_path.join(&dir);
            if candidate.is_dir() {
                let revision = self.last_changed_revision(&candidate)?;
                return Ok(Some(ResolvedRef {
                    label: label.to_string(),
                    name: dir,
                    kind,
                    revision,
                }));
            }
        }
        Ok(None)
    }

    fn checkout(&self, local_path: &Path, target: &ResolvedRef) -> Result<Checkout, VcsError> {
        let content_root = local_path.join(&target.name);
        if !content_root.is_dir() {
            return Err(VcsError::RefNotFound(target.label.clone()));
        }
        Ok(Checkout {
            revision: target.revision.clone(),
            content_root,
        })
    }
}
