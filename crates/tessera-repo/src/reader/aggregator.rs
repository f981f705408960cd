use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use tessera_core::format::ConfigFormat;
use tessera_core::{Application, Profiles, PropertySource};
use tracing::{debug, warn};

use super::ConfigParser;
use crate::error::ResolveError;
use crate::sync::WorkingCopy;

/// Base name shared by every application.
const SHARED_NAME: &str = "application";

/// Property sources read from a working copy.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    /// Most specific first.
    pub sources: Vec<PropertySource>,
    /// Files that exist but could not be parsed. They are left out of
    /// `sources`.
    pub errors: Vec<ResolveError>,
}

impl LoadOutcome {
    /// Returns true if every candidate file was read.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Collects the property files of a request from a working copy.
///
/// Order, most specific first:
/// 1. `{application}-{profile}` (the last requested profile first)
/// 2. `{application}`
/// 3. `application-{profile}`
/// 4. `application`
///
/// Within each tier the content root comes first, then the search paths
/// in configured order. For each file name the first existing extension
/// among `yml`, `yaml`, `json` and `properties` is used.
#[derive(Debug, Clone, Default)]
pub struct PropertySourceAggregator {
    search_paths: Vec<String>,
}

impl PropertySourceAggregator {
    /// `search_paths` are relative to the content root, with placeholders
    /// already expanded. They may contain `*` globs.
    pub fn new(search_paths: Vec<String>) -> Self {
        Self { search_paths }
    }

    pub fn load(
        &self,
        copy: &WorkingCopy,
        application: &Application,
        profiles: &Profiles,
    ) -> LoadOutcome {
        let root = copy.content_root();
        let prefix = format!("{}:{}", copy.kind(), copy.label());
        let locations = self.locations(root);

        let mut outcome = LoadOutcome::default();
        for stem in file_stems(application, profiles) {
            for location in &locations {
                let Some(path) = find_file(location, &stem) else {
                    continue;
                };
                match ConfigParser::parse_file(&path) {
                    Ok(config) => {
                        let name = format!("{prefix}:{}", relative_name(root, &path));
                        debug!(source = %name, "Loaded property source");
                        outcome.sources.push(
                            PropertySource::new(name, config).with_origin(path.display().to_string()),
                        );
                    },
                    Err(e) => {
                        warn!(repository = copy.repository(), error = %e, "Skipping unreadable property file");
                        outcome.errors.push(e);
                    },
                }
            }
        }

        debug!(
            repository = copy.repository(),
            label = copy.label(),
            sources = outcome.sources.len(),
            errors = outcome.errors.len(),
            "Aggregated property sources"
        );
        outcome
    }

    /// Directories searched, in order, without duplicates.
    fn locations(&self, root: &Path) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        let mut locations = Vec::new();
        let mut push = |dir: PathBuf| {
            if dir.is_dir() && seen.insert(dir.clone()) {
                locations.push(dir);
            }
        };

        push(root.to_path_buf());
        for search_path in &self.search_paths {
            let trimmed = search_path.trim().trim_matches('/');
            if trimmed.is_empty() {
                continue;
            }
            if escapes_root(trimmed) {
                warn!(search_path = trimmed, "Ignoring search path outside the working copy");
                continue;
            }

            if !trimmed.contains(['*', '?', '[']) {
                push(root.join(trimmed));
                continue;
            }

            let pattern = root.join(trimmed).to_string_lossy().into_owned();
            match glob::glob(&pattern) {
                Ok(paths) => {
                    let mut dirs: Vec<PathBuf> = paths.filter_map(Result::ok).collect();
                    dirs.sort();
                    dirs.into_iter().for_each(&mut push);
                },
                Err(e) => warn!(search_path = trimmed, error = %e, "Invalid search path pattern"),
            }
        }
        locations
    }
}

/// File names to look for, most specific first.
fn file_stems(application: &Application, profiles: &Profiles) -> Vec<String> {
    let mut stems = Vec::new();
    for name in [application.as_str(), SHARED_NAME] {
        for profile in profiles.as_slice().iter().rev() {
            stems.push(format!("{name}-{profile}"));
        }
        stems.push(name.to_string());
    }

    let mut seen = HashSet::new();
    stems.retain(|stem| seen.insert(stem.clone()));
    stems
}

fn find_file(dir: &Path, stem: &str) -> Option<PathBuf> {
    ConfigFormat::all()
        .iter()
        .flat_map(|format| format.extensions())
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .find(|path| path.is_file())
}

fn escapes_root(search_path: &str) -> bool {
    Path::new(search_path)
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
}

/// Path relative to the content root, with `/` separators.
fn relative_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
