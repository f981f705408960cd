//! Resolver settings.
//!
//! Everything the engine needs is in [`Settings`]: where working copies
//! live, how often moving labels are refreshed, the repository descriptors,
//! the credential rules and the transport parameters. Settings are
//! deserialized (camelCase, durations in seconds) or assembled with
//! [`Settings::builder`].

use std::path::PathBuf;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tessera_core::{ConfigMap, ConfigValue};

use crate::credentials::{CredentialSettings, TransportSettings};
use crate::vcs::BackendKind;

/// What to do when a remote cannot be reached but a local copy exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StalePolicy {
    /// Fail the request.
    #[default]
    Fail,
    /// Serve the label as last fetched.
    ServeStale,
}

/// One entry of `settings.repos`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptorSettings {
    pub name: String,

    /// Remote URI; may contain `{application}`, `{profile}` and `{label}`.
    pub uri: String,

    #[serde(default)]
    pub kind: BackendKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_label: Option<String>,

    /// Directories searched for property files, relative to the content
    /// root. May contain placeholders and `*` globs.
    #[serde(default)]
    pub search_paths: Vec<String>,

    /// Name of the credential rule to use for this repository.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_ref: Option<String>,

    /// `app-glob` or `app-glob/profile-glob`. Empty means `*`.
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl DescriptorSettings {
    pub fn new(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
            kind: BackendKind::Git,
            default_label: None,
            search_paths: Vec::new(),
            credential_ref: None,
            patterns: Vec::new(),
        }
    }

    pub fn kind(mut self, kind: BackendKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn default_label(mut self, label: impl Into<String>) -> Self {
        self.default_label = Some(label.into());
        self
    }

    pub fn search_path(mut self, path: impl Into<String>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    pub fn credential_ref(mut self, name: impl Into<String>) -> Self {
        self.credential_ref = Some(name.into());
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }
}

/// Secrets placed ahead of file sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretsSettings {
    /// Path prefix; secrets are fetched from `<prefix>/<application>/<profiles>`.
    #[serde(default = "default_secrets_prefix")]
    pub prefix: String,

    /// Static secrets keyed by path (`secret/svc1/dev`), used when no
    /// other backend is installed.
    #[serde(default)]
    pub entries: IndexMap<String, ConfigMap>,
}

fn default_secrets_prefix() -> String {
    "secret".to_string()
}

/// Settings of the multi-repository resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Parent directory of all working copies.
    #[serde(default = "default_basedir")]
    pub basedir: PathBuf,

    /// Label used when neither the request nor the descriptor names one.
    /// Falls back to the backend default (`main`, `trunk`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_label: Option<String>,

    /// Minimum time between two fetches of a moving label. Zero fetches
    /// on every request.
    #[serde(default, with = "duration_secs")]
    pub refresh_rate: Duration,

    /// How long a request waits for another request's sync of the same
    /// working copy.
    #[serde(default = "default_lock_wait_timeout", with = "duration_secs")]
    pub lock_wait_timeout: Duration,

    /// Fetch on every request, whatever the label kind or refresh rate.
    #[serde(default)]
    pub force_pull: bool,

    /// Delete untracked files after each checkout.
    #[serde(default = "default_true")]
    pub clean_on_checkout: bool,

    #[serde(default)]
    pub stale_policy: StalePolicy,

    #[serde(default)]
    pub transport: TransportSettings,

    #[serde(default)]
    pub repos: Vec<DescriptorSettings>,

    #[serde(default)]
    pub credentials: Vec<CredentialSettings>,

    /// Properties served ahead of everything else, as an `overrides` source.
    #[serde(default)]
    pub overrides: IndexMap<String, ConfigValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secrets: Option<SecretsSettings>,
}

fn default_basedir() -> PathBuf {
    std::env::temp_dir().join("tessera-repos")
}

fn default_lock_wait_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            basedir: default_basedir(),
            default_label: None,
            refresh_rate: Duration::ZERO,
            lock_wait_timeout: default_lock_wait_timeout(),
            force_pull: false,
            clean_on_checkout: true,
            stale_policy: StalePolicy::Fail,
            transport: TransportSettings::default(),
            repos: Vec::new(),
            credentials: Vec::new(),
            overrides: IndexMap::new(),
            secrets: None,
        }
    }
}

impl Settings {
    /// Creates a new builder for Settings.
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// The overrides as a nested configuration map.
    ///
    /// Dotted keys (`logging.level.root`) become nested objects so they
    /// merge with the same properties read from files.
    pub fn overrides_map(&self) -> ConfigMap {
        let mut map = ConfigMap::new();
        for (key, value) in &self.overrides {
            map.insert_path(key, value.clone());
        }
        map
    }
}

/// Builder for [`Settings`].
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    pub fn basedir(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.basedir = path.into();
        self
    }

    pub fn default_label(mut self, label: impl Into<String>) -> Self {
        self.settings.default_label = Some(label.into());
        self
    }

    pub fn refresh_rate(mut self, rate: Duration) -> Self {
        self.settings.refresh_rate = rate;
        self
    }

    pub fn lock_wait_timeout(mut self, timeout: Duration) -> Self {
        self.settings.lock_wait_timeout = timeout;
        self
    }

    pub fn force_pull(mut self, force: bool) -> Self {
        self.settings.force_pull = force;
        self
    }

    pub fn clean_on_checkout(mut self, clean: bool) -> Self {
        self.settings.clean_on_checkout = clean;
        self
    }

    pub fn stale_policy(mut self, policy: StalePolicy) -> Self {
        self.settings.stale_policy = policy;
        self
    }

    pub fn transport(mut self, transport: TransportSettings) -> Self {
        self.settings.transport = transport;
        self
    }

    pub fn repo(mut self, repo: DescriptorSettings) -> Self {
        self.settings.repos.push(repo);
        self
    }

    pub fn credential(mut self, credential: CredentialSettings) -> Self {
        self.settings.credentials.push(credential);
        self
    }

    pub fn override_property(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.settings.overrides.insert(key.into(), value.into());
        self
    }

    pub fn secrets(mut self, secrets: SecretsSettings) -> Self {
        self.settings.secrets = Some(secrets);
        self
    }

    pub fn build(self) -> Settings {
        self.settings
    }
}

/// Serde helper storing a `Duration` as whole seconds.
pub(crate) mod duration_secs {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
