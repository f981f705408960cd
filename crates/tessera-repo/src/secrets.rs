//! Secrets placed ahead of file-based property sources.

use async_trait::async_trait;
use indexmap::IndexMap;
use tessera_core::ConfigMap;

use crate::error::ResolveError;

/// A store of secret properties, addressed by path.
#[async_trait]
pub trait SecretsBackend: Send + Sync {
    /// Fetches the secrets stored at `path` for `label`.
    ///
    /// A path with no secrets yields an empty map, not an error.
    async fn fetch_secrets(&self, path: &str, label: &str) -> Result<ConfigMap, ResolveError>;

    /// Name used in logs.
    fn name(&self) -> &str;
}

/// Secrets held in memory, keyed by path. Labels are ignored.
#[derive(Debug, Clone, Default)]
pub struct StaticSecrets {
    entries: IndexMap<String, ConfigMap>,
}

impl StaticSecrets {
    pub fn new(entries: IndexMap<String, ConfigMap>) -> Self {
        Self { entries }
    }

    /// Builder-style method to add the secrets of one path.
    pub fn with_entry(mut self, path: impl Into<String>, secrets: ConfigMap) -> Self {
        self.entries.insert(path.into(), secrets);
        self
    }
}

#[async_trait]
impl SecretsBackend for StaticSecrets {
    async fn fetch_secrets(&self, path: &str, _label: &str) -> Result<ConfigMap, ResolveError> {
        Ok(self.entries.get(path).cloned().unwrap_or_default())
    }

    fn name(&self) -> &str {
        "static"
    }
}
