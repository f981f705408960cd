use crate::config::map::ConfigMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::ConfigValue;

/// A named set of configuration properties.
///
/// One property source usually corresponds to one file in a working copy
/// (`git:main:config/svc1-dev.yml`), but secrets and server-side overrides
/// are property sources too. Lists of sources are ordered most specific
/// first; see [`crate::merge::merge_by_precedence`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySource {
    /// The name shown to clients.
    pub name: String,

    /// Where the properties were read from (file path, secrets path), if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,

    /// The properties themselves.
    pub config: ConfigMap,
}

impl PropertySource {
    /// Creates a new PropertySource.
    pub fn new(name: impl Into<String>, config: ConfigMap) -> Self {
        Self {
            name: name.into(),
            origin: None,
            config,
        }
    }

    /// Builder-style method to record the origin.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Returns the properties with dotted keys, as clients expect them.
    pub fn flattened(&self) -> IndexMap<String, ConfigValue> {
        self.config.flatten()
    }

    /// Returns true if the source holds no properties.
    pub fn is_empty(&self) -> bool {
        self.config.is_empty()
    }
}
