use crate::config::value::ConfigValue;
use crate::error::{CoreError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// An ordered, nested configuration map.
///
/// Wraps an `IndexMap<String, ConfigValue>` and adds dot-notation access,
/// dotted-key insertion (for `.properties` style input) and flattening
/// back to dotted keys (for property-source rendering).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ConfigMap {
    #[serde(flatten)]
    inner: IndexMap<String, ConfigValue>,
}

impl ConfigMap {
    /// Creates a new empty configuration map.
    pub fn new() -> Self {
        Self {
            inner: IndexMap::new(),
        }
    }

    /// Creates a ConfigMap from an existing IndexMap.
    pub fn from_inner(inner: IndexMap<String, ConfigValue>) -> Self {
        Self { inner }
    }

    /// Returns a reference to the internal map.
    pub fn as_inner(&self) -> &IndexMap<String, ConfigValue> {
        &self.inner
    }

    /// Returns a mutable reference to the internal map.
    pub fn as_inner_mut(&mut self) -> &mut IndexMap<String, ConfigValue> {
        &mut self.inner
    }

    /// Returns true if the map contains no elements.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of top-level entries.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Inserts a top-level key-value pair.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) {
        self.inner.insert(key.into(), value.into());
    }

    /// Inserts a value under a dotted path, creating intermediate objects.
    ///
    /// A non-object value sitting on the path is replaced by an object,
    /// matching how `.properties` files treat `a=1` followed by `a.b=2`.
    ///
    /// ```
    /// use tessera_core::ConfigMap;
    ///
    /// let mut map = ConfigMap::new();
    /// map.insert_path("server.ssl.enabled", true);
    /// assert_eq!(map.get("server.ssl.enabled").unwrap().as_bool(), Some(true));
    /// ```
    pub fn insert_path(&mut self, path: &str, value: impl Into<ConfigValue>) {
        let mut parts = path.split('.').peekable();
        let mut current = &mut self.inner;

        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                current.insert(part.to_string(), value.into());
                return;
            }

            let slot = current
                .entry(part.to_string())
                .or_insert_with(|| ConfigValue::Object(IndexMap::new()));
            if !slot.is_object() {
                *slot = ConfigValue::Object(IndexMap::new());
            }
            current = match slot {
                ConfigValue::Object(next) => next,
                _ => return,
            };
        }
    }

    /// Retrieves a value by key, supporting dot notation for nested access.
    ///
    /// ```
    /// use tessera_core::ConfigMap;
    ///
    /// let map = ConfigMap::from_json(r#"{"server": {"port": 8080}}"#).unwrap();
    /// assert_eq!(map.get("server.port").unwrap().as_i64(), Some(8080));
    /// assert!(map.get("server.host").is_none());
    /// ```
    pub fn get(&self, path: &str) -> Option<&ConfigValue> {
        if path.is_empty() {
            return None;
        }

        if let Some(value) = self.inner.get(path) {
            return Some(value);
        }

        let mut parts = path.split('.');
        let mut current = self.inner.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }

        Some(current)
    }

    /// Flattens nested objects into dotted keys, keeping insertion order.
    ///
    /// Arrays are kept as leaf values.
    pub fn flatten(&self) -> IndexMap<String, ConfigValue> {
        let mut flat = IndexMap::new();
        for (key, value) in &self.inner {
            flatten_into(key, value, &mut flat);
        }
        flat
    }

    /// Parses a JSON object into a ConfigMap.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CoreError::parse_with_cause("json", e.to_string(), e))
    }

    /// Serializes the map to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| CoreError::serialize("json", e.to_string()))
    }

    /// Parses a YAML mapping into a ConfigMap.
    ///
    /// An empty (or comment-only) document yields an empty map.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let document: serde_yaml::Value = serde_yaml::from_str(yaml)
            .map_err(|e| CoreError::parse_with_cause("yaml", e.to_string(), e))?;

        if document.is_null() {
            return Ok(Self::new());
        }

        serde_yaml::from_value(document)
            .map_err(|e| CoreError::parse_with_cause("yaml", e.to_string(), e))
    }

    /// Serializes the map to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| CoreError::serialize("yaml", e.to_string()))
    }
}

fn flatten_into(prefix: &str, value: &ConfigValue, target: &mut IndexMap<String, ConfigValue>) {
    match value {
        ConfigValue::Object(map) if !map.is_empty() => {
            for (key, inner) in map {
                flatten_into(&format!("{prefix}.{key}"), inner, target);
            }
        },
        _ => {
            target.insert(prefix.to_string(), value.clone());
        },
    }
}

impl From<IndexMap<String, ConfigValue>> for ConfigMap {
    fn from(map: IndexMap<String, ConfigValue>) -> Self {
        ConfigMap { inner: map }
    }
}

impl FromIterator<(String, ConfigValue)> for ConfigMap {
    fn from_iter<T: IntoIterator<Item = (String, ConfigValue)>>(iter: T) -> Self {
        let mut map = ConfigMap::new();
        for (key, value) in iter {
            map.insert_path(&key, value);
        }
        map
    }
}
