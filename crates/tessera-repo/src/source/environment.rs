//! The resolution response.

use serde::{Deserialize, Serialize};
use tessera_core::merge::merge_by_precedence;
use tessera_core::{ConfigMap, PropertySource};

/// Configuration resolved for one query.
///
/// Serializes to the JSON shape config clients expect: `name`,
/// `profiles`, `label`, `version`, `state` and `propertySources`, the
/// sources ordered most specific first. Files left out because they could
/// not be parsed are listed under `skipped`, which is omitted when empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    name: String,
    profiles: Vec<String>,
    label: String,
    /// The revision the files were read at.
    version: Option<String>,
    state: Option<String>,
    property_sources: Vec<PropertySource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    skipped: Vec<String>,
}

impl Environment {
    pub fn new(name: impl Into<String>, profiles: Vec<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            profiles,
            label: label.into(),
            version: None,
            state: None,
            property_sources: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn profiles(&self) -> &[String] {
        &self.profiles
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    pub fn property_sources(&self) -> &[PropertySource] {
        &self.property_sources
    }

    /// Property files that exist but were left out, one message each.
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    /// Returns true if every candidate file made it into the sources.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    /// Appends a source with lower precedence than those already present.
    pub fn add_property_source(&mut self, source: PropertySource) {
        self.property_sources.push(source);
    }

    /// Inserts a source ahead of every other one.
    pub fn prepend_property_source(&mut self, source: PropertySource) {
        self.property_sources.insert(0, source);
    }

    pub fn is_empty(&self) -> bool {
        self.property_sources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.property_sources.len()
    }

    /// Builder-style method to set version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Builder-style method to set state.
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Builder-style method to set the property sources.
    pub fn with_property_sources(mut self, sources: Vec<PropertySource>) -> Self {
        self.property_sources = sources;
        self
    }

    /// Builder-style method to record the files left out.
    pub fn with_skipped(mut self, skipped: Vec<String>) -> Self {
        self.skipped = skipped;
        self
    }

    /// The effective configuration: all sources merged, most specific winning.
    pub fn merged(&self) -> ConfigMap {
        merge_by_precedence(&self.property_sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_environment() {
        let env = Environment::new("svc1", vec!["dev".to_string()], "main");
        assert_eq!(env.name(), "svc1");
        assert_eq!(env.label(), "main");
        assert!(env.version().is_none());
        assert!(env.is_empty());
    }

    #[test]
    fn test_prepend_keeps_precedence() {
        let file = PropertySource::new("git:main:svc1.yml", ConfigMap::from_yaml("a: file").unwrap());
        let overrides = PropertySource::new("overrides", ConfigMap::from_yaml("a: override").unwrap());

        let mut env = Environment::new("svc1", vec!["default".to_string()], "main")
            .with_property_sources(vec![file]);
        env.prepend_property_source(overrides);

        assert_eq!(env.property_sources()[0].name, "overrides");
        assert_eq!(env.merged().get("a").unwrap().as_str(), Some("override"));
    }

    #[test]
    fn test_serialization() {
        let env = Environment::new("svc1", vec!["dev".to_string()], "main").with_version("abc123");

        let json = serde_json::to_string(&env).unwrap();
        assert!(json.contains("\"name\":\"svc1\""));
        assert!(json.contains("\"version\":\"abc123\""));
        assert!(json.contains("\"propertySources\":[]"));
        assert!(!json.contains("skipped"));
    }

    #[test]
    fn test_skipped_files_are_serialized() {
        let env = Environment::new("svc1", vec!["dev".to_string()], "main")
            .with_skipped(vec!["svc1-dev.yml: mapping values are not allowed".to_string()]);

        assert!(!env.is_complete());
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["skipped"][0], "svc1-dev.yml: mapping values are not allowed");

        let back: Environment = serde_json::from_value(json).unwrap();
        assert_eq!(back.skipped(), env.skipped());
    }
}
