//! Configuration file formats.
//!
//! Each format implements [`FormatParser`] and [`FormatSerializer`];
//! [`ConfigFormat`] maps file extensions to formats and dispatches.

use std::path::Path;

use crate::config::ConfigMap;
use crate::error::Result;

pub mod json;
pub mod properties;
pub mod yaml;

use json::JsonFormat;
use properties::PropertiesFormat;
use yaml::YamlFormat;

/// Supported configuration formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigFormat {
    /// YAML format (.yml, .yaml)
    Yaml,
    /// JSON format (.json)
    Json,
    /// Java Properties format (.properties)
    Properties,
}

impl ConfigFormat {
    /// Detects the format from a file path based on extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Detects the format from an extension (without dot), ignoring case.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "yml" | "yaml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            "properties" => Some(Self::Properties),
            _ => None,
        }
    }

    /// Returns all file extensions for this format, preferred first.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Yaml => &["yml", "yaml"],
            Self::Json => &["json"],
            Self::Properties => &["properties"],
        }
    }

    /// Returns the MIME type used when rendering this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Yaml => "application/x-yaml",
            Self::Json => "application/json",
            Self::Properties => "text/plain",
        }
    }

    /// Returns all formats in lookup order.
    pub fn all() -> &'static [Self] {
        &[Self::Yaml, Self::Json, Self::Properties]
    }

    /// Parses content in this format.
    pub fn parse(&self, content: &str) -> Result<ConfigMap> {
        match self {
            Self::Yaml => YamlFormat.parse(content),
            Self::Json => JsonFormat.parse(content),
            Self::Properties => PropertiesFormat.parse(content),
        }
    }

    /// Serializes a map in this format.
    pub fn serialize(&self, config: &ConfigMap) -> Result<String> {
        match self {
            Self::Yaml => YamlFormat.serialize(config),
            Self::Json => JsonFormat.serialize(config),
            Self::Properties => PropertiesFormat.serialize(config),
        }
    }
}

impl std::fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Yaml => write!(f, "YAML"),
            Self::Json => write!(f, "JSON"),
            Self::Properties => write!(f, "Properties"),
        }
    }
}

/// A trait for parsing configuration from a string.
pub trait FormatParser: Send + Sync {
    /// Parses the input string into a ConfigMap.
    fn parse(&self, input: &str) -> Result<ConfigMap>;
}

/// A trait for serializing configuration to a string.
pub trait FormatSerializer: Send + Sync {
    /// Serializes the ConfigMap into a string.
    fn serialize(&self, config: &ConfigMap) -> Result<String>;
}
