//! Property file parsing.

use std::path::Path;

use tessera_core::ConfigMap;
use tessera_core::format::ConfigFormat;

use crate::error::ResolveError;

/// Reads property files in any supported format.
pub struct ConfigParser;

impl ConfigParser {
    /// Parses `content` as `format`. Errors name `origin`.
    pub fn parse(content: &str, format: ConfigFormat, origin: &Path) -> Result<ConfigMap, ResolveError> {
        format
            .parse(content)
            .map_err(|e| ResolveError::parse(origin, e.to_string()))
    }

    /// Parses a file, detecting the format from its extension.
    ///
    /// An unreadable file is reported like a malformed one, so a single bad
    /// file never hides the others.
    pub fn parse_file(path: &Path) -> Result<ConfigMap, ResolveError> {
        let format = ConfigFormat::from_path(path)
            .ok_or_else(|| ResolveError::parse(path, "unsupported file extension"))?;
        let content = std::fs::read_to_string(path)
            .map_err(|e| ResolveError::parse(path, format!("cannot read file: {e}")))?;
        Self::parse(&content, format, path)
    }
}
