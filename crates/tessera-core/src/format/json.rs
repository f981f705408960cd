use crate::config::ConfigMap;
use crate::error::Result;
use crate::format::{FormatParser, FormatSerializer};

/// JSON object documents.
pub struct JsonFormat;

impl FormatParser for JsonFormat {
    fn parse(&self, input: &str) -> Result<ConfigMap> {
        if input.trim().is_empty() {
            return Ok(ConfigMap::new());
        }
        ConfigMap::from_json(input)
    }
}

impl FormatSerializer for JsonFormat {
    fn serialize(&self, config: &ConfigMap) -> Result<String> {
        config.to_json()
    }
}
