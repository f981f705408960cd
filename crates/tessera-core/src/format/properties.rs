use java_properties::{PropertiesIter, PropertiesWriter};

use crate::config::{ConfigMap, ConfigValue};
use crate::error::{CoreError, Result};
use crate::format::{FormatParser, FormatSerializer};

/// Java `.properties` files.
///
/// Parsing follows the Java rules (`=`, `:` or whitespace separators, line
/// continuations, `\uXXXX` escapes) via the `java-properties` crate. Every
/// value is kept as a string, and dotted keys become nested objects.
pub struct PropertiesFormat;

impl FormatParser for PropertiesFormat {
    fn parse(&self, input: &str) -> Result<ConfigMap> {
        let mut map = ConfigMap::new();

        PropertiesIter::new(input.as_bytes())
            .read_into(|key, value| {
                map.insert_path(&key, ConfigValue::String(value));
            })
            .map_err(|e| CoreError::parse("properties", e.to_string()))?;

        Ok(map)
    }
}

impl FormatSerializer for PropertiesFormat {
    fn serialize(&self, config: &ConfigMap) -> Result<String> {
        let mut buffer = Vec::new();

        {
            let mut writer = PropertiesWriter::new(&mut buffer);
            for (key, value) in config.flatten() {
                writer
                    .write(&key, &value.to_property_string())
                    .map_err(|e| CoreError::serialize("properties", e.to_string()))?;
            }
            writer
                .finish()
                .map_err(|e| CoreError::serialize("properties", e.to_string()))?;
        }

        String::from_utf8(buffer).map_err(|e| CoreError::serialize("properties", e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_properties() {
        let input = "
# Server config
server.port=8080
server.host: localhost
app.name = Test App
! bang comments too
";

        let config = PropertiesFormat.parse(input).unwrap();

        assert_eq!(config.get("server.port").unwrap().as_str(), Some("8080"));
        assert_eq!(
            config.get("server.host").unwrap().as_str(),
            Some("localhost")
        );
        assert_eq!(config.get("app.name").unwrap().as_str(), Some("Test App"));
    }

    #[test]
    fn test_parse_continuation_and_escapes() {
        let input = "message=hello \\\n    world\nsymbol=\\u00e9\n";
        let config = PropertiesFormat.parse(input).unwrap();

        assert_eq!(config.get("message").unwrap().as_str(), Some("hello world"));
        assert_eq!(config.get("symbol").unwrap().as_str(), Some("é"));
    }

    #[test]
    fn test_serialize_properties() {
        let config = ConfigMap::from_json(r#"{"a": {"b": "c"}, "d": 10}"#).unwrap();

        let output = PropertiesFormat.serialize(&config).unwrap();

        assert!(output.contains("a.b=c"));
        assert!(output.contains("d=10"));
    }
}
