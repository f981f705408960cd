#![allow(dead_code)]
use tessera_core::{ConfigMap, PropertySource};

/// Builds a ConfigMap from JSON. Panics on invalid input.
pub fn config_from_json(json: &str) -> ConfigMap {
    ConfigMap::from_json(json).expect("test fixture should be valid JSON")
}

/// Builds a named property source from JSON.
pub fn source(name: &str, json_content: &str) -> PropertySource {
    PropertySource::new(name, config_from_json(json_content))
}

/// A nested fixture exercising objects, scalars and arrays.
pub fn complex_config() -> ConfigMap {
    config_from_json(
        r#"{
        "server": {
            "port": 8080,
            "host": "localhost",
            "ssl": {
                "enabled": true,
                "cert": "/path/to/cert"
            }
        },
        "database": {
            "primary": {
                "url": "jdbc:postgres://local",
                "pool": 10
            }
        },
        "features": ["new-ui", "beta-api"]
    }"#,
    )
}
