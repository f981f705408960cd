//! Tessera Core - Domain types
//!
//! This crate provides the foundational value types shared by the Tessera
//! resolution engine and its front ends:
//!
//! - [`ConfigValue`] and [`ConfigMap`]: ordered, nested configuration values
//! - [`PropertySource`]: a named configuration map (one file or origin)
//! - [`Application`], [`Profiles`], [`Label`]: request coordinates
//! - [`format`]: YAML, JSON and `.properties` parsers and serializers
//! - [`merge`]: deep merge of property sources in precedence order

pub mod config;
pub mod error;
pub mod format;
pub mod merge;
pub mod types;

pub use config::{ConfigMap, ConfigValue, PropertySource};
pub use error::{CoreError, Result};
pub use types::{Application, Label, Profiles};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_semver() {
        let v = version();
        assert_eq!(v.split('.').count(), 3, "Version should be semver");
    }
}
