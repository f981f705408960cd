//! Loading [`Settings`] from a file and the environment.

use std::path::Path;

use anyhow::Context;
use config::{Case, Config, Environment, File};
use tessera_repo::Settings;

/// Prefix of environment variables overriding top-level settings, e.g.
/// `TESSERA__REFRESH_RATE=60` or `TESSERA__STALE_POLICY=serve-stale`.
pub const ENV_PREFIX: &str = "TESSERA";

/// Reads `path` (YAML, JSON or TOML, by extension) and layers `TESSERA__*`
/// variables on top. Without a file, settings come from the environment
/// and defaults alone.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path));
    }

    let config = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .convert_case(Case::Camel)
                .try_parsing(true),
        )
        .build()
        .with_context(|| match path {
            Some(path) => format!("failed to read settings from {}", path.display()),
            None => "failed to read settings from the environment".to_string(),
        })?;

    config
        .try_deserialize::<Settings>()
        .context("invalid settings")
}
