//! Rendering a resolved [`Environment`].

use anyhow::Context;
use clap::ValueEnum;
use tessera_core::format::ConfigFormat;
use tessera_repo::Environment;

/// Output format of `tessera resolve`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Properties,
}

impl From<OutputFormat> for ConfigFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => ConfigFormat::Json,
            OutputFormat::Yaml => ConfigFormat::Yaml,
            OutputFormat::Properties => ConfigFormat::Properties,
        }
    }
}

/// Renders `env` in `format`.
///
/// With `merged`, the property sources are collapsed into one map, most
/// specific source winning. Otherwise JSON and YAML print the whole
/// environment, and `.properties` prints every source under a comment,
/// least specific first so that later keys override earlier ones.
pub fn render(env: &Environment, format: OutputFormat, merged: bool) -> anyhow::Result<String> {
    if merged {
        return ConfigFormat::from(format)
            .serialize(&env.merged())
            .context("failed to render merged properties");
    }

    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(env).context("failed to render environment as JSON")
        },
        OutputFormat::Yaml => {
            serde_yaml::to_string(env).context("failed to render environment as YAML")
        },
        OutputFormat::Properties => properties(env),
    }
}

fn properties(env: &Environment) -> anyhow::Result<String> {
    let mut output = format!(
        "# Application: {}\n# Profiles: {}\n# Label: {}\n",
        env.name(),
        env.profiles().join(","),
        env.label()
    );
    if let Some(version) = env.version() {
        output.push_str(&format!("# Version: {version}\n"));
    }

    for source in env.property_sources().iter().rev() {
        let body = ConfigFormat::Properties
            .serialize(&source.config)
            .with_context(|| format!("failed to render property source {}", source.name))?;
        output.push_str(&format!("\n# Source: {}\n{body}", source.name));
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::{ConfigMap, PropertySource};

    fn environment() -> Environment {
        let mut specific = ConfigMap::new();
        specific.insert_path("server.port", 9090);
        let mut general = ConfigMap::new();
        general.insert_path("server.port", 8080);
        general.insert_path("app.name", "svc1");

        Environment::new("svc1", vec!["dev".into()], "main")
            .with_version("a1")
            .with_property_sources(vec![
                PropertySource::new("git:main:svc1-dev.yml", specific),
                PropertySource::new("git:main:svc1.yml", general),
            ])
    }

    #[test]
    fn test_json_keeps_sources() {
        let rendered = render(&environment(), OutputFormat::Json, false).unwrap();
        let json: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(json["name"], "svc1");
        assert_eq!(json["version"], "a1");
        assert_eq!(json["propertySources"][0]["name"], "git:main:svc1-dev.yml");
    }

    #[test]
    fn test_merged_yaml_prefers_specific_source() {
        let rendered = render(&environment(), OutputFormat::Yaml, true).unwrap();
        let yaml: serde_yaml::Value = serde_yaml::from_str(&rendered).unwrap();

        assert_eq!(yaml["server"]["port"].as_i64(), Some(9090));
        assert_eq!(yaml["app"]["name"].as_str(), Some("svc1"));
    }

    #[test]
    fn test_properties_list_general_sources_first() {
        let rendered = render(&environment(), OutputFormat::Properties, false).unwrap();

        assert!(rendered.starts_with("# Application: svc1\n"));
        let general = rendered.find("# Source: git:main:svc1.yml").unwrap();
        let specific = rendered.find("# Source: git:main:svc1-dev.yml").unwrap();
        assert!(general < specific);
        assert!(rendered.contains("server.port=9090"));
    }
}
