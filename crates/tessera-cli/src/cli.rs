//! Command-line arguments and commands.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tessera_repo::{ConfigQuery, ConfigSource, MultiRepositoryResolver};
use tracing::{info, warn};

use crate::output::{OutputFormat, render};
use crate::settings::load_settings;

#[derive(Debug, Parser)]
#[command(name = "tessera", version, about = "Resolve configuration from many repositories")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve one application and print its environment.
    Resolve {
        application: String,

        /// Comma-separated profiles.
        #[arg(default_value = "default")]
        profiles: String,

        label: Option<String>,

        /// Settings file (YAML, JSON or TOML).
        #[arg(long, short)]
        config: Option<PathBuf>,

        #[arg(long, short, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Print one merged map instead of the property sources.
        #[arg(long)]
        merged: bool,
    },

    /// Check the settings: descriptors, patterns and credential rules.
    Validate {
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
}

/// Runs `command`, writing its output to `out`.
pub async fn run(command: Command, out: &mut impl Write) -> anyhow::Result<()> {
    match command {
        Command::Resolve {
            application,
            profiles,
            label,
            config,
            format,
            merged,
        } => {
            let query = ConfigQuery::parse(&application, &profiles, label.as_deref())?;
            let resolver = MultiRepositoryResolver::new(load_settings(config.as_deref())?)?;

            info!(query = %query, "Resolving");
            let env = resolver.fetch(&query).await?;
            for skipped in env.skipped() {
                warn!(file = %skipped, "Property file left out");
            }

            let rendered = render(&env, format, merged)?;
            writeln!(out, "{}", rendered.trim_end()).context("failed to write output")?;
        },
        Command::Validate { config } => {
            let resolver = MultiRepositoryResolver::new(load_settings(config.as_deref())?)?;

            for descriptor in resolver.store().descriptors() {
                let patterns = if descriptor.is_fallback() {
                    "*".to_string()
                } else {
                    descriptor
                        .patterns()
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                writeln!(
                    out,
                    "{} ({}) {} [{}]",
                    descriptor.name(),
                    descriptor.kind(),
                    descriptor.uri(),
                    patterns
                )?;
            }
            writeln!(
                out,
                "{} repositories, {} credential rules",
                resolver.store().len(),
                resolver.binder().rules().len()
            )?;
        },
    }

    Ok(())
}
