//! Tessera command-line front end.
//!
//! `tessera resolve` loads the settings, resolves one request through the
//! multi-repository resolver and prints the environment; `tessera validate`
//! only checks the settings.

pub mod cli;
pub mod output;
pub mod settings;

pub use cli::{Cli, Command, run};
pub use output::{OutputFormat, render};
pub use settings::load_settings;
