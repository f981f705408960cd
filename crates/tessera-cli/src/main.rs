//! Tessera binary.

use std::process::ExitCode;

use clap::Parser;
use tessera_cli::{Cli, run};
use tessera_repo::ResolveError;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut stdout = std::io::stdout().lock();

    match run(cli.command, &mut stdout).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let class = err
                .downcast_ref::<ResolveError>()
                .map_or("error", |e| e.class().as_str());
            eprintln!("{class}: {err:#}");
            ExitCode::FAILURE
        },
    }
}
