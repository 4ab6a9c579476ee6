mod app;

use anyhow::{Context, Result};
use clap::Parser;

use app::{Cli, Command, run};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Command::Check {
        threads: Some(threads),
        ..
    } = &cli.command
    {
        rayon::ThreadPoolBuilder::new()
            .num_threads(*threads)
            .build_global()
            .context("CLI: Failed to initialize thread pool")?;
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(&cli.command, &mut out)
}
