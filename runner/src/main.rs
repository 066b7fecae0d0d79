mod config;
mod database;
mod executors;
mod experiments;
mod ingest;
mod sweep;

use clap::Parser;
use config::{ConfigErrors, HarnessConfig};
use database::{ResultStore, StoreError};
use executors::{ExecutorError, Executors};
use experiments::Experiment;
use std::{error::Error as _, path::PathBuf, process::exit};
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Run transactional memory benchmark sweeps and collect their results
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Number of repeated runs for each experiment, 5 is a good choice
    #[arg(value_parser = clap::value_parser!(u32).range(1..=10))]
    num_repetitions: u32,

    /// YAML config file, defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Experiment to run, can be repeated (overrides the configured selection)
    #[arg(short, long = "experiment", value_enum)]
    experiments: Vec<Experiment>,

    /// Directory for transcripts and the result store
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Print the benchmark commands without running them
    #[arg(long)]
    dry_run: bool,
}

#[derive(Error, Debug)]
enum HarnessError {
    #[error(transparent)]
    Config(#[from] ConfigErrors),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

fn run(cli: Cli) -> Result<(), HarnessError> {
    let mut config = HarnessConfig::load(cli.config.as_deref())?;

    if !cli.experiments.is_empty() {
        config.experiments = cli.experiments;
    }
    if let Some(directory) = cli.output_dir {
        config.output.directory = directory;
    }

    config.preflight_checks()?;

    let mut store = ResultStore::load(config.output.data_path())?;
    if store.is_empty() {
        info!(path = ?store.path(), "Starting from an empty result store");
    }
    let executor = Executors::load(&config, cli.dry_run)?;

    for experiment in config.experiments.iter().copied() {
        executor.run_experiment(experiment, cli.num_repetitions, &mut store)?;
    }

    info!(records = store.len(), path = ?store.path(), "All experiments done");

    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // argument errors print the usage and exit with status 2 before anything runs
    let cli = Cli::parse();

    if let Err(error) = run(cli) {
        let mut message = error.to_string();
        let mut source = error.source();

        while let Some(cause) = source {
            message.push_str(&format!(": {cause}"));
            source = cause.source();
        }

        error!("Harness aborted: {message}");
        exit(1);
    }
}
