pub mod local;
#[cfg(test)]
mod local_test;

use crate::{
    config::{ConfigErrors, HarnessConfig},
    database::{ResultStore, StoreError},
    experiments::Experiment,
    ingest::IngestorError,
};
use std::{io, process::ExitStatus};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("No benchmark executable configured for variant {0}")]
    UnknownVariant(usize),
    #[error("Failed to create the output pipe for `{command}`")]
    Pipe {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed to spawn `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed while waiting for `{command}`")]
    Wait {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("`{command}` failed with {status}")]
    Failed { command: String, status: ExitStatus },
    #[error("Failed to extract metrics")]
    Ingest(#[from] IngestorError),
    #[error("Failed to persist results")]
    Store(#[from] StoreError),
}

#[derive(Clone, Debug)]
pub enum Executors {
    Local(local::LocalExecutor),
}

impl Executors {
    pub fn load(config: &HarnessConfig, dry_run: bool) -> Result<Self, ConfigErrors> {
        Ok(Self::Local(local::LocalExecutor::load(config, dry_run)?))
    }

    pub fn run_experiment(
        &self,
        experiment: Experiment,
        repetitions: u32,
        store: &mut ResultStore,
    ) -> Result<(), ExecutorError> {
        match self {
            Self::Local(executor) => executor.run_experiment(experiment, repetitions, store),
        }
    }
}
