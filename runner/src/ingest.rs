pub mod markers;

use crate::{
    config::{ConfigErrors, IngestorConfig},
    database::RunResult,
};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum IngestorError {
    #[error("Benchmark output does not contain '{marker}' followed by a number")]
    MissingMarker { marker: String },
    #[error("Value '{value}' after '{marker}' is not a valid number")]
    InvalidNumber { marker: String, value: String },
    #[error("Reported time {0} is not a positive number of seconds")]
    InvalidTime(f64),
    #[error("Failed to deserialize benchmark output")]
    DeserializeIngestor(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone)]
/// container for everything captured from one benchmark process
pub struct RunOutput {
    /// command line as it was printed
    pub command: String,
    /// stdout and stderr, interleaved as the benchmark wrote them
    pub output: String,
    /// wall clock time measured by the harness, in nanoseconds
    pub runtime: u128,
}

#[derive(Clone, Debug)]
pub enum Ingestors {
    Markers(markers::MarkerIngestor),
    /// the benchmark prints a YAML mapping with `time` and `array_size`
    Yaml,
}

impl Ingestors {
    pub fn load(config: &IngestorConfig) -> Result<Self, ConfigErrors> {
        match config {
            IngestorConfig::Markers { time, array_size } => {
                markers::MarkerIngestor::new(time, array_size).map(Self::Markers)
            }
            IngestorConfig::Yaml => Ok(Self::Yaml),
        }
    }

    #[tracing::instrument(level = "debug", skip(output), fields(command = %output.command))]
    pub fn ingest(&self, output: &RunOutput) -> Result<RunResult, IngestorError> {
        let result = match self {
            Self::Markers(ingestor) => ingestor.ingest(&output.output)?,
            Self::Yaml => match serde_yaml::from_str::<RunResult>(&output.output) {
                Ok(result) => result,
                Err(error) => {
                    error!(error = ?error, "Failed to deserialize metrics from benchmark output");

                    return Err(IngestorError::DeserializeIngestor(error));
                }
            },
        };

        validate(result)
    }
}

fn validate(result: RunResult) -> Result<RunResult, IngestorError> {
    if result.time.is_finite() && result.time > 0.0 {
        Ok(result)
    } else {
        Err(IngestorError::InvalidTime(result.time))
    }
}
