use crate::experiments::Experiment;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::Error,
    os::unix::fs::MetadataExt,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, error, warn};

pub const DEFAULT_TIME_MARKER: &str = "real time: ";
pub const DEFAULT_ARRAY_SIZE_MARKER: &str = "ARRAY_SZ: ";

// check if a file is executable
pub fn check_executable(path: &Path) -> Result<bool, ConfigErrors> {
    if !path.is_file() {
        Err(ConfigErrors::FileNotFound(path.to_path_buf()))
    } else {
        let metadata = fs::metadata(path)?;

        Ok((metadata.mode() & 0o111) != 0)
    }
}

#[derive(Error, Debug)]
pub enum ConfigErrors {
    #[error("Failed to read config file {path:?}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: Error,
    },
    #[error("Config file is invalid")]
    InvalidConfig(#[from] serde_yaml::Error),
    #[error("Marker could not be compiled")]
    InvalidMarker(#[from] regex::Error),
    #[error("File not found: {0:?}")]
    FileNotFound(PathBuf),
    #[error("Metadata not found")]
    MetadataNotFound(#[from] Error),
    #[error("Preflight checks failed, see the errors above")]
    PreflightFailed,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    // benchmark executables, indexed by variant (0 = low contention, 1 = high contention)
    #[serde(default = "default_benchmarks")]
    pub benchmarks: Vec<PathBuf>,

    #[serde(default)]
    pub output: OutputConfig,

    // experiments run by a plain invocation, in order
    #[serde(default = "default_experiments")]
    pub experiments: Vec<Experiment>,

    #[serde(default)]
    pub ingest: IngestorConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum IngestorConfig {
    Markers {
        #[serde(default = "default_time_marker")]
        time: String,
        #[serde(default = "default_array_size_marker")]
        array_size: String,
    },
    Yaml,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            benchmarks: default_benchmarks(),
            output: OutputConfig::default(),
            experiments: default_experiments(),
            ingest: IngestorConfig::default(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            data_file: default_data_file(),
        }
    }
}

impl Default for IngestorConfig {
    fn default() -> Self {
        Self::Markers {
            time: default_time_marker(),
            array_size: default_array_size_marker(),
        }
    }
}

impl OutputConfig {
    /// location of the shared result store
    pub fn data_path(&self) -> PathBuf {
        self.directory.join(&self.data_file)
    }
}

impl HarnessConfig {
    /// load the config file if one is given, otherwise fall back to the defaults
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigErrors> {
        match path {
            Some(path) => {
                let raw = fs::read_to_string(path).map_err(|source| ConfigErrors::ReadConfig {
                    path: path.to_path_buf(),
                    source,
                })?;
                let config = serde_yaml::from_str(&raw)?;

                debug!(path = ?path, "Loaded config");

                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn preflight_checks(&self) -> Result<(), ConfigErrors> {
        // attempt to catch all errors instead of piece-by-piece to make debugging easier for users
        let mut contains_error = false;

        if self.experiments.is_empty() {
            error!("No experiment was selected, nothing to run");
            contains_error = true;
        }

        let duplicates = self.experiments.iter().duplicates().collect_vec();
        if !duplicates.is_empty() {
            warn!(
                "Experiments {} are selected more than once, later runs overwrite earlier results",
                duplicates.iter().join(", ")
            );
        }

        if !self.output.directory.is_dir() {
            error!(
                "output.directory {} is not a directory",
                self.output.directory.to_string_lossy()
            );
            contains_error = true;
        }

        let variants = self
            .experiments
            .iter()
            .flat_map(|experiment| experiment.variants().iter().copied())
            .sorted()
            .dedup();

        for variant in variants {
            let Some(exec) = self.benchmarks.get(variant) else {
                error!(
                    "benchmarks.{variant} is required by the selected experiments but only {} benchmarks are configured",
                    self.benchmarks.len()
                );
                contains_error = true;
                continue;
            };

            match check_executable(exec) {
                Ok(true) => {}
                Ok(false) => {
                    error!(
                        "Benchmark {variant} target {} is not executable",
                        exec.to_string_lossy()
                    );
                    contains_error = true;
                }
                Err(e) => {
                    error!(
                        "Failed to find benchmarks.{variant} ({}): {e}",
                        exec.to_string_lossy()
                    );
                    contains_error = true;
                }
            }
        }

        if contains_error {
            Err(ConfigErrors::PreflightFailed)
        } else {
            Ok(())
        }
    }
}

fn default_benchmarks() -> Vec<PathBuf> {
    vec![PathBuf::from("./concurrent"), PathBuf::from("./concurrent-50")]
}

fn default_experiments() -> Vec<Experiment> {
    vec![Experiment::ScalabilityOverhead]
}

fn default_output_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_data_file() -> PathBuf {
    PathBuf::from("experiment_data.json")
}

fn default_time_marker() -> String {
    DEFAULT_TIME_MARKER.to_owned()
}

fn default_array_size_marker() -> String {
    DEFAULT_ARRAY_SIZE_MARKER.to_owned()
}
