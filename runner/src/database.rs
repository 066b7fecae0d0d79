pub mod json;
pub mod transcript;

pub use json::ResultStore;
pub use transcript::Transcript;

use serde::{Deserialize, Serialize};
use std::{fmt, io, path::PathBuf, str::FromStr};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read result store {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Result store {path:?} is not valid JSON")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize result store")]
    Serialize(#[from] serde_json::Error),
    #[error("Failed to write {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid run key '{0}', expected six '/' separated integers")]
    InvalidKey(String),
}

/// Metrics extracted from a single successful benchmark run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunResult {
    /// wall clock time in seconds as reported by the benchmark
    pub time: f64,
    pub array_size: u64,
}

/// Composite identifier of a benchmark invocation, stored as
/// `variant/trial/transactions/threads/tx_length/opacity`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunKey {
    pub variant: usize,
    pub trial: u32,
    pub transactions: u64,
    pub threads: u32,
    pub tx_length: u32,
    pub opacity: u8,
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}/{}",
            self.variant, self.trial, self.transactions, self.threads, self.tx_length, self.opacity
        )
    }
}

impl FromStr for RunKey {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StoreError::InvalidKey(s.to_owned());
        let mut parts = s.split('/');
        let mut next = || parts.next().ok_or_else(invalid);

        let key = Self {
            variant: next()?.parse().map_err(|_| invalid())?,
            trial: next()?.parse().map_err(|_| invalid())?,
            transactions: next()?.parse().map_err(|_| invalid())?,
            threads: next()?.parse().map_err(|_| invalid())?,
            tx_length: next()?.parse().map_err(|_| invalid())?,
            opacity: next()?.parse().map_err(|_| invalid())?,
        };

        if parts.next().is_some() {
            Err(invalid())
        } else {
            Ok(key)
        }
    }
}
