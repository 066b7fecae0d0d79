use super::{RunKey, RunResult, StoreError};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

/// In memory view of the JSON result file.
///
/// The whole file is read on `load` and rewritten on every `flush`; nothing
/// reaches the disk between two flushes.
#[derive(Debug)]
pub struct ResultStore {
    path: PathBuf,
    // BTreeMap keeps the serialized keys sorted
    records: BTreeMap<String, RunResult>,
}

impl ResultStore {
    /// Load an existing store, the file has to exist (an empty store is `{}`)
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let raw = fs::read_to_string(&path).map_err(|source| StoreError::Read {
            path: path.clone(),
            source,
        })?;
        let records: BTreeMap<String, RunResult> =
            serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
                path: path.clone(),
                source,
            })?;

        for key in records.keys() {
            if key.parse::<RunKey>().is_err() {
                warn!(key = %key, "Result store contains a key that is not a run key, keeping it as is");
            }
        }

        info!(path = ?path, records = records.len(), "Loaded result store");

        Ok(Self { path, records })
    }

    /// Insert or replace the result for `key`, returning the replaced result
    pub fn upsert(&mut self, key: &RunKey, result: RunResult) -> Option<RunResult> {
        let previous = self.records.insert(key.to_string(), result);

        if previous.is_some() {
            debug!(key = %key, "Overwrote existing result");
        }

        previous
    }

    #[cfg(test)]
    pub fn get(&self, key: &RunKey) -> Option<&RunResult> {
        self.records.get(&key.to_string())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrite the whole file with the current records as indented JSON
    pub fn flush(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&self.records)?;

        fs::write(&self.path, json).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;

        info!(path = ?self.path, records = self.records.len(), "Flushed result store");

        Ok(())
    }
}
