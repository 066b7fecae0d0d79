use super::StoreError;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

/// Literal console text of one experiment: series banners, command lines and
/// the raw benchmark output, saved once the experiment is done
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    name: String,
    text: String,
}

impl Transcript {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: String::new(),
        }
    }

    pub fn push_banner(&mut self, banner: &str) {
        self.text.push_str(banner);
        self.text.push('\n');
    }

    pub fn push_run(&mut self, command: &str, output: &str) {
        self.text.push_str(command);
        self.text.push('\n');
        self.text.push_str(output);
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn file_name(&self) -> String {
        format!("{}_stdout.txt", self.name)
    }

    /// Write the transcript into `directory`, replacing an older transcript of the same experiment
    pub fn save(&self, directory: &Path) -> Result<PathBuf, StoreError> {
        let path = directory.join(self.file_name());

        fs::write(&path, self.as_str()).map_err(|source| StoreError::Write {
            path: path.clone(),
            source,
        })?;

        info!(path = ?path, bytes = self.text.len(), "Saved transcript");

        Ok(path)
    }
}
