use super::IngestorError;
use crate::{config::ConfigErrors, database::RunResult};
use regex::Regex;
use std::str::FromStr;
use tracing::debug;

const FLOAT: &str = r"(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?";
const INTEGER: &str = r"[0-9]+";

/// Extracts a number that directly follows a literal marker, wherever the
/// marker shows up in the output
#[derive(Debug, Clone)]
pub struct Marker {
    marker: String,
    pattern: Regex,
}

impl Marker {
    fn new(marker: &str, number: &str) -> Result<Self, ConfigErrors> {
        let pattern = Regex::new(&format!(r"{}\s*({number})", regex::escape(marker)))?;

        Ok(Self {
            marker: marker.to_owned(),
            pattern,
        })
    }

    pub fn float(marker: &str) -> Result<Self, ConfigErrors> {
        Self::new(marker, FLOAT)
    }

    pub fn integer(marker: &str) -> Result<Self, ConfigErrors> {
        Self::new(marker, INTEGER)
    }

    /// parse the first number following the marker
    pub fn extract<T: FromStr>(&self, output: &str) -> Result<T, IngestorError> {
        let value = self
            .pattern
            .captures(output)
            .and_then(|captures| captures.get(1))
            .ok_or_else(|| IngestorError::MissingMarker {
                marker: self.marker.clone(),
            })?
            .as_str();

        value.parse().map_err(|_| IngestorError::InvalidNumber {
            marker: self.marker.clone(),
            value: value.to_owned(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct MarkerIngestor {
    time: Marker,
    array_size: Marker,
}

impl MarkerIngestor {
    pub fn new(time: &str, array_size: &str) -> Result<Self, ConfigErrors> {
        Ok(Self {
            time: Marker::float(time)?,
            array_size: Marker::integer(array_size)?,
        })
    }

    pub fn ingest(&self, output: &str) -> Result<RunResult, IngestorError> {
        let result = RunResult {
            time: self.time.extract(output)?,
            array_size: self.array_size.extract(output)?,
        };

        debug!(time = result.time, array_size = result.array_size, "Extracted metrics");

        Ok(result)
    }
}
