use crate::core::io::samples::SampleCsv;
use crate::core::io::traits::{CsvError, CsvFile};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A single occurrence record: a species observed at a location.
///
/// Serialized as one `species,longitude,latitude` CSV row, the layout the engine expects
/// for its samples file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub species: String,
    pub longitude: f64,
    pub latitude: f64,
}

impl Sample {
    pub fn new(species: impl Into<String>, longitude: f64, latitude: f64) -> Self {
        Self {
            species: species.into(),
            longitude,
            latitude,
        }
    }

    /// Writes `samples` to `path` as a samples file, header included.
    pub fn to_csv<P: AsRef<Path>>(path: P, samples: &[Sample]) -> Result<(), CsvError> {
        SampleCsv::write_to_path(samples, path)
    }

    /// Reads a samples file. Columns are taken by position, so the header names are free.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Sample>, CsvError> {
        SampleCsv::read_from_path(path)
    }
}
