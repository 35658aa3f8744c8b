use super::layer::Layer;
use super::sample::Sample;
use crate::core::io::swd::SwdCsv;
use crate::core::io::traits::{CsvError, CsvFile};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum SwdBuildError {
    #[error("Record for '{species}' carries {found} covariate values but {expected} layers are defined")]
    ArityMismatch {
        species: String,
        expected: usize,
        found: usize,
    },
}

/// One sample together with the covariate values extracted at its location, in layer
/// column order.
#[derive(Debug, Clone, PartialEq)]
pub struct SwdRecord {
    pub sample: Sample,
    pub values: Vec<f64>,
}

/// Samples-with-data: occurrence records annotated with per-layer covariate values.
///
/// The empty table (no layers, no records) is the defined fallback of the extraction
/// pipeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SamplesWithData {
    layers: Vec<String>,
    records: Vec<SwdRecord>,
}

impl SamplesWithData {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses a samples-with-data CSV as printed by the engine.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self, CsvError> {
        SwdCsv::read_from_path(path)
    }

    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), CsvError> {
        SwdCsv::write_to_path(self, path)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Covariate column names, in order.
    pub fn layer_names(&self) -> &[String] {
        &self.layers
    }

    pub fn records(&self) -> &[SwdRecord] {
        &self.records
    }

    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.records.iter().map(|r| &r.sample)
    }

    /// The value of column `layer` for the record at `index`.
    pub fn value(&self, index: usize, layer: &str) -> Option<f64> {
        let column = self.layers.iter().position(|l| l == layer)?;
        self.records.get(index).map(|r| r.values[column])
    }

    /// Looks up the column of a registered layer by its variable name.
    pub fn value_for(&self, index: usize, layer: &Layer) -> Option<f64> {
        self.value(index, layer.variable())
    }
}

/// Incremental construction of a [`SamplesWithData`]. Starts empty.
#[derive(Debug, Default)]
pub struct SwdBuilder {
    layers: Vec<String>,
    records: Vec<SwdRecord>,
}

impl SwdBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.layers = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn push(&mut self, sample: Sample, values: Vec<f64>) -> Result<(), SwdBuildError> {
        if values.len() != self.layers.len() {
            return Err(SwdBuildError::ArityMismatch {
                species: sample.species,
                expected: self.layers.len(),
                found: values.len(),
            });
        }
        self.records.push(SwdRecord { sample, values });
        Ok(())
    }

    pub fn build(self) -> SamplesWithData {
        SamplesWithData {
            layers: self.layers,
            records: self.records,
        }
    }
}
