//! File formats exchanged with the modeling engine.
//!
//! The engine reads occurrence samples from CSV, prints samples-with-data tables as CSV on
//! its standard output, and reads environmental layers as ESRI ASCII grids. This module
//! provides a trait-based interface for the CSV formats and a header reader for the grids.

pub mod grid;
pub mod samples;
pub mod swd;
pub mod traits;
