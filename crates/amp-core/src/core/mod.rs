//! # Core Module
//!
//! Stateless building blocks shared by the engine and workflow layers.
//!
//! - [`models`] - Layers, occurrence samples and samples-with-data tables
//! - [`io`] - CSV formats exchanged with the engine and ESRI ASCII grid headers
//! - [`workspace`] - Validation of the directory the engine reads from and writes to

pub mod io;
pub mod models;
pub mod workspace;
