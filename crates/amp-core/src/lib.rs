//! # AMP Core Library
//!
//! Coordinates the inputs and outputs of the MaxEnt species distribution modeling engine:
//! a workspace directory, a registry of environmental raster layers, and the translation
//! between in-memory occurrence records and the CSV based command-line protocol the engine
//! speaks.
//!
//! ## Architectural Philosophy
//!
//! - **[`core`]: The Foundation.** Stateless value objects (`Layer`, `Sample`,
//!   `SamplesWithData`), workspace validation, and CSV / raster header I/O.
//!
//! - **[`engine`]: The Collaborators.** Engine configuration (`ConfigBuilder`), the layer
//!   registry, the external process runner, progress reporting and the error taxonomy.
//!
//! - **[`workflows`]: The Procedures.** Samples-with-data extraction, background sampling and
//!   model fitting, each a single `run` entry point.
//!
//! - **[`service`]: The Public API.** [`service::MaxEntService`] owns the workspace and layer
//!   registry and exposes the operations callers use.

pub mod core;
pub mod engine;
pub mod service;
pub mod workflows;
