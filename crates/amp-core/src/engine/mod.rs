//! Stateful collaborators of the workflows: engine configuration, the layer registry, the
//! external process runner, and progress reporting.

pub mod config;
pub mod error;
pub mod progress;
pub mod registry;
pub mod runner;
