//! # Workflows Module
//!
//! The procedures the service exposes, each with a single `run` entry point:
//!
//! - [`swd`] - Extracts covariate values at sample locations through the engine
//! - [`background`] - Draws random background points across the extent of a set of grids
//! - [`fit`] - Trains a model from samples with data
//!
//! All of them run the engine through an [`EngineContext`], which carries the runner and the
//! per-invocation policy (timeout, cancellation, scratch file retention).

pub mod background;
pub mod fit;
pub mod swd;

use crate::core::workspace::Workspace;
use crate::engine::runner::{CancellationToken, EngineRunner, Invocation, InvocationKind};
use std::io;
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{info, warn};

pub struct EngineContext<'a> {
    pub workspace: &'a Workspace,
    pub runner: &'a dyn EngineRunner,
    pub timeout: Option<Duration>,
    pub cancel: CancellationToken,
    pub keep_temp_files: bool,
}

impl EngineContext<'_> {
    pub(crate) fn invocation(&self, kind: InvocationKind, argv: Vec<String>) -> Invocation {
        Invocation::new(kind, argv)
            .with_timeout(self.timeout)
            .with_cancellation(self.cancel.clone())
    }

    /// Atomically creates a uniquely named file `<prefix>XXXXXX<suffix>` in `dir`.
    pub(crate) fn scratch_file(dir: &Path, prefix: &str, suffix: &str) -> io::Result<NamedTempFile> {
        tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile_in(dir)
    }

    /// Applies the retention policy to a scratch file: deleted on drop unless retention is on.
    pub(crate) fn release(&self, file: NamedTempFile) {
        if !self.keep_temp_files {
            return;
        }
        match file.keep() {
            Ok((_, path)) => info!("Retained scratch file {:?}", path),
            Err(e) => warn!("Failed to retain scratch file: {}", e),
        }
    }
}
