use std::io;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

/// Failures of a single external engine invocation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to start engine '{program}': {source}")]
    Spawn { program: String, source: io::Error },

    #[error("I/O error while running the engine: {0}")]
    Io(#[from] io::Error),

    #[error("Engine exited with {status}: {stderr}")]
    Exit { status: ExitStatus, stderr: String },

    #[error("Engine did not finish within {after:?} and was terminated")]
    TimedOut { after: Duration },

    #[error("Engine invocation was cancelled")]
    Cancelled,

    #[error("Engine failed: {0}")]
    Failed(String),
}
