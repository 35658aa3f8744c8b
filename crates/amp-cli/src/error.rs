use maxent_amp::engine::config::ConfigError;
use maxent_amp::service::ServiceError;
use maxent_amp::workflows::swd::SwdError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Samples-with-data extraction failed: {0}")]
    Extraction(#[from] SwdError),

    #[error("Engine option error: {0}")]
    EngineOption(#[from] ConfigError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
