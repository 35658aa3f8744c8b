pub mod background;
pub mod fit;
pub mod swd;

use crate::config::RunSettings;
use crate::error::{CliError, Result};
use maxent_amp::core::io::traits::CsvError;
use maxent_amp::core::models::swd::SamplesWithData;
use std::path::Path;
use tracing::info;

fn file_error(path: &Path, source: CsvError) -> CliError {
    CliError::FileParsing {
        path: path.to_path_buf(),
        source: source.into(),
    }
}

fn require_layers(settings: &RunSettings) -> Result<()> {
    if settings.layers.is_empty() {
        return Err(CliError::Config(
            "At least one layer is required either in the config file (`workspace.layers`) or via --layer.".to_string(),
        ));
    }
    Ok(())
}

fn write_swd(swd: &SamplesWithData, output: &Path) -> Result<()> {
    info!("Writing {} record(s) to {:?}", swd.len(), output);
    swd.to_csv(output).map_err(|e| file_error(output, e))
}
