use super::EngineContext;
use crate::core::io::traits::CsvError;
use crate::core::models::layer::Layer;
use crate::core::models::swd::SamplesWithData;
use crate::engine::config::{Config, ConfigBuilder, ConfigError, OptionKey};
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::runner::InvocationKind;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Debug, Error)]
pub enum FitError {
    #[error("Cannot fit a model without samples")]
    NoSamples,

    #[error("File I/O error for '{path}': {source}")]
    Io { path: String, source: io::Error },

    #[error("Failed to write the training samples: {0}")]
    WriteSamples(#[source] CsvError),

    #[error("Invalid model configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Engine invocation failed: {0}")]
    Engine(#[from] EngineError),
}

/// What a successful fit leaves behind.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifact {
    pub output_dir: PathBuf,
    /// The engine's captured standard output.
    pub log_path: PathBuf,
    /// Trained model coefficient files found in the output directory, sorted.
    pub lambdas: Vec<PathBuf>,
}

/// Trains a model on `swd` with the options of `config`.
///
/// The samples are written as a `presence*.csv` samples-with-data file in the configuration's
/// workspace and handed to the engine as its samples file. Unless the configuration says
/// otherwise, output goes to the workspace and the environmental layers are read from the
/// directory shared by the configuration's layers. The run is non-interactive.
#[instrument(skip_all, name = "fit_workflow", fields(samples = swd.len()))]
pub fn run(
    ctx: &EngineContext,
    config: &Config,
    swd: &SamplesWithData,
    reporter: &ProgressReporter,
) -> Result<ModelArtifact, FitError> {
    if swd.is_empty() {
        return Err(FitError::NoSamples);
    }
    let workspace = config.workspace_dir();
    let io_error = |path: &Path| {
        let path = path.to_string_lossy().to_string();
        move |source| FitError::Io { path, source }
    };

    let presence = EngineContext::scratch_file(workspace, "presence", ".csv")
        .map_err(io_error(workspace))?;
    swd.to_csv(presence.path()).map_err(FitError::WriteSamples)?;

    let mut builder = ConfigBuilder::from_config(config)?
        .add_option(OptionKey::SamplesFile, presence.path().to_string_lossy().as_ref())?
        .default_option(OptionKey::OutputDirectory, workspace.to_string_lossy().as_ref())?;
    if let Some(dir) = shared_layer_dir(config.layers()) {
        builder = builder.default_option(OptionKey::EnvironmentalLayers, dir.to_string_lossy().as_ref())?;
    } else if builder.get_option(OptionKey::EnvironmentalLayers).is_none() {
        warn!("Layers do not share a directory and no environmental layers directory is set.");
    }
    let fit_config = builder
        .add_flag(OptionKey::AutoRun)?
        .default_option(OptionKey::Visible, "false")?
        .default_option(OptionKey::Warnings, "false")?
        .default_option(OptionKey::AskOverwrite, "false")?
        .build();

    let output_dir = PathBuf::from(
        fit_config
            .option(OptionKey::OutputDirectory)
            .unwrap_or_default(),
    );
    fs::create_dir_all(&output_dir).map_err(io_error(&output_dir))?;

    let log = EngineContext::scratch_file(&output_dir, "maxent", ".log")
        .map_err(io_error(&output_dir))?;
    let stdout = log.as_file().try_clone().map_err(io_error(log.path()))?;

    reporter.report(Progress::Message("Fitting model".to_string()));
    let result = ctx
        .runner
        .run(&ctx.invocation(InvocationKind::Fit, fit_config.command_line()), stdout);
    ctx.release(presence);

    let (_, log_path) = log.keep().map_err(|e| FitError::Io {
        path: output_dir.to_string_lossy().to_string(),
        source: e.error,
    })?;
    result?;

    let lambdas = list_lambdas(&output_dir).map_err(io_error(&output_dir))?;
    info!(
        "Model fit finished: {} lambdas file(s) in {:?}.",
        lambdas.len(),
        output_dir
    );
    Ok(ModelArtifact {
        output_dir,
        log_path,
        lambdas,
    })
}

/// The directory holding every layer, when there is exactly one.
fn shared_layer_dir(layers: &[Layer]) -> Option<PathBuf> {
    let mut parents = layers.iter().map(|l| l.path().parent());
    let first = parents.next()??;
    parents
        .all(|p| p == Some(first))
        .then(|| first.to_path_buf())
}

fn list_lambdas(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut lambdas = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "lambdas") {
            lambdas.push(path);
        }
    }
    lambdas.sort();
    Ok(lambdas)
}
