//! The service facade over the workflows.
//!
//! A [`MaxEntService`] is constructed once with an engine runner, initialized with a
//! workspace and a layer list, and then shared by reference between callers. The registry
//! is published as an immutable snapshot, so re-initialization never disturbs calls already
//! in flight.

use crate::core::io::grid::GridError;
use crate::core::models::layer::Layer;
use crate::core::models::sample::Sample;
use crate::core::models::swd::SamplesWithData;
use crate::core::workspace::{Workspace, WorkspaceError};
use crate::engine::config::Config;
use crate::engine::progress::ProgressReporter;
use crate::engine::registry::LayerRegistry;
use crate::engine::runner::{CancellationToken, EngineRunner};
use crate::workflows::background::{self, BackgroundSampler, ExtentSampler};
use crate::workflows::fit::{self, FitError, ModelArtifact};
use crate::workflows::swd::{self, SwdOutcome};
use crate::workflows::EngineContext;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, instrument};

const DEFAULT_ENGINE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    InvalidWorkspace(#[from] WorkspaceError),

    #[error("Service not initialized")]
    Uninitialized,

    #[error("Background sampling failed: {0}")]
    Background(#[from] GridError),

    #[error("Model fitting failed: {0}")]
    ModelFit(#[from] FitError),
}

/// Per-invocation policy applied to every engine call the service makes.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceOptions {
    /// Upper bound on a single engine run; `None` waits indefinitely.
    pub engine_timeout: Option<Duration>,
    /// Keep the scratch CSV files in the workspace instead of deleting them.
    pub keep_temp_files: bool,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            engine_timeout: Some(DEFAULT_ENGINE_TIMEOUT),
            keep_temp_files: false,
        }
    }
}

pub struct MaxEntService {
    runner: Box<dyn EngineRunner>,
    sampler: Box<dyn BackgroundSampler>,
    options: ServiceOptions,
    cancel: RwLock<CancellationToken>,
    state: RwLock<Option<Arc<LayerRegistry>>>,
}

impl MaxEntService {
    pub fn new(runner: impl EngineRunner + 'static) -> Self {
        Self::with_options(runner, ServiceOptions::default())
    }

    pub fn with_options(runner: impl EngineRunner + 'static, options: ServiceOptions) -> Self {
        Self {
            runner: Box::new(runner),
            sampler: Box::new(ExtentSampler::default()),
            options,
            cancel: RwLock::new(CancellationToken::new()),
            state: RwLock::new(None),
        }
    }

    /// Replaces the background point sampler.
    pub fn with_sampler(mut self, sampler: impl BackgroundSampler + 'static) -> Self {
        self.sampler = Box::new(sampler);
        self
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    /// A token that cancels the engine runs in flight and any started before the next
    /// [`MaxEntService::reset_cancellation`] or [`MaxEntService::init_service`].
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Installs a fresh token so later calls run again after a cancellation. Runs already in
    /// flight keep the token they started with.
    pub fn reset_cancellation(&self) {
        *self.cancel.write().unwrap_or_else(PoisonError::into_inner) = CancellationToken::new();
    }

    /// Registers the workspace directory and the layers.
    ///
    /// Replaces any previous registration wholesale. Nothing changes when validation fails.
    #[instrument(skip_all, fields(workspace = %workspace_path.as_ref().display()))]
    pub fn init_service(
        &self,
        workspace_path: impl AsRef<Path>,
        layers: Option<&[Layer]>,
    ) -> Result<(), ServiceError> {
        let workspace = Workspace::open(workspace_path)?;
        let layers = layers
            .ok_or_else(|| ServiceError::InvalidArgument("Layer list was null".to_string()))?;

        let registry = Arc::new(LayerRegistry::new(workspace, layers));
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Some(registry);
        self.reset_cancellation();
        info!("Service initialized with {} layer(s).", layers.len());
        Ok(())
    }

    /// Drops the registration. Later calls fail until the service is initialized again.
    pub fn teardown(&self) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_initialized(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn registry(&self) -> Result<Arc<LayerRegistry>, ServiceError> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(ServiceError::Uninitialized)
    }

    fn context<'a>(&'a self, registry: &'a LayerRegistry) -> EngineContext<'a> {
        EngineContext {
            workspace: registry.workspace(),
            runner: self.runner.as_ref(),
            timeout: self.options.engine_timeout,
            cancel: self.cancellation_token(),
            keep_temp_files: self.options.keep_temp_files,
        }
    }

    /// Looks up a registered layer by its file name.
    pub fn get_layer(&self, filename: &str) -> Result<Option<Layer>, ServiceError> {
        Ok(self.registry()?.get(filename).cloned())
    }

    pub fn layers(&self) -> Result<Vec<Layer>, ServiceError> {
        Ok(self.registry()?.layers().to_vec())
    }

    pub fn workspace(&self) -> Result<Workspace, ServiceError> {
        Ok(self.registry()?.workspace().clone())
    }

    /// Samples with data for `samples` over `layers`.
    ///
    /// Fails only when the service is not initialized. Every later failure is logged and
    /// yields an empty table; use [`MaxEntService::swd_outcome`] to tell the cases apart.
    pub fn swd(&self, samples: &[Sample], layers: &[Layer]) -> Result<SamplesWithData, ServiceError> {
        let outcome = self.swd_outcome(samples, layers, &ProgressReporter::new())?;
        if let SwdOutcome::Failed(e) = &outcome {
            error!("Samples-with-data extraction failed, returning an empty result: {}", e);
        }
        Ok(outcome.into_swd())
    }

    /// Like [`MaxEntService::swd`], but reports progress and keeps the failure cause.
    pub fn swd_outcome(
        &self,
        samples: &[Sample],
        layers: &[Layer],
        reporter: &ProgressReporter,
    ) -> Result<SwdOutcome, ServiceError> {
        let registry = self.registry()?;
        let ctx = self.context(&registry);
        Ok(SwdOutcome::from(swd::run(&ctx, samples, layers, reporter)))
    }

    /// Draws up to `n` background points across `grids` and attaches their covariate values.
    ///
    /// Unreadable grid headers are an error; a failing extraction yields an empty table as in
    /// [`MaxEntService::swd`].
    pub fn get_random_background_data(
        &self,
        config: &Config,
        grids: &[Layer],
        n: usize,
    ) -> Result<SamplesWithData, ServiceError> {
        self.registry()?;
        let points = background::run(config, grids, n, self.sampler.as_ref())?;
        self.swd(&points, grids)
    }

    /// Trains a model on `swd` with the options of `config`.
    pub fn fit(&self, config: &Config, swd: &SamplesWithData) -> Result<ModelArtifact, ServiceError> {
        self.fit_with_progress(config, swd, &ProgressReporter::new())
    }

    pub fn fit_with_progress(
        &self,
        config: &Config,
        swd: &SamplesWithData,
        reporter: &ProgressReporter,
    ) -> Result<ModelArtifact, ServiceError> {
        let registry = self.registry()?;
        let ctx = self.context(&registry);
        Ok(fit::run(&ctx, config, swd, reporter)?)
    }
}
