use super::EngineContext;
use crate::core::io::samples::SampleCsv;
use crate::core::io::swd::SwdCsv;
use crate::core::io::traits::{CsvError, CsvFile};
use crate::core::models::layer::Layer;
use crate::core::models::sample::Sample;
use crate::core::models::swd::SamplesWithData;
use crate::engine::config::{Config, ConfigBuilder, ConfigError, OptionKey};
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter, Stage};
use crate::engine::runner::InvocationKind;
use std::io::{self, BufWriter};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Debug, Error)]
pub enum SwdError {
    #[error("Failed to create a scratch file in '{dir}': {source}")]
    Scratch { dir: String, source: io::Error },

    #[error("Failed to write the samples file: {0}")]
    WriteSamples(#[source] CsvError),

    #[error("Failed to configure the extraction: {0}")]
    Config(#[from] ConfigError),

    #[error("Configuration is missing required option '{0}'")]
    MissingOption(OptionKey),

    #[error("Engine invocation failed: {0}")]
    Engine(#[from] EngineError),

    #[error("Failed to parse the engine output: {0}")]
    Parse(#[source] CsvError),
}

/// How an extraction ended. Callers that only want a table use [`SwdOutcome::into_swd`],
/// which collapses both empty cases.
#[derive(Debug)]
pub enum SwdOutcome {
    Extracted(SamplesWithData),
    NoData,
    Failed(SwdError),
}

impl SwdOutcome {
    pub fn into_swd(self) -> SamplesWithData {
        match self {
            SwdOutcome::Extracted(swd) => swd,
            SwdOutcome::NoData | SwdOutcome::Failed(_) => SamplesWithData::empty(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, SwdOutcome::Failed(_))
    }
}

impl From<Result<SamplesWithData, SwdError>> for SwdOutcome {
    fn from(result: Result<SamplesWithData, SwdError>) -> Self {
        match result {
            Ok(swd) if swd.is_empty() => SwdOutcome::NoData,
            Ok(swd) => SwdOutcome::Extracted(swd),
            Err(e) => SwdOutcome::Failed(e),
        }
    }
}

/// Extracts the values of `layers` at each sample location.
///
/// The samples are written to a scratch `samples*.csv` in the workspace, the engine's
/// extraction entry point is invoked with the argument vector built by [`getval_argv`], and
/// its standard output, captured into a scratch `swd*.csv`, is parsed back. Both scratch
/// files are removed on every exit path unless the context retains them.
#[instrument(skip_all, name = "swd_workflow", fields(samples = samples.len(), layers = layers.len()))]
pub fn run(
    ctx: &EngineContext,
    samples: &[Sample],
    layers: &[Layer],
    reporter: &ProgressReporter,
) -> Result<SamplesWithData, SwdError> {
    if samples.is_empty() {
        info!("No samples given, skipping the engine.");
        return Ok(SamplesWithData::empty());
    }

    let dir = ctx.workspace.path();
    let scratch = |prefix: &str| {
        EngineContext::scratch_file(dir, prefix, ".csv").map_err(|source| SwdError::Scratch {
            dir: dir.to_string_lossy().to_string(),
            source,
        })
    };
    let samples_file = scratch("samples")?;
    let swd_file = scratch("swd")?;

    let result = extract(ctx, samples, layers, &samples_file, &swd_file, reporter);

    ctx.release(samples_file);
    ctx.release(swd_file);
    result
}

fn extract(
    ctx: &EngineContext,
    samples: &[Sample],
    layers: &[Layer],
    samples_file: &NamedTempFile,
    swd_file: &NamedTempFile,
    reporter: &ProgressReporter,
) -> Result<SamplesWithData, SwdError> {
    reporter.stage(Stage::WritingInput);
    SampleCsv::write_to(samples, BufWriter::new(samples_file.as_file()))
        .map_err(|e| SwdError::WriteSamples(e.at(samples_file.path())))?;
    debug!("Wrote {} samples to {:?}", samples.len(), samples_file.path());
    reporter.report(Progress::StageFinish);

    reporter.stage(Stage::Configuring);
    let samples_path = samples_file.path().to_string_lossy();
    let config = ConfigBuilder::with_workspace(ctx.workspace.clone())
        .add_option(OptionKey::SamplesFile, samples_path.as_ref())?
        .add_layers(layers)
        .build();
    let argv = getval_argv(&config)?;
    reporter.report(Progress::StageFinish);

    reporter.stage(Stage::Invoking);
    let stdout = swd_file
        .as_file()
        .try_clone()
        .map_err(|e| SwdError::Engine(EngineError::Io(e)))?;
    ctx.runner
        .run(&ctx.invocation(InvocationKind::Getval, argv), stdout)?;
    reporter.report(Progress::StageFinish);

    reporter.stage(Stage::ParsingOutput);
    let swd = SwdCsv::read_from_path(swd_file.path()).map_err(SwdError::Parse)?;
    reporter.report(Progress::StageFinish);

    info!(
        "Extracted {} records over {} layers.",
        swd.len(),
        swd.layer_names().len()
    );
    Ok(swd)
}

/// The extraction argument vector: the samples file followed by every layer path, in the
/// configuration's layer order.
pub fn getval_argv(config: &Config) -> Result<Vec<String>, SwdError> {
    let samples_path = config
        .option(OptionKey::SamplesFile)
        .ok_or(SwdError::MissingOption(OptionKey::SamplesFile))?;

    let mut argv = Vec::with_capacity(config.layers().len() + 1);
    argv.push(samples_path.to_string());
    argv.extend(
        config
            .layers()
            .iter()
            .map(|l| l.path().to_string_lossy().to_string()),
    );
    Ok(argv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::workspace::Workspace;
    use crate::engine::runner::{CancellationToken, EngineRunner, Invocation};
    use std::fs::{self, File};
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Echoes the samples file back with one column per layer holding `latitude * 10`.
    struct EchoEngine {
        seen: Mutex<Vec<Invocation>>,
    }

    impl EchoEngine {
        fn new() -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl EngineRunner for EchoEngine {
        fn run(&self, invocation: &Invocation, mut stdout: File) -> Result<(), EngineError> {
            self.seen.lock().unwrap().push(invocation.clone());
            let samples = SampleCsv::read_from_path(&invocation.argv[0])
                .map_err(|e| EngineError::Failed(e.to_string()))?;
            let layers: Vec<Layer> = invocation.argv[1..].iter().map(Layer::new).collect();

            let mut header = vec!["species".to_string(), "x".into(), "y".into()];
            header.extend(layers.iter().map(|l| l.variable().to_string()));
            writeln!(stdout, "{}", header.join(","))?;
            for s in samples {
                let mut row = vec![s.species.clone(), s.longitude.to_string(), s.latitude.to_string()];
                row.extend(layers.iter().map(|_| (s.latitude * 10.0).to_string()));
                writeln!(stdout, "{}", row.join(","))?;
            }
            Ok(())
        }
    }

    struct BrokenEngine;

    impl EngineRunner for BrokenEngine {
        fn run(&self, _: &Invocation, _: File) -> Result<(), EngineError> {
            Err(EngineError::Failed("engine crashed".to_string()))
        }
    }

    struct GarbageEngine;

    impl EngineRunner for GarbageEngine {
        fn run(&self, _: &Invocation, mut stdout: File) -> Result<(), EngineError> {
            writeln!(stdout, "species,x,y,bio1\nsp,1,2,not-a-number")?;
            Ok(())
        }
    }

    struct SilentEngine;

    impl EngineRunner for SilentEngine {
        fn run(&self, _: &Invocation, _: File) -> Result<(), EngineError> {
            Ok(())
        }
    }

    fn context<'a>(workspace: &'a Workspace, runner: &'a dyn EngineRunner) -> EngineContext<'a> {
        EngineContext {
            workspace,
            runner,
            timeout: None,
            cancel: CancellationToken::new(),
            keep_temp_files: false,
        }
    }

    fn samples() -> Vec<Sample> {
        vec![
            Sample::new("Puma concolor", -122.25, 37.5),
            Sample::new("Puma concolor", -119.5, 36.25),
        ]
    }

    #[test]
    fn argv_is_samples_file_then_layers_in_order() {
        let config = ConfigBuilder::new(".")
            .unwrap()
            .add_option(OptionKey::SamplesFile, "/ws/samples1.csv")
            .unwrap()
            .add_layers(&[Layer::new("/g/bio1.asc"), Layer::new("/g/bio12.asc")])
            .build();
        assert_eq!(
            getval_argv(&config).unwrap(),
            ["/ws/samples1.csv", "/g/bio1.asc", "/g/bio12.asc"]
        );
    }

    #[test]
    fn argv_requires_a_samples_file() {
        let config = ConfigBuilder::new(".").unwrap().build();
        assert!(matches!(
            getval_argv(&config),
            Err(SwdError::MissingOption(OptionKey::SamplesFile))
        ));
    }

    #[test]
    fn extraction_returns_engine_values_and_cleans_up() {
        let dir = tempdir().unwrap();
        let workspace = Workspace::open(dir.path()).unwrap();
        let engine = EchoEngine::new();
        let layers = [Layer::new("/g/bio1.asc"), Layer::new("/g/bio12.asc")];

        let swd = run(&context(&workspace, &engine), &samples(), &layers, &ProgressReporter::new())
            .unwrap();

        assert_eq!(swd.len(), 2);
        assert_eq!(swd.layer_names(), ["bio1", "bio12"]);
        assert_eq!(swd.samples().cloned().collect::<Vec<_>>(), samples());
        assert_eq!(swd.value(1, "bio12"), Some(362.5));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);

        let seen = engine.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].kind, InvocationKind::Getval);
        assert!(seen[0].argv[0].starts_with(&dir.path().join("samples").to_string_lossy().to_string()));
        assert!(seen[0].argv[0].ends_with(".csv"));
        assert_eq!(&seen[0].argv[1..], ["/g/bio1.asc", "/g/bio12.asc"]);
    }

    #[test]
    fn engine_failure_is_reported_and_scratch_files_are_removed() {
        let dir = tempdir().unwrap();
        let workspace = Workspace::open(dir.path()).unwrap();

        let result = run(
            &context(&workspace, &BrokenEngine),
            &samples(),
            &[Layer::new("/g/bio1.asc")],
            &ProgressReporter::new(),
        );

        assert!(matches!(result, Err(SwdError::Engine(_))));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn unparseable_output_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let workspace = Workspace::open(dir.path()).unwrap();

        let result = run(
            &context(&workspace, &GarbageEngine),
            &samples(),
            &[Layer::new("/g/bio1.asc")],
            &ProgressReporter::new(),
        );

        assert!(matches!(result, Err(SwdError::Parse(CsvError::Malformed { .. }))));
    }

    #[test]
    fn retained_scratch_files_follow_the_naming_pattern() {
        let dir = tempdir().unwrap();
        let workspace = Workspace::open(dir.path()).unwrap();
        let engine = EchoEngine::new();
        let mut ctx = context(&workspace, &engine);
        ctx.keep_temp_files = true;

        run(&ctx, &samples(), &[Layer::new("/g/bio1.asc")], &ProgressReporter::new()).unwrap();

        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        assert_eq!(names.len(), 2);
        assert!(names[0].starts_with("samples") && names[0].ends_with(".csv"));
        assert!(names[1].starts_with("swd") && names[1].ends_with(".csv"));
    }

    #[test]
    fn no_samples_skips_the_engine() {
        let dir = tempdir().unwrap();
        let workspace = Workspace::open(dir.path()).unwrap();
        let engine = EchoEngine::new();

        let swd = run(&context(&workspace, &engine), &[], &[], &ProgressReporter::new()).unwrap();

        assert!(swd.is_empty());
        assert!(engine.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn stages_are_reported_in_order() {
        let dir = tempdir().unwrap();
        let workspace = Workspace::open(dir.path()).unwrap();
        let stages = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|p| {
            if let Progress::StageStart { stage } = p {
                stages.lock().unwrap().push(stage);
            }
        }));

        let _ = run(&context(&workspace, &BrokenEngine), &samples(), &[], &reporter);

        assert_eq!(
            *stages.lock().unwrap(),
            [Stage::WritingInput, Stage::Configuring, Stage::Invoking]
        );
    }

    #[test]
    fn outcome_distinguishes_failure_from_no_data() {
        let failed = SwdOutcome::from(Err(SwdError::MissingOption(OptionKey::SamplesFile)));
        assert!(failed.is_failure());
        assert!(failed.into_swd().is_empty());

        let empty = SwdOutcome::from(Ok(SamplesWithData::empty()));
        assert!(matches!(empty, SwdOutcome::NoData));
    }

    #[test]
    fn silent_engine_with_samples_is_no_data() {
        let dir = tempdir().unwrap();
        let workspace = Workspace::open(dir.path()).unwrap();

        let outcome = SwdOutcome::from(run(
            &context(&workspace, &SilentEngine),
            &samples(),
            &[Layer::new("/g/bio1.asc")],
            &ProgressReporter::new(),
        ));

        assert!(matches!(outcome, SwdOutcome::NoData));
    }
}
