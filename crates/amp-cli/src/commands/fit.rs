use super::file_error;
use crate::cli::FitArgs;
use crate::config::PartialRunConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use maxent_amp::core::models::swd::SamplesWithData;
use maxent_amp::engine::config::{ConfigBuilder, OptionKey};
use maxent_amp::engine::progress::ProgressReporter;
use tracing::{info, warn};

pub fn run(args: FitArgs) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let settings = PartialRunConfig::load(&args.engine)?.merge_with_cli(&args.engine)?;

    let mut config = settings.engine_config()?;
    if let Some(dir) = &args.output_dir {
        config = ConfigBuilder::from_config(&config)?
            .add_option(OptionKey::OutputDirectory, dir.to_string_lossy().as_ref())?
            .build();
    }

    info!("Loading samples with data from {:?}", &args.input);
    let swd = SamplesWithData::from_csv(&args.input).map_err(|e| file_error(&args.input, e))?;

    let service = settings.service();
    service.init_service(&settings.workspace, Some(settings.layers.as_slice()))?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Training a model on {} record(s)...", swd.len());
    let artifact = service.fit_with_progress(&config, &swd, &reporter)?;
    progress_handler.clear();

    println!("✓ Model outputs written to: {}", artifact.output_dir.display());
    println!("  Engine log: {}", artifact.log_path.display());
    if artifact.lambdas.is_empty() {
        warn!("The engine finished without writing a .lambdas file.");
        println!("Warning: no .lambdas file was produced.");
    }
    for lambdas in &artifact.lambdas {
        println!("  Model: {}", lambdas.display());
    }
    Ok(())
}
