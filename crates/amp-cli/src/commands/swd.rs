use super::{file_error, require_layers, write_swd};
use crate::cli::SwdArgs;
use crate::config::PartialRunConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use maxent_amp::core::models::sample::Sample;
use maxent_amp::core::models::swd::SamplesWithData;
use maxent_amp::engine::progress::ProgressReporter;
use maxent_amp::workflows::swd::SwdOutcome;
use tracing::{info, warn};

pub fn run(args: SwdArgs) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let settings = PartialRunConfig::load(&args.engine)?.merge_with_cli(&args.engine)?;
    require_layers(&settings)?;

    info!("Loading samples from {:?}", &args.samples);
    let samples = Sample::from_csv(&args.samples).map_err(|e| file_error(&args.samples, e))?;

    let service = settings.service();
    service.init_service(&settings.workspace, Some(settings.layers.as_slice()))?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Extracting {} layer(s) at {} sample location(s)...",
        settings.layers.len(),
        samples.len()
    );
    let outcome = service.swd_outcome(&samples, &settings.layers, &reporter)?;
    progress_handler.clear();

    let swd = match outcome {
        SwdOutcome::Extracted(swd) => swd,
        SwdOutcome::NoData => {
            warn!("Extraction produced no records.");
            println!("Warning: {}; writing an empty table.", no_data_reason(samples.len()));
            SamplesWithData::empty()
        }
        SwdOutcome::Failed(e) => return Err(e.into()),
    };

    write_swd(&swd, &args.output)?;
    println!(
        "✓ {} record(s) with data written to: {}",
        swd.len(),
        args.output.display()
    );
    Ok(())
}

fn no_data_reason(sample_count: usize) -> String {
    if sample_count == 0 {
        "the samples file held no records".to_string()
    } else {
        format!("the engine returned no records for {sample_count} sample(s)")
    }
}
