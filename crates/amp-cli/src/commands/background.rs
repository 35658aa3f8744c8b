use super::{require_layers, write_swd};
use crate::cli::BackgroundArgs;
use crate::config::PartialRunConfig;
use crate::error::Result;
use tracing::{info, warn};

pub fn run(args: BackgroundArgs) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let settings = PartialRunConfig::load(&args.engine)?.merge_with_cli(&args.engine)?;
    require_layers(&settings)?;
    let config = settings.engine_config()?;

    let service = settings.service();
    service.init_service(&settings.workspace, Some(settings.layers.as_slice()))?;

    println!(
        "Drawing {} background point(s) across {} layer(s)...",
        args.count,
        settings.layers.len()
    );
    let swd = service.get_random_background_data(&config, &settings.layers, args.count)?;

    if swd.is_empty() {
        warn!("Background sampling produced no records; see the log for the cause.");
        println!("Warning: no background records were produced.");
    } else if swd.len() < args.count {
        info!(
            "Drew {} distinct point(s) out of {} requested.",
            swd.len(),
            args.count
        );
    }

    write_swd(&swd, &args.output)?;
    println!(
        "✓ {} background record(s) written to: {}",
        swd.len(),
        args.output.display()
    );
    Ok(())
}
