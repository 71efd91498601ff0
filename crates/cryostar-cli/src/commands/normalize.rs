use crate::cli::NormalizeArgs;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use cryostar::workflows::{NormalizeOptions, Normalizer, ProgressReporter};
use std::fs;
use tracing::{info, warn};

pub fn run(args: NormalizeArgs) -> Result<()> {
    fs::create_dir_all(&args.output_dir)?;
    let normalizer = Normalizer::new(&args.output_dir, args.force)?;

    let options = NormalizeOptions {
        bg_diameter: args.bg_diameter,
        black_dust: args.black_dust,
        white_dust: args.white_dust,
    };

    let progress = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress.callback());
    let report = normalizer.normalize(&args.input_dir, &options, &reporter)?;

    info!(
        processed = report.processed,
        skipped = report.skipped,
        failed = report.failed,
        "Normalization finished."
    );
    println!(
        "Normalized {} stack(s), skipped {}, failed {}.",
        report.processed, report.skipped, report.failed
    );
    if report.failed > 0 {
        warn!("Some stacks failed; re-run with -v for details.");
    }
    if report.failed > 0 && report.processed == 0 && report.skipped == 0 {
        return Err(CliError::Other(anyhow::anyhow!(
            "all {} stack(s) failed to normalize",
            report.failed
        )));
    }
    Ok(())
}
