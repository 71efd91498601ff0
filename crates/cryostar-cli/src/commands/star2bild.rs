use crate::cli::Star2BildArgs;
use crate::error::{CliError, Result};
use crate::utils::parser::parse_color;
use cryostar::core::io::bild::{self, BildOptions};
use cryostar::core::io::{MetadataFile, StarFile};
use cryostar::core::particles::calculate_apix;
use std::fs::File;
use std::io::BufWriter;
use tracing::{info, warn};

pub fn run(args: Star2BildArgs) -> Result<()> {
    let document = StarFile::read_from_path(&args.input)?;
    let particles = document
        .particles()
        .ok_or(CliError::Argument("Input contains no particles".into()))?;

    let apix = args.apix.or_else(|| calculate_apix(&document)).unwrap_or_else(|| {
        warn!("Could not compute pixel size, default is 1.0 Angstroms per pixel.");
        1.0
    });

    let options = BildOptions {
        apix,
        radius: args.radius,
        arrow_length: args.length.unwrap_or(2.5 * args.radius),
        color: args
            .color
            .as_deref()
            .map(parse_color)
            .transpose()
            .map_err(|e| CliError::Argument(e.to_string()))?
            .unwrap_or(BildOptions::default().color),
    };

    let file = File::create(&args.output)?;
    let mut writer = BufWriter::new(file);
    bild::write_markers(particles, &options, &mut writer)?;
    info!(
        particles = particles.n_rows(),
        path = %args.output.display(),
        "Wrote BILD markers."
    );
    Ok(())
}
