use crate::cli::StarArgs;
use crate::error::{CliError, Result};
use cryostar::core::io::{MetadataFile, StarFile};
use cryostar::core::models::{Label, StarDocument, Table};
use cryostar::core::particles::{calculate_apix, downgrade_relion2, recenter, select_classes};
use tracing::{info, warn};

pub fn run(args: StarArgs) -> Result<()> {
    let mut documents = args.inputs.iter().map(StarFile::read_from_path);
    let mut document = documents
        .next()
        .ok_or_else(|| CliError::Argument("At least one input file is required".into()))??;

    for other in documents {
        concatenate(&mut document, &other?)?;
    }

    if !args.classes.is_empty() {
        let particles = require_particles(&document)?;
        let selected = select_classes(particles, &args.classes)?;
        info!(
            kept = selected.n_rows(),
            total = particles.n_rows(),
            "Applied class selection."
        );
        document.set_particles(selected);
    }

    if args.recenter {
        let apix = calculate_apix(&document).unwrap_or_else(|| {
            warn!("Could not compute pixel size, default is 1.0 Angstroms per pixel.");
            1.0
        });
        let particles = document
            .particles_mut()
            .ok_or(CliError::Argument("Input contains no particles".into()))?;
        recenter(particles, apix)?;
    }

    if !args.drop_fields.is_empty() {
        let labels: Vec<Label> = args.drop_fields.iter().map(|t| Label::parse(t)).collect();
        if let Some(particles) = document.particles_mut() {
            for label in labels {
                if !particles.remove_column(&label) {
                    warn!(tag = label.tag(), "Column not present, nothing to drop.");
                }
            }
        }
    }

    if args.relion2 {
        document = downgrade_relion2(&document)?;
    }

    if args.info {
        print_summary(&document);
        return Ok(());
    }

    let output = args.output.ok_or_else(|| {
        CliError::Argument("An output path is required unless --info is given".into())
    })?;
    StarFile::write_to_path(&document, &output)?;
    info!(path = %output.display(), "Wrote STAR file.");
    Ok(())
}

/// Appends the particles of `other` onto `document`; the tables must share
/// a schema.
fn concatenate(document: &mut StarDocument, other: &StarDocument) -> Result<()> {
    let incoming = require_particles(other)?;
    let particles = document
        .particles_mut()
        .ok_or(CliError::Argument("Input contains no particles".into()))?;
    particles.append_rows(incoming)?;
    Ok(())
}

fn require_particles(document: &StarDocument) -> Result<&Table> {
    document
        .particles()
        .ok_or(CliError::Argument("Input contains no particles".into()))
}

fn print_summary(document: &StarDocument) {
    for block in &document.blocks {
        println!("data_{}", block.name);
        for (label, value) in &block.pairs {
            println!("  {} = {}", label.tag(), value);
        }
        if let Some(table) = &block.table {
            println!("  {} rows x {} columns", table.n_rows(), table.n_columns());
            for label in table.labels() {
                println!("    {}", label.tag());
            }
        }
    }
}
