use crate::cli::JobsArgs;
use crate::error::Result;
use cryostar::metadata::JobParser;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::warn;

pub fn run(args: JobsArgs) -> Result<()> {
    let files = JobParser::new(&args.job_dir)
        .with_sets(args.sets.clone())
        .parse()?;

    if files.is_empty() {
        warn!(job = %args.job_dir.display(), "No metadata files resolved for this job.");
        return Ok(());
    }

    print_group("Particles", &files.particles);
    print_group("Particles (passthrough)", &files.particles_passthrough);
    print_group("Micrographs", &files.micrographs);
    print_group("Micrographs (passthrough)", &files.micrographs_passthrough);
    Ok(())
}

fn print_group(title: &str, paths: &BTreeSet<PathBuf>) {
    if paths.is_empty() {
        return;
    }
    println!("{title}:");
    for path in paths {
        println!("  {}", path.display());
    }
}
