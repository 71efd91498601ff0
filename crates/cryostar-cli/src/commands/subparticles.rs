use crate::cli::SubparticlesArgs;
use crate::error::{CliError, Result};
use crate::utils::parser::{parse_matrix, parse_triple, parse_vec3};
use crate::utils::progress::CliProgressHandler;
use cryostar::core::io::{MetadataFile, StarFile};
use cryostar::workflows::subparticles::AxisPreset;
use cryostar::workflows::{ProgressReporter, SubparticleOptions, SubparticleOutput};
use std::path::PathBuf;
use tracing::info;

pub fn run(args: SubparticlesArgs) -> Result<()> {
    let options = build_options(&args)?;
    let document = StarFile::read_from_path(&args.input)?;

    let progress = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress.callback());
    let output = cryostar::workflows::run_subparticles(&document, &options, &reporter)?;

    match output {
        SubparticleOutput::Joined(result) => {
            StarFile::write_to_path(&result, &args.output)?;
            info!(path = %args.output.display(), "Wrote subparticles.");
        }
        SubparticleOutput::Split(documents) => {
            for (i, result) in documents.iter().enumerate() {
                let path = split_path(&args, i);
                StarFile::write_to_path(result, &path)?;
                info!(path = %path.display(), "Wrote subparticle expansion.");
            }
        }
    }
    Ok(())
}

fn build_options(args: &SubparticlesArgs) -> Result<SubparticleOptions> {
    let argument = |e: crate::utils::parser::ParseError| CliError::Argument(e.to_string());

    let preset = match (args.i1_c3, args.i1_c5) {
        (true, _) => Some(AxisPreset::I1C3),
        (_, true) => Some(AxisPreset::I1C5),
        _ => None,
    };

    Ok(SubparticleOptions {
        apix: args.apix,
        boxsize: args.boxsize,
        origin: args
            .origin
            .as_deref()
            .map(parse_vec3)
            .transpose()
            .map_err(argument)?,
        target: args
            .target
            .as_deref()
            .map(parse_vec3)
            .transpose()
            .map_err(argument)?,
        psi: args.psi,
        euler: args
            .euler
            .as_deref()
            .map(parse_triple)
            .transpose()
            .map_err(argument)?,
        transform: args
            .transform
            .as_deref()
            .map(parse_matrix)
            .transpose()
            .map_err(argument)?,
        displacement: args.displacement,
        sym: args
            .sym
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(CliError::Symmetry)?,
        subgroup: args
            .subgroup
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(CliError::Symmetry)?,
        preset,
        classes: args.classes.clone(),
        recenter: args.recenter,
        adjust_defocus: args.adjust_defocus,
        shift_only: args.shift_only,
        invert: args.invert,
        split: args.skip_join || args.suffix.is_some(),
        relion2: args.relion2,
    })
}

/// Output path for the i-th split file: `<stem>_<i>.star` next to the
/// requested output, with `--suffix` overriding the stem.
fn split_path(args: &SubparticlesArgs, index: usize) -> PathBuf {
    let stem = args
        .suffix
        .clone()
        .or_else(|| {
            args.output
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "subparticles".to_string());
    let file = format!("{stem}_{index}.star");
    match args.output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(file),
        _ => PathBuf::from(file),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: SubparticlesArgs,
    }

    fn parse(extra: &[&str]) -> SubparticlesArgs {
        let mut argv = vec!["harness", "in.star", "out/sub.star"];
        argv.extend_from_slice(extra);
        Harness::parse_from(argv).args
    }

    #[test]
    fn presets_and_symmetry_strings_map_to_typed_options() {
        let args = parse(&["--I1-C3", "--displacement", "25"]);
        let options = build_options(&args).unwrap();
        assert_eq!(options.preset, Some(AxisPreset::I1C3));
        assert_eq!(options.displacement, 25.0);
    }

    #[test]
    fn malformed_target_is_an_argument_error() {
        let args = parse(&["--target", "1,2"]);
        assert!(matches!(
            build_options(&args),
            Err(CliError::Argument(_))
        ));
    }

    #[test]
    fn suffix_controls_the_split_file_names() {
        let args = parse(&["--suffix", "vertex"]);
        assert_eq!(split_path(&args, 3), PathBuf::from("out/vertex_3.star"));

        let args = parse(&["--skip-join"]);
        assert_eq!(split_path(&args, 0), PathBuf::from("out/sub_0.star"));
    }
}
