use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "cryostar developers",
    version,
    about = "cryostar - a toolkit for cryo-EM particle metadata: STAR file manipulation, symmetry expansion, subparticle generation, and stack preprocessing.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel work.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect, filter, merge, or downgrade STAR particle files.
    Star(StarArgs),
    /// Generate subparticles and symmetry expansions from a particle file.
    Subparticles(SubparticlesArgs),
    /// Normalize particle stacks with relion_preprocess.
    Normalize(NormalizeArgs),
    /// Resolve the metadata files of a cryoSPARC job directory.
    Jobs(JobsArgs),
    /// Render particle positions and orientations as a Chimera BILD file.
    Star2bild(Star2BildArgs),
}

/// Arguments for the `star` subcommand.
#[derive(Args, Debug)]
pub struct StarArgs {
    /// Input STAR file(s); multiple inputs are concatenated.
    #[arg(required = true, value_name = "PATH")]
    pub inputs: Vec<PathBuf>,

    /// Path for the output STAR file.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Keep this class in the output, may be passed multiple times.
    #[arg(long = "class", value_name = "INT")]
    pub classes: Vec<i64>,

    /// Subtract the integer part of the origin shifts from the coordinates.
    #[arg(long)]
    pub recenter: bool,

    /// Write a Relion 2 compatible STAR file.
    #[arg(long, short = 'r')]
    pub relion2: bool,

    /// Remove a column by its tag, may be passed multiple times.
    #[arg(long = "drop-field", value_name = "TAG")]
    pub drop_fields: Vec<String>,

    /// Print a summary of the input instead of writing a file.
    #[arg(long)]
    pub info: bool,
}

/// Arguments for the `subparticles` subcommand.
#[derive(Args, Debug)]
pub struct SubparticlesArgs {
    /// STAR file with source particles.
    #[arg(value_name = "PATH")]
    pub input: PathBuf,

    /// Output file path (and stem for split output files).
    #[arg(value_name = "PATH")]
    pub output: PathBuf,

    /// Angstroms per pixel (calculated from the input by default).
    #[arg(long, alias = "angpix", value_name = "FLOAT")]
    pub apix: Option<f64>,

    /// Particle box size in pixels, used to define the origin only.
    #[arg(long, value_name = "INT")]
    pub boxsize: Option<f64>,

    /// Keep this class in the output, may be passed multiple times.
    #[arg(long = "class", value_name = "INT")]
    pub classes: Vec<i64>,

    /// Distance of the new origin along the symmetry axis (Angstroms).
    #[arg(long, value_name = "FLOAT", default_value_t = 0.0)]
    pub displacement: f64,

    /// Origin coordinates in Angstroms.
    #[arg(long, value_name = "x,y,z")]
    pub origin: Option<String>,

    /// Target coordinates in Angstroms.
    #[arg(long, value_name = "x,y,z")]
    pub target: Option<String>,

    /// Invert the transformation.
    #[arg(long)]
    pub invert: bool,

    /// Additional in-plane rotation of the target in degrees.
    #[arg(long, value_name = "FLOAT", default_value_t = 0.0)]
    pub psi: f64,

    /// Euler angles (ZYZ intrinsic, degrees) to rotate the particles.
    #[arg(long, value_name = "rot,tilt,psi")]
    pub euler: Option<String>,

    /// Transformation matrix (3x3 or 3x4, row-major JSON).
    #[arg(long, value_name = "JSON")]
    pub transform: Option<String>,

    /// Recenter subparticle coordinates by subtracting the X and Y shifts
    /// (e.g. for extraction outside Relion).
    #[arg(long)]
    pub recenter: bool,

    /// Add the Z component of the shifts to the defocus.
    #[arg(long)]
    pub adjust_defocus: bool,

    /// Keep the original view axis after the target transformation.
    #[arg(long)]
    pub shift_only: bool,

    /// Force one output file per symmetry operator.
    #[arg(long)]
    pub skip_join: bool,

    /// Stem for split output files.
    #[arg(long, value_name = "NAME")]
    pub suffix: Option<String>,

    /// Symmetry group for whole-particle expansion or symmetry-derived
    /// subparticles (Relion conventions).
    #[arg(long, value_name = "GROUP")]
    pub sym: Option<String>,

    /// Symmetry (sub)group to eliminate after the target transformation.
    #[arg(long, value_name = "GROUP")]
    pub subgroup: Option<String>,

    /// Point the target rotation at the I1 three-fold axis and eliminate C3.
    #[arg(long = "I1-C3")]
    pub i1_c3: bool,

    /// Point the target rotation at the I1 five-fold axis and eliminate C5.
    #[arg(long = "I1-C5", conflicts_with = "i1_c3")]
    pub i1_c5: bool,

    /// Write Relion 2 compatible STAR file(s).
    #[arg(long, short = 'r')]
    pub relion2: bool,
}

/// Arguments for the `normalize` subcommand.
#[derive(Args, Debug)]
pub struct NormalizeArgs {
    /// Directory containing *.mrcs particle stacks.
    #[arg(value_name = "DIR")]
    pub input_dir: PathBuf,

    /// Directory for the normalized stacks (created if missing).
    #[arg(short, long, value_name = "DIR", default_value = "./picks")]
    pub output_dir: PathBuf,

    /// Background diameter in pixels.
    #[arg(long, required = true, value_name = "INT")]
    pub bg_diameter: u32,

    /// Black dust removal threshold (-1 disables it).
    #[arg(long, value_name = "INT", default_value_t = -1, allow_hyphen_values = true)]
    pub black_dust: i32,

    /// White dust removal threshold (-1 disables it).
    #[arg(long, value_name = "INT", default_value_t = -1, allow_hyphen_values = true)]
    pub white_dust: i32,

    /// Overwrite stacks that already exist in the output directory.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `jobs` subcommand.
#[derive(Args, Debug)]
pub struct JobsArgs {
    /// cryoSPARC job directory (containing job.json).
    #[arg(value_name = "DIR")]
    pub job_dir: PathBuf,

    /// Keep only this split of a particle-sets job, may be passed
    /// multiple times.
    #[arg(long = "sets", value_name = "INT")]
    pub sets: Vec<u32>,
}

/// Arguments for the `star2bild` subcommand.
#[derive(Args, Debug)]
pub struct Star2BildArgs {
    /// Input STAR file.
    #[arg(value_name = "PATH")]
    pub input: PathBuf,

    /// Output BILD file.
    #[arg(value_name = "PATH")]
    pub output: PathBuf,

    /// Angstroms per pixel (calculated from the input by default).
    #[arg(long, alias = "angpix", value_name = "FLOAT")]
    pub apix: Option<f64>,

    /// Marker sphere radius in Angstroms.
    #[arg(long, value_name = "FLOAT", default_value_t = 20.0)]
    pub radius: f64,

    /// View-axis arrow length in Angstroms (2.5 x radius by default).
    #[arg(long, value_name = "FLOAT")]
    pub length: Option<f64>,

    /// Marker color as RGB components in [0, 1].
    #[arg(long, value_name = "r,g,b")]
    pub color: Option<String>,
}
