//! Batch normalization of particle stacks through `relion_preprocess`.
//!
//! Each `*.mrcs` stack in an input directory is piped through the external
//! tool with background normalization and dust removal; stacks whose
//! output already exists are skipped unless overwriting is requested.

use super::error::WorkflowError;
use super::progress::ProgressReporter;
use rayon::prelude::*;
use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, error};

const RELION_PREPROCESS: &str = "relion_preprocess";
const STACK_EXTENSION: &str = "mrcs";

#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions {
    /// Background diameter in pixels; the tool takes its radius.
    pub bg_diameter: u32,
    /// Black dust removal threshold; `-1` disables it.
    pub black_dust: i32,
    /// White dust removal threshold; `-1` disables it.
    pub white_dust: i32,
}

impl NormalizeOptions {
    pub fn new(bg_diameter: u32) -> Self {
        Self {
            bg_diameter,
            black_dust: -1,
            white_dust: -1,
        }
    }
}

/// Per-run accounting; failures are reported per file and never abort the
/// batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum Outcome {
    Processed,
    Skipped,
    Failed,
}

pub struct Normalizer {
    executable: PathBuf,
    output_dir: PathBuf,
    overwrite: bool,
}

impl Normalizer {
    /// Locates `relion_preprocess` on `PATH`.
    pub fn new<P: AsRef<Path>>(output_dir: P, overwrite: bool) -> Result<Self, WorkflowError> {
        let executable = resolve_executable(RELION_PREPROCESS)?;
        Ok(Self::with_executable(executable, output_dir, overwrite))
    }

    /// Uses an explicit executable instead of searching `PATH`.
    pub fn with_executable<P: AsRef<Path>>(
        executable: PathBuf,
        output_dir: P,
        overwrite: bool,
    ) -> Self {
        Self {
            executable,
            output_dir: output_dir.as_ref().to_path_buf(),
            overwrite,
        }
    }

    /// Normalizes every stack in `input_dir` over the current rayon pool.
    pub fn normalize<P: AsRef<Path>>(
        &self,
        input_dir: P,
        options: &NormalizeOptions,
        reporter: &ProgressReporter,
    ) -> Result<NormalizeReport, WorkflowError> {
        let input_dir = input_dir.as_ref();
        let stacks = find_stacks(input_dir)?;
        if stacks.is_empty() {
            return Err(WorkflowError::NoInputStacks {
                dir: input_dir.to_path_buf(),
                extension: STACK_EXTENSION.to_string(),
            });
        }

        reporter.start_task(stacks.len() as u64);

        let report = stacks
            .par_iter()
            .map(|stack| {
                let outcome = self.normalize_stack(stack, options);
                reporter.step();
                outcome
            })
            .fold(NormalizeReport::default, |mut report, outcome| {
                match outcome {
                    Outcome::Processed => report.processed += 1,
                    Outcome::Skipped => report.skipped += 1,
                    Outcome::Failed => report.failed += 1,
                }
                report
            })
            .reduce(NormalizeReport::default, |mut a, b| {
                a.processed += b.processed;
                a.skipped += b.skipped;
                a.failed += b.failed;
                a
            });

        reporter.finish_task();
        Ok(report)
    }

    fn normalize_stack(&self, stack: &Path, options: &NormalizeOptions) -> Outcome {
        let file_name = match stack.file_name() {
            Some(name) => name,
            None => return Outcome::Failed,
        };
        let output = self.output_dir.join(file_name);
        if output.exists() && !self.overwrite {
            debug!(stack = %stack.display(), "Output exists, skipping.");
            return Outcome::Skipped;
        }

        let status = Command::new(&self.executable)
            .arg("--operate_on")
            .arg(stack)
            .arg("--operate_out")
            .arg(&output)
            .arg("--norm")
            .arg("--bg_radius")
            .arg((options.bg_diameter / 2).to_string())
            .arg("--black_dust")
            .arg(options.black_dust.to_string())
            .arg("--white_dust")
            .arg(options.white_dust.to_string())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Outcome::Processed,
            Ok(status) => {
                error!(stack = %stack.display(), %status, "Normalization failed.");
                Outcome::Failed
            }
            Err(e) => {
                error!(stack = %stack.display(), error = %e, "Could not launch normalization.");
                Outcome::Failed
            }
        }
    }
}

/// Searches `PATH` for `name` and returns its full path.
pub fn resolve_executable(name: &str) -> Result<PathBuf, WorkflowError> {
    let paths = env::var_os("PATH").unwrap_or_default();
    env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| WorkflowError::ExecutableNotFound {
            name: name.to_string(),
        })
}

/// The `*.mrcs` stacks directly inside `dir`, in a stable order.
fn find_stacks(dir: &Path) -> Result<Vec<PathBuf>, WorkflowError> {
    let mut stacks: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().is_some_and(|ext| ext == STACK_EXTENSION)
        })
        .collect();
    stacks.sort();
    Ok(stacks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::progress::Progress;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn resolve_executable_finds_a_shell() {
        assert!(resolve_executable("sh").is_ok());
    }

    #[test]
    fn resolve_executable_reports_missing_tools() {
        let result = resolve_executable("no-such-tool-cryostar");
        assert!(matches!(
            result,
            Err(WorkflowError::ExecutableNotFound { .. })
        ));
    }

    #[test]
    fn empty_input_directory_is_an_error() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let normalizer =
            Normalizer::with_executable(PathBuf::from("true"), output.path(), false);
        let result = normalizer.normalize(
            input.path(),
            &NormalizeOptions::new(160),
            &ProgressReporter::new(),
        );
        assert!(matches!(result, Err(WorkflowError::NoInputStacks { .. })));
    }

    #[test]
    fn successful_runs_are_counted_and_reported() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        touch(&input.path().join("a.mrcs"));
        touch(&input.path().join("b.mrcs"));
        touch(&input.path().join("ignored.mrc"));

        let increments = Mutex::new(0u64);
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if matches!(event, Progress::TaskIncrement) {
                *increments.lock().unwrap() += 1;
            }
        }));

        let normalizer =
            Normalizer::with_executable(PathBuf::from("true"), output.path(), false);
        let report = normalizer
            .normalize(input.path(), &NormalizeOptions::new(160), &reporter)
            .unwrap();
        assert_eq!(
            report,
            NormalizeReport {
                processed: 2,
                skipped: 0,
                failed: 0
            }
        );
        drop(reporter);
        assert_eq!(*increments.lock().unwrap(), 2);
    }

    #[test]
    fn existing_outputs_are_skipped_without_overwrite() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        touch(&input.path().join("a.mrcs"));
        touch(&output.path().join("a.mrcs"));

        let normalizer =
            Normalizer::with_executable(PathBuf::from("true"), output.path(), false);
        let report = normalizer
            .normalize(
                input.path(),
                &NormalizeOptions::new(160),
                &ProgressReporter::new(),
            )
            .unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.processed, 0);

        let overwriting =
            Normalizer::with_executable(PathBuf::from("true"), output.path(), true);
        let report = overwriting
            .normalize(
                input.path(),
                &NormalizeOptions::new(160),
                &ProgressReporter::new(),
            )
            .unwrap();
        assert_eq!(report.processed, 1);
    }

    #[test]
    fn failing_runs_are_counted_not_fatal() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        touch(&input.path().join("a.mrcs"));

        let normalizer =
            Normalizer::with_executable(PathBuf::from("false"), output.path(), false);
        let report = normalizer
            .normalize(
                input.path(),
                &NormalizeOptions::new(160),
                &ProgressReporter::new(),
            )
            .unwrap();
        assert_eq!(report.failed, 1);
    }
}
