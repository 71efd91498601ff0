use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Job types whose "good" particle output is split across one metafile per
/// class.
const SPLIT_JOBS: [&str; 3] = ["hetero_refine", "homo_abinit", "class_3D"];
/// Job types that split particles into numbered subsets.
const SET_JOBS: [&str; 1] = ["particle_sets"];
/// Metafile name fragments that mark rejected or partial outputs.
const SKIP_MARKERS: [&str; 6] = [
    "excluded",
    "incomplete",
    "remainder",
    "rejected",
    "uncategorized",
    "unused",
];

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Cannot read job description '{path}': {source}", path = path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Cannot parse job description '{path}': {source}", path = path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The subset of a cryoSPARC `job.json` this toolkit needs. Unknown fields
/// are ignored so the reader survives schema additions.
#[derive(Debug, Clone, Deserialize)]
pub struct JobDocument {
    pub uid: String,
    #[serde(rename = "type")]
    pub job_type: String,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub output_results: Vec<OutputResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputResult {
    pub group_name: String,
    #[serde(default)]
    pub metafiles: Vec<String>,
    #[serde(default)]
    pub passthrough: bool,
}

/// The metadata files relevant to one job, grouped the way cryoSPARC
/// splits them: direct outputs versus passthrough copies, particles versus
/// micrographs. Ordered sets keep the output deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    pub particles: BTreeSet<PathBuf>,
    pub particles_passthrough: BTreeSet<PathBuf>,
    pub micrographs: BTreeSet<PathBuf>,
    pub micrographs_passthrough: BTreeSet<PathBuf>,
}

impl FileSet {
    pub fn is_complete(&self) -> bool {
        !self.particles.is_empty()
            && !self.particles_passthrough.is_empty()
            && !self.micrographs.is_empty()
            && !self.micrographs_passthrough.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
            && self.particles_passthrough.is_empty()
            && self.micrographs.is_empty()
            && self.micrographs_passthrough.is_empty()
    }

    fn groups_mut(&mut self) -> [&mut BTreeSet<PathBuf>; 4] {
        [
            &mut self.particles,
            &mut self.particles_passthrough,
            &mut self.micrographs,
            &mut self.micrographs_passthrough,
        ]
    }

    /// Fills each still-empty group from `other`. A group already populated
    /// by a nearer job is never overridden by a more distant parent.
    fn merge_missing_from(&mut self, other: FileSet) {
        let sources = [
            other.particles,
            other.particles_passthrough,
            other.micrographs,
            other.micrographs_passthrough,
        ];
        for (dst, src) in self.groups_mut().into_iter().zip(sources) {
            if dst.is_empty() {
                dst.extend(src);
            }
        }
    }

    /// Drops files that do not exist on disk, warning for each.
    fn prune_missing(&mut self) {
        for group in self.groups_mut() {
            group.retain(|path| {
                let exists = path.exists();
                if !exists {
                    warn!(
                        path = %path.display(),
                        "Referenced metadata file does not exist; dropping it."
                    );
                }
                exists
            });
        }
    }
}

/// Resolves the metadata files describing a cryoSPARC job by walking the
/// job directory and, where outputs are missing, its parent jobs.
#[derive(Debug, Clone)]
pub struct JobParser {
    job_dir: PathBuf,
    /// When set, only these `split_<n>` subsets of a particle-sets job are
    /// collected.
    sets: Option<Vec<u32>>,
}

impl JobParser {
    pub fn new<P: AsRef<Path>>(job_dir: P) -> Self {
        Self {
            job_dir: job_dir.as_ref().to_path_buf(),
            sets: None,
        }
    }

    pub fn with_sets(mut self, sets: Vec<u32>) -> Self {
        self.sets = if sets.is_empty() { None } else { Some(sets) };
        self
    }

    /// Walks the job graph and returns the collected file groups.
    ///
    /// # Errors
    ///
    /// Fails only when the root job's `job.json` cannot be read or parsed;
    /// missing parents merely warn, matching how exporters leave gaps in
    /// old projects.
    pub fn parse(&self) -> Result<FileSet, JobError> {
        let mut visited = BTreeSet::new();
        let root = read_job(&self.job_dir)?;
        Ok(self.collect(&self.job_dir, &root, &mut visited))
    }

    fn collect(&self, job_dir: &Path, job: &JobDocument, visited: &mut BTreeSet<String>) -> FileSet {
        visited.insert(job.uid.clone());
        let mut files = self.classify_outputs(job_dir, job);
        files.prune_missing();

        for parent in &job.parents {
            if files.is_complete() {
                break;
            }
            if visited.contains(parent) {
                continue;
            }
            let parent_dir = job_dir.parent().map(|p| p.join(parent));
            let Some(parent_dir) = parent_dir else { break };
            match read_job(&parent_dir) {
                Ok(parent_job) => {
                    let parent_files = self.collect(&parent_dir, &parent_job, visited);
                    files.merge_missing_from(parent_files);
                }
                Err(e) => {
                    warn!(parent = %parent, error = %e, "Parent job is missing or corrupted.");
                }
            }
        }
        files
    }

    fn classify_outputs(&self, job_dir: &Path, job: &JobDocument) -> FileSet {
        let mut files = FileSet::default();
        let project_dir = job_dir.parent().unwrap_or(job_dir);

        for output in &job.output_results {
            if SPLIT_JOBS.contains(&job.job_type.as_str()) {
                // The good output of a classification is split per class;
                // only the final metafile of each class is current.
                let wanted = (!output.passthrough
                    && output.group_name.contains("particles_class_"))
                    || (output.passthrough && output.group_name == "particles_all_classes");
                if wanted {
                    if let Some(last) = output.metafiles.last() {
                        target_group(&mut files, output.passthrough, true)
                            .insert(project_dir.join(last));
                    }
                }
            } else if SET_JOBS.contains(&job.job_type.as_str()) {
                if let Some(index) = split_index(&output.group_name) {
                    let wanted = match &self.sets {
                        Some(sets) => sets.contains(&index),
                        None => true,
                    };
                    if wanted {
                        if let Some(last) = output.metafiles.last() {
                            target_group(&mut files, output.passthrough, true)
                                .insert(project_dir.join(last));
                        }
                    }
                }
            } else {
                for metafile in &output.metafiles {
                    if SKIP_MARKERS.iter().any(|marker| metafile.contains(marker)) {
                        debug!(metafile = %metafile, "Skipping rejected or partial output.");
                        continue;
                    }
                    let is_particles = metafile.contains("particles");
                    if !is_particles && !metafile.contains("micrographs") {
                        continue;
                    }
                    target_group(&mut files, output.passthrough, is_particles)
                        .insert(project_dir.join(metafile));
                }
            }
        }
        files
    }
}

fn target_group(
    files: &mut FileSet,
    passthrough: bool,
    is_particles: bool,
) -> &mut BTreeSet<PathBuf> {
    match (is_particles, passthrough) {
        (true, false) => &mut files.particles,
        (true, true) => &mut files.particles_passthrough,
        (false, false) => &mut files.micrographs,
        (false, true) => &mut files.micrographs_passthrough,
    }
}

/// Extracts `n` from a `split_<n>` group name.
fn split_index(group_name: &str) -> Option<u32> {
    let rest = group_name.split("split_").nth(1)?;
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

fn read_job(job_dir: &Path) -> Result<JobDocument, JobError> {
    let path = job_dir.join("job.json");
    let file = File::open(&path).map_err(|source| JobError::Unreadable {
        path: path.clone(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|source| JobError::Malformed { path, source })
}
