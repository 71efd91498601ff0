//! Symmetry expansion and subparticle generation.
//!
//! A subparticle run re-expresses every particle in a local frame: a
//! base rotation points the view axis at a site of interest, a shift
//! moves the origin there, and (optionally) every operator of a point
//! group replicates the site across symmetry-related copies.

use super::error::WorkflowError;
use super::progress::ProgressReporter;
use crate::core::geom::{
    IcosahedralVariant, SymmetryGroup, euler_to_rot, find_subgroup_members, vec_to_rot,
};
use crate::core::models::{Label, StarDocument, Table};
use crate::core::particles::{
    TransformOptions, calculate_apix, downgrade_relion2, interleave, recenter, select_classes,
    sync_origins_angst, transform_particles,
};
use nalgebra::{Matrix3, Rotation3, Vector3};
use tracing::{debug, info, warn};

/// Components below this magnitude (in px) of a target offset are treated
/// as exactly centered.
const TARGET_SNAP_PX: f64 = 1.0;

/// Shorthand presets for the two icosahedral local-symmetry axes most
/// often used in practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisPreset {
    /// The I1 three-fold axis; forces subgroup C3.
    I1C3,
    /// The I1 five-fold axis; forces subgroup C5.
    I1C5,
}

impl AxisPreset {
    fn axis(self) -> Vector3<f64> {
        match self {
            AxisPreset::I1C3 => Vector3::new(0.382, 0.0, 1.0),
            AxisPreset::I1C5 => Vector3::new(0.0, 0.618, 1.0),
        }
    }

    fn subgroup(self) -> SymmetryGroup {
        match self {
            AxisPreset::I1C3 => SymmetryGroup::Cyclic(3),
            AxisPreset::I1C5 => SymmetryGroup::Cyclic(5),
        }
    }
}

/// An explicit 3x3 or 3x4 transformation. The translation, when present,
/// is in Angstroms.
#[derive(Debug, Clone, Copy)]
pub struct MatrixTransform {
    pub rotation: Matrix3<f64>,
    pub translation: Option<Vector3<f64>>,
}

#[derive(Debug, Clone, Default)]
pub struct SubparticleOptions {
    /// Pixel size override in Angstroms; calculated from the input when
    /// absent.
    pub apix: Option<f64>,
    /// Box size in pixels; defines the map origin as its center.
    pub boxsize: Option<f64>,
    /// Map origin in Angstroms. Supersedes `boxsize`.
    pub origin: Option<Vector3<f64>>,
    /// Target site in Angstroms. Supersedes `transform`.
    pub target: Option<Vector3<f64>>,
    /// Extra in-plane rotation of the target frame, in degrees.
    pub psi: f64,
    /// ZYZ intrinsic Euler angles in degrees, as an alternative way to
    /// give the base rotation.
    pub euler: Option<[f64; 3]>,
    pub transform: Option<MatrixTransform>,
    /// Distance of the new origin along the symmetry axis, in Angstroms.
    pub displacement: f64,
    pub sym: Option<SymmetryGroup>,
    /// Subgroup whose cosets collapse to a single representative after
    /// the target transformation.
    pub subgroup: Option<SymmetryGroup>,
    pub preset: Option<AxisPreset>,
    /// Keep only these class numbers.
    pub classes: Vec<i64>,
    /// Fold integer origin shifts back into the extraction coordinates.
    pub recenter: bool,
    /// Add the depth component of the shifts to the defocus.
    pub adjust_defocus: bool,
    /// Keep the original view axis; apply shifts only.
    pub shift_only: bool,
    pub invert: bool,
    /// Produce one document per operator instead of a joined table.
    pub split: bool,
    /// Downgrade the output to the legacy single-block layout.
    pub relion2: bool,
}

/// Result of a subparticle run: one joined document, or one document per
/// symmetry operator when splitting is requested.
#[derive(Debug, Clone)]
pub enum SubparticleOutput {
    Joined(StarDocument),
    Split(Vec<StarDocument>),
}

struct BaseFrame {
    rotation: Rotation3<f64>,
    shift_px: Vector3<f64>,
}

pub fn run(
    document: &StarDocument,
    options: &SubparticleOptions,
    reporter: &ProgressReporter,
) -> Result<SubparticleOutput, WorkflowError> {
    let options = validated(options)?;

    reporter.start_phase("Preparing input");
    let particles = document.particles().ok_or(WorkflowError::NoParticles)?;
    if particles.is_empty() {
        return Err(WorkflowError::NoParticles);
    }
    for label in Label::angles() {
        if !particles.has_column(&label) {
            return Err(WorkflowError::MissingAngles);
        }
    }

    let apix = resolve_apix(document, options.apix);
    let origin_px = options
        .origin
        .map(|o| o / apix)
        .or_else(|| options.boxsize.map(|b| Vector3::repeat(b / 2.0)));

    let particles = if options.classes.is_empty() {
        particles.clone()
    } else {
        select_classes(particles, &options.classes)?
    };
    if particles.is_empty() {
        return Err(WorkflowError::NoParticles);
    }
    reporter.finish_phase();

    let frame = base_frame(&options, apix, origin_px);
    info!(
        rotation = ?frame.rotation.matrix(),
        shift_px = ?frame.shift_px,
        "Resolved base transformation."
    );

    let ops = operator_list(&options, &frame)?;
    reporter.start_phase("Expanding particles");
    reporter.start_task(ops.len() as u64);

    let flags = TransformOptions {
        rotate: !options.shift_only,
        invert: options.invert,
        adjust_defocus: options.adjust_defocus,
    };

    let mut expansions: Vec<Table> = Vec::with_capacity(ops.len());
    for (i, op) in ops.iter().enumerate() {
        debug!(index = i, "Applying expansion operator.");
        let mut copy = particles.clone();
        transform_particles(&mut copy, op, &frame.shift_px, apix, &flags)?;
        sync_origins_angst(&mut copy, apix)?;
        if options.recenter {
            recenter(&mut copy, apix)?;
        }
        expansions.push(copy);
        reporter.step();
    }
    reporter.finish_task();
    reporter.finish_phase();

    if options.split {
        let mut documents = Vec::with_capacity(expansions.len());
        for table in expansions {
            documents.push(finish_document(document, table, options.relion2)?);
        }
        return Ok(SubparticleOutput::Split(documents));
    }

    let joined = if expansions.len() > 1 {
        interleave(&expansions)?
    } else {
        expansions
            .into_iter()
            .next()
            .ok_or(WorkflowError::NoParticles)?
    };
    Ok(SubparticleOutput::Joined(finish_document(
        document,
        joined,
        options.relion2,
    )?))
}

/// Applies the option precedence rules and rejects unusable combinations.
fn validated(options: &SubparticleOptions) -> Result<SubparticleOptions, WorkflowError> {
    let mut options = options.clone();

    if let Some(preset) = options.preset {
        match options.sym {
            None | Some(SymmetryGroup::Icosahedral(IcosahedralVariant::I1)) => {}
            Some(_) => return Err(WorkflowError::PresetRequiresI1),
        }
        options.sym = Some(SymmetryGroup::Icosahedral(IcosahedralVariant::I1));
        options.subgroup = Some(preset.subgroup());
    }

    if options.target.is_none()
        && options.sym.is_none()
        && options.transform.is_none()
        && options.euler.is_none()
        && options.displacement == 0.0
    {
        return Err(WorkflowError::NothingToExpand);
    }

    if (options.target.is_some() || options.transform.is_some())
        && options.boxsize.is_none()
        && options.origin.is_none()
    {
        return Err(WorkflowError::MissingOrigin);
    }

    if options.target.is_some() && options.transform.is_some() {
        warn!("A target supersedes an explicit transformation matrix.");
    }
    if options.origin.is_some() && options.boxsize.is_some() {
        warn!("An explicit origin supersedes the box size.");
    }

    // Euler angles are a notation for a matrix transform; the target, when
    // also given, becomes its translation but then takes precedence anyway.
    // Without one the translation is zero, so the shift still picks up the
    // rotated-origin term.
    if let (Some(euler), None) = (options.euler, options.transform) {
        let [rot, tilt, psi] = euler.map(f64::to_radians);
        options.transform = Some(MatrixTransform {
            rotation: *euler_to_rot(rot, tilt, psi).matrix(),
            translation: Some(options.target.unwrap_or_else(Vector3::zeros)),
        });
    }

    Ok(options)
}

fn resolve_apix(document: &StarDocument, requested: Option<f64>) -> f64 {
    let calculated = calculate_apix(document);
    match (requested, calculated) {
        (Some(requested), Some(calculated)) if requested != calculated => {
            warn!(
                requested,
                calculated, "Using the specified pixel size instead of the calculated one."
            );
            requested
        }
        (Some(requested), _) => requested,
        (None, Some(calculated)) => calculated,
        (None, None) => {
            warn!("Could not compute pixel size, defaulting to 1.0 Angstroms per pixel.");
            1.0
        }
    }
}

/// Derives the base rotation and per-copy shift from whichever of the
/// target, matrix, or displacement forms was given.
fn base_frame(
    options: &SubparticleOptions,
    apix: f64,
    origin_px: Option<Vector3<f64>>,
) -> BaseFrame {
    if let Some(preset) = options.preset {
        let rotation = vec_to_rot(&preset.axis());
        let shift_px = match options.target {
            Some(target) => {
                let c = snapped_offset(target / apix, origin_px.unwrap_or_else(Vector3::zeros));
                Vector3::new(0.0, 0.0, -c.norm())
            }
            None => Vector3::new(0.0, 0.0, -options.displacement / apix),
        };
        return BaseFrame { rotation, shift_px };
    }

    if let Some(target) = options.target {
        let c = snapped_offset(target / apix, origin_px.unwrap_or_else(Vector3::zeros));
        let dist = c.norm();
        let axis = c / dist;
        let rotation = euler_to_rot(
            axis.y.atan2(axis.x),
            axis.z.acos(),
            options.psi.to_radians(),
        );
        return BaseFrame {
            rotation,
            shift_px: Vector3::new(0.0, 0.0, -dist),
        };
    }

    if let Some(transform) = options.transform {
        let rotation = Rotation3::from_matrix_unchecked(transform.rotation);
        let shift_px = match transform.translation {
            Some(t) => {
                let origin = origin_px.unwrap_or_else(Vector3::zeros);
                rotation * origin + t / apix - origin
            }
            None => Vector3::zeros(),
        };
        return BaseFrame { rotation, shift_px };
    }

    BaseFrame {
        rotation: Rotation3::identity(),
        shift_px: Vector3::new(0.0, 0.0, -options.displacement / apix),
    }
}

/// Snaps near-zero components of the target offset so a site sitting on
/// an axis stays exactly on it.
fn snapped_offset(target_px: Vector3<f64>, origin_px: Vector3<f64>) -> Vector3<f64> {
    (target_px - origin_px).map(|v| if v.abs() < TARGET_SNAP_PX { 0.0 } else { v })
}

/// One operator per output copy: each symmetry operator composed with the
/// inverse base rotation, reduced to coset representatives when a
/// subgroup is declared.
fn operator_list(
    options: &SubparticleOptions,
    frame: &BaseFrame,
) -> Result<Vec<Rotation3<f64>>, WorkflowError> {
    let r_inv = frame.rotation.inverse();
    let mut ops: Vec<Rotation3<f64>> = match &options.sym {
        Some(sym) => sym.operators().into_iter().map(|op| op * r_inv).collect(),
        None => vec![r_inv],
    };

    if let Some(subgroup) = &options.subgroup {
        let members = find_subgroup_members(&ops, &subgroup.operators());
        info!(operators = members.len(), "Subgroup search reduced the operator list.");
        ops = members.into_iter().map(|k| ops[k]).collect();
    }
    Ok(ops)
}

fn finish_document(
    input: &StarDocument,
    particles: Table,
    relion2: bool,
) -> Result<StarDocument, WorkflowError> {
    let mut document = input.clone();
    document.set_particles(particles);
    if relion2 {
        document = downgrade_relion2(&document)?;
    }
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::DataBlock;

    fn assert_column_approx(table: &Table, label: Label, expected: &[f64]) {
        let actual = table.f64_column(&label).unwrap();
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-4, "{label:?}: {a} != {e}");
        }
    }

    fn particle_document(apix: f64) -> StarDocument {
        let optics = Table::from_columns([
            (Label::OpticsGroup, vec!["1".into()]),
            (Label::ImagePixelSize, vec![format!("{apix}")]),
        ])
        .unwrap();
        let particles = Table::from_columns([
            (Label::AngleRot, vec!["0.0".into(), "10.0".into()]),
            (Label::AngleTilt, vec!["0.0".into(), "20.0".into()]),
            (Label::AnglePsi, vec!["0.0".into(), "30.0".into()]),
            (Label::OriginX, vec!["0.0".into(), "1.0".into()]),
            (Label::OriginY, vec!["0.0".into(), "-1.0".into()]),
            (Label::OpticsGroup, vec!["1".into(), "1".into()]),
        ])
        .unwrap();
        let mut document = StarDocument::from_particles(particles);
        document.blocks.insert(0, DataBlock::with_table("optics", optics));
        document
    }

    #[test]
    fn rejects_an_empty_option_set() {
        let document = particle_document(1.0);
        let options = SubparticleOptions::default();
        let result = run(&document, &options, &ProgressReporter::new());
        assert!(matches!(result, Err(WorkflowError::NothingToExpand)));
    }

    #[test]
    fn target_without_origin_is_rejected() {
        let document = particle_document(1.0);
        let options = SubparticleOptions {
            target: Some(Vector3::new(10.0, 0.0, 0.0)),
            ..Default::default()
        };
        let result = run(&document, &options, &ProgressReporter::new());
        assert!(matches!(result, Err(WorkflowError::MissingOrigin)));
    }

    #[test]
    fn preset_conflicts_with_non_icosahedral_symmetry() {
        let document = particle_document(1.0);
        let options = SubparticleOptions {
            preset: Some(AxisPreset::I1C3),
            sym: Some(SymmetryGroup::Cyclic(2)),
            ..Default::default()
        };
        let result = run(&document, &options, &ProgressReporter::new());
        assert!(matches!(result, Err(WorkflowError::PresetRequiresI1)));
    }

    #[test]
    fn symmetry_expansion_multiplies_row_count() {
        let document = particle_document(1.0);
        let options = SubparticleOptions {
            sym: Some(SymmetryGroup::Cyclic(4)),
            ..Default::default()
        };
        let output = run(&document, &options, &ProgressReporter::new()).unwrap();
        let SubparticleOutput::Joined(result) = output else {
            panic!("expected a joined document");
        };
        assert_eq!(result.particles().unwrap().n_rows(), 8);
    }

    #[test]
    fn interleaving_keeps_copies_of_one_particle_adjacent() {
        let document = particle_document(1.0);
        let options = SubparticleOptions {
            sym: Some(SymmetryGroup::Cyclic(2)),
            ..Default::default()
        };
        let output = run(&document, &options, &ProgressReporter::new()).unwrap();
        let SubparticleOutput::Joined(result) = output else {
            panic!("expected a joined document");
        };
        let rot = result
            .particles()
            .unwrap()
            .f64_column(&Label::AngleRot)
            .unwrap();
        // Rows 0 and 1 are the two copies of the first particle.
        assert!((rot[0] - 0.0).abs() < 1e-9 || (rot[0] - 180.0).abs() < 1e-9);
        assert!((rot[2] - rot[0]).abs() > 1e-9 || (rot[3] - rot[1]).abs() > 1e-9);
    }

    #[test]
    fn split_output_yields_one_document_per_operator() {
        let document = particle_document(1.0);
        let options = SubparticleOptions {
            sym: Some(SymmetryGroup::Dihedral(2)),
            split: true,
            ..Default::default()
        };
        let output = run(&document, &options, &ProgressReporter::new()).unwrap();
        let SubparticleOutput::Split(documents) = output else {
            panic!("expected split documents");
        };
        assert_eq!(documents.len(), 4);
        for doc in &documents {
            assert_eq!(doc.particles().unwrap().n_rows(), 2);
        }
    }

    #[test]
    fn displacement_shifts_untilted_particles_in_depth_only() {
        let document = particle_document(2.0);
        let options = SubparticleOptions {
            displacement: 10.0,
            adjust_defocus: false,
            ..Default::default()
        };
        let output = run(&document, &options, &ProgressReporter::new()).unwrap();
        let SubparticleOutput::Joined(result) = output else {
            panic!("expected a joined document");
        };
        let particles = result.particles().unwrap();
        // An untilted particle's depth shift has no in-plane component.
        assert_column_approx(particles, Label::OriginX, &[0.0, 2.480991]);
        let rot = particles.f64_column(&Label::AngleRot).unwrap();
        assert!((rot[0] - 0.0).abs() < 1e-6);
    }

    #[test]
    fn subgroup_elimination_reduces_the_copies() {
        let document = particle_document(1.0);
        let options = SubparticleOptions {
            sym: Some(SymmetryGroup::Cyclic(6)),
            subgroup: Some(SymmetryGroup::Cyclic(3)),
            ..Default::default()
        };
        let output = run(&document, &options, &ProgressReporter::new()).unwrap();
        let SubparticleOutput::Joined(result) = output else {
            panic!("expected a joined document");
        };
        assert_eq!(result.particles().unwrap().n_rows(), 4);
    }

    #[test]
    fn i1_presets_collapse_redundant_copies() {
        // The local axis of each preset carries its own point symmetry, so
        // only one operator per coset survives: 60/3 and 60/5.
        let document = particle_document(1.0);
        for (preset, copies) in [(AxisPreset::I1C3, 20), (AxisPreset::I1C5, 12)] {
            let options = SubparticleOptions {
                preset: Some(preset),
                displacement: 10.0,
                ..Default::default()
            };
            let output = run(&document, &options, &ProgressReporter::new()).unwrap();
            let SubparticleOutput::Joined(result) = output else {
                panic!("expected a joined document");
            };
            assert_eq!(result.particles().unwrap().n_rows(), 2 * copies);
        }
    }

    #[test]
    fn euler_angles_shift_particles_through_the_rotated_origin() {
        // A 90-degree tilt maps the origin (10, 0, 0) to (0, 0, 10); the
        // untilted particle picks up the difference as an in-plane shift.
        let document = particle_document(1.0);
        let options = SubparticleOptions {
            euler: Some([0.0, 90.0, 0.0]),
            origin: Some(Vector3::new(10.0, 0.0, 0.0)),
            ..Default::default()
        };
        let output = run(&document, &options, &ProgressReporter::new()).unwrap();
        let SubparticleOutput::Joined(result) = output else {
            panic!("expected a joined document");
        };
        let x = result.particles().unwrap().f64_column(&Label::OriginX).unwrap();
        assert!((x[0] - 10.0).abs() < 1e-6, "expected a shifted origin, got {}", x[0]);
    }

    #[test]
    fn relion2_output_uses_the_legacy_block() {
        let document = particle_document(1.0);
        let options = SubparticleOptions {
            sym: Some(SymmetryGroup::Cyclic(2)),
            relion2: true,
            ..Default::default()
        };
        let output = run(&document, &options, &ProgressReporter::new()).unwrap();
        let SubparticleOutput::Joined(result) = output else {
            panic!("expected a joined document");
        };
        assert!(result.optics().is_none());
        assert_eq!(result.blocks.len(), 1);
        assert_eq!(result.blocks[0].name, "");
    }

    #[test]
    fn missing_angles_are_reported_before_any_work() {
        let particles = Table::from_columns([
            (Label::OriginX, vec!["0.0".into()]),
            (Label::OriginY, vec!["0.0".into()]),
        ])
        .unwrap();
        let document = StarDocument::from_legacy_particles(particles);
        let options = SubparticleOptions {
            sym: Some(SymmetryGroup::Cyclic(2)),
            ..Default::default()
        };
        let result = run(&document, &options, &ProgressReporter::new());
        assert!(matches!(result, Err(WorkflowError::MissingAngles)));
    }
}
