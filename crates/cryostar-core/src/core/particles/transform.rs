use super::ops::ensure_pixel_origins;
use crate::core::geom::{euler_to_rot, rot_to_euler};
use crate::core::models::label::Label;
use crate::core::models::table::{Table, TableError};
use nalgebra::{Rotation3, Vector3};

/// Flags controlling how an operator is applied to a particle table.
#[derive(Debug, Clone, Copy)]
pub struct TransformOptions {
    /// Update the Euler angles with the composed orientation. When off,
    /// only the origin shifts (and defocus) are updated and the original
    /// view axis is kept.
    pub rotate: bool,
    /// Apply the inverse of the operator instead.
    pub invert: bool,
    /// Add the depth component of each particle's shift, in Angstroms, to
    /// `_rlnDefocusU` and `_rlnDefocusV`.
    pub adjust_defocus: bool,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            rotate: true,
            invert: false,
            adjust_defocus: false,
        }
    }
}

/// Composes `op` with every particle orientation and shifts the origins by
/// the per-particle image-frame displacement of `shift_px`.
///
/// For each particle with orientation `R` the new orientation is
/// `R · op` (or `R · op⁻¹` with `invert`), and the displacement applied to
/// the origins is `(R · op) · shift_px`: its x/y components land in the
/// pixel origin columns, its z component optionally in the defocus.
pub fn transform_particles(
    table: &mut Table,
    op: &Rotation3<f64>,
    shift_px: &Vector3<f64>,
    apix: f64,
    options: &TransformOptions,
) -> Result<(), TableError> {
    let op_eff = if options.invert { op.inverse() } else { *op };

    let rot = table.f64_column(&Label::AngleRot)?;
    let tilt = table.f64_column(&Label::AngleTilt)?;
    let psi = table.f64_column(&Label::AnglePsi)?;

    ensure_pixel_origins(table, apix)?;
    let mut origin_x = table.f64_column(&Label::OriginX)?;
    let mut origin_y = table.f64_column(&Label::OriginY)?;

    let mut defocus = if options.adjust_defocus {
        Some((
            table.f64_column(&Label::DefocusU)?,
            table.f64_column(&Label::DefocusV)?,
        ))
    } else {
        None
    };

    let mut new_rot = Vec::with_capacity(rot.len());
    let mut new_tilt = Vec::with_capacity(rot.len());
    let mut new_psi = Vec::with_capacity(rot.len());

    for i in 0..rot.len() {
        let r = euler_to_rot(
            rot[i].to_radians(),
            tilt[i].to_radians(),
            psi[i].to_radians(),
        );
        let composed = r * op_eff;
        let delta = composed * shift_px;

        origin_x[i] += delta.x;
        origin_y[i] += delta.y;
        if let Some((du, dv)) = defocus.as_mut() {
            du[i] += delta.z * apix;
            dv[i] += delta.z * apix;
        }

        let (a, b, g) = rot_to_euler(&composed);
        new_rot.push(a.to_degrees());
        new_tilt.push(b.to_degrees());
        new_psi.push(g.to_degrees());
    }

    if options.rotate {
        table.set_f64_column(Label::AngleRot, &new_rot)?;
        table.set_f64_column(Label::AngleTilt, &new_tilt)?;
        table.set_f64_column(Label::AnglePsi, &new_psi)?;
    }
    table.set_f64_column(Label::OriginX, &origin_x)?;
    table.set_f64_column(Label::OriginY, &origin_y)?;
    if let Some((du, dv)) = defocus {
        table.set_f64_column(Label::DefocusU, &du)?;
        table.set_f64_column(Label::DefocusV, &dv)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn table_with_angles(rot: f64, tilt: f64, psi: f64) -> Table {
        Table::from_columns([
            (Label::AngleRot, vec![format!("{rot}")]),
            (Label::AngleTilt, vec![format!("{tilt}")]),
            (Label::AnglePsi, vec![format!("{psi}")]),
            (Label::OriginX, vec!["0.0".into()]),
            (Label::OriginY, vec!["0.0".into()]),
            (Label::DefocusU, vec!["15000.0".into()]),
            (Label::DefocusV, vec!["15200.0".into()]),
        ])
        .unwrap()
    }

    #[test]
    fn identity_op_with_zero_shift_is_a_noop() {
        let mut table = table_with_angles(10.0, 20.0, 30.0);
        let before = table.clone();
        transform_particles(
            &mut table,
            &Rotation3::identity(),
            &Vector3::zeros(),
            1.0,
            &TransformOptions::default(),
        )
        .unwrap();
        let angles_before = before.f64_column(&Label::AngleRot).unwrap();
        let angles_after = table.f64_column(&Label::AngleRot).unwrap();
        assert!((angles_before[0] - angles_after[0]).abs() < 1e-6);
        assert_eq!(table.f64_column(&Label::OriginX).unwrap(), vec![0.0]);
    }

    #[test]
    fn untilted_particle_keeps_depth_shift_out_of_plane() {
        // With all angles zero the composed orientation is the identity,
        // so a pure depth displacement must not move the in-plane origins.
        let mut table = table_with_angles(0.0, 0.0, 0.0);
        transform_particles(
            &mut table,
            &Rotation3::identity(),
            &Vector3::new(0.0, 0.0, -10.0),
            1.5,
            &TransformOptions {
                adjust_defocus: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(table.f64_column(&Label::OriginX).unwrap()[0].abs() < 1e-9);
        assert!(table.f64_column(&Label::OriginY).unwrap()[0].abs() < 1e-9);
        // Depth of -10 px at 1.5 A/px.
        assert!((table.f64_column(&Label::DefocusU).unwrap()[0] - 14985.0).abs() < 1e-6);
        assert!((table.f64_column(&Label::DefocusV).unwrap()[0] - 15185.0).abs() < 1e-6);
    }

    #[test]
    fn tilted_particle_moves_depth_shift_into_plane() {
        // A particle tilted 90 degrees views the map from the side; a map
        // depth displacement becomes an in-plane shift.
        let mut table = table_with_angles(0.0, 90.0, 0.0);
        transform_particles(
            &mut table,
            &Rotation3::identity(),
            &Vector3::new(0.0, 0.0, -10.0),
            1.0,
            &TransformOptions::default(),
        )
        .unwrap();
        let x = table.f64_column(&Label::OriginX).unwrap()[0];
        let y = table.f64_column(&Label::OriginY).unwrap()[0];
        let planar = (x * x + y * y).sqrt();
        assert!((planar - 10.0).abs() < 1e-6);
    }

    #[test]
    fn shift_only_preserves_angles_but_applies_shifts() {
        let mut table = table_with_angles(15.0, 40.0, -25.0);
        let before = table.f64_column(&Label::AngleTilt).unwrap();
        let op = Rotation3::from_axis_angle(&Vector3::z_axis(), PI);
        transform_particles(
            &mut table,
            &op,
            &Vector3::new(3.0, 0.0, 0.0),
            1.0,
            &TransformOptions {
                rotate: false,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(table.f64_column(&Label::AngleTilt).unwrap(), before);
        let x = table.f64_column(&Label::OriginX).unwrap()[0];
        let y = table.f64_column(&Label::OriginY).unwrap()[0];
        assert!((x * x + y * y).sqrt() > 1e-6);
    }

    #[test]
    fn invert_composes_the_inverse_operator() {
        let op = Rotation3::from_axis_angle(&Vector3::z_axis(), 0.7);
        let mut forward = table_with_angles(10.0, 50.0, 5.0);
        transform_particles(
            &mut forward,
            &op,
            &Vector3::zeros(),
            1.0,
            &TransformOptions::default(),
        )
        .unwrap();
        // Applying op then op⁻¹ returns to the start.
        transform_particles(
            &mut forward,
            &op,
            &Vector3::zeros(),
            1.0,
            &TransformOptions {
                invert: true,
                ..Default::default()
            },
        )
        .unwrap();
        let original = table_with_angles(10.0, 50.0, 5.0);
        let a = forward.f64_column(&Label::AngleTilt).unwrap()[0];
        let b = original.f64_column(&Label::AngleTilt).unwrap()[0];
        assert!((a - b).abs() < 1e-6);
        // And the single inverse application differs from the forward one.
        let fwd_rot = transform_result_angle(&table_with_angles(10.0, 50.0, 5.0), &op, false);
        let inv_rot = transform_result_angle(&table_with_angles(10.0, 50.0, 5.0), &op, true);
        assert!((fwd_rot - inv_rot).abs() > 1e-6);
    }

    fn transform_result_angle(table: &Table, op: &Rotation3<f64>, invert: bool) -> f64 {
        let mut t = table.clone();
        transform_particles(
            &mut t,
            op,
            &Vector3::zeros(),
            1.0,
            &TransformOptions {
                invert,
                ..Default::default()
            },
        )
        .unwrap();
        t.f64_column(&Label::AngleRot).unwrap()[0]
    }

    #[test]
    fn adjust_defocus_requires_defocus_columns() {
        let mut table = Table::from_columns([
            (Label::AngleRot, vec!["0.0".into()]),
            (Label::AngleTilt, vec!["0.0".into()]),
            (Label::AnglePsi, vec!["0.0".into()]),
        ])
        .unwrap();
        let result = transform_particles(
            &mut table,
            &Rotation3::identity(),
            &Vector3::zeros(),
            1.0,
            &TransformOptions {
                adjust_defocus: true,
                ..Default::default()
            },
        );
        assert!(matches!(
            result,
            Err(TableError::ColumnMissing(Label::DefocusU))
        ));
    }
}
