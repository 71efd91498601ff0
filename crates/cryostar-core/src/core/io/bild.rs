use crate::core::geom::euler_to_rot;
use crate::core::models::label::Label;
use crate::core::models::table::{Table, TableError};
use std::io::{self, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BildError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Table error: {0}")]
    Table(#[from] TableError),
    #[error("Table has no coordinate columns")]
    NoCoordinates,
}

/// Rendering parameters for a BILD annotation file.
#[derive(Debug, Clone, Copy)]
pub struct BildOptions {
    /// Pixel size in Angstroms, used to place markers in physical units.
    pub apix: f64,
    /// Sphere radius in Angstroms.
    pub radius: f64,
    /// View-axis arrow length in Angstroms.
    pub arrow_length: f64,
    /// Marker color as RGB in [0, 1].
    pub color: [f64; 3],
}

impl Default for BildOptions {
    fn default() -> Self {
        Self {
            apix: 1.0,
            radius: 20.0,
            arrow_length: 50.0,
            color: [0.0, 0.5, 1.0],
        }
    }
}

/// Writes one `.sphere` per particle, in Angstroms, with the origin shifts
/// subtracted from the coordinates. When the table carries Euler angles an
/// `.arrow` along each particle's view axis is added, so orientations can
/// be inspected directly in UCSF Chimera.
pub fn write_markers(
    table: &Table,
    options: &BildOptions,
    writer: &mut impl Write,
) -> Result<(), BildError> {
    if !table.has_column(&Label::CoordinateX) || !table.has_column(&Label::CoordinateY) {
        return Err(BildError::NoCoordinates);
    }

    let positions = positions_angst(table, options.apix)?;
    let axes = view_axes(table)?;

    let [r, g, b] = options.color;
    writeln!(writer, ".color {:.3} {:.3} {:.3}", r, g, b)?;
    for (i, [x, y, z]) in positions.iter().enumerate() {
        writeln!(
            writer,
            ".sphere {:.3} {:.3} {:.3} {:.3}",
            x, y, z, options.radius
        )?;
        if let Some(axes) = &axes {
            let [ax, ay, az] = axes[i];
            writeln!(
                writer,
                ".arrow {:.3} {:.3} {:.3} {:.3} {:.3} {:.3} {:.3}",
                x,
                y,
                z,
                x + ax * options.arrow_length,
                y + ay * options.arrow_length,
                z + az * options.arrow_length,
                options.radius * 0.35,
            )?;
        }
    }
    Ok(())
}

fn positions_angst(table: &Table, apix: f64) -> Result<Vec<[f64; 3]>, BildError> {
    let axis = |coord: Label, px: Label, angst: Label| -> Result<Vec<f64>, BildError> {
        let coords = table.f64_column(&coord)?;
        let shifts_angst = if table.has_column(&angst) {
            table.f64_column(&angst)?
        } else if table.has_column(&px) {
            table.f64_column(&px)?.iter().map(|v| v * apix).collect()
        } else {
            vec![0.0; coords.len()]
        };
        Ok(coords
            .iter()
            .zip(&shifts_angst)
            .map(|(c, s)| c * apix - s)
            .collect())
    };

    let xs = axis(Label::CoordinateX, Label::OriginX, Label::OriginXAngst)?;
    let ys = axis(Label::CoordinateY, Label::OriginY, Label::OriginYAngst)?;
    let zs = if table.has_column(&Label::CoordinateZ) {
        axis(Label::CoordinateZ, Label::OriginZ, Label::OriginZAngst)?
    } else {
        vec![0.0; xs.len()]
    };

    Ok(xs
        .into_iter()
        .zip(ys)
        .zip(zs)
        .map(|((x, y), z)| [x, y, z])
        .collect())
}

fn view_axes(table: &Table) -> Result<Option<Vec<[f64; 3]>>, BildError> {
    if !Label::angles().iter().all(|l| table.has_column(l)) {
        return Ok(None);
    }
    let rot = table.f64_column(&Label::AngleRot)?;
    let tilt = table.f64_column(&Label::AngleTilt)?;
    let psi = table.f64_column(&Label::AnglePsi)?;
    let axes = (0..rot.len())
        .map(|i| {
            let r = euler_to_rot(
                rot[i].to_radians(),
                tilt[i].to_radians(),
                psi[i].to_radians(),
            );
            let m = r.matrix();
            // Third row: the view direction expressed in the map frame.
            [m[(2, 0)], m[(2, 1)], m[(2, 2)]]
        })
        .collect();
    Ok(Some(axes))
}
