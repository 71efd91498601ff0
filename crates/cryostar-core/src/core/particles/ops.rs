use crate::core::models::document::StarDocument;
use crate::core::models::label::Label;
use crate::core::models::optics::OpticsGroups;
use crate::core::models::table::{Table, TableError};
use itertools::Itertools;
use tracing::debug;

/// Magnification written when downgrading to the legacy per-particle
/// calibration columns; pixel sizes are then expressed through
/// `_rlnDetectorPixelSize` alone.
pub const LEGACY_MAGNIFICATION: f64 = 10000.0;

fn first_f64(table: &Table, label: &Label) -> Option<f64> {
    table
        .column(label)
        .and_then(|c| c.values.first())
        .and_then(|v| v.parse().ok())
}

/// Derives the pixel size in Angstroms from a document.
///
/// Prefers `_rlnImagePixelSize` (optics table first, then the particle
/// table); falls back to the legacy pair
/// `10000 × _rlnDetectorPixelSize / _rlnMagnification`. Returns `None`
/// when neither is available.
pub fn calculate_apix(document: &StarDocument) -> Option<f64> {
    if let Some(optics) = document.optics() {
        if let Some(apix) = first_f64(optics, &Label::ImagePixelSize) {
            return Some(apix);
        }
    }
    let particles = document.particles()?;
    if let Some(apix) = first_f64(particles, &Label::ImagePixelSize) {
        return Some(apix);
    }
    let dps = first_f64(particles, &Label::DetectorPixelSize)?;
    let mag = first_f64(particles, &Label::Magnification)?;
    Some(LEGACY_MAGNIFICATION * dps / mag)
}

/// Keeps only particles whose `_rlnClassNumber` is in `classes`.
pub fn select_classes(table: &Table, classes: &[i64]) -> Result<Table, TableError> {
    let wanted: Vec<i64> = classes.iter().copied().unique().collect();
    let column = table.i64_column(&Label::ClassNumber)?;
    let indices: Vec<usize> = column
        .iter()
        .enumerate()
        .filter(|(_, class)| wanted.contains(class))
        .map(|(i, _)| i)
        .collect();
    debug!(
        kept = indices.len(),
        total = column.len(),
        "Selected particles by class."
    );
    Ok(table.select_rows(&indices))
}

/// Materializes pixel-unit origin columns for the in-plane axes: derives
/// them from the Angstrom columns when only those exist, and zero-fills
/// them when the table carries no origins at all.
pub fn ensure_pixel_origins(table: &mut Table, apix: f64) -> Result<(), TableError> {
    for (px, angst) in Label::origins().into_iter().zip(Label::origins_angst()) {
        if table.has_column(&px) {
            continue;
        }
        let values = if table.has_column(&angst) {
            table
                .f64_column(&angst)?
                .into_iter()
                .map(|v| v / apix)
                .collect()
        } else {
            vec![0.0; table.n_rows()]
        };
        table.set_f64_column(px, &values)?;
    }
    Ok(())
}

/// Rewrites the Angstrom origin columns from the pixel columns. Only
/// columns already present are updated; a legacy table without Angstrom
/// origins stays legacy.
pub fn sync_origins_angst(table: &mut Table, apix: f64) -> Result<(), TableError> {
    for (px, angst) in Label::origins().into_iter().zip(Label::origins_angst()) {
        if !table.has_column(&angst) || !table.has_column(&px) {
            continue;
        }
        let values: Vec<f64> = table
            .f64_column(&px)?
            .into_iter()
            .map(|v| v * apix)
            .collect();
        table.set_f64_column(angst, &values)?;
    }
    Ok(())
}

/// Folds the integer part of each origin into the particle coordinates,
/// leaving only sub-pixel shifts behind. Used before re-extraction so the
/// new boxes are cut at the shifted positions.
pub fn recenter(table: &mut Table, apix: f64) -> Result<(), TableError> {
    ensure_pixel_origins(table, apix)?;
    let axes = [
        (Label::CoordinateX, Label::OriginX, Label::OriginXAngst),
        (Label::CoordinateY, Label::OriginY, Label::OriginYAngst),
    ];
    for (coord, origin, _) in &axes {
        if !table.has_column(coord) {
            return Err(TableError::ColumnMissing(coord.clone()));
        }
        let origins = table.f64_column(origin)?;
        let shifts: Vec<f64> = origins.iter().map(|o| o.round()).collect();
        let coords: Vec<f64> = table
            .f64_column(coord)?
            .iter()
            .zip(&shifts)
            .map(|(c, s)| c - s)
            .collect();
        let remainders: Vec<f64> = origins.iter().zip(&shifts).map(|(o, s)| o - s).collect();
        table.set_f64_column(coord.clone(), &coords)?;
        table.set_f64_column(origin.clone(), &remainders)?;
    }
    sync_origins_angst(table, apix)
}

/// Round-robin merge of equally shaped tables, so that the symmetry copies
/// of each source particle end up adjacent in the output.
pub fn interleave(tables: &[Table]) -> Result<Table, TableError> {
    let first = match tables.first() {
        Some(t) => t,
        None => return Ok(Table::new()),
    };
    for table in &tables[1..] {
        if !table.same_schema(first) {
            return Err(TableError::SchemaMismatch(
                "interleaved tables must share a schema".to_string(),
            ));
        }
        if table.n_rows() != first.n_rows() {
            return Err(TableError::SchemaMismatch(format!(
                "interleaved tables must have equal row counts ({} vs {})",
                first.n_rows(),
                table.n_rows()
            )));
        }
    }
    let mut merged = first.select_rows(&[]);
    for (row, table) in (0..first.n_rows()).cartesian_product(tables) {
        let values = table.row(row).into_iter().map(str::to_string).collect();
        merged.push_row(values)?;
    }
    Ok(merged)
}

/// Flattens a RELION ≥3.1 document into a single legacy block readable by
/// RELION 2: optics-group values become per-particle columns, Angstrom
/// origins become pixel origins, and the legacy magnification pair is
/// restored.
pub fn downgrade_relion2(document: &StarDocument) -> Result<StarDocument, TableError> {
    let particles = document
        .particles()
        .ok_or(TableError::ColumnMissing(Label::ImageName))?;
    let mut table = particles.clone();

    if let Some(optics_table) = document.optics() {
        let optics = OpticsGroups::from_table(optics_table)?;
        let groups: Vec<i64> = if table.has_column(&Label::OpticsGroup) {
            table.i64_column(&Label::OpticsGroup)?
        } else {
            vec![1; table.n_rows()]
        };

        for label in optics.data_labels() {
            if label == Label::ImagePixelSize || table.has_column(&label) {
                continue;
            }
            let values: Vec<String> = groups
                .iter()
                .map(|&g| optics.value(&label, g).unwrap_or("0").to_string())
                .collect();
            table.insert_column(label, values)?;
        }

        let apix_per_row: Vec<f64> = groups
            .iter()
            .map(|&g| {
                optics
                    .f64_value(&Label::ImagePixelSize, g)
                    .or_else(|| first_f64(&table, &Label::ImagePixelSize))
                    .unwrap_or(1.0)
            })
            .collect();

        for (px, angst) in Label::origins().into_iter().zip(Label::origins_angst()) {
            if let Some(column) = table.column(&angst) {
                let values: Vec<f64> = column
                    .values
                    .iter()
                    .enumerate()
                    .map(|(row, v)| {
                        v.parse::<f64>().map(|a| a / apix_per_row[row]).map_err(|_| {
                            TableError::CellParse {
                                label: angst.clone(),
                                row,
                                value: v.clone(),
                                wanted: "float",
                            }
                        })
                    })
                    .collect::<Result<_, _>>()?;
                table.set_f64_column(px, &values)?;
                table.remove_column(&angst);
            }
        }

        table.set_f64_column(
            Label::Magnification,
            &vec![LEGACY_MAGNIFICATION; table.n_rows()],
        )?;
        table.set_f64_column(Label::DetectorPixelSize, &apix_per_row)?;
        table.remove_column(&Label::OpticsGroup);
        table.remove_column(&Label::OpticsGroupName);
        table.remove_column(&Label::ImagePixelSize);
    }

    Ok(StarDocument::from_legacy_particles(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::document::DataBlock;

    fn legacy_doc() -> StarDocument {
        let table = Table::from_columns([
            (Label::CoordinateX, vec!["100.0".into(), "200.0".into()]),
            (Label::CoordinateY, vec!["110.0".into(), "210.0".into()]),
            (Label::OriginX, vec!["2.7".into(), "-1.2".into()]),
            (Label::OriginY, vec!["-0.4".into(), "3.5".into()]),
            (Label::ClassNumber, vec!["1".into(), "2".into()]),
            (Label::DetectorPixelSize, vec!["5.0".into(), "5.0".into()]),
            (Label::Magnification, vec!["50000".into(), "50000".into()]),
        ])
        .unwrap();
        StarDocument::from_legacy_particles(table)
    }

    fn modern_doc() -> StarDocument {
        let optics = Table::from_columns([
            (Label::OpticsGroup, vec!["1".into()]),
            (Label::ImagePixelSize, vec!["1.25".into()]),
            (Label::Voltage, vec!["300".into()]),
        ])
        .unwrap();
        let particles = Table::from_columns([
            (Label::CoordinateX, vec!["100.0".into()]),
            (Label::CoordinateY, vec!["120.0".into()]),
            (Label::OriginXAngst, vec!["2.5".into()]),
            (Label::OriginYAngst, vec!["-5.0".into()]),
            (Label::OpticsGroup, vec!["1".into()]),
        ])
        .unwrap();
        StarDocument {
            blocks: vec![
                DataBlock::with_table("optics", optics),
                DataBlock::with_table("particles", particles),
            ],
        }
    }

    #[test]
    fn apix_prefers_optics_then_falls_back_to_legacy_pair() {
        assert_eq!(calculate_apix(&modern_doc()), Some(1.25));
        assert_eq!(calculate_apix(&legacy_doc()), Some(1.0));

        let empty = StarDocument::from_legacy_particles(
            Table::from_columns([(Label::CoordinateX, vec!["1.0".into()])]).unwrap(),
        );
        assert_eq!(calculate_apix(&empty), None);
    }

    #[test]
    fn select_classes_filters_rows() {
        let doc = legacy_doc();
        let selected = select_classes(doc.particles().unwrap(), &[2, 2]).unwrap();
        assert_eq!(selected.n_rows(), 1);
        assert_eq!(
            selected.f64_column(&Label::CoordinateX).unwrap(),
            vec![200.0]
        );
    }

    #[test]
    fn select_classes_requires_the_class_column() {
        let table = Table::from_columns([(Label::CoordinateX, vec!["1.0".into()])]).unwrap();
        assert!(matches!(
            select_classes(&table, &[1]),
            Err(TableError::ColumnMissing(Label::ClassNumber))
        ));
    }

    #[test]
    fn recenter_moves_integer_shifts_into_coordinates() {
        let mut doc = legacy_doc();
        recenter(doc.particles_mut().unwrap(), 1.0).unwrap();
        let table = doc.particles().unwrap();
        assert_eq!(
            table.f64_column(&Label::CoordinateX).unwrap(),
            vec![97.0, 201.0]
        );
        let residual = table.f64_column(&Label::OriginX).unwrap();
        assert!((residual[0] - (2.7 - 3.0)).abs() < 1e-9);
        assert!((residual[1] - (-1.2 + 1.0)).abs() < 1e-9);
    }

    #[test]
    fn ensure_pixel_origins_derives_from_angstroms() {
        let mut doc = modern_doc();
        ensure_pixel_origins(doc.particles_mut().unwrap(), 1.25).unwrap();
        let table = doc.particles().unwrap();
        assert_eq!(table.f64_column(&Label::OriginX).unwrap(), vec![2.0]);
        assert_eq!(table.f64_column(&Label::OriginY).unwrap(), vec![-4.0]);
    }

    #[test]
    fn sync_origins_updates_only_existing_angstrom_columns() {
        let mut doc = legacy_doc();
        sync_origins_angst(doc.particles_mut().unwrap(), 1.0).unwrap();
        assert!(!doc.particles().unwrap().has_column(&Label::OriginXAngst));

        let mut modern = modern_doc();
        {
            let table = modern.particles_mut().unwrap();
            ensure_pixel_origins(table, 1.25).unwrap();
            table.set_f64_column(Label::OriginX, &[4.0]).unwrap();
            sync_origins_angst(table, 1.25).unwrap();
        }
        assert_eq!(
            modern
                .particles()
                .unwrap()
                .f64_column(&Label::OriginXAngst)
                .unwrap(),
            vec![5.0]
        );
    }

    #[test]
    fn interleave_round_robins_rows() {
        let a = Table::from_columns([(
            Label::ImageName,
            vec!["a1".into(), "a2".into()],
        )])
        .unwrap();
        let b = Table::from_columns([(
            Label::ImageName,
            vec!["b1".into(), "b2".into()],
        )])
        .unwrap();
        let merged = interleave(&[a, b]).unwrap();
        assert_eq!(
            merged.strings(&Label::ImageName).unwrap(),
            &["a1", "b1", "a2", "b2"]
        );
    }

    #[test]
    fn interleave_rejects_mismatched_tables() {
        let a = Table::from_columns([(Label::ImageName, vec!["a1".into()])]).unwrap();
        let b = Table::from_columns([(Label::MicrographName, vec!["b1".into()])]).unwrap();
        assert!(matches!(
            interleave(&[a, b]),
            Err(TableError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn downgrade_flattens_optics_into_particles() {
        let doc = modern_doc();
        let legacy = downgrade_relion2(&doc).unwrap();
        assert_eq!(legacy.blocks.len(), 1);
        assert_eq!(legacy.blocks[0].name, "");

        let table = legacy.particles().unwrap();
        assert_eq!(table.strings(&Label::Voltage).unwrap(), &["300"]);
        assert_eq!(table.f64_column(&Label::OriginX).unwrap(), vec![2.0]);
        assert_eq!(
            table.f64_column(&Label::Magnification).unwrap(),
            vec![LEGACY_MAGNIFICATION]
        );
        assert_eq!(
            table.f64_column(&Label::DetectorPixelSize).unwrap(),
            vec![1.25]
        );
        assert!(!table.has_column(&Label::OpticsGroup));
        assert!(!table.has_column(&Label::OriginXAngst));
        assert!(!table.has_column(&Label::ImagePixelSize));
    }
}
