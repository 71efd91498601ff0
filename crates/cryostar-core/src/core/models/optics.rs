use super::label::Label;
use super::table::{Table, TableError};
use std::collections::HashMap;

/// An index over a `data_optics` table, resolving an optics-group number to
/// its row so per-particle lookups are O(1).
#[derive(Debug, Clone)]
pub struct OpticsGroups {
    table: Table,
    rows_by_group: HashMap<i64, usize>,
}

impl OpticsGroups {
    /// Indexes an optics table by its `_rlnOpticsGroup` column. A table
    /// without that column is treated as a single anonymous group `1`,
    /// which some exporters emit.
    pub fn from_table(table: &Table) -> Result<Self, TableError> {
        let rows_by_group = if table.has_column(&Label::OpticsGroup) {
            table
                .i64_column(&Label::OpticsGroup)?
                .into_iter()
                .enumerate()
                .map(|(row, group)| (group, row))
                .collect()
        } else {
            HashMap::from([(1, 0)])
        };
        Ok(Self {
            table: table.clone(),
            rows_by_group,
        })
    }

    pub fn len(&self) -> usize {
        self.rows_by_group.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows_by_group.is_empty()
    }

    /// The raw value of `label` for `group`, if both exist.
    pub fn value(&self, label: &Label, group: i64) -> Option<&str> {
        let &row = self.rows_by_group.get(&group)?;
        self.table.column(label).map(|c| c.values[row].as_str())
    }

    /// The value of `label` for `group` parsed as `f64`.
    pub fn f64_value(&self, label: &Label, group: i64) -> Option<f64> {
        self.value(label, group).and_then(|v| v.parse().ok())
    }

    /// Labels present in the optics table besides the group number and name,
    /// i.e. the ones worth flattening into a legacy particle table.
    pub fn data_labels(&self) -> Vec<Label> {
        self.table
            .labels()
            .filter(|l| !matches!(l, Label::OpticsGroup | Label::OpticsGroupName))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn optics_table() -> Table {
        Table::from_columns([
            (Label::OpticsGroup, vec!["1".into(), "2".into()]),
            (Label::ImagePixelSize, vec!["1.05".into(), "0.85".into()]),
            (Label::Voltage, vec!["300".into(), "200".into()]),
        ])
        .unwrap()
    }

    #[test]
    fn lookup_by_group_number() {
        let optics = OpticsGroups::from_table(&optics_table()).unwrap();
        assert_eq!(optics.len(), 2);
        assert_eq!(optics.f64_value(&Label::ImagePixelSize, 2), Some(0.85));
        assert_eq!(optics.value(&Label::Voltage, 1), Some("300"));
        assert_eq!(optics.f64_value(&Label::ImagePixelSize, 3), None);
    }

    #[test]
    fn missing_group_column_becomes_single_group() {
        let table =
            Table::from_columns([(Label::ImagePixelSize, vec!["1.2".into()])]).unwrap();
        let optics = OpticsGroups::from_table(&table).unwrap();
        assert_eq!(optics.f64_value(&Label::ImagePixelSize, 1), Some(1.2));
    }

    #[test]
    fn data_labels_exclude_group_bookkeeping() {
        let optics = OpticsGroups::from_table(&optics_table()).unwrap();
        let labels = optics.data_labels();
        assert!(labels.contains(&Label::ImagePixelSize));
        assert!(labels.contains(&Label::Voltage));
        assert!(!labels.contains(&Label::OpticsGroup));
    }
}
