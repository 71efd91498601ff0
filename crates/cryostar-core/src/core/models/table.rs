use super::label::Label;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Column {0} not found in table")]
    ColumnMissing(Label),
    #[error("Column {label} row {row}: cannot parse '{value}' as {wanted}")]
    CellParse {
        label: Label,
        row: usize,
        value: String,
        wanted: &'static str,
    },
    #[error("Column {label}: expected {expected} values, got {found}")]
    LengthMismatch {
        label: Label,
        expected: usize,
        found: usize,
    },
    #[error("Row has {found} values but the table has {expected} columns")]
    RowWidthMismatch { expected: usize, found: usize },
    #[error("Table schemas differ: {0}")]
    SchemaMismatch(String),
}

/// A single named column of a loop table. Values are kept as text so that
/// fields the library never interprets survive a read/write cycle unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub label: Label,
    pub values: Vec<String>,
}

/// A STAR `loop_` table: an ordered set of equally long columns.
///
/// All mutating methods preserve the rectangularity invariant (every column
/// has the same length) or fail without modifying the table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an empty table with the given column order.
    pub fn from_labels(labels: impl IntoIterator<Item = Label>) -> Self {
        Self {
            columns: labels
                .into_iter()
                .map(|label| Column {
                    label,
                    values: Vec::new(),
                })
                .collect(),
        }
    }

    /// Builds a table from `(label, values)` pairs. All columns must have
    /// the same length.
    pub fn from_columns(
        columns: impl IntoIterator<Item = (Label, Vec<String>)>,
    ) -> Result<Self, TableError> {
        let mut table = Table::new();
        for (label, values) in columns {
            table.insert_column(label, values)?;
        }
        Ok(table)
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.columns.iter().map(|c| &c.label)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn has_column(&self, label: &Label) -> bool {
        self.columns.iter().any(|c| &c.label == label)
    }

    pub fn column(&self, label: &Label) -> Option<&Column> {
        self.columns.iter().find(|c| &c.label == label)
    }

    fn column_mut(&mut self, label: &Label) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| &c.label == label)
    }

    /// Declares a new, empty column. Only valid while the table has no rows;
    /// used by parsers while reading a `loop_` header.
    pub fn declare_column(&mut self, label: Label) -> Result<(), TableError> {
        if self.n_rows() != 0 {
            return Err(TableError::LengthMismatch {
                label,
                expected: self.n_rows(),
                found: 0,
            });
        }
        self.columns.push(Column {
            label,
            values: Vec::new(),
        });
        Ok(())
    }

    /// Inserts a column, replacing any existing column with the same label.
    pub fn insert_column(&mut self, label: Label, values: Vec<String>) -> Result<(), TableError> {
        if !self.columns.is_empty() && values.len() != self.n_rows() {
            return Err(TableError::LengthMismatch {
                label,
                expected: self.n_rows(),
                found: values.len(),
            });
        }
        match self.column_mut(&label) {
            Some(column) => column.values = values,
            None => self.columns.push(Column { label, values }),
        }
        Ok(())
    }

    /// Removes a column if present; returns whether anything was removed.
    pub fn remove_column(&mut self, label: &Label) -> bool {
        let before = self.columns.len();
        self.columns.retain(|c| &c.label != label);
        self.columns.len() != before
    }

    /// Appends one row of raw values, in column order.
    pub fn push_row(&mut self, values: Vec<String>) -> Result<(), TableError> {
        if values.len() != self.columns.len() {
            return Err(TableError::RowWidthMismatch {
                expected: self.columns.len(),
                found: values.len(),
            });
        }
        for (column, value) in self.columns.iter_mut().zip(values) {
            column.values.push(value);
        }
        Ok(())
    }

    pub fn row(&self, index: usize) -> Vec<&str> {
        self.columns
            .iter()
            .map(|c| c.values[index].as_str())
            .collect()
    }

    /// Returns the raw text values of a column.
    pub fn strings(&self, label: &Label) -> Result<&[String], TableError> {
        self.column(label)
            .map(|c| c.values.as_slice())
            .ok_or_else(|| TableError::ColumnMissing(label.clone()))
    }

    /// Parses a column as `f64`, reporting the offending row on failure.
    pub fn f64_column(&self, label: &Label) -> Result<Vec<f64>, TableError> {
        let column = self
            .column(label)
            .ok_or_else(|| TableError::ColumnMissing(label.clone()))?;
        column
            .values
            .iter()
            .enumerate()
            .map(|(row, v)| {
                v.parse::<f64>().map_err(|_| TableError::CellParse {
                    label: label.clone(),
                    row,
                    value: v.clone(),
                    wanted: "float",
                })
            })
            .collect()
    }

    /// Parses a column as `i64`, reporting the offending row on failure.
    pub fn i64_column(&self, label: &Label) -> Result<Vec<i64>, TableError> {
        let column = self
            .column(label)
            .ok_or_else(|| TableError::ColumnMissing(label.clone()))?;
        column
            .values
            .iter()
            .enumerate()
            .map(|(row, v)| {
                v.parse::<i64>().map_err(|_| TableError::CellParse {
                    label: label.clone(),
                    row,
                    value: v.clone(),
                    wanted: "integer",
                })
            })
            .collect()
    }

    /// Writes a numeric column, creating it if absent. Values are rendered
    /// with six decimal places, matching RELION's own output.
    pub fn set_f64_column(&mut self, label: Label, values: &[f64]) -> Result<(), TableError> {
        let rendered = values.iter().map(|v| format!("{:.6}", v)).collect();
        self.insert_column(label, rendered)
    }

    /// Keeps only the rows at `indices` (in the given order).
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                label: c.label.clone(),
                values: indices.iter().map(|&i| c.values[i].clone()).collect(),
            })
            .collect();
        Table { columns }
    }

    /// Appends all rows of `other`. The two tables must carry exactly the
    /// same labels in the same order.
    pub fn append_rows(&mut self, other: &Table) -> Result<(), TableError> {
        if !self.same_schema(other) {
            return Err(TableError::SchemaMismatch(format!(
                "[{}] vs [{}]",
                self.labels().map(Label::tag).collect::<Vec<_>>().join(", "),
                other
                    .labels()
                    .map(Label::tag)
                    .collect::<Vec<_>>()
                    .join(", "),
            )));
        }
        for (dst, src) in self.columns.iter_mut().zip(&other.columns) {
            dst.values.extend(src.values.iter().cloned());
        }
        Ok(())
    }

    pub fn same_schema(&self, other: &Table) -> bool {
        self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(a, b)| a.label == b.label)
    }
}
