use crate::core::io::traits::MetadataFile;
use crate::core::models::document::{DataBlock, StarDocument};
use crate::core::models::label::Label;
use crate::core::models::table::Table;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StarError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: StarParseErrorKind,
    },
    #[error("Document contains no data blocks")]
    Empty,
}

#[derive(Debug, Error)]
pub enum StarParseErrorKind {
    #[error("'loop_' encountered outside a data block")]
    LoopHeaderOutsideBlock,
    #[error("Data row has {found} values but the loop declares {expected} columns")]
    ColumnCountMismatch { expected: usize, found: usize },
    #[error("Data row encountered outside a loop")]
    DataRowOutsideLoop,
    #[error("Tag line '{tag}' has no value")]
    MissingPairValue { tag: String },
}

enum ParserState {
    /// Before any `data_` header, or between blocks.
    Idle,
    /// Inside a block, reading pairs.
    InBlock,
    /// Collecting `_tag #N` column declarations after a `loop_`.
    LoopHeader(Vec<Label>),
    /// Reading whitespace-split data rows into the loop's table.
    LoopRows(Table),
}

impl ParserState {
    /// Moves a finished loop's table into its block; other states are
    /// left untouched.
    fn close_loop(&mut self, block: &mut Option<DataBlock>) {
        match std::mem::replace(self, ParserState::Idle) {
            ParserState::LoopHeader(labels) => {
                if let Some(block) = block {
                    block.table = Some(Table::from_labels(labels));
                }
            }
            ParserState::LoopRows(table) => {
                if let Some(block) = block {
                    block.table = Some(table);
                }
            }
            other => *self = other,
        }
    }
}

/// The STAR file format used for RELION particle metadata.
///
/// Handles both the legacy single-block layout (`data_` + one loop) and the
/// RELION ≥3.1 layout (`data_optics` + `data_particles`). Comments and the
/// version pragma lines (`# version 30001`) are skipped on input.
pub struct StarFile;

impl MetadataFile for StarFile {
    type Error = StarError;

    fn read_from(reader: &mut impl BufRead) -> Result<StarDocument, Self::Error> {
        let mut document = StarDocument::new();
        let mut block: Option<DataBlock> = None;
        let mut state = ParserState::Idle;

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;
            let trimmed = line.trim();

            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            if let Some(name) = trimmed.strip_prefix("data_") {
                state.close_loop(&mut block);
                if let Some(finished) = block.take() {
                    document.blocks.push(finished);
                }
                block = Some(DataBlock {
                    name: name.to_string(),
                    pairs: Vec::new(),
                    table: None,
                });
                state = ParserState::InBlock;
                continue;
            }

            if trimmed == "loop_" {
                if block.is_none() {
                    return Err(StarError::Parse {
                        line: line_num,
                        kind: StarParseErrorKind::LoopHeaderOutsideBlock,
                    });
                }
                state.close_loop(&mut block);
                state = ParserState::LoopHeader(Vec::new());
                continue;
            }

            if trimmed.starts_with('_') {
                if let ParserState::LoopHeader(labels) = &mut state {
                    // `_rlnTag #N`; the index is informational only.
                    let tag = trimmed.split_whitespace().next().unwrap_or(trimmed);
                    labels.push(Label::parse(tag));
                    continue;
                }
                if matches!(state, ParserState::Idle) {
                    return Err(StarError::Parse {
                        line: line_num,
                        kind: StarParseErrorKind::DataRowOutsideLoop,
                    });
                }
                // A pair line; after loop rows it closes the loop.
                state.close_loop(&mut block);
                let current = block.as_mut().ok_or(StarError::Parse {
                    line: line_num,
                    kind: StarParseErrorKind::DataRowOutsideLoop,
                })?;
                let mut parts = trimmed.splitn(2, char::is_whitespace);
                let tag = parts.next().unwrap_or_default();
                let value = parts.next().map(str::trim).ok_or(StarError::Parse {
                    line: line_num,
                    kind: StarParseErrorKind::MissingPairValue {
                        tag: tag.to_string(),
                    },
                })?;
                current.pairs.push((Label::parse(tag), value.to_string()));
                state = ParserState::InBlock;
                continue;
            }

            // Anything else must be a loop data row.
            match &mut state {
                ParserState::LoopHeader(labels) => {
                    let mut table = Table::from_labels(std::mem::take(labels));
                    push_loop_row(&mut table, trimmed, line_num)?;
                    state = ParserState::LoopRows(table);
                }
                ParserState::LoopRows(table) => {
                    push_loop_row(table, trimmed, line_num)?;
                }
                _ => {
                    return Err(StarError::Parse {
                        line: line_num,
                        kind: StarParseErrorKind::DataRowOutsideLoop,
                    });
                }
            }
        }

        state.close_loop(&mut block);
        if let Some(finished) = block.take() {
            document.blocks.push(finished);
        }
        if document.blocks.is_empty() {
            return Err(StarError::Empty);
        }
        Ok(document)
    }

    fn write_to(document: &StarDocument, writer: &mut impl Write) -> Result<(), Self::Error> {
        for block in &document.blocks {
            writeln!(writer)?;
            writeln!(writer, "data_{}", block.name)?;
            writeln!(writer)?;

            if !block.pairs.is_empty() {
                let tag_width = block
                    .pairs
                    .iter()
                    .map(|(label, _)| label.tag().len())
                    .max()
                    .unwrap_or(0);
                for (label, value) in &block.pairs {
                    writeln!(writer, "{:<tag_width$}  {}", label.tag(), value)?;
                }
                writeln!(writer)?;
            }

            if let Some(table) = &block.table {
                writeln!(writer, "loop_")?;
                for (index, label) in table.labels().enumerate() {
                    writeln!(writer, "{} #{}", label.tag(), index + 1)?;
                }
                let widths: Vec<usize> = table
                    .columns()
                    .iter()
                    .map(|c| c.values.iter().map(String::len).max().unwrap_or(0))
                    .collect();
                for row in 0..table.n_rows() {
                    let mut first = true;
                    for (column, &width) in table.columns().iter().zip(&widths) {
                        if !first {
                            write!(writer, " ")?;
                        }
                        write!(writer, "{:>width$}", column.values[row])?;
                        first = false;
                    }
                    writeln!(writer)?;
                }
                writeln!(writer)?;
            }
        }
        Ok(())
    }
}

fn push_loop_row(table: &mut Table, line: &str, line_num: usize) -> Result<(), StarError> {
    let values: Vec<String> = line.split_whitespace().map(str::to_string).collect();
    let expected = table.n_columns();
    let found = values.len();
    table.push_row(values).map_err(|_| StarError::Parse {
        line: line_num,
        kind: StarParseErrorKind::ColumnCountMismatch { expected, found },
    })
}
