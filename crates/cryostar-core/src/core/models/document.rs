use super::label::Label;
use super::table::Table;

/// RELION ≥3.1 block name for the optics-group table.
pub const OPTICS_BLOCK: &str = "optics";
/// RELION ≥3.1 block name for the particle table.
pub const PARTICLES_BLOCK: &str = "particles";

/// One `data_<name>` block: simple `_tag value` pairs, an optional
/// `loop_` table, or both. Legacy files use a single block with an empty
/// name (`data_`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataBlock {
    pub name: String,
    pub pairs: Vec<(Label, String)>,
    pub table: Option<Table>,
}

impl DataBlock {
    pub fn with_table(name: &str, table: Table) -> Self {
        Self {
            name: name.to_string(),
            pairs: Vec::new(),
            table: Some(table),
        }
    }
}

/// A parsed STAR document: an ordered list of data blocks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StarDocument {
    pub blocks: Vec<DataBlock>,
}

impl StarDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a particle table in a modern (`data_particles`) document.
    pub fn from_particles(table: Table) -> Self {
        Self {
            blocks: vec![DataBlock::with_table(PARTICLES_BLOCK, table)],
        }
    }

    /// Wraps a particle table in a legacy single-block document (`data_`).
    pub fn from_legacy_particles(table: Table) -> Self {
        Self {
            blocks: vec![DataBlock::with_table("", table)],
        }
    }

    fn block(&self, name: &str) -> Option<&DataBlock> {
        self.blocks.iter().find(|b| b.name == name)
    }

    /// The particle table: the `data_particles` block when present,
    /// otherwise the first loop block that is not the optics table
    /// (covering legacy single-block files).
    pub fn particles(&self) -> Option<&Table> {
        if let Some(block) = self.block(PARTICLES_BLOCK) {
            return block.table.as_ref();
        }
        self.blocks
            .iter()
            .filter(|b| b.name != OPTICS_BLOCK)
            .find_map(|b| b.table.as_ref())
    }

    pub fn particles_mut(&mut self) -> Option<&mut Table> {
        if self.blocks.iter().any(|b| b.name == PARTICLES_BLOCK) {
            return self
                .blocks
                .iter_mut()
                .find(|b| b.name == PARTICLES_BLOCK)
                .and_then(|b| b.table.as_mut());
        }
        self.blocks
            .iter_mut()
            .filter(|b| b.name != OPTICS_BLOCK)
            .find_map(|b| b.table.as_mut())
    }

    /// The optics-group table, if this is a RELION ≥3.1 document.
    pub fn optics(&self) -> Option<&Table> {
        self.block(OPTICS_BLOCK).and_then(|b| b.table.as_ref())
    }

    /// Replaces the particle table while keeping every other block intact.
    pub fn set_particles(&mut self, table: Table) {
        match self.particles_mut() {
            Some(existing) => *existing = table,
            None => self
                .blocks
                .push(DataBlock::with_table(PARTICLES_BLOCK, table)),
        }
    }
}
