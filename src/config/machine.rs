use super::traits::ConfigSection;
use crate::engines::evaluation::machine::{
    DEFAULT_ALLOCATE_SLACK, DEFAULT_MAX_NESTING, DEFAULT_MAX_CELLS, DEFAULT_STEP_BUDGET,
};
use crate::engines::evaluation::tape::DEFAULT_TAPE_LENGTH;
use crate::engines::generation::codec::DEFAULT_MAX_DEPTH;
use crate::error::SageError;
use crate::types::Word;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    pub tape_length: usize,
    pub blank: i64,
    pub step_budget: u64,
    pub max_cells: usize,
    pub allocate_slack: usize,
    /// Cap on nested bodies and calls during a run.
    pub max_nesting: usize,
    /// Nesting cap applied when decoding genomes.
    pub max_depth: usize,
}

impl MachineConfig {
    pub fn blank_word(&self) -> Word {
        self.blank as Word
    }
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            tape_length: DEFAULT_TAPE_LENGTH,
            blank: 0,
            step_budget: DEFAULT_STEP_BUDGET,
            max_cells: DEFAULT_MAX_CELLS,
            allocate_slack: DEFAULT_ALLOCATE_SLACK,
            max_nesting: DEFAULT_MAX_NESTING,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ConfigSection for MachineConfig {
    fn section_name() -> &'static str {
        "machine"
    }

    fn validate(&self) -> Result<(), SageError> {
        if self.step_budget == 0 {
            return Err(SageError::Configuration(
                "Step budget must be positive".to_string(),
            ));
        }
        if self.tape_length > self.max_cells {
            return Err(SageError::Configuration(format!(
                "Tape length {} exceeds the cell limit {}",
                self.tape_length, self.max_cells
            )));
        }
        if self.max_depth == 0 {
            return Err(SageError::Configuration(
                "Genome depth cap must be at least 1".to_string(),
            ));
        }
        if self.max_nesting == 0 {
            return Err(SageError::Configuration(
                "Nesting limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
