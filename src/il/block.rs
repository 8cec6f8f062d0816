//! Top-level instruction sequence
//!
//! A block is the flat list of unattached entries the inlining pass consumes,
//! and the shorter list of nested trees it leaves behind.

use super::instruction::InstId;

/// Ordered sequence of top-level instructions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    /// Instructions in evaluation order
    pub instructions: Vec<InstId>,
}

impl Block {
    /// Create a new block
    pub fn new(instructions: Vec<InstId>) -> Self {
        Self { instructions }
    }

    /// Get instruction at a specific index
    pub fn get_instruction(&self, index: usize) -> Option<InstId> {
        self.instructions.get(index).copied()
    }

    /// Get all instructions
    pub fn instructions(&self) -> &[InstId] {
        &self.instructions
    }

    /// Get the number of instructions in this block
    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    pub fn push(&mut self, inst: InstId) {
        self.instructions.push(inst);
    }
}
