//! Transformation passes over an instruction tree
//!
//! This module contains the passes that restructure a function body after
//! translation: stack inlining and constant folding.

pub mod constant_folding;
pub mod inlining;

pub use constant_folding::{fold_constants, ConstantFolder, ConstantFoldingPass};
pub use inlining::{inline_block, inline_function, InlineReport, Inlined, InliningPass};

use crate::error::Result;
use crate::il::IlFunction;

/// Trait for transformation passes
pub trait Transform {
    /// Get the name of this pass
    fn name(&self) -> &'static str;

    /// Run the pass on one function
    fn run(&mut self, func: &mut IlFunction) -> Result<()>;

    /// Check if this pass should run
    fn should_run(&self) -> bool {
        true
    }
}
