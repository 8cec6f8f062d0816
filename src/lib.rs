//! stackir: instruction-tree core for stack bytecode decompilers
//!
//! This library provides the mutable instruction tree a decompiler builds from
//! a flat stack-machine listing, the effect flags cached on every subtree,
//! visitor dispatch over the node variants, and the inlining pass that turns
//! the flat sequence into nested expressions without reordering side effects.

pub mod cli;
pub mod decompiler;
pub mod error;
pub mod il;
pub mod listing;
pub mod transforms;

pub use decompiler::{Decompiler, FunctionReport, InlineConfig};
pub use error::{Error as StackIrError, Result as StackIrResult};

// Re-export commonly used types
pub use il::{Block, IlFunction, InstId, InstructionFlags, OpCode};
pub use listing::Listing;
pub use transforms::{inline_block, inline_function, InlineReport};
