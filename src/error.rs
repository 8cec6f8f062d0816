use crate::il::{InstId, InstructionFlags, OpCode};
use miette::Diagnostic;
use thiserror::Error;

/// Result type for instruction-tree operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the instruction tree, its passes and the CLI
///
/// The structural variants signal a broken tree invariant: the translator
/// or a node implementation is non-conformant. They are never produced by
/// the shape of the decompiled program itself.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("I/O error: {0}")]
    #[diagnostic(code(stackir::io_error))]
    Io(String),

    #[error("JSON error: {0}")]
    #[diagnostic(code(stackir::json_error))]
    Json(String),

    #[error("Instruction {child} already belongs to {parent} (slot {slot})")]
    #[diagnostic(code(stackir::already_parented))]
    AlreadyParented {
        child: InstId,
        parent: InstId,
        slot: usize,
    },

    #[error("Slot {slot} is out of range for {inst} with {count} children")]
    #[diagnostic(code(stackir::slot_out_of_range))]
    SlotOutOfRange {
        inst: InstId,
        slot: usize,
        count: usize,
    },

    #[error("{opcode} expects {expected} children, got {got}")]
    #[diagnostic(code(stackir::cardinality))]
    Cardinality {
        opcode: OpCode,
        expected: usize,
        got: usize,
    },

    #[error("Attaching {child} under {parent} would create a cycle")]
    #[diagnostic(code(stackir::cyclic_child))]
    CyclicChild { child: InstId, parent: InstId },

    #[error("Instruction {inst} has been released")]
    #[diagnostic(code(stackir::dead_instruction))]
    DeadInstruction { inst: InstId },

    #[error("Instruction {inst} is still attached to {parent}")]
    #[diagnostic(code(stackir::still_attached))]
    StillAttached { inst: InstId, parent: InstId },

    #[error("Instruction {inst} appears more than once in the block")]
    #[diagnostic(code(stackir::duplicate_entry))]
    DuplicateEntry { inst: InstId },

    #[error("Cached flags of {inst} are {cached:?}, recomputed {computed:?}")]
    #[diagnostic(code(stackir::flags_mismatch))]
    FlagsMismatch {
        inst: InstId,
        cached: InstructionFlags,
        computed: InstructionFlags,
    },

    #[error("Listing error at entry {index}: {message}")]
    #[diagnostic(code(stackir::listing_error))]
    Listing { index: usize, message: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(stackir::config_error))]
    Config { message: String },

    #[error("Internal error: {message}")]
    #[diagnostic(code(stackir::internal_error))]
    Internal { message: String },
}

impl Error {
    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Create a listing error for the given entry
    pub fn listing(index: usize, message: impl Into<String>) -> Self {
        Error::Listing {
            index,
            message: message.into(),
        }
    }

    /// Whether this error reports a broken tree invariant
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Error::AlreadyParented { .. }
                | Error::SlotOutOfRange { .. }
                | Error::Cardinality { .. }
                | Error::CyclicChild { .. }
                | Error::DeadInstruction { .. }
                | Error::StillAttached { .. }
                | Error::DuplicateEntry { .. }
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err.to_string())
    }
}
