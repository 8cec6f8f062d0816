//! Instruction tree: nodes, effect flags and visitor dispatch

pub mod binary;
pub mod block;
pub mod call;
pub mod combinators;
pub mod display;
pub mod flags;
pub mod instruction;
pub mod opcode;
pub mod verify;
pub mod visitor;

pub use binary::BinaryInstruction;
pub use block::Block;
pub use call::CallInstruction;
pub use display::{InstructionDisplay, TextWriter};
pub use flags::{may_reorder, InstructionFlags};
pub use instruction::{IlFunction, InstId, Instruction, InstructionKind, LocalId, ParentSlot};
pub use opcode::{intrinsic, BinaryOp, OpCode, UnaryOp};
pub use verify::FlagsVerifier;
pub use visitor::{IlVisitor, IlVisitorMut};
