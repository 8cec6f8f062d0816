//! Opcode tags and their intrinsic effect flags

use super::flags::InstructionFlags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::Neg => "neg",
            UnaryOp::Not => "not",
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Ceq,
    Clt,
    Cgt,
}

impl BinaryOp {
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Rem => "rem",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
            BinaryOp::Shl => "shl",
            BinaryOp::Shr => "shr",
            BinaryOp::Ceq => "ceq",
            BinaryOp::Clt => "clt",
            BinaryOp::Cgt => "cgt",
        }
    }

    /// Whether the operator itself can fault
    pub fn may_throw(self) -> bool {
        matches!(self, BinaryOp::Div | BinaryOp::Rem)
    }
}

/// Operation tag of an instruction node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    LdcI4,
    LdLoc,
    Pop,
    Peek,
    Unary(UnaryOp),
    Binary(BinaryOp),
    StLoc,
    Call,
    Return,
}

impl OpCode {
    /// Base effect facts contributed by the operation, independent of children
    pub fn intrinsic(self) -> InstructionFlags {
        match self {
            OpCode::LdcI4 | OpCode::Unary(_) => InstructionFlags::empty(),
            OpCode::LdLoc => InstructionFlags::MAY_READ_STATE,
            OpCode::Pop => InstructionFlags::MAY_POP,
            OpCode::Peek => InstructionFlags::MAY_PEEK,
            OpCode::Binary(op) if op.may_throw() => InstructionFlags::MAY_THROW,
            OpCode::Binary(_) => InstructionFlags::empty(),
            OpCode::StLoc => InstructionFlags::MAY_WRITE_STATE,
            OpCode::Call => {
                InstructionFlags::MAY_READ_STATE
                    | InstructionFlags::MAY_WRITE_STATE
                    | InstructionFlags::MAY_THROW
            }
            OpCode::Return => InstructionFlags::MAY_EXIT,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OpCode::LdcI4 => "ldc.i4",
            OpCode::LdLoc => "ldloc",
            OpCode::Pop => "pop",
            OpCode::Peek => "peek",
            OpCode::Unary(op) => op.name(),
            OpCode::Binary(op) => op.name(),
            OpCode::StLoc => "stloc",
            OpCode::Call => "call",
            OpCode::Return => "ret",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Free-standing form of [`OpCode::intrinsic`]
pub fn intrinsic(opcode: OpCode) -> InstructionFlags {
    opcode.intrinsic()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_division_contributes_may_throw() {
        assert_eq!(
            OpCode::Binary(BinaryOp::Div).intrinsic(),
            InstructionFlags::MAY_THROW
        );
        assert_eq!(
            OpCode::Binary(BinaryOp::Add).intrinsic(),
            InstructionFlags::empty()
        );
    }

    #[test]
    fn test_call_is_a_side_effect() {
        assert!(OpCode::Call.intrinsic().has_side_effect());
        assert!(!OpCode::LdLoc.intrinsic().has_side_effect());
    }

    #[test]
    fn test_opcode_names() {
        assert_eq!(OpCode::LdcI4.to_string(), "ldc.i4");
        assert_eq!(OpCode::Binary(BinaryOp::Mul).to_string(), "mul");
        assert_eq!(OpCode::Return.to_string(), "ret");
    }
}
