//! Binary operator nodes: two owned operands, evaluated left to right

use super::flags::InstructionFlags;
use super::instruction::{IlFunction, InstId, InstructionKind};
use super::opcode::{BinaryOp, OpCode};
use crate::error::Result;
use crate::transforms::inlining::{self, Inlined, InstructionStack};

pub const LEFT: usize = 0;
pub const RIGHT: usize = 1;

/// Borrowed view of a binary node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryInstruction {
    pub op: BinaryOp,
    pub left: InstId,
    pub right: InstId,
}

impl IlFunction {
    pub fn binary(&mut self, op: BinaryOp, left: InstId, right: InstId) -> Result<InstId> {
        self.alloc(InstructionKind::Binary(op), vec![left, right])
    }

    /// Binary node whose operands both come from the evaluation stack
    pub fn binary_pending(&mut self, op: BinaryOp) -> Result<InstId> {
        let left = self.pop()?;
        let right = self.pop()?;
        self.binary(op, left, right)
    }

    pub fn as_binary(&self, inst: InstId) -> Result<Option<BinaryInstruction>> {
        let node = self.get(inst)?;
        Ok(match (node.kind(), node.children()) {
            (InstructionKind::Binary(op), &[left, right]) => Some(BinaryInstruction {
                op: *op,
                left,
                right,
            }),
            _ => None,
        })
    }

    pub fn set_left(&mut self, inst: InstId, left: InstId) -> Result<()> {
        self.set_child(inst, LEFT, left)
    }

    pub fn set_right(&mut self, inst: InstId, right: InstId) -> Result<()> {
        self.set_child(inst, RIGHT, right)
    }
}

pub(crate) fn compute_flags(func: &IlFunction, inst: InstId, op: BinaryOp) -> Result<InstructionFlags> {
    let left = func.flags(func.child(inst, LEFT)?)?;
    let right = func.flags(func.child(inst, RIGHT)?)?;
    Ok(left | right | OpCode::Binary(op).intrinsic())
}

/// The right operand is evaluated last, so its value sits closest to the
/// stack top and is resolved first. The left operand only gets its turn once
/// the right one finished.
pub(crate) fn inline(
    func: &mut IlFunction,
    inst: InstId,
    flags_before: InstructionFlags,
    stack: &mut InstructionStack,
) -> Result<Inlined> {
    let left = func.child(inst, LEFT)?;
    let right = func.child(inst, RIGHT)?;
    let left_flags = func.flags(left)?;

    if func.flags(right)?.has_stack_access() {
        if inlining::operand_blocked(func, left_flags, right, stack)? {
            return Ok(Inlined::stalled(inst));
        }
        let flags_before_right = flags_before | left_flags.without_stack_access();
        let inlined = func.inline(right, flags_before_right, stack)?;
        func.set_right(inst, inlined.inst)?;
        if !inlined.finished {
            return Ok(Inlined::stalled(inst));
        }
    }

    if left_flags.has_stack_access() {
        let inlined = func.inline(left, flags_before, stack)?;
        func.set_left(inst, inlined.inst)?;
        if !inlined.finished {
            return Ok(Inlined::stalled(inst));
        }
    }
    Ok(Inlined::finished(inst))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::il::LocalId;

    #[test]
    fn test_binary_flags_are_union_of_operands() {
        let mut func = IlFunction::new("test");
        let load = func.ld_loc(LocalId(0)).unwrap();
        let pending = func.pop().unwrap();
        let add = func.binary(BinaryOp::Add, load, pending).unwrap();
        assert_eq!(
            func.flags(add).unwrap(),
            InstructionFlags::MAY_READ_STATE | InstructionFlags::MAY_POP
        );
    }

    #[test]
    fn test_division_adds_may_throw() {
        let mut func = IlFunction::new("test");
        let a = func.ldc_i4(1).unwrap();
        let b = func.ldc_i4(0).unwrap();
        let div = func.binary(BinaryOp::Div, a, b).unwrap();
        assert_eq!(func.flags(div).unwrap(), InstructionFlags::MAY_THROW);
    }

    #[test]
    fn test_as_binary_view() {
        let mut func = IlFunction::new("test");
        let add = func.binary_pending(BinaryOp::Sub).unwrap();
        let view = func.as_binary(add).unwrap().unwrap();
        assert_eq!(view.op, BinaryOp::Sub);
        assert_eq!(func.opcode(view.left).unwrap(), OpCode::Pop);
        assert_ne!(view.left, view.right);

        let leaf = func.ldc_i4(1).unwrap();
        assert_eq!(func.as_binary(leaf).unwrap(), None);
    }

    #[test]
    fn test_inline_resolves_right_before_left() {
        let mut func = IlFunction::new("test");
        let first = func.ldc_i4(1).unwrap();
        let second = func.ldc_i4(2).unwrap();
        let sub = func.binary_pending(BinaryOp::Sub).unwrap();

        let mut stack = vec![first, second];
        let inlined = func
            .inline(sub, InstructionFlags::empty(), &mut stack)
            .unwrap();

        assert!(inlined.finished);
        assert!(stack.is_empty());
        let view = func.as_binary(sub).unwrap().unwrap();
        assert_eq!(view.left, first);
        assert_eq!(view.right, second);
    }

    #[test]
    fn test_inline_stops_when_right_cannot_be_filled() {
        let mut func = IlFunction::new("test");
        let add = func.binary_pending(BinaryOp::Add).unwrap();
        let mut stack = Vec::new();
        let inlined = func
            .inline(add, InstructionFlags::empty(), &mut stack)
            .unwrap();
        assert!(!inlined.finished);
        assert_eq!(inlined.inst, add);
        assert!(func.flags(add).unwrap().contains(InstructionFlags::MAY_POP));
    }
}
