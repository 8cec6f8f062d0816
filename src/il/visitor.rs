//! Visitor dispatch over the closed set of instruction variants
//!
//! Each trait has one required method per variant and no defaults, so adding
//! a variant fails to compile until every visitor handles it. New tree-wide
//! operations only need a new visitor type.
//!
//! # Example
//!
//! ```
//! use stackir::il::{BinaryOp, IlFunction, IlVisitor, InstId, LocalId, UnaryOp};
//!
//! /// Counts constant loads
//! struct ConstCounter;
//!
//! impl IlVisitor for ConstCounter {
//!     type Output = usize;
//!
//!     fn visit_ldc_i4(&mut self, _: &IlFunction, _: InstId, _: i32) -> usize { 1 }
//!     fn visit_ld_loc(&mut self, _: &IlFunction, _: InstId, _: LocalId) -> usize { 0 }
//!     fn visit_pop(&mut self, _: &IlFunction, _: InstId) -> usize { 0 }
//!     fn visit_peek(&mut self, _: &IlFunction, _: InstId) -> usize { 0 }
//!     fn visit_unary(&mut self, f: &IlFunction, i: InstId, _: UnaryOp, _: InstId) -> usize {
//!         f.aggregate_children(i, 0, self, |a, b| a + b).unwrap_or(0)
//!     }
//!     fn visit_binary(&mut self, f: &IlFunction, i: InstId, _: BinaryOp, _: InstId, _: InstId) -> usize {
//!         f.aggregate_children(i, 0, self, |a, b| a + b).unwrap_or(0)
//!     }
//!     fn visit_st_loc(&mut self, f: &IlFunction, i: InstId, _: LocalId, _: InstId) -> usize {
//!         f.aggregate_children(i, 0, self, |a, b| a + b).unwrap_or(0)
//!     }
//!     fn visit_call(&mut self, f: &IlFunction, i: InstId, _: &str, _: &[InstId], _: bool) -> usize {
//!         f.aggregate_children(i, 0, self, |a, b| a + b).unwrap_or(0)
//!     }
//!     fn visit_return(&mut self, f: &IlFunction, i: InstId, _: Option<InstId>) -> usize {
//!         f.aggregate_children(i, 0, self, |a, b| a + b).unwrap_or(0)
//!     }
//! }
//!
//! let mut func = IlFunction::new("example");
//! let a = func.ldc_i4(1).unwrap();
//! let b = func.ldc_i4(2).unwrap();
//! let add = func.binary(BinaryOp::Add, a, b).unwrap();
//! assert_eq!(func.accept(add, &mut ConstCounter).unwrap(), 2);
//! ```

use super::instruction::{IlFunction, InstId, InstructionKind, LocalId};
use super::opcode::{BinaryOp, UnaryOp};
use crate::error::Result;

/// Read-only operation over the tree
pub trait IlVisitor {
    type Output;

    fn visit_ldc_i4(&mut self, func: &IlFunction, inst: InstId, value: i32) -> Self::Output;
    fn visit_ld_loc(&mut self, func: &IlFunction, inst: InstId, local: LocalId) -> Self::Output;
    fn visit_pop(&mut self, func: &IlFunction, inst: InstId) -> Self::Output;
    fn visit_peek(&mut self, func: &IlFunction, inst: InstId) -> Self::Output;
    fn visit_unary(
        &mut self,
        func: &IlFunction,
        inst: InstId,
        op: UnaryOp,
        arg: InstId,
    ) -> Self::Output;
    fn visit_binary(
        &mut self,
        func: &IlFunction,
        inst: InstId,
        op: BinaryOp,
        left: InstId,
        right: InstId,
    ) -> Self::Output;
    fn visit_st_loc(
        &mut self,
        func: &IlFunction,
        inst: InstId,
        local: LocalId,
        value: InstId,
    ) -> Self::Output;
    fn visit_call(
        &mut self,
        func: &IlFunction,
        inst: InstId,
        method: &str,
        args: &[InstId],
        returns_value: bool,
    ) -> Self::Output;
    fn visit_return(&mut self, func: &IlFunction, inst: InstId, value: Option<InstId>)
        -> Self::Output;
}

/// Rewriting operation over the tree
///
/// Payloads are copied out before dispatch so the visitor may mutate the
/// function freely.
pub trait IlVisitorMut {
    type Output;

    fn visit_ldc_i4(&mut self, func: &mut IlFunction, inst: InstId, value: i32) -> Self::Output;
    fn visit_ld_loc(&mut self, func: &mut IlFunction, inst: InstId, local: LocalId)
        -> Self::Output;
    fn visit_pop(&mut self, func: &mut IlFunction, inst: InstId) -> Self::Output;
    fn visit_peek(&mut self, func: &mut IlFunction, inst: InstId) -> Self::Output;
    fn visit_unary(
        &mut self,
        func: &mut IlFunction,
        inst: InstId,
        op: UnaryOp,
        arg: InstId,
    ) -> Self::Output;
    fn visit_binary(
        &mut self,
        func: &mut IlFunction,
        inst: InstId,
        op: BinaryOp,
        left: InstId,
        right: InstId,
    ) -> Self::Output;
    fn visit_st_loc(
        &mut self,
        func: &mut IlFunction,
        inst: InstId,
        local: LocalId,
        value: InstId,
    ) -> Self::Output;
    fn visit_call(
        &mut self,
        func: &mut IlFunction,
        inst: InstId,
        method: String,
        args: Vec<InstId>,
        returns_value: bool,
    ) -> Self::Output;
    fn visit_return(
        &mut self,
        func: &mut IlFunction,
        inst: InstId,
        value: Option<InstId>,
    ) -> Self::Output;
}

impl IlFunction {
    /// Dispatch `visitor` on `inst`
    pub fn accept<V: IlVisitor + ?Sized>(&self, inst: InstId, visitor: &mut V) -> Result<V::Output> {
        let node = self.get(inst)?;
        let children = node.children();
        Ok(match node.kind() {
            InstructionKind::LdcI4(value) => visitor.visit_ldc_i4(self, inst, *value),
            InstructionKind::LdLoc(local) => visitor.visit_ld_loc(self, inst, *local),
            InstructionKind::Pop => visitor.visit_pop(self, inst),
            InstructionKind::Peek => visitor.visit_peek(self, inst),
            InstructionKind::Unary(op) => visitor.visit_unary(self, inst, *op, children[0]),
            InstructionKind::Binary(op) => {
                visitor.visit_binary(self, inst, *op, children[0], children[1])
            }
            InstructionKind::StLoc(local) => visitor.visit_st_loc(self, inst, *local, children[0]),
            InstructionKind::Call {
                method,
                returns_value,
            } => visitor.visit_call(self, inst, method, children, *returns_value),
            InstructionKind::Return => visitor.visit_return(self, inst, children.first().copied()),
        })
    }

    /// Dispatch a rewriting `visitor` on `inst`
    pub fn accept_mut<V: IlVisitorMut + ?Sized>(
        &mut self,
        inst: InstId,
        visitor: &mut V,
    ) -> Result<V::Output> {
        let node = self.get(inst)?;
        let kind = node.kind().clone();
        let children = node.children().to_vec();
        Ok(match kind {
            InstructionKind::LdcI4(value) => visitor.visit_ldc_i4(self, inst, value),
            InstructionKind::LdLoc(local) => visitor.visit_ld_loc(self, inst, local),
            InstructionKind::Pop => visitor.visit_pop(self, inst),
            InstructionKind::Peek => visitor.visit_peek(self, inst),
            InstructionKind::Unary(op) => visitor.visit_unary(self, inst, op, children[0]),
            InstructionKind::Binary(op) => {
                visitor.visit_binary(self, inst, op, children[0], children[1])
            }
            InstructionKind::StLoc(local) => visitor.visit_st_loc(self, inst, local, children[0]),
            InstructionKind::Call {
                method,
                returns_value,
            } => visitor.visit_call(self, inst, method, children, returns_value),
            InstructionKind::Return => {
                let value = children.first().copied();
                visitor.visit_return(self, inst, value)
            }
        })
    }
}
