//! Consistency checks for cached flags and parent back-references

use super::instruction::{IlFunction, InstId, LocalId, ParentSlot};
use super::opcode::{BinaryOp, UnaryOp};
use super::visitor::IlVisitor;
use super::InstructionFlags;
use crate::error::{Error, Result};

/// Recomputes flags from scratch and compares them with the cache
#[derive(Debug, Default)]
pub struct FlagsVerifier {
    checked: usize,
}

impl FlagsVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes checked so far
    pub fn checked(&self) -> usize {
        self.checked
    }

    fn check(&mut self, func: &IlFunction, inst: InstId) -> Result<InstructionFlags> {
        let intrinsic = func.opcode(inst)?.intrinsic();
        let computed = func.aggregate_children(inst, Ok::<_, Error>(intrinsic), self, |acc, child| {
            Ok(acc? | child?)
        })??;
        self.checked += 1;
        let cached = func.flags(inst)?;
        if cached != computed {
            log::warn!(
                "Flags of {} in {} are stale: cached {:?}, computed {:?}",
                inst,
                func.name(),
                cached,
                computed
            );
            return Err(Error::FlagsMismatch {
                inst,
                cached,
                computed,
            });
        }
        Ok(computed)
    }
}

impl IlVisitor for FlagsVerifier {
    type Output = Result<InstructionFlags>;

    fn visit_ldc_i4(&mut self, func: &IlFunction, inst: InstId, _value: i32) -> Self::Output {
        self.check(func, inst)
    }

    fn visit_ld_loc(&mut self, func: &IlFunction, inst: InstId, _local: LocalId) -> Self::Output {
        self.check(func, inst)
    }

    fn visit_pop(&mut self, func: &IlFunction, inst: InstId) -> Self::Output {
        self.check(func, inst)
    }

    fn visit_peek(&mut self, func: &IlFunction, inst: InstId) -> Self::Output {
        self.check(func, inst)
    }

    fn visit_unary(
        &mut self,
        func: &IlFunction,
        inst: InstId,
        _op: UnaryOp,
        _arg: InstId,
    ) -> Self::Output {
        self.check(func, inst)
    }

    fn visit_binary(
        &mut self,
        func: &IlFunction,
        inst: InstId,
        _op: BinaryOp,
        _left: InstId,
        _right: InstId,
    ) -> Self::Output {
        self.check(func, inst)
    }

    fn visit_st_loc(
        &mut self,
        func: &IlFunction,
        inst: InstId,
        _local: LocalId,
        _value: InstId,
    ) -> Self::Output {
        self.check(func, inst)
    }

    fn visit_call(
        &mut self,
        func: &IlFunction,
        inst: InstId,
        _method: &str,
        _args: &[InstId],
        _returns_value: bool,
    ) -> Self::Output {
        self.check(func, inst)
    }

    fn visit_return(
        &mut self,
        func: &IlFunction,
        inst: InstId,
        _value: Option<InstId>,
    ) -> Self::Output {
        self.check(func, inst)
    }
}

impl IlFunction {
    /// Check that every cached flag set under `root` matches a fresh
    /// bottom-up recomputation
    pub fn verify_flags(&self, root: InstId) -> Result<InstructionFlags> {
        self.accept(root, &mut FlagsVerifier::new())?
    }

    /// Check that every child under `root` points back at its slot
    pub fn verify_structure(&self, root: InstId) -> Result<()> {
        let mut pending = vec![root];
        while let Some(inst) = pending.pop() {
            for (slot, &child) in self.children(inst)?.iter().enumerate() {
                let expected = ParentSlot { parent: inst, slot };
                match self.parent(child)? {
                    Some(actual) if actual == expected => pending.push(child),
                    Some(actual) => {
                        return Err(Error::AlreadyParented {
                            child,
                            parent: actual.parent,
                            slot: actual.slot,
                        })
                    }
                    None => {
                        return Err(Error::internal(format!(
                            "{} sits in slot {} of {} without a back-reference",
                            child, slot, inst
                        )))
                    }
                }
            }
        }
        Ok(())
    }

    /// Run both checks over every top-level entry of the body
    pub fn verify(&self) -> Result<()> {
        for &inst in self.body.instructions() {
            if let Some(parent) = self.parent(inst)? {
                return Err(Error::StillAttached {
                    inst,
                    parent: parent.parent,
                });
            }
            self.verify_structure(inst)?;
            self.verify_flags(inst)?;
        }
        Ok(())
    }
}
