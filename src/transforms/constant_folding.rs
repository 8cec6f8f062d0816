//! Constant folding pass
//!
//! Rewrites unary and binary nodes whose operands are constants into a single
//! `ldc.i4`, using wrapping 32-bit arithmetic. Operations that would fault at
//! run time are left alone.

use super::Transform;
use crate::error::Result;
use crate::il::{BinaryOp, IlFunction, IlVisitorMut, InstId, InstructionKind, LocalId, UnaryOp};

/// Post-order rewriter folding constant subexpressions
#[derive(Debug, Default)]
pub struct ConstantFolder {
    folded: usize,
}

impl ConstantFolder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes replaced so far
    pub fn folded(&self) -> usize {
        self.folded
    }

    fn constant(func: &IlFunction, inst: InstId) -> Result<Option<i32>> {
        Ok(match func.kind(inst)? {
            InstructionKind::LdcI4(value) => Some(*value),
            _ => None,
        })
    }

    fn replace(&mut self, func: &mut IlFunction, inst: InstId, value: i32) -> Result<InstId> {
        self.folded += 1;
        log::trace!("Folding {} into ldc.i4 {}", inst, value);
        func.ldc_i4(value)
    }
}

fn fold_unary(op: UnaryOp, value: i32) -> i32 {
    match op {
        UnaryOp::Neg => value.wrapping_neg(),
        UnaryOp::Not => !value,
    }
}

fn fold_binary(op: BinaryOp, left: i32, right: i32) -> Option<i32> {
    Some(match op {
        BinaryOp::Add => left.wrapping_add(right),
        BinaryOp::Sub => left.wrapping_sub(right),
        BinaryOp::Mul => left.wrapping_mul(right),
        BinaryOp::Div => left.checked_div(right)?,
        BinaryOp::Rem => left.checked_rem(right)?,
        BinaryOp::And => left & right,
        BinaryOp::Or => left | right,
        BinaryOp::Xor => left ^ right,
        BinaryOp::Shl => left.wrapping_shl(right as u32),
        BinaryOp::Shr => left.wrapping_shr(right as u32),
        BinaryOp::Ceq => (left == right) as i32,
        BinaryOp::Clt => (left < right) as i32,
        BinaryOp::Cgt => (left > right) as i32,
    })
}

impl IlVisitorMut for ConstantFolder {
    type Output = Result<InstId>;

    fn visit_ldc_i4(&mut self, _func: &mut IlFunction, inst: InstId, _value: i32) -> Self::Output {
        Ok(inst)
    }

    fn visit_ld_loc(&mut self, _func: &mut IlFunction, inst: InstId, _local: LocalId) -> Self::Output {
        Ok(inst)
    }

    fn visit_pop(&mut self, _func: &mut IlFunction, inst: InstId) -> Self::Output {
        Ok(inst)
    }

    fn visit_peek(&mut self, _func: &mut IlFunction, inst: InstId) -> Self::Output {
        Ok(inst)
    }

    fn visit_unary(
        &mut self,
        func: &mut IlFunction,
        inst: InstId,
        op: UnaryOp,
        _arg: InstId,
    ) -> Self::Output {
        func.transform_children(inst, self)?;
        match Self::constant(func, func.child(inst, 0)?)? {
            Some(value) => self.replace(func, inst, fold_unary(op, value)),
            None => Ok(inst),
        }
    }

    fn visit_binary(
        &mut self,
        func: &mut IlFunction,
        inst: InstId,
        op: BinaryOp,
        _left: InstId,
        _right: InstId,
    ) -> Self::Output {
        func.transform_children(inst, self)?;
        let Some(view) = func.as_binary(inst)? else {
            return Ok(inst);
        };
        let left = Self::constant(func, view.left)?;
        let right = Self::constant(func, view.right)?;
        match (left, right) {
            (Some(l), Some(r)) => match fold_binary(op, l, r) {
                Some(value) => self.replace(func, inst, value),
                None => Ok(inst),
            },
            _ => Ok(inst),
        }
    }

    fn visit_st_loc(
        &mut self,
        func: &mut IlFunction,
        inst: InstId,
        _local: LocalId,
        _value: InstId,
    ) -> Self::Output {
        func.transform_children(inst, self)?;
        Ok(inst)
    }

    fn visit_call(
        &mut self,
        func: &mut IlFunction,
        inst: InstId,
        _method: String,
        _args: Vec<InstId>,
        _returns_value: bool,
    ) -> Self::Output {
        func.transform_children(inst, self)?;
        Ok(inst)
    }

    fn visit_return(
        &mut self,
        func: &mut IlFunction,
        inst: InstId,
        _value: Option<InstId>,
    ) -> Self::Output {
        func.transform_children(inst, self)?;
        Ok(inst)
    }
}

/// Fold every top-level entry of `func`, returning the number of folds
pub fn fold_constants(func: &mut IlFunction) -> Result<usize> {
    let mut folder = ConstantFolder::new();
    let entries = func.body.instructions().to_vec();
    for (index, inst) in entries.into_iter().enumerate() {
        let replacement = func.accept_mut(inst, &mut folder)??;
        if replacement != inst {
            func.discard(inst)?;
            func.body.instructions[index] = replacement;
        }
    }
    Ok(folder.folded())
}

/// Pass wrapper around [`fold_constants`]
#[derive(Debug, Default)]
pub struct ConstantFoldingPass {
    enabled: bool,
    folded: usize,
}

impl ConstantFoldingPass {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, folded: 0 }
    }

    pub fn folded(&self) -> usize {
        self.folded
    }
}

impl Transform for ConstantFoldingPass {
    fn name(&self) -> &'static str {
        "constant-folding"
    }

    fn run(&mut self, func: &mut IlFunction) -> Result<()> {
        self.folded += fold_constants(func)?;
        Ok(())
    }

    fn should_run(&self) -> bool {
        self.enabled
    }
}
