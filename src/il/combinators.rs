//! Variant-agnostic child combinators built on child enumeration

use super::instruction::{IlFunction, InstId, InstructionKind};
use super::visitor::{IlVisitor, IlVisitorMut};
use crate::error::Result;

impl IlFunction {
    /// Fold each child's visitor result into `init`, first child first
    pub fn aggregate_children<V, A, F>(
        &self,
        inst: InstId,
        init: A,
        visitor: &mut V,
        mut combine: F,
    ) -> Result<A>
    where
        V: IlVisitor + ?Sized,
        F: FnMut(A, V::Output) -> A,
    {
        let mut acc = init;
        for &child in self.children(inst)? {
            acc = combine(acc, self.accept(child, visitor)?);
        }
        Ok(acc)
    }

    /// Replace each immediate child with the node `visitor` returns for it.
    ///
    /// Recursing further down is the visitor's own business. A returned node
    /// other than the current child must be unattached; the old child is
    /// released.
    pub fn transform_children<V>(&mut self, inst: InstId, visitor: &mut V) -> Result<()>
    where
        V: IlVisitorMut<Output = Result<InstId>> + ?Sized,
    {
        for slot in 0..self.child_count(inst)? {
            let child = self.child(inst, slot)?;
            let replacement = self.accept_mut(child, visitor)??;
            self.set_child(inst, slot, replacement)?;
        }
        Ok(())
    }

    /// Children of `inst` that are still pending stack operands
    pub fn pending_slots(&self, inst: InstId) -> Result<Vec<usize>> {
        let mut slots = Vec::new();
        for (slot, &child) in self.children(inst)?.iter().enumerate() {
            if *self.kind(child)? == InstructionKind::Pop {
                slots.push(slot);
            }
        }
        Ok(slots)
    }
}
