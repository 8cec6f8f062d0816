//! Instruction nodes and the per-function arena that owns them
//!
//! Child slots are the only owning edge. The parent back-reference on each
//! node records `(parent, slot)` for structural checks and never keeps a node
//! alive; releasing a node frees its arena slot and every descendant.

use super::block::Block;
use super::flags::InstructionFlags;
use super::opcode::{BinaryOp, OpCode, UnaryOp};
use super::{binary, call};
use crate::error::{Error, Result};
use crate::transforms::inlining::{self, Inlined, InstructionStack};
use std::collections::HashSet;
use std::fmt;

/// Handle to an instruction inside an [`IlFunction`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstId(u32);

impl InstId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for InstId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A local variable slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(pub u32);

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V_{}", self.0)
    }
}

/// Operation payload of a node; children are stored separately
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstructionKind {
    LdcI4(i32),
    LdLoc(LocalId),
    /// Pending operand, filled from the evaluation stack
    Pop,
    /// Reads the evaluation stack top without consuming it
    Peek,
    Unary(UnaryOp),
    Binary(BinaryOp),
    StLoc(LocalId),
    Call {
        method: String,
        returns_value: bool,
    },
    Return,
}

impl InstructionKind {
    pub fn opcode(&self) -> OpCode {
        match self {
            InstructionKind::LdcI4(_) => OpCode::LdcI4,
            InstructionKind::LdLoc(_) => OpCode::LdLoc,
            InstructionKind::Pop => OpCode::Pop,
            InstructionKind::Peek => OpCode::Peek,
            InstructionKind::Unary(op) => OpCode::Unary(*op),
            InstructionKind::Binary(op) => OpCode::Binary(*op),
            InstructionKind::StLoc(_) => OpCode::StLoc,
            InstructionKind::Call { .. } => OpCode::Call,
            InstructionKind::Return => OpCode::Return,
        }
    }

    /// Whether evaluating the node leaves a value behind
    pub fn produces_value(&self) -> bool {
        match self {
            InstructionKind::StLoc(_) | InstructionKind::Return => false,
            InstructionKind::Call { returns_value, .. } => *returns_value,
            _ => true,
        }
    }

    fn check_arity(&self, got: usize) -> Result<()> {
        let expected = match self {
            InstructionKind::LdcI4(_)
            | InstructionKind::LdLoc(_)
            | InstructionKind::Pop
            | InstructionKind::Peek => 0,
            InstructionKind::Unary(_) | InstructionKind::StLoc(_) => 1,
            InstructionKind::Binary(_) => 2,
            InstructionKind::Call { .. } => return Ok(()),
            InstructionKind::Return if got <= 1 => return Ok(()),
            InstructionKind::Return => 1,
        };
        if expected != got {
            return Err(Error::Cardinality {
                opcode: self.opcode(),
                expected,
                got,
            });
        }
        Ok(())
    }
}

/// Where a node is attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParentSlot {
    pub parent: InstId,
    pub slot: usize,
}

/// A single node of the instruction tree
#[derive(Debug, Clone)]
pub struct Instruction {
    kind: InstructionKind,
    children: Vec<InstId>,
    flags: InstructionFlags,
    parent: Option<ParentSlot>,
}

impl Instruction {
    pub fn kind(&self) -> &InstructionKind {
        &self.kind
    }

    pub fn opcode(&self) -> OpCode {
        self.kind.opcode()
    }

    pub fn children(&self) -> &[InstId] {
        &self.children
    }

    /// Cached flags of the whole subtree
    pub fn flags(&self) -> InstructionFlags {
        self.flags
    }

    pub fn parent(&self) -> Option<ParentSlot> {
        self.parent
    }
}

/// Instruction tree of one method body
///
/// The function owns every node it created. One function is processed by a
/// single task at a time; independent functions share nothing.
#[derive(Debug, Clone, Default)]
pub struct IlFunction {
    name: String,
    nodes: Vec<Option<Instruction>>,
    live: usize,
    /// Top-level instruction sequence
    pub body: Block,
}

impl IlFunction {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of nodes not yet released
    pub fn live_count(&self) -> usize {
        self.live
    }

    pub fn is_live(&self, inst: InstId) -> bool {
        matches!(self.nodes.get(inst.index()), Some(Some(_)))
    }

    pub fn get(&self, inst: InstId) -> Result<&Instruction> {
        self.nodes
            .get(inst.index())
            .and_then(Option::as_ref)
            .ok_or(Error::DeadInstruction { inst })
    }

    fn get_mut(&mut self, inst: InstId) -> Result<&mut Instruction> {
        self.nodes
            .get_mut(inst.index())
            .and_then(Option::as_mut)
            .ok_or(Error::DeadInstruction { inst })
    }

    pub fn kind(&self, inst: InstId) -> Result<&InstructionKind> {
        Ok(&self.get(inst)?.kind)
    }

    pub fn opcode(&self, inst: InstId) -> Result<OpCode> {
        Ok(self.get(inst)?.opcode())
    }

    pub fn flags(&self, inst: InstId) -> Result<InstructionFlags> {
        Ok(self.get(inst)?.flags)
    }

    pub fn parent(&self, inst: InstId) -> Result<Option<ParentSlot>> {
        Ok(self.get(inst)?.parent)
    }

    pub fn produces_value(&self, inst: InstId) -> Result<bool> {
        Ok(self.get(inst)?.kind.produces_value())
    }

    pub fn child_count(&self, inst: InstId) -> Result<usize> {
        Ok(self.get(inst)?.children.len())
    }

    pub fn children(&self, inst: InstId) -> Result<&[InstId]> {
        Ok(&self.get(inst)?.children)
    }

    pub fn child(&self, inst: InstId, slot: usize) -> Result<InstId> {
        let children = self.children(inst)?;
        children.get(slot).copied().ok_or(Error::SlotOutOfRange {
            inst,
            slot,
            count: children.len(),
        })
    }

    /// Allocate a node and attach `children` to it.
    ///
    /// Every child must be live, unattached and listed once.
    pub fn alloc(&mut self, kind: InstructionKind, children: Vec<InstId>) -> Result<InstId> {
        kind.check_arity(children.len())?;
        let mut seen = HashSet::with_capacity(children.len());
        for &child in &children {
            if let Some(parent) = self.get(child)?.parent {
                return Err(Error::AlreadyParented {
                    child,
                    parent: parent.parent,
                    slot: parent.slot,
                });
            }
            if !seen.insert(child) {
                return Err(Error::DuplicateEntry { inst: child });
            }
        }

        let raw = u32::try_from(self.nodes.len())
            .map_err(|_| Error::internal("instruction arena is full"))?;
        let inst = InstId(raw);
        for (slot, &child) in children.iter().enumerate() {
            self.get_mut(child)?.parent = Some(ParentSlot { parent: inst, slot });
        }
        self.nodes.push(Some(Instruction {
            kind,
            children,
            flags: InstructionFlags::empty(),
            parent: None,
        }));
        self.live += 1;
        let flags = self.compute_flags(inst)?;
        self.get_mut(inst)?.flags = flags;
        Ok(inst)
    }

    pub fn ldc_i4(&mut self, value: i32) -> Result<InstId> {
        self.alloc(InstructionKind::LdcI4(value), Vec::new())
    }

    pub fn ld_loc(&mut self, local: LocalId) -> Result<InstId> {
        self.alloc(InstructionKind::LdLoc(local), Vec::new())
    }

    pub fn pop(&mut self) -> Result<InstId> {
        self.alloc(InstructionKind::Pop, Vec::new())
    }

    pub fn peek(&mut self) -> Result<InstId> {
        self.alloc(InstructionKind::Peek, Vec::new())
    }

    pub fn unary(&mut self, op: UnaryOp, arg: InstId) -> Result<InstId> {
        self.alloc(InstructionKind::Unary(op), vec![arg])
    }

    pub fn st_loc(&mut self, local: LocalId, value: InstId) -> Result<InstId> {
        self.alloc(InstructionKind::StLoc(local), vec![value])
    }

    pub fn ret(&mut self, value: Option<InstId>) -> Result<InstId> {
        self.alloc(InstructionKind::Return, value.into_iter().collect())
    }

    /// Recompute the flags of `inst` from its intrinsic facts and the
    /// current cached flags of its children
    pub fn compute_flags(&self, inst: InstId) -> Result<InstructionFlags> {
        let node = self.get(inst)?;
        match &node.kind {
            InstructionKind::Binary(op) => binary::compute_flags(self, inst, *op),
            InstructionKind::Call { .. } => call::compute_flags(self, inst),
            InstructionKind::LdcI4(_)
            | InstructionKind::LdLoc(_)
            | InstructionKind::Pop
            | InstructionKind::Peek
            | InstructionKind::Unary(_)
            | InstructionKind::StLoc(_)
            | InstructionKind::Return => {
                let mut flags = node.opcode().intrinsic();
                for &child in &node.children {
                    flags = flags.combine(self.flags(child)?);
                }
                Ok(flags)
            }
        }
    }

    /// Recompute cached flags from `inst` up to the root, stopping once a
    /// node's flags come out unchanged
    fn refresh_flags(&mut self, inst: InstId) -> Result<()> {
        let mut current = Some(inst);
        while let Some(id) = current {
            let computed = self.compute_flags(id)?;
            let node = self.get_mut(id)?;
            if node.flags == computed {
                break;
            }
            node.flags = computed;
            current = node.parent.map(|p| p.parent);
        }
        Ok(())
    }

    fn is_ancestor_or_self(&self, candidate: InstId, inst: InstId) -> Result<bool> {
        let mut current = Some(inst);
        while let Some(id) = current {
            if id == candidate {
                return Ok(true);
            }
            current = self.get(id)?.parent.map(|p| p.parent);
        }
        Ok(false)
    }

    /// Put `child` into `slot` of `parent` and return the previous occupant,
    /// now detached but still live.
    ///
    /// Fails without touching the tree if the slot does not exist, `child` is
    /// attached elsewhere or `child` is `parent` or one of its ancestors.
    pub fn replace_child(&mut self, parent: InstId, slot: usize, child: InstId) -> Result<InstId> {
        let old = self.child(parent, slot)?;
        match self.get(child)?.parent {
            Some(p) if p == (ParentSlot { parent, slot }) => return Ok(old),
            Some(p) => {
                return Err(Error::AlreadyParented {
                    child,
                    parent: p.parent,
                    slot: p.slot,
                })
            }
            None => {}
        }
        if self.is_ancestor_or_self(child, parent)? {
            return Err(Error::CyclicChild { child, parent });
        }

        self.get_mut(old)?.parent = None;
        self.get_mut(child)?.parent = Some(ParentSlot { parent, slot });
        self.get_mut(parent)?.children[slot] = child;
        self.refresh_flags(parent)?;
        Ok(old)
    }

    /// Put `child` into `slot` of `parent`, releasing the previous occupant
    pub fn set_child(&mut self, parent: InstId, slot: usize, child: InstId) -> Result<()> {
        let old = self.replace_child(parent, slot, child)?;
        if old != child {
            self.discard(old)?;
        }
        Ok(())
    }

    /// Release an unattached node together with its whole subtree
    pub fn discard(&mut self, inst: InstId) -> Result<()> {
        if let Some(p) = self.get(inst)?.parent {
            return Err(Error::StillAttached {
                inst,
                parent: p.parent,
            });
        }
        let mut pending = vec![inst];
        while let Some(id) = pending.pop() {
            if let Some(node) = self.nodes.get_mut(id.index()).and_then(Option::take) {
                self.live -= 1;
                pending.extend(node.children);
            }
        }
        Ok(())
    }

    /// Try to fill pending operands of `inst` from `stack`.
    ///
    /// Returns the node that takes `inst`'s place, which is a stack producer
    /// when `inst` is itself a pending `pop`, and whether every pending operand
    /// below it was resolved.
    pub fn inline(
        &mut self,
        inst: InstId,
        flags_before: InstructionFlags,
        stack: &mut InstructionStack,
    ) -> Result<Inlined> {
        match self.opcode(inst)? {
            OpCode::Pop => inlining::inline_pop(self, inst, flags_before, stack),
            OpCode::Peek => Ok(Inlined {
                inst,
                finished: stack.is_empty(),
            }),
            OpCode::LdcI4 | OpCode::LdLoc => Ok(Inlined::finished(inst)),
            OpCode::Binary(_) => binary::inline(self, inst, flags_before, stack),
            OpCode::Unary(_) | OpCode::StLoc | OpCode::Call | OpCode::Return => {
                inlining::inline_operands(self, inst, flags_before, stack)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_sets_parent_back_references() {
        let mut func = IlFunction::new("test");
        let value = func.ldc_i4(7).unwrap();
        let store = func.st_loc(LocalId(0), value).unwrap();

        assert_eq!(
            func.parent(value).unwrap(),
            Some(ParentSlot {
                parent: store,
                slot: 0
            })
        );
        assert_eq!(func.parent(store).unwrap(), None);
        assert_eq!(func.live_count(), 2);
    }

    #[test]
    fn test_alloc_rejects_wrong_arity() {
        let mut func = IlFunction::new("test");
        let a = func.ldc_i4(1).unwrap();
        let b = func.ldc_i4(2).unwrap();
        let err = func
            .alloc(InstructionKind::Unary(UnaryOp::Neg), vec![a, b])
            .unwrap_err();
        assert!(matches!(err, Error::Cardinality { expected: 1, got: 2, .. }));
    }

    #[test]
    fn test_alloc_rejects_attached_child() {
        let mut func = IlFunction::new("test");
        let value = func.ldc_i4(1).unwrap();
        let _neg = func.unary(UnaryOp::Neg, value).unwrap();
        let err = func.unary(UnaryOp::Not, value).unwrap_err();
        assert!(matches!(err, Error::AlreadyParented { .. }));
        assert_eq!(func.live_count(), 2);
    }

    #[test]
    fn test_alloc_rejects_same_child_twice() {
        let mut func = IlFunction::new("test");
        let value = func.ldc_i4(1).unwrap();
        let err = func
            .alloc(InstructionKind::Binary(BinaryOp::Add), vec![value, value])
            .unwrap_err();
        assert_eq!(err, Error::DuplicateEntry { inst: value });
        assert_eq!(func.parent(value).unwrap(), None);
    }

    #[test]
    fn test_set_child_releases_old_child() {
        let mut func = IlFunction::new("test");
        let pending = func.pop().unwrap();
        let neg = func.unary(UnaryOp::Neg, pending).unwrap();
        let value = func.ldc_i4(3).unwrap();

        func.set_child(neg, 0, value).unwrap();

        assert!(!func.is_live(pending));
        assert_eq!(func.child(neg, 0).unwrap(), value);
        assert_eq!(func.flags(neg).unwrap(), InstructionFlags::empty());
    }

    #[test]
    fn test_set_child_same_child_is_noop() {
        let mut func = IlFunction::new("test");
        let value = func.ldc_i4(3).unwrap();
        let neg = func.unary(UnaryOp::Neg, value).unwrap();
        func.set_child(neg, 0, value).unwrap();
        assert!(func.is_live(value));
        assert_eq!(func.child(neg, 0).unwrap(), value);
    }

    #[test]
    fn test_set_child_rejects_cycle() {
        let mut func = IlFunction::new("test");
        let value = func.ldc_i4(3).unwrap();
        let inner = func.unary(UnaryOp::Neg, value).unwrap();
        let outer = func.unary(UnaryOp::Not, inner).unwrap();

        let err = func.set_child(inner, 0, outer).unwrap_err();
        assert_eq!(
            err,
            Error::CyclicChild {
                child: outer,
                parent: inner
            }
        );
        assert_eq!(func.child(inner, 0).unwrap(), value);
        assert!(func.is_live(value));
    }

    #[test]
    fn test_set_child_out_of_range() {
        let mut func = IlFunction::new("test");
        let value = func.ldc_i4(3).unwrap();
        let neg = func.unary(UnaryOp::Neg, value).unwrap();
        let other = func.ldc_i4(4).unwrap();
        let err = func.set_child(neg, 1, other).unwrap_err();
        assert!(matches!(err, Error::SlotOutOfRange { slot: 1, count: 1, .. }));
    }

    #[test]
    fn test_flags_propagate_to_ancestors() {
        let mut func = IlFunction::new("test");
        let value = func.ldc_i4(3).unwrap();
        let inner = func.unary(UnaryOp::Neg, value).unwrap();
        let outer = func.unary(UnaryOp::Not, inner).unwrap();
        assert_eq!(func.flags(outer).unwrap(), InstructionFlags::empty());

        let load = func.ld_loc(LocalId(2)).unwrap();
        func.set_child(inner, 0, load).unwrap();

        assert_eq!(func.flags(inner).unwrap(), InstructionFlags::MAY_READ_STATE);
        assert_eq!(func.flags(outer).unwrap(), InstructionFlags::MAY_READ_STATE);
    }

    #[test]
    fn test_discard_requires_detached_node() {
        let mut func = IlFunction::new("test");
        let value = func.ldc_i4(3).unwrap();
        let neg = func.unary(UnaryOp::Neg, value).unwrap();

        assert!(matches!(
            func.discard(value),
            Err(Error::StillAttached { .. })
        ));
        func.discard(neg).unwrap();
        assert_eq!(func.live_count(), 0);
        assert_eq!(func.get(value).unwrap_err(), Error::DeadInstruction { inst: value });
    }

    #[test]
    fn test_return_accepts_optional_value() {
        let mut func = IlFunction::new("test");
        let bare = func.ret(None).unwrap();
        let value = func.ldc_i4(0).unwrap();
        let with_value = func.ret(Some(value)).unwrap();
        assert_eq!(func.child_count(bare).unwrap(), 0);
        assert_eq!(func.child_count(with_value).unwrap(), 1);
        assert!(!func.produces_value(with_value).unwrap());
        assert!(func.flags(bare).unwrap().contains(InstructionFlags::MAY_EXIT));
    }
}
