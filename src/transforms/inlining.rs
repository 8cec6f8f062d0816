//! Stack-to-expression inlining
//!
//! Walks a flat top-level sequence while keeping a working stack of values
//! that were produced but not yet consumed. Each entry tries to fill its
//! pending `pop` operands from that stack, nesting the producers as its
//! children. Legality is decided from cached flags only; whenever a move
//! could reorder observable effects the entry is left flat and the stack is
//! flushed back into the sequence in its original order.

use super::Transform;
use crate::error::{Error, Result};
use crate::il::{may_reorder, Block, IlFunction, InstId, InstructionFlags, InstructionKind};
use serde::Serialize;
use std::collections::HashSet;

/// Values produced but not yet consumed, most recent last
pub type InstructionStack = Vec<InstId>;

/// Outcome of inlining one subtree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inlined {
    /// Node that takes the place of the inlined one
    pub inst: InstId,
    /// False when some pending operand had to be left unresolved
    pub finished: bool,
}

impl Inlined {
    pub fn finished(inst: InstId) -> Self {
        Self {
            inst,
            finished: true,
        }
    }

    pub fn stalled(inst: InstId) -> Self {
        Self {
            inst,
            finished: false,
        }
    }
}

/// Summary of one block-level inlining run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InlineReport {
    pub entries_before: usize,
    pub entries_after: usize,
    /// Top-level entries that were nested into a consumer
    pub consumed: usize,
    /// Entries left with unresolved pending operands
    pub stalled: usize,
    /// Whether every entry finished
    pub finished: bool,
}

/// A pending `pop` takes the stack top if the move is legal
pub(crate) fn inline_pop(
    func: &mut IlFunction,
    inst: InstId,
    flags_before: InstructionFlags,
    stack: &mut InstructionStack,
) -> Result<Inlined> {
    let Some(&top) = stack.last() else {
        return Ok(Inlined::stalled(inst));
    };
    let candidate = func.flags(top)?;
    if !may_reorder(flags_before, candidate) {
        log::debug!(
            "Cannot move {} ({:?}) past {:?} in {}",
            top,
            candidate,
            flags_before,
            func.name()
        );
        return Ok(Inlined::stalled(inst));
    }
    stack.pop();
    log::trace!("Substituting {} for pending operand {}", top, inst);
    Ok(Inlined::finished(top))
}

/// Number of pending `pop` leaves under `inst`
fn pending_pops(func: &IlFunction, inst: InstId) -> Result<usize> {
    let mut count = 0;
    let mut pending = vec![inst];
    while let Some(id) = pending.pop() {
        if !func.flags(id)?.contains(InstructionFlags::MAY_POP) {
            continue;
        }
        if *func.kind(id)? == InstructionKind::Pop {
            count += 1;
        }
        pending.extend_from_slice(func.children(id)?);
    }
    Ok(count)
}

/// Whether `slot` must not pull from the stack because an earlier-evaluated
/// sibling (summarized by `earlier`) still touches the stack itself.
///
/// An unresolved `peek` would observe a different value once anything is
/// pulled. An unresolved `pop` would consume the value a pulled producer's
/// own pending operands expect.
pub(crate) fn operand_blocked(
    func: &IlFunction,
    earlier: InstructionFlags,
    slot: InstId,
    stack: &InstructionStack,
) -> Result<bool> {
    if !func.flags(slot)?.contains(InstructionFlags::MAY_POP) {
        return Ok(false);
    }
    if earlier.contains(InstructionFlags::MAY_PEEK) {
        return Ok(true);
    }
    if earlier.contains(InstructionFlags::MAY_POP) {
        let reach = pending_pops(func, slot)?;
        for &entry in stack.iter().rev().take(reach) {
            if func.flags(entry)?.has_stack_access() {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

/// Operand walk shared by every composite variant.
///
/// Operands are resolved last to first. Operand `i` sees the effects of
/// operands `0..i`, which run before it, but not their passive stack access.
/// Operands without stack access were filled earlier and are skipped.
pub(crate) fn inline_operands(
    func: &mut IlFunction,
    inst: InstId,
    flags_before: InstructionFlags,
    stack: &mut InstructionStack,
) -> Result<Inlined> {
    let children = func.children(inst)?.to_vec();
    for (slot, &child) in children.iter().enumerate().rev() {
        if !func.flags(child)?.has_stack_access() {
            continue;
        }
        let mut earlier = InstructionFlags::empty();
        for &sibling in &children[..slot] {
            earlier |= func.flags(sibling)?;
        }
        if operand_blocked(func, earlier, child, stack)? {
            return Ok(Inlined::stalled(inst));
        }

        let inlined = func.inline(child, flags_before | earlier.without_stack_access(), stack)?;
        func.set_child(inst, slot, inlined.inst)?;
        if !inlined.finished {
            return Ok(Inlined::stalled(inst));
        }
    }
    Ok(Inlined::finished(inst))
}

fn check_entries(func: &IlFunction, entries: &[InstId]) -> Result<()> {
    let mut seen = HashSet::with_capacity(entries.len());
    for &inst in entries {
        if let Some(parent) = func.parent(inst)? {
            return Err(Error::StillAttached {
                inst,
                parent: parent.parent,
            });
        }
        if !seen.insert(inst) {
            return Err(Error::DuplicateEntry { inst });
        }
    }
    Ok(())
}

fn flush(stack: &mut InstructionStack, output: &mut Vec<InstId>) {
    if !stack.is_empty() {
        log::debug!("Flushing {} pending value(s)", stack.len());
        output.append(stack);
    }
}

/// Inline one flat sequence in place.
///
/// Entries must be live, unattached and listed once.
pub fn inline_block(func: &mut IlFunction, block: &mut Block) -> Result<InlineReport> {
    check_entries(func, block.instructions())?;

    let entries_before = block.instruction_count();
    let mut stack = InstructionStack::new();
    let mut output = Vec::with_capacity(entries_before);
    let mut stalled = 0;

    for inst in std::mem::take(&mut block.instructions) {
        let inlined = func.inline(inst, InstructionFlags::empty(), &mut stack)?;
        if inlined.inst != inst {
            // a bare pending `pop` was replaced by the producer it stood for
            func.discard(inst)?;
        }
        if !inlined.finished {
            log::debug!("{} stalled with {} value(s) pending", inlined.inst, stack.len());
            stalled += 1;
            flush(&mut stack, &mut output);
        }
        if func.produces_value(inlined.inst)? {
            stack.push(inlined.inst);
        } else {
            flush(&mut stack, &mut output);
            output.push(inlined.inst);
        }
    }
    flush(&mut stack, &mut output);

    block.instructions = output;
    let entries_after = block.instruction_count();
    Ok(InlineReport {
        entries_before,
        entries_after,
        consumed: entries_before - entries_after,
        stalled,
        finished: stalled == 0,
    })
}

/// Inline the body of `func`
pub fn inline_function(func: &mut IlFunction) -> Result<InlineReport> {
    let mut body = std::mem::take(&mut func.body);
    let report = inline_block(func, &mut body);
    func.body = body;
    let report = report?;
    log::debug!(
        "Inlined {}: {} -> {} entries ({} stalled)",
        func.name(),
        report.entries_before,
        report.entries_after,
        report.stalled
    );
    Ok(report)
}

/// Pass wrapper around [`inline_function`]
#[derive(Debug, Default)]
pub struct InliningPass {
    enabled: bool,
    last_report: Option<InlineReport>,
}

impl InliningPass {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            last_report: None,
        }
    }

    /// Report of the most recent run
    pub fn last_report(&self) -> Option<InlineReport> {
        self.last_report
    }
}

impl Transform for InliningPass {
    fn name(&self) -> &'static str {
        "inlining"
    }

    fn run(&mut self, func: &mut IlFunction) -> Result<()> {
        self.last_report = Some(inline_function(func)?);
        Ok(())
    }

    fn should_run(&self) -> bool {
        self.enabled
    }
}
