//! Effect flags computed bottom-up for every instruction subtree
//!
//! The inlining engine decides legality purely from these flags, so every
//! cached value must stay equal to a fresh recomputation.

use bitflags::bitflags;

bitflags! {
    /// Facts about what evaluating a subtree may do.
    ///
    /// Multiple facts combine with bitwise OR (|). A node's flags are always
    /// a superset of every descendant's flags.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
    pub struct InstructionFlags: u8 {
        /// May read mutable state (locals, memory, globals).
        const MAY_READ_STATE = 1 << 0;
        /// May write mutable state.
        const MAY_WRITE_STATE = 1 << 1;
        /// May throw an exception.
        const MAY_THROW = 1 << 2;
        /// May leave the enclosing sequence (return, branch).
        const MAY_EXIT = 1 << 3;
        /// Reads the top of the evaluation stack without consuming it.
        const MAY_PEEK = 1 << 4;
        /// Consumes the top of the evaluation stack.
        const MAY_POP = 1 << 5;

        /// Effects whose relative order is observable.
        const SIDE_EFFECT = Self::MAY_WRITE_STATE.bits()
            | Self::MAY_THROW.bits()
            | Self::MAY_EXIT.bits();
        /// Any interaction with the pending-value stack.
        const STACK_ACCESS = Self::MAY_PEEK.bits() | Self::MAY_POP.bits();
    }
}

impl InstructionFlags {
    /// Union of two flag sets
    pub fn combine(self, other: InstructionFlags) -> InstructionFlags {
        self | other
    }

    pub fn has_side_effect(self) -> bool {
        self.intersects(Self::SIDE_EFFECT)
    }

    pub fn has_stack_access(self) -> bool {
        self.intersects(Self::STACK_ACCESS)
    }

    /// Drop the passive stack-read facts, keeping only actual effects
    pub fn without_stack_access(self) -> InstructionFlags {
        self - Self::STACK_ACCESS
    }
}

/// Whether `candidate` may be moved past code summarized by `before`.
///
/// The check is symmetric: a side effect on either side conflicts with stack
/// access on the other, a write conflicts with any read or write, and two
/// side effects may never swap places.
pub fn may_reorder(before: InstructionFlags, candidate: InstructionFlags) -> bool {
    let stack_conflict = (candidate.has_side_effect() && before.has_stack_access())
        || (before.has_side_effect() && candidate.has_stack_access());
    if stack_conflict {
        return false;
    }

    let state = InstructionFlags::MAY_READ_STATE | InstructionFlags::MAY_WRITE_STATE;
    let write_conflict = (before.contains(InstructionFlags::MAY_WRITE_STATE)
        && candidate.intersects(state))
        || (candidate.contains(InstructionFlags::MAY_WRITE_STATE) && before.intersects(state));
    if write_conflict {
        return false;
    }

    !(before.has_side_effect() && candidate.has_side_effect())
}
