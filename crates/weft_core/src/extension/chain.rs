//! Ordered hook walk shared by all per-operation chains.
//!
//! # Responsibility
//! - Track the current position inside one operation dispatch across an
//!   ordered hook list.
//! - Guarantee that repeated onward calls from the same hook re-run the
//!   remainder of the chain independently.
//!
//! # Invariants
//! - The cursor is rewound after every nested invocation returns, so a hook
//!   calling onward twice executes the downstream hooks (including the
//!   terminal base hook) twice with identical chain state. This is a
//!   deliberate contract, not an accident; downstream re-execution must not
//!   be memoized away.
//! - Chains built by the framework always end in the owner's local hook,
//!   which never calls onward; walking past the end is therefore only
//!   possible for hand-built hook lists and surfaces as `advance()`
//!   returning `None`.

use std::rc::Rc;

/// Cursor state over one ordered hook list for a single operation dispatch.
pub struct HookChain<'a, H: ?Sized> {
    hooks: &'a [Rc<H>],
    cursor: usize,
}

impl<'a, H: ?Sized> HookChain<'a, H> {
    /// Creates a chain positioned before the first hook.
    pub fn new(hooks: &'a [Rc<H>]) -> Self {
        Self { hooks, cursor: 0 }
    }

    /// Moves to the next hook for one nested invocation.
    ///
    /// Returns the position to rewind to once the invocation returns, plus
    /// the hook to invoke. Returns `None` when the chain is exhausted.
    pub fn advance(&mut self) -> Option<(usize, Rc<H>)> {
        let position = self.cursor;
        let hook = self.hooks.get(position)?;
        self.cursor = position + 1;
        Some((position, Rc::clone(hook)))
    }

    /// Restores the cursor after a nested invocation returned.
    pub fn rewind(&mut self, position: usize) {
        self.cursor = position;
    }

    /// Number of hooks in the chain, including the terminal local hook.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// True when the cursor has moved past the last hook.
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.hooks.len()
    }
}
