//! Per-owner lazy materialization of extension hook instances.
//!
//! # Responsibility
//! - Materialize the ordered hook instance list for one owner exactly once,
//!   on first use.
//! - Let re-entrant requests during materialization observe the partial
//!   prefix instead of restarting construction.
//!
//! # Invariants
//! - Owners are single-threaded; no internal locking beyond `RefCell`.
//! - Once materialized, the list never changes for the owner's lifetime;
//!   later registry mutations do not invalidate it.
//! - A nested request while construction is in progress never
//!   re-instantiates hooks already created and never recurses into the
//!   materializer again.

use std::cell::RefCell;
use std::rc::Rc;

enum MaterializeState<H: ?Sized> {
    NotStarted,
    InProgress(Rc<RefCell<Vec<Rc<H>>>>),
    Done(Rc<Vec<Rc<H>>>),
}

/// Lazily materialized, order-stable hook instance list for one owner.
pub struct ExtensionInstances<H: ?Sized> {
    state: RefCell<MaterializeState<H>>,
}

impl<H: ?Sized> Default for ExtensionInstances<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ?Sized> ExtensionInstances<H> {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(MaterializeState::NotStarted),
        }
    }

    /// True once the final list has been computed.
    pub fn is_materialized(&self) -> bool {
        matches!(&*self.state.borrow(), MaterializeState::Done(_))
    }

    /// Returns the materialized hook list, computing it on first call.
    ///
    /// `materialize` receives a sink and pushes hook instances in chain
    /// order; the caller is responsible for pushing the terminal local hook
    /// last. When this method is re-entered while `materialize` is still
    /// running (a hook constructor asking for its own owner's list), the
    /// nested call returns a snapshot of the prefix pushed so far.
    pub fn get_or_materialize<F>(&self, materialize: F) -> Rc<Vec<Rc<H>>>
    where
        F: FnOnce(&mut dyn FnMut(Rc<H>)),
    {
        match &*self.state.borrow() {
            MaterializeState::Done(list) => return Rc::clone(list),
            MaterializeState::InProgress(partial) => return Rc::new(partial.borrow().clone()),
            MaterializeState::NotStarted => {}
        }

        let partial: Rc<RefCell<Vec<Rc<H>>>> = Rc::new(RefCell::new(Vec::new()));
        *self.state.borrow_mut() = MaterializeState::InProgress(Rc::clone(&partial));

        {
            let mut sink = |hook: Rc<H>| partial.borrow_mut().push(hook);
            materialize(&mut sink);
        }

        let list = Rc::new(partial.borrow().clone());
        *self.state.borrow_mut() = MaterializeState::Done(Rc::clone(&list));
        list
    }
}
