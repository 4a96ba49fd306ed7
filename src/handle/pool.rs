//! Recycling pool for handle bodies.
//!
//! The pool is thread-local process state: initialized on first use, never
//! torn down. Stores acquire a body at fixation and return it at release.
//! Outstanding user clones keep sharing a released body, so a later
//! [`acquire`] re-targets them to whatever slot the body is allocated to next.

use std::cell::RefCell;
use std::rc::Rc;

use super::{Handle, RefCore};

thread_local! {
    static IDLE: RefCell<Vec<Rc<RefCore>>> = RefCell::new(Vec::new());
}

/// Takes an invalidated body from the pool, creating one if the pool is empty.
pub(crate) fn acquire() -> Handle {
    let core = IDLE.with(|idle| idle.borrow_mut().pop());
    Handle::from_core(core.unwrap_or_else(|| Rc::new(RefCore::new_invalid())))
}

/// Returns a body to the pool. The caller must have invalidated it first.
pub(crate) fn release(handle: Handle) {
    debug_assert!(!handle.is_valid(), "released bodies must be invalidated first");
    IDLE.with(|idle| idle.borrow_mut().push(handle.into_core()));
}

/// Number of idle bodies pooled on this thread.
pub(crate) fn idle_count() -> usize { IDLE.with(|idle| idle.borrow().len()) }
