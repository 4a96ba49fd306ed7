//! Stable, versioned references into movable slot storage.
//!
//! A [`Handle`] clones cheaply and keeps pointing at the same logical slot
//! across compaction: the owning store rewrites the shared body's offset in
//! place when the slot moves, so every outside clone follows along.
//! Releasing the slot zeroes the shared body, after which every clone fails
//! validation.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::comp::EntityId;
use crate::locator::Locator;

pub(crate) mod pool;

/// Offset carried by invalid handles.
pub const INVALID_OFFSET: usize = usize::MAX;

/// Version carried by invalid handles. Allocated slots never hold version 0.
pub const INVALID_VERSION: u32 = 0;

/// The handle body shared between the owning slot and all user-held clones.
pub(crate) struct RefCore {
    locator: RefCell<Option<Rc<dyn Locator>>>,
    offset:  Cell<usize>,
    version: Cell<u32>,
}

impl RefCore {
    pub(crate) fn new_invalid() -> Self {
        Self {
            locator: RefCell::new(None),
            offset:  Cell::new(INVALID_OFFSET),
            version: Cell::new(INVALID_VERSION),
        }
    }
}

/// A clonable reference to one slot in some store.
///
/// The slot owns the lifecycle of the shared body; user code must treat a
/// handle as borrowed. After the slot is released, [`is_valid`](Self::is_valid)
/// returns `false` and dereferencing wrappers built on the handle fails fast.
#[derive(Clone)]
pub struct Handle {
    core: Rc<RefCore>,
}

impl Handle {
    pub(crate) fn from_core(core: Rc<RefCore>) -> Self { Self { core } }

    pub(crate) fn into_core(self) -> Rc<RefCore> { self.core }

    /// The current offset of the referenced slot,
    /// or [`INVALID_OFFSET`] for an invalid handle.
    ///
    /// Offsets are rewritten during compaction; cache the handle, not the
    /// integer.
    pub fn offset(&self) -> usize { self.core.offset.get() }

    /// The version captured at fixation,
    /// or [`INVALID_VERSION`] for an invalid handle.
    pub fn version(&self) -> u32 { self.core.version.get() }

    /// The gateway of the owning store, if the handle is allocated.
    pub fn locator(&self) -> Option<Rc<dyn Locator>> { self.core.locator.borrow().clone() }

    /// Whether the handle still validates against its store:
    /// the offset is in the allocated range and the slot version matches.
    pub fn is_valid(&self) -> bool {
        match self.locator() {
            Some(locator) => locator.not_null(self.version(), self.offset()),
            None => false,
        }
    }

    /// The owning entity of the referenced slot, or `0` when invalid.
    pub fn entity(&self) -> EntityId {
        match self.locator() {
            Some(locator) => locator.entity_at(self.offset()),
            None => 0,
        }
    }

    /// The current revision of the referenced slot, or `0` when invalid.
    pub fn revision(&self) -> u32 {
        match self.locator() {
            Some(locator) => locator.revision_at(self.offset()),
            None => 0,
        }
    }

    /// Whether two handles share the same body.
    pub fn ptr_eq(&self, other: &Self) -> bool { Rc::ptr_eq(&self.core, &other.core) }

    /// Overwrites all three fields. The body must be freshly acquired from the
    /// pool or previously invalidated.
    pub(crate) fn allocate(&self, locator: Rc<dyn Locator>, offset: usize, version: u32) {
        debug_assert!(self.core.locator.borrow().is_none(), "allocating a live handle body");
        *self.core.locator.borrow_mut() = Some(locator);
        self.core.offset.set(offset);
        self.core.version.set(version);
    }

    /// Rewrites only the offset; the slot moved but its identity is unchanged.
    pub(crate) fn relocate(&self, offset: usize) { self.core.offset.set(offset); }

    /// Resets to the invalid triple. Called before the body returns to the pool.
    pub(crate) fn invalidate(&self) {
        *self.core.locator.borrow_mut() = None;
        self.core.offset.set(INVALID_OFFSET);
        self.core.version.set(INVALID_VERSION);
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Handle");
        match self.locator() {
            Some(locator) => debug.field("comp", &locator.comp_ty()),
            None => debug.field("comp", &"<invalid>"),
        };
        debug
            .field("offset", &self.offset())
            .field("version", &self.version())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{pool, INVALID_OFFSET, INVALID_VERSION};

    #[test]
    fn fresh_handles_are_invalid() {
        let handle = pool::acquire();
        assert_eq!(handle.offset(), INVALID_OFFSET);
        assert_eq!(handle.version(), INVALID_VERSION);
        assert!(handle.locator().is_none());
        assert!(!handle.is_valid());
        assert_eq!(handle.entity(), 0);
        assert_eq!(handle.revision(), 0);
    }

    #[test]
    fn pool_recycles_bodies() {
        let first = pool::acquire();
        let probe = first.clone();
        let idle = pool::idle_count();
        pool::release(first);
        assert_eq!(pool::idle_count(), idle + 1);

        let second = pool::acquire();
        assert_eq!(pool::idle_count(), idle);
        assert!(second.ptr_eq(&probe), "the pool should hand back the recycled body");
    }
}
