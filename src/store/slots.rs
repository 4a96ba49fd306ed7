//! The dense slot array backing one store: payload cells plus bookkeeping rows.

use std::mem::MaybeUninit;

use bitvec::prelude::BitVec;

use crate::comp::EntityId;
use crate::handle::Handle;

/// Advances a wrap-around counter, skipping the reserved `0`:
/// `u32::MAX` wraps to `1`.
pub(crate) fn bump(counter: u32) -> u32 { counter % u32::MAX + 1 }

/// Bookkeeping for one slot.
pub(crate) struct Meta {
    /// The in-slot handle. `None` for vacant slots and for slots released but
    /// not yet compacted away.
    pub(crate) handle:   Option<Handle>,
    pub(crate) entity:   EntityId,
    /// Fixation counter. `0` only before the first fixation of this physical
    /// slot; survives release and vacation so reuse always bumps past it.
    pub(crate) version:  u32,
    /// Mutation counter; reset to `0` on fixation.
    pub(crate) revision: u32,
}

impl Meta {
    fn vacant() -> Self { Self { handle: None, entity: 0, version: 0, revision: 0 } }
}

/// A dense array of slots with explicitly materialized capacity.
///
/// The prefix `[0, len)` holds fixed slots; `[len, capacity)` are vacant.
/// Payload initialization is tracked by the `init` bits rather than by `len`:
/// a released slot keeps its payload (and bit) until compaction drops or
/// overwrites it, so stale reads by raw offset still observe the old value
/// until then.
pub(crate) struct SlotVec<T> {
    metas: Vec<Meta>,
    data:  Vec<MaybeUninit<T>>,
    init:  BitVec,
    len:   usize,
}

impl<T> SlotVec<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let mut slots = Self { metas: Vec::new(), data: Vec::new(), init: BitVec::new(), len: 0 };
        slots.reserve_to(capacity);
        slots
    }

    /// Number of fixed slots, released-but-uncompacted ones included.
    pub(crate) fn len(&self) -> usize { self.len }

    /// Materialized slot count.
    pub(crate) fn capacity(&self) -> usize { self.metas.len() }

    /// Materializes capacity up to `capacity`, preserving existing slots.
    pub(crate) fn reserve_to(&mut self, capacity: usize) {
        if capacity <= self.metas.len() {
            return;
        }
        self.metas.resize_with(capacity, Meta::vacant);
        self.data.resize_with(capacity, MaybeUninit::uninit);
        self.init.resize(capacity, false);
    }

    /// The bookkeeping row at `offset`, bounded by the allocated range.
    pub(crate) fn meta(&self, offset: usize) -> Option<&Meta> {
        if offset < self.len { self.metas.get(offset) } else { None }
    }

    /// Mutable variant of [`meta`](Self::meta).
    pub(crate) fn meta_mut(&mut self, offset: usize) -> Option<&mut Meta> {
        if offset < self.len { self.metas.get_mut(offset) } else { None }
    }

    /// Fixes the slot at the dense tail, returning its new version.
    /// Capacity must already cover the position.
    pub(crate) fn fix(&mut self, entity: EntityId, value: T) -> u32 {
        let pos = self.len;
        debug_assert!(pos < self.capacity(), "growth must run before fixation");
        debug_assert!(!self.init[pos], "vacant slots must not hold a payload");

        self.data.get_mut(pos).expect("capacity materialized above len").write(value);
        self.init.set(pos, true);

        let meta = self.metas.get_mut(pos).expect("capacity materialized above len");
        meta.entity = entity;
        meta.revision = 0;
        meta.version = bump(meta.version);
        let version = meta.version;

        self.len += 1;
        version
    }

    /// Stores the in-slot handle of a just-fixed slot.
    pub(crate) fn set_handle(&mut self, offset: usize, handle: Handle) {
        let meta = self.meta_mut(offset).expect("offset was fixed by the caller");
        debug_assert!(meta.handle.is_none(), "slot already holds a handle");
        meta.handle = Some(handle);
    }

    /// The payload at `offset`, if the slot is in the allocated range.
    ///
    /// Released slots still report their (stale) payload until compaction.
    pub(crate) fn value(&self, offset: usize) -> Option<&T> {
        if offset >= self.len || !*self.init.get(offset)? {
            return None;
        }
        let cell = self.data.get(offset).expect("init bits match data length");
        // SAFETY: the init bit is set, so the cell is initialized.
        Some(unsafe { cell.assume_init_ref() })
    }

    /// Mutable variant of [`value`](Self::value).
    pub(crate) fn value_mut(&mut self, offset: usize) -> Option<&mut T> {
        if offset >= self.len || !*self.init.get(offset)? {
            return None;
        }
        let cell = self.data.get_mut(offset).expect("init bits match data length");
        // SAFETY: the init bit is set, so the cell is initialized.
        Some(unsafe { cell.assume_init_mut() })
    }

    /// Drops the payload at `offset` in place, leaving the slot vacant.
    pub(crate) fn drop_value(&mut self, offset: usize) {
        debug_assert!(self.init[offset], "dropping a vacant payload");
        self.init.set(offset, false);
        let cell = self.data.get_mut(offset).expect("init bits match data length");
        // SAFETY: the bit was set before the flip above, so the cell is
        // initialized; the flip records that it no longer is.
        unsafe { cell.assume_init_drop() };
    }

    /// Moves the whole slot at `from` into the vacant slot at `to`:
    /// payload, handle, entity, version and revision all travel.
    /// The vacated slot keeps its own version counter for future fixations.
    pub(crate) fn move_slot(&mut self, from: usize, to: usize) {
        debug_assert!(from != to, "moving a slot onto itself");
        debug_assert!(self.init[from], "source slot must hold a payload");
        debug_assert!(!self.init[to], "target slot must be vacant");

        // SAFETY: `from` is initialized per the bit just checked; the bit flips
        // below record that the payload now lives at `to` instead.
        let value = unsafe { self.data.get(from).expect("bounds checked").assume_init_read() };
        self.data.get_mut(to).expect("bounds checked").write(value);
        self.init.set(from, false);
        self.init.set(to, true);

        let (handle, entity, version, revision) = {
            let meta = self.metas.get_mut(from).expect("bounds checked");
            (meta.handle.take(), meta.entity, meta.version, meta.revision)
        };
        let meta = self.metas.get_mut(to).expect("bounds checked");
        meta.handle = handle;
        meta.entity = entity;
        meta.version = version;
        meta.revision = revision;
    }

    /// Retracts the dense prefix by `count` slots after compaction.
    pub(crate) fn shrink_by(&mut self, count: usize) {
        debug_assert!(count <= self.len, "shrinking past the dense prefix");
        self.len -= count;
    }
}

impl<T> Drop for SlotVec<T> {
    fn drop(&mut self) {
        for index in self.init.iter_ones() {
            let cell = self.data.get_mut(index).expect("init bits match data length");
            // SAFETY: the bit is set, so the cell is initialized; the whole
            // vector is discarded after this loop.
            unsafe { cell.assume_init_drop() };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{bump, SlotVec};

    #[test]
    fn counter_bump_skips_zero() {
        assert_eq!(bump(0), 1);
        assert_eq!(bump(1), 2);
        assert_eq!(bump(u32::MAX - 1), u32::MAX);
        assert_eq!(bump(u32::MAX), 1);
    }

    #[test]
    fn drops_exactly_the_initialized_payloads() {
        use std::cell::Cell;
        use std::rc::Rc;

        struct Probe(Rc<Cell<u32>>);
        impl Drop for Probe {
            fn drop(&mut self) { self.0.set(self.0.get() + 1); }
        }

        let drops = Rc::new(Cell::new(0));
        {
            let mut slots = SlotVec::with_capacity(4);
            for entity in 1..=3 {
                slots.fix(entity, Probe(Rc::clone(&drops)));
            }
            slots.drop_value(1);
            assert_eq!(drops.get(), 1);
        }
        assert_eq!(drops.get(), 3);
    }

    #[test]
    fn move_slot_carries_bookkeeping() {
        let mut slots = SlotVec::with_capacity(4);
        slots.fix(11, "a");
        slots.fix(22, "b");

        slots.drop_value(0);
        slots.move_slot(1, 0);

        let meta = slots.meta(0).expect("offset 0 is allocated");
        assert_eq!(meta.entity, 22);
        assert_eq!(meta.version, 1);
        assert_eq!(slots.value(0), Some(&"b"));
        assert_eq!(slots.value(1), None);
        // the vacated slot keeps its counter
        assert_eq!(slots.metas[1].version, 1);
    }
}
