//! Per-type component stores with deferred-cleanup compaction.
//!
//! A [`Store<T>`] packs every `T` component into a dense prefix of a growable
//! slot array. Releasing a slot only marks it; a later [`Store::rearrange`]
//! pass moves live tail slots into the holes and rewrites the moved handles'
//! offsets in place, so outside [`Handle`]s stay valid across compaction.

use std::any::Any;
use std::cell::{self, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use crate::comp::{Comp, EntityId};
use crate::handle::{pool, Handle};
use crate::locator::Locator;
use crate::refs::TypedRef;
use crate::util::{self, DbgTypeId};

mod slots;
use slots::SlotVec;

#[cfg(test)]
mod tests;

/// Constructor-time growth policy of a store.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Slot capacity materialized at construction.
    pub initial_capacity: usize,

    /// Multiplier applied to capacity when growth triggers.
    pub growth_rate: f64,

    /// Fractional fill of capacity that pre-triggers growth.
    ///
    /// With any value above `1.0` (the default included) the fractional test
    /// can never fire before the hard full-capacity check, so growth happens
    /// exactly when the dense prefix reaches capacity. Set below `1.0` to grow
    /// ahead of that point.
    pub growth_trigger: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self { initial_capacity: 100, growth_rate: 2.0, growth_trigger: 1.2 }
    }
}

struct Inner<T> {
    slots:  SlotVec<T>,
    /// Offsets released since the last compaction pass.
    marked: Vec<usize>,
    config: Config,
}

/// A cheaply clonable facade over one component type's storage.
///
/// All clones share the same interior; the facade only adds the typed fast
/// path on top of the type-erased [`Locator`] gateway.
pub struct Store<T: Comp> {
    inner:   Rc<RefCell<Inner<T>>>,
    locator: Rc<StoreLocator<T>>,
}

impl<T: Comp> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self { inner: Rc::clone(&self.inner), locator: Rc::clone(&self.locator) }
    }
}

impl<T: Comp> Default for Store<T> {
    fn default() -> Self { Self::new(Config::default()) }
}

impl<T: Comp> Store<T> {
    /// Creates a store with the given growth policy.
    pub fn new(config: Config) -> Self {
        let inner = Rc::new(RefCell::new(Inner {
            slots: SlotVec::with_capacity(config.initial_capacity),
            marked: Vec::new(),
            config,
        }));
        let locator = Rc::new(StoreLocator { inner: Rc::downgrade(&inner) });
        Self { inner, locator }
    }

    /// Fixes a new slot for `entity` with the default payload,
    /// returning its offset.
    pub fn fix(&self, entity: EntityId) -> usize { self.fix_with(entity, T::default()) }

    /// Fixes a new slot for `entity` with an explicit payload,
    /// returning its offset.
    ///
    /// The new slot is live even if `on_create` panics; the panic is caught
    /// and logged.
    pub fn fix_with(&self, entity: EntityId, value: T) -> usize {
        let mut borrow = self.inner.borrow_mut();
        let inner = &mut *borrow;

        let pos = inner.slots.len();
        let capacity = inner.slots.capacity();
        let edge = (capacity as f64 * inner.config.growth_trigger).floor() as usize;
        if pos > edge || pos >= capacity {
            let grown = (capacity as f64 * inner.config.growth_rate).round() as usize;
            inner.slots.reserve_to((pos + 1).max(grown));
        }

        let version = inner.slots.fix(entity, value);
        let handle = pool::acquire();
        handle.allocate(Rc::clone(&self.locator) as Rc<dyn Locator>, pos, version);
        inner.slots.set_handle(pos, handle);

        let value = inner.slots.value_mut(pos).expect("slot was fixed above");
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| value.on_create(entity))) {
            log::error!(
                "{} on_create panicked for entity {entity}: {}",
                DbgTypeId::of::<T>(),
                util::panic_payload(payload.as_ref()),
            );
        }

        pos
    }

    /// Releases the slot at `offset`.
    ///
    /// Returns `false` without side effects if `offset` is out of the
    /// allocated range or the slot was already released. The payload stays in
    /// place until the next [`rearrange`](Self::rearrange); the slot's version
    /// survives so a later overwrite invalidates lingering outside handles.
    pub fn release(&self, offset: usize) -> bool {
        let mut borrow = self.inner.borrow_mut();
        let inner = &mut *borrow;

        let entity = match inner.slots.meta(offset) {
            Some(meta) if meta.handle.is_some() => meta.entity,
            _ => return false,
        };

        let value = inner.slots.value_mut(offset).expect("allocated slots hold a payload");
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| value.on_destroy(entity))) {
            log::error!(
                "{} on_destroy panicked for entity {entity}: {}",
                DbgTypeId::of::<T>(),
                util::panic_payload(payload.as_ref()),
            );
        }

        let meta = inner.slots.meta_mut(offset).expect("bounds checked above");
        meta.revision = 0;
        meta.entity = 0;
        let handle = meta.handle.take().expect("checked above");
        handle.invalidate();
        pool::release(handle);

        inner.marked.push(offset);
        true
    }

    /// Compacts the dense prefix.
    ///
    /// Every slot released since the last pass is dropped; live tail slots
    /// move into the holes and their handles' offsets are rewritten in place.
    /// Afterwards live slots occupy exactly `[0, len)`.
    pub fn rearrange(&self) {
        let mut borrow = self.inner.borrow_mut();
        let inner = &mut *borrow;

        if inner.marked.is_empty() {
            return;
        }

        inner.marked.sort_unstable();
        let released = inner.marked.len();
        let mut moved = 0_usize;

        // Walking holes from the highest offset down, paired with tail offsets
        // also moving inward, each step moves a live slot into a hole and no
        // hole is touched twice.
        for (step, &hole) in inner.marked.iter().rev().enumerate() {
            let tail = inner.slots.len() - 1 - step;
            inner.slots.drop_value(hole);
            if hole >= tail {
                continue; // the hole is already at the trimmed tail
            }
            inner.slots.move_slot(tail, hole);
            let meta = inner.slots.meta(hole).expect("hole < tail < len");
            meta.handle.as_ref().expect("moved slots are live").relocate(hole);
            moved += 1;
        }

        inner.slots.shrink_by(released);
        inner.marked.clear();
        log::trace!("{}: compacted {released} slots, moved {moved}", DbgTypeId::of::<T>());
    }

    /// Grows capacity by `count` slots without fixing any; returns `count`.
    pub fn expand(&self, count: usize) -> usize {
        let mut borrow = self.inner.borrow_mut();
        let target = borrow.slots.capacity() + count;
        borrow.slots.reserve_to(target);
        count
    }

    /// Number of fixed slots, released-but-uncompacted ones included.
    pub fn len(&self) -> usize { self.inner.borrow().slots.len() }

    /// Whether no slots are fixed.
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Materialized slot capacity.
    pub fn capacity(&self) -> usize { self.inner.borrow().slots.capacity() }

    /// Number of released slots awaiting compaction.
    pub fn pending_cleanup(&self) -> usize { self.inner.borrow().marked.len() }

    /// The owning entity of the slot at `offset`, or `0` if out of range.
    pub fn entity_at(&self, offset: usize) -> EntityId {
        self.inner.borrow().slots.meta(offset).map_or(0, |meta| meta.entity)
    }

    /// The in-slot handle at `offset`, or `None` if out of range or released.
    pub fn handle_at(&self, offset: usize) -> Option<Handle> {
        self.inner.borrow().slots.meta(offset).and_then(|meta| meta.handle.clone())
    }

    /// A typed ref to the live slot at `offset`.
    pub fn ref_at(&self, offset: usize) -> Option<TypedRef<T>> {
        self.handle_at(offset).map(|handle| TypedRef::from_parts(handle, self.clone()))
    }

    /// The type-erased gateway shared by this store's handles.
    pub fn locator(&self) -> Rc<dyn Locator> { Rc::clone(&self.locator) as Rc<dyn Locator> }

    /// Whether `handle` was issued by this store.
    fn owns(&self, handle: &Handle) -> bool {
        match handle.locator() {
            Some(locator) => {
                Rc::as_ptr(&locator) as *const () == Rc::as_ptr(&self.locator) as *const ()
            }
            None => false,
        }
    }

    /// Read guard over the payload referenced by `handle`.
    ///
    /// Returns `None` unless the handle was issued by this store and still
    /// validates. Reading leaves the slot revision untouched.
    pub fn read(&self, handle: &Handle) -> Option<cell::Ref<'_, T>> {
        if !self.owns(handle) {
            return None;
        }
        let borrow = self.inner.borrow();
        let offset = handle.offset();
        match borrow.slots.meta(offset) {
            Some(meta) if meta.version == handle.version() => {}
            _ => return None,
        }
        cell::Ref::filter_map(borrow, |inner| inner.slots.value(offset)).ok()
    }

    /// Write guard over the payload referenced by `handle`;
    /// bumps the slot revision.
    ///
    /// Returns `None` unless the handle was issued by this store and still
    /// validates.
    pub fn write(&self, handle: &Handle) -> Option<cell::RefMut<'_, T>> {
        if !self.owns(handle) {
            return None;
        }
        let mut borrow = self.inner.borrow_mut();
        let offset = handle.offset();
        match borrow.slots.meta_mut(offset) {
            Some(meta) if meta.version == handle.version() => {
                meta.revision = slots::bump(meta.revision);
            }
            _ => return None,
        }
        cell::RefMut::filter_map(borrow, |inner| inner.slots.value_mut(offset)).ok()
    }

    /// Visits every live slot in offset order.
    pub fn for_each(&self, mut f: impl FnMut(usize, EntityId, &T)) {
        let borrow = self.inner.borrow();
        for offset in 0..borrow.slots.len() {
            let meta = borrow.slots.meta(offset).expect("offset < len");
            if meta.handle.is_none() {
                continue; // released, awaiting compaction
            }
            let value = borrow.slots.value(offset).expect("live slots hold a payload");
            f(offset, meta.entity, value);
        }
    }

    /// Visits every live slot mutably in offset order,
    /// bumping each visited slot's revision.
    pub fn for_each_mut(&self, mut f: impl FnMut(usize, EntityId, &mut T)) {
        let mut borrow = self.inner.borrow_mut();
        let inner = &mut *borrow;
        for offset in 0..inner.slots.len() {
            let entity = {
                let meta = inner.slots.meta_mut(offset).expect("offset < len");
                if meta.handle.is_none() {
                    continue;
                }
                meta.revision = slots::bump(meta.revision);
                meta.entity
            };
            let value = inner.slots.value_mut(offset).expect("live slots hold a payload");
            f(offset, entity, value);
        }
    }
}

/// The per-store implementation of [`Locator`].
///
/// Holds only a weak back-reference to the store interior; every operation
/// degrades to an empty result once the store is gone.
pub struct StoreLocator<T: Comp> {
    inner: Weak<RefCell<Inner<T>>>,
}

impl<T: Comp> StoreLocator<T> {
    /// Rebuilds the typed store facade, if the interior is still alive.
    pub(crate) fn upgrade(self: Rc<Self>) -> Option<Store<T>> {
        let inner = self.inner.upgrade()?;
        Some(Store { inner, locator: self })
    }
}

impl<T: Comp> Locator for StoreLocator<T> {
    fn not_null(&self, version: u32, offset: usize) -> bool {
        let Some(inner) = self.inner.upgrade() else { return false };
        let borrow = inner.borrow();
        match borrow.slots.meta(offset) {
            Some(meta) => meta.version == version,
            None => false,
        }
    }

    fn comp_ty(&self) -> DbgTypeId { DbgTypeId::of::<T>() }

    fn entity_at(&self, offset: usize) -> EntityId {
        let Some(inner) = self.inner.upgrade() else { return 0 };
        let entity = inner.borrow().slots.meta(offset).map_or(0, |meta| meta.entity);
        entity
    }

    fn handle_at(&self, offset: usize) -> Option<Handle> {
        let inner = self.inner.upgrade()?;
        let handle = inner.borrow().slots.meta(offset).and_then(|meta| meta.handle.clone());
        handle
    }

    fn revision_at(&self, offset: usize) -> u32 {
        let Some(inner) = self.inner.upgrade() else { return 0 };
        let revision = inner.borrow().slots.meta(offset).map_or(0, |meta| meta.revision);
        revision
    }

    fn bump_revision(&self, offset: usize) -> u32 {
        let Some(inner) = self.inner.upgrade() else { return 0 };
        let mut borrow = inner.borrow_mut();
        match borrow.slots.meta_mut(offset) {
            Some(meta) => {
                meta.revision = slots::bump(meta.revision);
                meta.revision
            }
            None => 0,
        }
    }

    fn as_any_rc(self: Rc<Self>) -> Rc<dyn Any> { self }
}

/// Object-safe surface of a store, used by the type-erased registry.
pub trait AnyStore {
    /// The store's type-erased gateway.
    fn locator(&self) -> Rc<dyn Locator>;

    /// Fixes a slot for `entity` with the default payload,
    /// returning its offset.
    fn fix(&self, entity: EntityId) -> usize;

    /// Releases the slot at `offset`; `false` on out-of-range or
    /// double release.
    fn release(&self, offset: usize) -> bool;

    /// Compacts the store.
    fn rearrange(&self);

    /// Number of fixed slots.
    fn len(&self) -> usize;

    /// Whether no slots are fixed.
    fn is_empty(&self) -> bool { self.len() == 0 }

    /// Identity of the store's element type.
    fn comp_ty(&self) -> DbgTypeId;

    /// Downcast support for recovering the typed store.
    fn as_any(&self) -> &dyn Any;
}

static_assertions::assert_obj_safe!(AnyStore);

impl<T: Comp> AnyStore for Store<T> {
    fn locator(&self) -> Rc<dyn Locator> { Store::locator(self) }

    fn fix(&self, entity: EntityId) -> usize { Store::fix(self, entity) }

    fn release(&self, offset: usize) -> bool { Store::release(self, offset) }

    fn rearrange(&self) { Store::rearrange(self) }

    fn len(&self) -> usize { Store::len(self) }

    fn comp_ty(&self) -> DbgTypeId { DbgTypeId::of::<T>() }

    fn as_any(&self) -> &dyn Any { self }
}
