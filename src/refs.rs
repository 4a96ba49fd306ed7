//! User-facing component references.
//!
//! Both wrappers borrow the in-slot [`Handle`]; the slot owns its lifecycle.
//! Once the slot is released the shared body is zeroed, so every accessor
//! here fails fast: the panicking accessors abort on first use and the
//! `try_` variants return `None`.

use std::any::TypeId;
use std::cell::{Ref, RefMut};
use std::fmt;

use crate::comp::{Comp, EntityId};
use crate::handle::Handle;
use crate::store::{Store, StoreLocator};
use crate::util::DbgTypeId;

/// A typed reference to one component slot.
pub struct TypedRef<T: Comp> {
    handle: Handle,
    store:  Store<T>,
}

impl<T: Comp> Clone for TypedRef<T> {
    fn clone(&self) -> Self {
        Self { handle: self.handle.clone(), store: self.store.clone() }
    }
}

impl<T: Comp> TypedRef<T> {
    pub(crate) fn from_parts(handle: Handle, store: Store<T>) -> Self { Self { handle, store } }

    /// Recovers the typed reference from a handle.
    ///
    /// # Panics
    /// Panics if the handle is invalid or its store's element type is not `T`.
    pub fn new(handle: Handle) -> Self {
        match Self::try_new(handle) {
            Some(typed) => typed,
            None => panic!("handle does not reference a live {} store", DbgTypeId::of::<T>()),
        }
    }

    /// Non-panicking variant of [`new`](Self::new).
    pub fn try_new(handle: Handle) -> Option<Self> {
        let locator = handle.locator()?;
        let locator = locator.as_any_rc().downcast::<StoreLocator<T>>().ok()?;
        let store = locator.upgrade()?;
        Some(Self { handle, store })
    }

    /// Read-only access to the payload. Leaves the slot revision untouched.
    ///
    /// # Panics
    /// Panics if the handle no longer validates.
    pub fn get(&self) -> Ref<'_, T> {
        match self.try_get() {
            Some(value) => value,
            None => panic!("dereferenced an invalidated {} ref", DbgTypeId::of::<T>()),
        }
    }

    /// Non-panicking variant of [`get`](Self::get).
    pub fn try_get(&self) -> Option<Ref<'_, T>> { self.store.read(&self.handle) }

    /// Mutable access to the payload; bumps the slot revision.
    ///
    /// # Panics
    /// Panics if the handle no longer validates.
    pub fn get_mut(&self) -> RefMut<'_, T> {
        match self.try_get_mut() {
            Some(value) => value,
            None => panic!("dereferenced an invalidated {} ref", DbgTypeId::of::<T>()),
        }
    }

    /// Non-panicking variant of [`get_mut`](Self::get_mut).
    pub fn try_get_mut(&self) -> Option<RefMut<'_, T>> { self.store.write(&self.handle) }

    /// The borrowed handle.
    pub fn handle(&self) -> &Handle { &self.handle }

    /// Whether the referenced slot is still live.
    pub fn is_valid(&self) -> bool { self.handle.is_valid() }

    /// The owning entity, or `0` when invalid.
    pub fn entity(&self) -> EntityId { self.handle.entity() }

    /// The current slot revision, or `0` when invalid.
    pub fn revision(&self) -> u32 { self.handle.revision() }

    /// Erases the element type.
    pub fn untyped(&self) -> UntypedRef { UntypedRef::new(self.handle.clone()) }
}

impl<T: Comp> fmt::Debug for TypedRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypedRef").field(&self.handle).finish()
    }
}

/// A type-erased reference to one component slot.
#[derive(Clone)]
pub struct UntypedRef {
    handle: Handle,
}

impl UntypedRef {
    /// Wraps a handle without inspecting it.
    pub fn new(handle: Handle) -> Self { Self { handle } }

    /// The borrowed handle.
    pub fn handle(&self) -> &Handle { &self.handle }

    /// Whether the referenced slot is still live.
    pub fn is_valid(&self) -> bool { self.handle.is_valid() }

    /// The owning entity, or `0` when invalid.
    pub fn entity(&self) -> EntityId { self.handle.entity() }

    /// The current slot revision, or `0` when invalid.
    pub fn revision(&self) -> u32 { self.handle.revision() }

    /// The element type of the referenced store, if the handle is allocated.
    pub fn comp_ty(&self) -> Option<DbgTypeId> {
        self.handle.locator().map(|locator| locator.comp_ty())
    }

    /// Whether the referenced store's element type is `T`.
    pub fn is<T: Comp>(&self) -> bool {
        match self.handle.locator() {
            Some(locator) => locator.is_comp(TypeId::of::<T>()),
            None => false,
        }
    }

    /// Downcasts to a typed reference.
    ///
    /// # Panics
    /// Panics if the element type is not `T` or the handle is invalid.
    pub fn typed<T: Comp>(&self) -> TypedRef<T> { TypedRef::new(self.handle.clone()) }

    /// Non-panicking variant of [`typed`](Self::typed).
    pub fn try_typed<T: Comp>(&self) -> Option<TypedRef<T>> {
        TypedRef::try_new(self.handle.clone())
    }
}

impl PartialEq for UntypedRef {
    /// Identity equality: two refs are equal iff they share the same handle
    /// body.
    fn eq(&self, other: &Self) -> bool { self.handle.ptr_eq(&other.handle) }
}

impl Eq for UntypedRef {}

impl fmt::Debug for UntypedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UntypedRef").field(&self.handle).finish()
    }
}
