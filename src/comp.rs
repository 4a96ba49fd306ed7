//! The component contract consumed from user code.
//!
//! A component is a plain data record attached to an entity.
//! The core identifies components by their static type:
//! each type gets its own [`Store`](crate::store::Store),
//! and the [`Manager`](crate::manager::Manager) multiplexes the stores.

/// An opaque 64-bit entity tag assigned by the surrounding entity table.
///
/// The core never allocates or validates entity ids;
/// lookups that miss report the id as `0`.
pub type EntityId = u64;

/// A component payload attachable to entities.
///
/// Implementors are value-type data records.
/// [`Default`] supplies the payload when a slot is fixed without an explicit
/// initial value. Both lifecycle hooks default to no-ops.
///
/// Hooks run synchronously inside fixation and release on the tick thread.
/// They must not reentrantly mutate the store that owns the slot;
/// doing so trips the store's borrow guard immediately.
/// A panicking hook is caught and logged, and the surrounding operation
/// still completes.
pub trait Comp: Default + 'static {
    /// Called once after the slot holding this payload is fixed.
    fn on_create(&mut self, entity: EntityId) { let _ = entity; }

    /// Called once before the slot holding this payload is released.
    fn on_destroy(&mut self, entity: EntityId) { let _ = entity; }
}
