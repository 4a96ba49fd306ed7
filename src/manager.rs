//! The type → store registry with component lifecycle events.

use std::any::TypeId;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::comp::{Comp, EntityId};
use crate::handle::Handle;
use crate::refs::TypedRef;
use crate::signal::Signal;
use crate::store::{AnyStore, Config, Store};
use crate::util::DbgTypeId;


/// Argument of the component lifecycle signals.
pub struct ComponentEvent {
    /// The in-slot handle: live for *created*, already invalidated for
    /// *removed*.
    pub handle: Handle,
    /// The owning entity; captured before release for *removed*.
    pub entity: EntityId,
}

/// Multiplexes component types through a uniform store registry.
///
/// Stores are constructed lazily on first use and live for the manager's
/// lifetime. All operations run on the tick thread;
/// [`cleanup`](Self::cleanup) is meant to be called at a tick boundary, never
/// interleaved with fixation or release.
#[derive(Default)]
pub struct Manager {
    stores:  IndexMap<DbgTypeId, Box<dyn AnyStore>>,
    created: Signal<ComponentEvent>,
    removed: Signal<ComponentEvent>,
}

impl Manager {
    /// Creates an empty manager.
    pub fn new() -> Self { Self::default() }

    /// Registers the store for `T` with an explicit growth policy.
    ///
    /// # Panics
    /// Panics if a store for `T` already exists; silently ignoring the policy
    /// would be worse.
    pub fn register<T: Comp>(&mut self, config: Config) -> Store<T> {
        let ty = DbgTypeId::of::<T>();
        assert!(!self.stores.contains_key(&ty), "store for {ty} is already registered");
        let store = Store::<T>::new(config);
        self.stores.insert(ty, Box::new(store.clone()));
        store
    }

    /// The store for `T`, constructed with the default policy on first use.
    ///
    /// # Panics
    /// Panics if the registry entry for `T` holds a different store type,
    /// which indicates registry corruption.
    pub fn store<T: Comp>(&mut self) -> Store<T> {
        let ty = DbgTypeId::of::<T>();
        let entry = self.stores.entry(ty).or_insert_with(|| Box::new(Store::<T>::default()));
        downcast_store::<T>(entry.as_ref()).clone()
    }

    /// The store for `T` if one exists, without constructing it.
    pub fn try_store<T: Comp>(&self) -> Option<Store<T>> {
        let entry = self.stores.get(&TypeId::of::<T>())?;
        Some(downcast_store::<T>(entry.as_ref()).clone())
    }

    /// Type-erased lookup by element type id. Never constructs a store:
    /// a bare type id carries no constructor, so creation always goes through
    /// the typed path.
    pub fn store_dyn(&self, ty: TypeId) -> Option<&dyn AnyStore> {
        self.stores.get(&ty).map(|entry| &**entry)
    }

    /// Whether a store for `T` exists.
    pub fn contains<T: Comp>(&self) -> bool { self.stores.contains_key(&TypeId::of::<T>()) }

    /// Number of registered stores.
    pub fn store_count(&self) -> usize { self.stores.len() }

    /// Whether no store has been registered yet.
    pub fn is_empty(&self) -> bool { self.stores.is_empty() }

    /// Connects a handler to the *created* signal.
    ///
    /// *Created* fires after the slot is live and `on_create` has been
    /// attempted.
    pub fn on_created(&mut self, handler: impl FnMut(&ComponentEvent) + 'static) {
        self.created.connect(handler);
    }

    /// Connects a handler to the *removed* signal.
    ///
    /// *Removed* fires after `on_destroy` and handle invalidation; handlers
    /// see an already-invalid handle plus the entity id captured beforehand.
    pub fn on_removed(&mut self, handler: impl FnMut(&ComponentEvent) + 'static) {
        self.removed.connect(handler);
    }

    /// Creates a `T` component on `entity` with the default payload.
    pub fn create<T: Comp>(&mut self, entity: EntityId) -> TypedRef<T> {
        self.create_with(entity, T::default())
    }

    /// Creates a `T` component on `entity` with an explicit payload.
    pub fn create_with<T: Comp>(&mut self, entity: EntityId, value: T) -> TypedRef<T> {
        let store = self.store::<T>();
        let offset = store.fix_with(entity, value);
        let handle = store.handle_at(offset).expect("the slot fixed above holds its handle");
        self.created.emit(&ComponentEvent { handle: handle.clone(), entity });
        TypedRef::from_parts(handle, store)
    }

    /// Destroys the component behind `handle`.
    ///
    /// # Panics
    /// Panics if the handle is already invalid, or if it belongs to a store
    /// not registered in this manager.
    pub fn destroy(&mut self, handle: &Handle) {
        let locator = handle.locator().expect("destroying an invalidated handle");
        assert!(
            locator.not_null(handle.version(), handle.offset()),
            "destroying a stale handle",
        );

        let ty = locator.comp_ty();
        let store = self
            .stores
            .get(&ty)
            .unwrap_or_else(|| panic!("no store registered for {ty}"));
        assert!(
            Rc::as_ptr(&store.locator()) as *const () == Rc::as_ptr(&locator) as *const (),
            "handle belongs to a {ty} store outside this manager",
        );

        let offset = handle.offset();
        let entity = locator.entity_at(offset);
        let released = store.release(offset);
        debug_assert!(released, "a validated handle must release");
        if released {
            self.removed.emit(&ComponentEvent { handle: handle.clone(), entity });
        }
    }

    /// Compacts every store, in registration order.
    pub fn cleanup(&mut self) {
        for store in self.stores.values() {
            store.rearrange();
        }
    }
}

fn downcast_store<T: Comp>(entry: &dyn AnyStore) -> &Store<T> {
    match entry.as_any().downcast_ref::<Store<T>>() {
        Some(store) => store,
        None => panic!(
            "registry entry for {} holds a {} store",
            DbgTypeId::of::<T>(),
            entry.comp_ty(),
        ),
    }
}
