//! A sparse-component ECS core.
//!
//! slotec is the storage heart of an Entity-Component-System runtime:
//! densely packed per-type component stores, stable versioned handles over
//! storage that compacts underneath them, and a type → store manager that
//! multiplexes component lifecycles.
//!
//! # Storage model
//! Each component type `T` lives in its own [`Store<T>`]: a growable array
//! whose prefix `[0, len)` is always dense. Creating a component *fixes* a
//! slot at the tail; destroying one only *marks* the slot. The holes are
//! reclaimed in a batch by [`Store::rearrange`] (usually fanned out through
//! [`Manager::cleanup`] at a tick boundary), which moves live tail slots into
//! the holes.
//!
//! # Handles
//! Every live slot owns a [`Handle`] body shared with all user-held clones.
//! When compaction moves a slot, the store rewrites the shared body's offset
//! in place, so outside references keep working without any scanning. Two
//! counters disambiguate the rest:
//!
//! - the **version** increments each time a physical slot is fixed, so a
//!   handle captured before the slot was reused can never validate again;
//! - the **revision** increments on every mutable access, so change-detection
//!   machinery can tell *mutated* apart from *reused*.
//!
//! Raw integer offsets cached outside a handle are invalidated by compaction;
//! cache the handle instead.
//!
//! # Typed and type-erased access
//! [`TypedRef<T>`] is the fast path: it dispatches statically through the
//! concrete store. [`UntypedRef`] and the [`Locator`] gateway serve the
//! type-erased paths (destruction by opaque handle, mixed-type iteration);
//! the explicit downcast back to a typed reference is checked against the
//! store's element type.
//!
//! # Threading
//! The core is single-threaded and cooperative: all mutations happen on the
//! tick thread, nothing suspends, and events are delivered synchronously in
//! program order. Component hooks and signal handlers may panic; the core
//! catches, logs (via [`log`]) and continues.
//!
//! ```
//! use slotec::{Comp, Manager};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Position {
//!     x: f32,
//!     y: f32,
//! }
//! impl Comp for Position {}
//!
//! let mut manager = Manager::new();
//! let position = manager.create_with(1, Position { x: 15.0, y: 25.0 });
//! position.get_mut().x = 30.0;
//! assert_eq!(*position.get(), Position { x: 30.0, y: 25.0 });
//!
//! manager.destroy(position.handle());
//! assert!(!position.is_valid());
//! manager.cleanup();
//! ```

#![cfg_attr(doc, warn(missing_docs))]

pub mod comp;
pub use comp::{Comp, EntityId};

pub mod handle;
pub use handle::Handle;

pub mod locator;
pub use locator::Locator;

pub mod manager;
pub use manager::{ComponentEvent, Manager};

pub mod refs;
pub use refs::{TypedRef, UntypedRef};

pub mod signal;
pub use signal::Signal;

pub mod store;
pub use store::{AnyStore, Config, Store};

#[cfg(any(test, feature = "internal-bench"))]
pub mod test_util;

pub mod util;
