//! Shared fixtures for tests and benchmarks.

#![allow(missing_docs)]

use std::cell::Cell;
use std::rc::Rc;

use crate::comp::{Comp, EntityId};

/// 2D position payload.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self { Self { x, y } }
}

impl Comp for Position {}

/// 2D velocity payload.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Velocity {
    pub dx: f32,
    pub dy: f32,
}

impl Velocity {
    pub fn new(dx: f32, dy: f32) -> Self { Self { dx, dy } }
}

impl Comp for Velocity {}

/// Hit-point payload.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Health {
    pub current: i32,
    pub max:     i32,
}

impl Comp for Health {}

/// Counters observed by [`Lifecycle`] hooks, shared with the test body.
#[derive(Debug, Default)]
pub struct LifeProbe {
    pub created:   Cell<u32>,
    pub destroyed: Cell<u32>,
}

/// Records lifecycle hook invocations.
#[derive(Debug, Default, Clone)]
pub struct Lifecycle {
    pub probe:            Option<Rc<LifeProbe>>,
    pub on_create_called: bool,
}

impl Lifecycle {
    pub fn probed(probe: &Rc<LifeProbe>) -> Self {
        Self { probe: Some(Rc::clone(probe)), on_create_called: false }
    }
}

impl Comp for Lifecycle {
    fn on_create(&mut self, _entity: EntityId) {
        self.on_create_called = true;
        if let Some(probe) = &self.probe {
            probe.created.set(probe.created.get() + 1);
        }
    }

    fn on_destroy(&mut self, _entity: EntityId) {
        if let Some(probe) = &self.probe {
            probe.destroyed.set(probe.destroyed.get() + 1);
        }
    }
}

/// Panics in the selected hooks; exercises fault isolation.
#[derive(Debug, Default, Clone, Copy)]
pub struct Faulty {
    pub panic_on_create:  bool,
    pub panic_on_destroy: bool,
}

impl Comp for Faulty {
    fn on_create(&mut self, _entity: EntityId) {
        if self.panic_on_create {
            panic!("on_create fault");
        }
    }

    fn on_destroy(&mut self, _entity: EntityId) {
        if self.panic_on_destroy {
            panic!("on_destroy fault");
        }
    }
}
