//! Resolve-or-defer references to other entities.
//!
//! Actions store target ids, never references. A restored action may name a
//! target that the loader has not created yet, so the first successful
//! resolution is reported separately and the action runs its one-time setup
//! then.

use crate::state::{EntityId, Position, World};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Binding {
    /// Never seen. May still appear.
    Pending,
    /// Resolved for the first time during this call.
    Fresh(Position),
    /// Resolved before and still present.
    Ready(Position),
    /// Resolved before but no longer in the world.
    Gone,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetRef {
    id: EntityId,
    bound: bool,
}

impl TargetRef {
    pub const fn new(id: EntityId) -> Self {
        Self { id, bound: false }
    }

    pub const fn id(&self) -> EntityId {
        self.id
    }

    pub const fn is_bound(&self) -> bool {
        self.bound
    }

    pub fn resolve(&mut self, world: &World) -> Binding {
        match (world.tile_of(self.id), self.bound) {
            (Some(tile), true) => Binding::Ready(tile),
            (Some(tile), false) => {
                self.bound = true;
                Binding::Fresh(tile)
            }
            (None, true) => Binding::Gone,
            (None, false) => Binding::Pending,
        }
    }
}
