//! Passive world objects: doors, chests, levers and items lying on the ground.

use super::{EntityId, ItemId, ItemStack, Position};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Lock {
    pub locked: bool,
    pub pickable: bool,
    pub level: i32,
    /// Item that opens the lock without a check.
    pub key: Option<ItemId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Trap {
    pub level: i32,
    pub detected: bool,
    pub disarmed: bool,
    pub damage: i32,
}

impl Trap {
    pub fn is_armed(&self) -> bool {
        !self.disarmed
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Usable {
    pub ap_cost: i32,
    /// Log key describing what using the object does ("opened", "pulled").
    pub verb: String,
    pub activated: bool,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorldObject {
    pub id: EntityId,
    pub name: String,
    pub tile: Position,
    /// Solid objects occupy their tile; walkers stop next to them.
    pub solid: bool,
    pub lock: Option<Lock>,
    pub trap: Option<Trap>,
    pub usable: Option<Usable>,
    /// Item stack that can be picked up.
    pub loot: Option<ItemStack>,
}

impl WorldObject {
    pub fn new(id: EntityId, name: impl Into<String>, tile: Position) -> Self {
        Self {
            id,
            name: name.into(),
            tile,
            solid: false,
            lock: None,
            trap: None,
            usable: None,
            loot: None,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_some_and(|l| l.locked)
    }

    pub fn armed_trap(&self) -> Option<Trap> {
        self.trap.filter(Trap::is_armed)
    }

    pub fn unlock(&mut self) {
        if let Some(lock) = &mut self.lock {
            lock.locked = false;
        }
    }

    /// Sets the trap off. It is spent afterwards.
    pub fn spring_trap(&mut self) -> Option<Trap> {
        let trap = self.armed_trap()?;
        if let Some(t) = &mut self.trap {
            t.disarmed = true;
            t.detected = true;
        }
        Some(trap)
    }
}
