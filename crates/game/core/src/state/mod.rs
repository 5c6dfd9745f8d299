//! World state owned by the simulation: actors, objects and their shared types.

mod animation;
mod common;
mod entity;
mod object;
mod orientation;
mod world;

pub use animation::{Animation, AnimationState};
pub use common::{EntityId, Position, ResourceMeter, WorldPos};
pub use entity::{
    Capabilities, CombatModifiers, Entity, Equipment, Faction, ForbiddenActions, Hand, Inventory,
    ItemId, ItemStack, PerkId, Skill, Skills, Stats, Weapon,
};
pub use object::{Lock, Trap, Usable, WorldObject};
pub use orientation::Orientation;
pub use world::World;
