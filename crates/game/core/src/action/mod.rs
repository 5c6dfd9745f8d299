//! Action domain - resumable per-entity behaviours.
//!
//! # Architecture
//!
//! - `ActionKind`: closed set of variant tags, also the persisted tag
//! - `ActionCommand`: typed parameters, one variant per kind
//! - [`Action`]: the state machine every variant implements
//! - `ActionRegistry`: tag -> factory, used by the container and by restore
//! - `ActionContainer`: the live actions of one entity, slot rules, pooling
//!
//! Movement is the primitive ([`MoveTo`]). Interaction verbs are built from
//! [`Approach`], which walks into range and then runs a pluggable
//! [`Resolution`]. Attacks embed a mover directly because their range test
//! and multi-frame resolution do not fit the single-step template.
//!
//! # Module Structure
//!
//! - `kind`, `command`, `error`, `target`: shared vocabulary
//! - `movement`, `attack`, `perk`, `approach`, `interact`, `item`: verbs
//! - `idle`, `wander`, `chain`: utility and composite actions
//! - `container`, `registry`: ownership and construction

mod approach;
mod attack;
mod chain;
mod command;
mod container;
mod error;
mod idle;
mod interact;
mod item;
mod kind;
mod movement;
mod perk;
mod registry;
mod target;
mod wander;

pub use approach::{Approach, Resolution};
pub use attack::{Attack, MockAttack, StrikeOptions};
pub use chain::Chain;
pub use command::{
    ActionCommand, ActionTarget, ChainParams, Destination, ItemUseParams, LookAroundParams,
    PerkParams, WanderDuration, WanderParams,
};
pub use container::{ActionContainer, ActionHandle};
pub(crate) use container::save_action;
pub use error::ActionError;
pub use idle::{LookAround, LookAt, SetBrainEnabled, Shout, Wait};
pub use interact::{DisarmTrap, Lockpick, PickUp, TalkTo, UseGameObject};
pub use item::UseInventoryItem;
pub use kind::ActionKind;
pub use movement::{Arrival, MoveTo};
pub use perk::UsePerk;
pub use registry::{ActionFactory, ActionRegistry};
pub use target::{Binding, TargetRef};
pub use wander::Wander;

use std::fmt;

use crate::env::SimContext;
use crate::persist::{Element, PersistError};
use crate::state::EntityId;

/// Exclusivity key of an attached action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActionSlot {
    /// At most one attached action per container holds this key.
    Exclusive(ActionKind),
    /// Any number may run side by side.
    Unbounded,
}

/// A resumable unit of behaviour bound to one owner at a time.
///
/// States: uninitialised, active, paused, finished. `init` fully resets the
/// instance, so pooled instances are indistinguishable from fresh ones.
pub trait Action: fmt::Debug + Send {
    fn kind(&self) -> ActionKind;

    /// Binds the action to `owner` and starts the command.
    ///
    /// Fails only on configuration faults: wrong parameters, an owner without
    /// the required capabilities, unknown catalog ids.
    fn init(
        &mut self,
        owner: EntityId,
        command: &ActionCommand,
        ctx: &mut SimContext<'_>,
    ) -> Result<(), ActionError>;

    /// Advances one frame. No-op while paused or finished.
    fn update(&mut self, dt: f32, ctx: &mut SimContext<'_>);

    fn is_finished(&self) -> bool;

    fn is_paused(&self) -> bool;

    /// Requests a pause. Movement honours it at the next tile boundary.
    fn pause(&mut self);

    fn resume(&mut self, ctx: &mut SimContext<'_>);

    /// While true, no other action of the owner may start during its turn.
    fn is_blocking_in_combat(&self) -> bool;

    fn slot(&self) -> ActionSlot {
        ActionSlot::Exclusive(self.kind())
    }

    fn is_verb(&self) -> bool {
        self.kind().is_verb()
    }

    /// Cleanup when detached. Runs once per attach, even if never started.
    fn on_remove(&mut self, _ctx: &mut SimContext<'_>) {}

    fn write_params(&self, out: &mut Element);

    /// Parses persisted parameters and re-inits against `owner`.
    fn read_params(
        &mut self,
        owner: EntityId,
        input: &Element,
        ctx: &mut SimContext<'_>,
    ) -> Result<(), PersistError>;
}

/// Fails unless `owner` exists and has the capabilities `kind` needs.
pub(crate) fn check_owner(
    kind: ActionKind,
    owner: EntityId,
    ctx: &SimContext<'_>,
) -> Result<(), ActionError> {
    let entity = ctx
        .entity(owner)
        .ok_or(ActionError::UnknownEntity(owner))?;
    let required = kind.required_capabilities();
    if !entity.has(required) {
        return Err(ActionError::IncompatibleOwner {
            kind,
            owner,
            required,
        });
    }
    Ok(())
}

pub(crate) fn mismatch(expected: ActionKind, command: &ActionCommand) -> ActionError {
    ActionError::ParameterMismatch {
        expected,
        got: command.kind(),
    }
}
