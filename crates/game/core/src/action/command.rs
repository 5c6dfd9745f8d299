//! Typed parameters for each action variant.
//!
//! Every command the UI, a brain or a chain issues is an [`ActionCommand`].
//! Its variant decides which action the registry builds, so a command can
//! never reach an action with the wrong parameter shape at run time except
//! through a hand-built mismatch, which `init` rejects.

use crate::env::Path;
use crate::persist::{Element, PersistError};
use crate::state::{EntityId, ItemId, Orientation, PerkId, Position};

use super::ActionKind;

/// Where a movement goes.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Destination {
    /// Follow a precomputed path.
    Path(Path),

    /// Walk to a tile. With `include_last` false the walker stops next to it.
    Tile { tile: Position, include_last: bool },
}

impl Destination {
    pub const fn tile(tile: Position) -> Self {
        Self::Tile {
            tile,
            include_last: true,
        }
    }

    pub const fn next_to(tile: Position) -> Self {
        Self::Tile {
            tile,
            include_last: false,
        }
    }
}

/// Target of a perk, spell or item use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActionTarget {
    Entity(EntityId),
    Tile(Position),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PerkParams {
    pub perk: PerkId,
    pub target: ActionTarget,
    /// Skip the AP part of the perk's cost (granted uses).
    pub free: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemUseParams {
    pub item: ItemId,
    pub target: ActionTarget,
}

/// How long an idle behaviour (wander, look around) keeps going.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WanderDuration {
    Infinite,
    /// Finishes after the first walk or turn.
    Once,
    Seconds(f32),
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WanderParams {
    /// Tile to wander around. `None` captures the owner's tile on the first update.
    pub centre: Option<Position>,
    pub radius: i32,
    /// Percent chance, rolled once per second, of starting a new walk.
    pub chance_to_move: u32,
    pub duration: WanderDuration,
    /// Only walk while the player can see the wanderer.
    pub visible_only: bool,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LookAroundParams {
    /// Percent chance, rolled once per second, of turning one step.
    pub chance_to_turn: u32,
    pub duration: WanderDuration,
    /// Facings the owner never turns to.
    #[cfg_attr(feature = "serde", serde(default))]
    pub forbidden: Vec<Orientation>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChainParams {
    /// Entity that performs the steps. `None` means the chain's owner.
    pub performer: Option<EntityId>,
    pub steps: Vec<ActionCommand>,
}

/// A command: one action variant plus its parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActionCommand {
    MoveTo(Destination),
    Attack { target: EntityId },
    MockAttack { target: EntityId },
    UsePerk(PerkParams),
    CastSpell(PerkParams),
    UseInventoryItem(ItemUseParams),
    UseGameObject { object: EntityId },
    Lockpick { object: EntityId },
    DisarmTrap { object: EntityId },
    PickUp { object: EntityId },
    TalkTo { target: EntityId },
    Wait { seconds: f32 },
    Wander(WanderParams),
    LookAround(LookAroundParams),
    LookAt { tile: Position },
    Shout { text: String },
    DisableAi,
    EnableAi,
    Chain(ChainParams),
}

impl ActionCommand {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::MoveTo(_) => ActionKind::MoveTo,
            Self::Attack { .. } => ActionKind::Attack,
            Self::MockAttack { .. } => ActionKind::MockAttack,
            Self::UsePerk(_) => ActionKind::UsePerk,
            Self::CastSpell(_) => ActionKind::CastSpell,
            Self::UseInventoryItem(_) => ActionKind::UseInventoryItem,
            Self::UseGameObject { .. } => ActionKind::UseGameObject,
            Self::Lockpick { .. } => ActionKind::Lockpick,
            Self::DisarmTrap { .. } => ActionKind::DisarmTrap,
            Self::PickUp { .. } => ActionKind::PickUp,
            Self::TalkTo { .. } => ActionKind::TalkTo,
            Self::Wait { .. } => ActionKind::Wait,
            Self::Wander(_) => ActionKind::Wander,
            Self::LookAround(_) => ActionKind::LookAround,
            Self::LookAt { .. } => ActionKind::LookAt,
            Self::Shout { .. } => ActionKind::Shout,
            Self::DisableAi => ActionKind::DisableAi,
            Self::EnableAi => ActionKind::EnableAi,
            Self::Chain(_) => ActionKind::Chain,
        }
    }

    pub fn move_to(tile: Position) -> Self {
        Self::MoveTo(Destination::tile(tile))
    }

    pub fn attack(target: EntityId) -> Self {
        Self::Attack { target }
    }

    pub fn wait(seconds: f32) -> Self {
        Self::Wait { seconds }
    }

    /// Persisted form of a command that has not started yet.
    ///
    /// Uses the same tag and attributes as the matching action's
    /// `write_params`, so the registry can restore either.
    pub fn to_element(&self) -> Element {
        let mut out = Element::new(self.kind().as_ref());
        match self {
            Self::MoveTo(destination) => {
                let (tile, include_last) = match destination {
                    Destination::Path(path) => (path.last().map(|s| s.tile), true),
                    Destination::Tile { tile, include_last } => (Some(*tile), *include_last),
                };
                if let Some(tile) = tile {
                    out.set_tile(tile);
                }
                if !include_last {
                    out.set("include_last", false);
                }
            }
            Self::Attack { target } | Self::MockAttack { target } | Self::TalkTo { target } => {
                out.set_entity("target", *target);
            }
            Self::UseGameObject { object }
            | Self::Lockpick { object }
            | Self::DisarmTrap { object }
            | Self::PickUp { object } => out.set_entity("target", *object),
            Self::UsePerk(params) | Self::CastSpell(params) => {
                out.set("perk", params.perk.0);
                write_target(&mut out, params.target);
                if params.free {
                    out.set("free", true);
                }
            }
            Self::UseInventoryItem(params) => {
                out.set("item", params.item.0);
                write_target(&mut out, params.target);
            }
            Self::Wait { seconds } => out.set("seconds", seconds),
            Self::Wander(params) => {
                out.set("radius", params.radius);
                out.set("chance_to_move", params.chance_to_move);
                write_duration(&mut out, params.duration);
                out.set("visible_only", params.visible_only);
                if let Some(centre) = params.centre {
                    out.set("centre_x", centre.x);
                    out.set("centre_y", centre.y);
                }
            }
            Self::LookAround(params) => {
                out.set("chance_to_turn", params.chance_to_turn);
                write_duration(&mut out, params.duration);
                write_orientations(&mut out, "forbidden", &params.forbidden);
            }
            Self::LookAt { tile } => out.set_tile(*tile),
            Self::Shout { text } => out.set("text", text),
            Self::DisableAi | Self::EnableAi => {}
            Self::Chain(params) => {
                if let Some(performer) = params.performer {
                    out.set_entity("performer", performer);
                }
                for step in &params.steps {
                    out.push(step.to_element());
                }
            }
        }
        out
    }
}

pub(crate) fn write_duration(out: &mut Element, duration: WanderDuration) {
    match duration {
        WanderDuration::Infinite => out.set("duration", "infinite"),
        WanderDuration::Once => out.set("duration", "once"),
        WanderDuration::Seconds(secs) => out.set("duration", secs),
    }
}

/// Missing means infinite.
pub(crate) fn read_duration(input: &Element) -> Result<WanderDuration, PersistError> {
    Ok(match input.get("duration") {
        None | Some("infinite") => WanderDuration::Infinite,
        Some("once") => WanderDuration::Once,
        Some(_) => WanderDuration::Seconds(input.require("duration")?),
    })
}

/// Comma separated facing names; omitted when empty.
pub(crate) fn write_orientations(out: &mut Element, key: &str, facings: &[Orientation]) {
    if facings.is_empty() {
        return;
    }
    let names: Vec<&str> = facings.iter().map(AsRef::as_ref).collect();
    out.set(key, names.join(","));
}

pub(crate) fn read_orientations(input: &Element, key: &str) -> Result<Vec<Orientation>, PersistError> {
    let Some(raw) = input.get(key) else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .filter(|name| !name.is_empty())
        .map(|name| {
            name.parse().map_err(|_| PersistError::InvalidAttribute {
                element: input.name.clone(),
                attribute: key.to_owned(),
                value: raw.to_owned(),
            })
        })
        .collect()
}

pub(crate) fn write_target(out: &mut Element, target: ActionTarget) {
    match target {
        ActionTarget::Entity(id) => out.set_entity("target", id),
        ActionTarget::Tile(tile) => out.set_tile(tile),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_variant() {
        assert_eq!(
            ActionCommand::move_to(Position::new(1, 1)).kind(),
            ActionKind::MoveTo
        );
        assert_eq!(
            ActionCommand::Chain(ChainParams {
                performer: None,
                steps: vec![ActionCommand::wait(1.0)],
            })
            .kind(),
            ActionKind::Chain
        );
    }

    #[test]
    fn forbidden_facings_survive_the_element_form() {
        let element = ActionCommand::LookAround(LookAroundParams {
            chance_to_turn: 30,
            duration: WanderDuration::Seconds(4.0),
            forbidden: vec![Orientation::Up, Orientation::DownLeft],
        })
        .to_element();

        assert_eq!(element.name, "look_around");
        assert_eq!(element.get("forbidden"), Some("up,down_left"));
        assert_eq!(read_duration(&element), Ok(WanderDuration::Seconds(4.0)));
        assert_eq!(
            read_orientations(&element, "forbidden"),
            Ok(vec![Orientation::Up, Orientation::DownLeft])
        );

        let broken = Element::new("look_around").with("forbidden", "up,sideways");
        assert!(read_orientations(&broken, "forbidden").is_err());
    }
}
