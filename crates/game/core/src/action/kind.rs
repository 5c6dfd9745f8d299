//! Action kind enumeration - every variant the registry can build.

use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::state::{Capabilities, Entity};

/// Tag of a concrete action variant.
///
/// The snake_case string form is the persisted tag, so renaming a variant
/// breaks existing saves.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, AsRefStr, Display, EnumString,
    EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ActionKind {
    // ========================================================================
    // Movement
    // ========================================================================
    /// Follow a path to a tile.
    MoveTo,

    /// Stroll around a centre tile.
    Wander,

    /// Turn on the spot now and then.
    LookAround,

    // ========================================================================
    // Combat
    // ========================================================================
    Attack,
    /// Attack that rolls but deals no damage and costs no AP.
    MockAttack,
    UsePerk,
    CastSpell,

    // ========================================================================
    // Interaction
    // ========================================================================
    UseInventoryItem,
    UseGameObject,
    Lockpick,
    DisarmTrap,
    PickUp,
    TalkTo,

    // ========================================================================
    // Utility
    // ========================================================================
    Wait,
    LookAt,
    Shout,
    DisableAi,
    EnableAi,

    /// Runs queued sub-commands one after another.
    Chain,
}

impl ActionKind {
    /// Commands a player may issue directly.
    pub const VERBS: &'static [ActionKind] = &[
        ActionKind::MoveTo,
        ActionKind::Attack,
        ActionKind::UseInventoryItem,
        ActionKind::UsePerk,
        ActionKind::CastSpell,
        ActionKind::PickUp,
        ActionKind::TalkTo,
        ActionKind::Wander,
        ActionKind::UseGameObject,
    ];

    /// Verbs only offered for full player characters.
    pub const PC_ONLY_VERBS: &'static [ActionKind] = &[
        ActionKind::UseInventoryItem,
        ActionKind::PickUp,
        ActionKind::UseGameObject,
        ActionKind::TalkTo,
    ];

    pub fn is_verb(self) -> bool {
        Self::VERBS.contains(&self)
    }

    pub fn is_pc_only(self) -> bool {
        Self::PC_ONLY_VERBS.contains(&self)
    }

    /// Capabilities an owner must have for `init` to accept it.
    pub const fn required_capabilities(self) -> Capabilities {
        match self {
            Self::MoveTo | Self::Wander => Capabilities::MOBILE,
            Self::Attack
            | Self::MockAttack
            | Self::UsePerk
            | Self::CastSpell
            | Self::UseInventoryItem
            | Self::UseGameObject
            | Self::Lockpick
            | Self::DisarmTrap
            | Self::PickUp
            | Self::TalkTo => Capabilities::MOBILE.union(Capabilities::COMBATANT),
            Self::LookAt | Self::LookAround => Capabilities::ORIENTED,
            Self::Wait | Self::Shout | Self::DisableAi | Self::EnableAi | Self::Chain => {
                Capabilities::empty()
            }
        }
    }

    /// Whether a front-end should offer this command for `entity`.
    pub fn is_offered_to(self, entity: &Entity) -> bool {
        self.is_verb()
            && entity.has(self.required_capabilities())
            && (!self.is_pc_only() || entity.has(Capabilities::PLAYER_CHARACTER))
            && entity.can_perform(self)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;
    use crate::state::EntityId;

    #[test]
    fn tags_round_trip_through_strings() {
        for kind in ActionKind::iter() {
            assert_eq!(ActionKind::from_str(kind.as_ref()), Ok(kind));
        }
        assert_eq!(ActionKind::UseGameObject.as_ref(), "use_game_object");
    }

    #[test]
    fn pc_only_verbs_are_verbs() {
        for kind in ActionKind::PC_ONLY_VERBS {
            assert!(kind.is_verb());
        }
        assert!(!ActionKind::Lockpick.is_verb());
        assert!(!ActionKind::Chain.is_verb());
    }

    #[test]
    fn npc_is_not_offered_inventory_verbs() {
        let npc = Entity::new(EntityId(2), "guard", Capabilities::NPC);
        let pc = Entity::new(EntityId(1), "hero", Capabilities::PC);

        assert!(ActionKind::Attack.is_offered_to(&npc));
        assert!(!ActionKind::PickUp.is_offered_to(&npc));
        assert!(ActionKind::PickUp.is_offered_to(&pc));
        assert!(!ActionKind::Wait.is_offered_to(&pc));
    }
}
