//! Item and perk definitions consumed by the use-item and use-perk actions.

use std::collections::BTreeMap;

use crate::state::{AnimationState, CombatModifiers, ItemId, PerkId, Skill};

/// Immediate effect applied to a target when an item or perk resolves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Effect {
    Damage { min: i32, max: i32 },
    Heal(i32),
    RestoreAp(i32),
    RestoreSp(i32),
    RestoreMp(i32),
}

/// Requirement checked before an item may be used.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UseCondition {
    MinSkill { skill: Skill, rank: i32 },
    NotInCombat,
    OnlyInCombat,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemUse {
    /// Whether the item is applied to a chosen tile or entity rather than the user.
    pub targeted: bool,
    pub conditions: Vec<UseCondition>,
    pub effects: Vec<Effect>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemDefinition {
    pub id: ItemId,
    pub name: String,
    pub usable: Option<ItemUse>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ResourceCosts {
    pub ap: i32,
    pub hp: i32,
    pub sp: i32,
    pub mp: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Targeting {
    #[default]
    Single,
    /// Every living entity within the radius of the chosen tile.
    Area { radius: i32 },
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PerkDefinition {
    pub id: PerkId,
    pub name: String,
    /// Passive perks only grant modifiers and can never be used.
    pub activated: bool,
    /// Spells are cast through the cast-spell verb instead of use-perk.
    pub spell: bool,
    /// Attack perks strike each target using the normal attack machinery.
    pub attack: bool,
    pub costs: ResourceCosts,
    pub cooldown_secs: f32,
    pub targeting: Targeting,
    pub animation: Option<AnimationState>,
    /// Added to the user's combat modifiers while an attack perk strikes.
    pub modifiers: CombatModifiers,
    pub effects: Vec<Effect>,
}

pub trait ItemOracle: Send + Sync {
    fn item(&self, id: ItemId) -> Option<&ItemDefinition>;
}

pub trait PerkOracle: Send + Sync {
    fn perk(&self, id: PerkId) -> Option<&PerkDefinition>;

    fn spell(&self, id: PerkId) -> Option<&PerkDefinition> {
        self.perk(id).filter(|p| p.spell)
    }
}

/// In-memory item and perk tables.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    items: BTreeMap<ItemId, ItemDefinition>,
    perks: BTreeMap<PerkId, PerkDefinition>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_item(&mut self, item: ItemDefinition) {
        self.items.insert(item.id, item);
    }

    pub fn add_perk(&mut self, perk: PerkDefinition) {
        self.perks.insert(perk.id, perk);
    }

    #[must_use]
    pub fn with_item(mut self, item: ItemDefinition) -> Self {
        self.add_item(item);
        self
    }

    #[must_use]
    pub fn with_perk(mut self, perk: PerkDefinition) -> Self {
        self.add_perk(perk);
        self
    }
}

impl ItemOracle for Catalog {
    fn item(&self, id: ItemId) -> Option<&ItemDefinition> {
        self.items.get(&id)
    }
}

impl PerkOracle for Catalog {
    fn perk(&self, id: PerkId) -> Option<&PerkDefinition> {
        self.perks.get(&id)
    }
}
