//! Actors: characters, creatures and animated props that can own actions.

use std::collections::{BTreeMap, BTreeSet};

use arrayvec::ArrayVec;
use bitflags::bitflags;
use strum::{AsRefStr, EnumIter, EnumString};

use crate::action::ActionKind;
use crate::config::AnimationTimings;

use super::{Animation, AnimationState, EntityId, Orientation, Position, ResourceMeter, WorldPos};

bitflags! {
    /// What an entity is able to do. Action variants declare which of these
    /// their owner must have.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct Capabilities: u8 {
        /// Has an orientation that can be changed.
        const ORIENTED = 1 << 0;
        /// Can walk along paths.
        const MOBILE = 1 << 1;
        /// Has combat stats, equipment and AP.
        const COMBATANT = 1 << 2;
        /// A full player character: inventory verbs, dialogue, object use.
        const PLAYER_CHARACTER = 1 << 3;
    }
}

impl Capabilities {
    /// Typical non-player character.
    pub const NPC: Self = Self::ORIENTED.union(Self::MOBILE).union(Self::COMBATANT);
    /// Typical member of the player's party.
    pub const PC: Self = Self::NPC.union(Self::PLAYER_CHARACTER);
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, AsRefStr, EnumString, EnumIter,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum Skill {
    Armor,
    Sword,
    Dagger,
    Axe,
    Staff,
    Bow,
    Unarmed,
    Thrown,
    DualWielding,
    Dodge,
    Climbing,
    Swimming,
    Hunting,
    Scouting,
    Sneaking,
    Persuasion,
    Traps,
    Lockpicking,
}

impl Skill {
    /// Skills whose checks scale with rank. Others rely on modifiers alone.
    pub const fn is_rank_scaled(self) -> bool {
        matches!(
            self,
            Self::Climbing
                | Self::Swimming
                | Self::Sneaking
                | Self::Persuasion
                | Self::Hunting
                | Self::Scouting
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Skills {
    ranks: BTreeMap<Skill, i32>,
}

impl Skills {
    pub fn rank(&self, skill: Skill) -> i32 {
        self.ranks.get(&skill).copied().unwrap_or(0)
    }

    pub fn set(&mut self, skill: Skill, rank: i32) {
        self.ranks.insert(skill, rank);
    }

    #[must_use]
    pub fn with(mut self, skill: Skill, rank: i32) -> Self {
        self.set(skill, rank);
        self
    }
}

/// Flat combat modifiers from gear, perks and effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CombatModifiers {
    pub chance_to_hit: i32,
    pub damage: i32,
    pub unarmed_damage: i32,
    /// Percentage points added to the damage multiplier (0 = unchanged).
    pub damage_percent: i32,
    pub dodge_parry: i32,
    pub ap_cost_to_attack: i32,
}

impl CombatModifiers {
    #[must_use]
    pub fn combined(self, other: CombatModifiers) -> Self {
        Self {
            chance_to_hit: self.chance_to_hit + other.chance_to_hit,
            damage: self.damage + other.damage,
            unarmed_damage: self.unarmed_damage + other.unarmed_damage,
            damage_percent: self.damage_percent + other.damage_percent,
            dodge_parry: self.dodge_parry + other.dodge_parry,
            ap_cost_to_attack: self.ap_cost_to_attack + other.ap_cost_to_attack,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Stats {
    pub ap: ResourceMeter,
    pub hp: ResourceMeter,
    pub sp: ResourceMeter,
    pub mp: ResourceMeter,
    pub skills: Skills,
    /// Percentage of incoming damage absorbed.
    pub armor_rating: i32,
    pub experience: u32,
    pub modifiers: CombatModifiers,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, AsRefStr, EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum Hand {
    Right,
    Left,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Weapon {
    pub name: String,
    pub skill: Skill,
    pub ranged: bool,
    /// Ranged weapons that loose a missile resolve on its arrival.
    pub projectile: bool,
    pub bonus: i32,
    pub min_damage: i32,
    pub max_damage: i32,
}

impl Weapon {
    pub fn melee(name: impl Into<String>, skill: Skill, min_damage: i32, max_damage: i32) -> Self {
        Self {
            name: name.into(),
            skill,
            ranged: false,
            projectile: false,
            bonus: 0,
            min_damage,
            max_damage,
        }
    }

    pub fn bow(name: impl Into<String>, min_damage: i32, max_damage: i32) -> Self {
        Self {
            name: name.into(),
            skill: Skill::Bow,
            ranged: true,
            projectile: true,
            bonus: 0,
            min_damage,
            max_damage,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Equipment {
    pub right: Option<Weapon>,
    pub left: Option<Weapon>,
}

impl Equipment {
    pub fn weapon(&self, hand: Hand) -> Option<&Weapon> {
        match hand {
            Hand::Right => self.right.as_ref(),
            Hand::Left => self.left.as_ref(),
        }
    }

    /// Equipped weapons, right hand first.
    pub fn weapons(&self) -> ArrayVec<(Hand, &Weapon), 2> {
        let mut out = ArrayVec::new();
        if let Some(w) = &self.right {
            out.push((Hand::Right, w));
        }
        if let Some(w) = &self.left {
            out.push((Hand::Left, w));
        }
        out
    }

    pub fn is_unarmed(&self) -> bool {
        self.right.is_none() && self.left.is_none()
    }

    pub fn is_dual_wielding(&self) -> bool {
        self.right.is_some() && self.left.is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PerkId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemStack {
    pub item: ItemId,
    pub count: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Inventory {
    stacks: Vec<ItemStack>,
}

impl Inventory {
    pub fn add(&mut self, stack: ItemStack) {
        if let Some(existing) = self.stacks.iter_mut().find(|s| s.item == stack.item) {
            existing.count += stack.count;
        } else if stack.count > 0 {
            self.stacks.push(stack);
        }
    }

    pub fn count(&self, item: ItemId) -> u32 {
        self.stacks
            .iter()
            .find(|s| s.item == item)
            .map_or(0, |s| s.count)
    }

    pub fn has(&self, item: ItemId) -> bool {
        self.count(item) > 0
    }

    /// Removes a single unit. Returns false if none was held.
    pub fn take_one(&mut self, item: ItemId) -> bool {
        let Some(index) = self.stacks.iter().position(|s| s.item == item) else {
            return false;
        };
        self.stacks[index].count -= 1;
        if self.stacks[index].count == 0 {
            self.stacks.remove(index);
        }
        true
    }

    pub fn stacks(&self) -> &[ItemStack] {
        &self.stacks
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, AsRefStr, EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum Faction {
    Player,
    #[default]
    Neutral,
    Hostile,
}

impl Faction {
    pub fn is_hostile_to(self, other: Faction) -> bool {
        matches!(
            (self, other),
            (Faction::Player, Faction::Hostile) | (Faction::Hostile, Faction::Player)
        )
    }
}

/// Action kinds an entity may not start, keyed by who forbade them.
///
/// Several sources (a paralysis effect, a cutscene) can forbid the same kind;
/// it stays forbidden until every one of them allows it again.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ForbiddenActions {
    by_forbidder: BTreeMap<String, BTreeSet<ActionKind>>,
}

impl ForbiddenActions {
    pub fn forbid(&mut self, forbidder: &str, kinds: impl IntoIterator<Item = ActionKind>) {
        self.by_forbidder
            .entry(forbidder.to_owned())
            .or_default()
            .extend(kinds);
    }

    pub fn allow(&mut self, forbidder: &str, kinds: impl IntoIterator<Item = ActionKind>) {
        if let Some(set) = self.by_forbidder.get_mut(forbidder) {
            for kind in kinds {
                set.remove(&kind);
            }
            if set.is_empty() {
                self.by_forbidder.remove(forbidder);
            }
        }
    }

    pub fn allow_all(&mut self, forbidder: &str) {
        self.by_forbidder.remove(forbidder);
    }

    pub fn is_forbidden(&self, kind: ActionKind) -> bool {
        self.by_forbidder.values().any(|set| set.contains(&kind))
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub capabilities: Capabilities,
    pub faction: Faction,
    pub position: WorldPos,
    pub orientation: Orientation,
    pub animation: Animation,
    /// Walking speed in tiles per second.
    pub speed: f32,
    pub stats: Stats,
    pub equipment: Equipment,
    pub inventory: Inventory,
    pub perks: BTreeSet<PerkId>,
    /// Remaining cooldown in seconds, per perk.
    pub perk_cooldowns: BTreeMap<PerkId, f32>,
    pub forbidden: ForbiddenActions,
    pub sneaking: bool,
    pub asleep: bool,
    /// Whether the player can currently see this entity.
    pub visible_to_player: bool,
    /// Member of the player-controllable group.
    pub controllable: bool,
    pub dialogue: Option<String>,
    pub met: BTreeSet<EntityId>,
}

impl Entity {
    pub fn new(id: EntityId, name: impl Into<String>, capabilities: Capabilities) -> Self {
        Self {
            id,
            name: name.into(),
            capabilities,
            faction: Faction::Neutral,
            position: WorldPos::default(),
            orientation: Orientation::default(),
            animation: Animation::default(),
            speed: 4.0,
            stats: Stats {
                ap: ResourceMeter::full(10),
                hp: ResourceMeter::full(10),
                ..Stats::default()
            },
            equipment: Equipment::default(),
            inventory: Inventory::default(),
            perks: BTreeSet::new(),
            perk_cooldowns: BTreeMap::new(),
            forbidden: ForbiddenActions::default(),
            sneaking: false,
            asleep: false,
            visible_to_player: true,
            controllable: false,
            dialogue: None,
            met: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn at(mut self, tile: Position) -> Self {
        self.position = tile.to_world();
        self
    }

    #[must_use]
    pub fn with_faction(mut self, faction: Faction) -> Self {
        self.faction = faction;
        self
    }

    #[must_use]
    pub fn with_stats(mut self, stats: Stats) -> Self {
        self.stats = stats;
        self
    }

    pub fn tile(&self) -> Position {
        self.position.tile()
    }

    pub fn has(&self, capabilities: Capabilities) -> bool {
        self.capabilities.contains(capabilities)
    }

    pub fn is_alive(&self) -> bool {
        !self.has(Capabilities::COMBATANT) || !self.stats.hp.is_empty()
    }

    pub fn can_perform(&self, kind: ActionKind) -> bool {
        !self.forbidden.is_forbidden(kind)
    }

    /// Forbids `kinds` on behalf of `forbidder` (a web, a cutscene, a stun).
    pub fn forbid_actions(&mut self, forbidder: &str, kinds: impl IntoIterator<Item = ActionKind>) {
        tracing::debug!("{} forbids {} some actions", forbidder, self.id);
        self.forbidden.forbid(forbidder, kinds);
    }

    pub fn allow_actions(&mut self, forbidder: &str, kinds: impl IntoIterator<Item = ActionKind>) {
        self.forbidden.allow(forbidder, kinds);
    }

    pub fn allow_all_actions(&mut self, forbidder: &str) {
        self.forbidden.allow_all(forbidder);
    }

    pub fn is_hostile_to(&self, other: &Entity) -> bool {
        self.faction.is_hostile_to(other.faction)
    }

    pub fn set_animation(&mut self, state: AnimationState, timings: &AnimationTimings) {
        self.animation.set_state(state, timings);
    }

    pub fn face(&mut self, isometric: bool, target: WorldPos) {
        if self.has(Capabilities::ORIENTED) {
            self.orientation = Orientation::toward(isometric, self.position, target);
        }
    }

    /// Applies incoming damage through the target's own pools.
    /// Returns the HP actually removed.
    pub fn take_damage(&mut self, amount: i32, timings: &AnimationTimings) -> i32 {
        let before = self.stats.hp.current;
        self.stats.hp.add(-amount.max(0));
        if self.stats.hp.is_empty() {
            self.animation.restart(AnimationState::Death, timings);
        }
        before - self.stats.hp.current
    }

    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.stats.hp.current;
        self.stats.hp.add(amount.max(0));
        self.stats.hp.current - before
    }

    pub fn give_experience(&mut self, amount: u32) {
        self.stats.experience += amount;
    }

    pub fn is_perk_ready(&self, perk: PerkId) -> bool {
        self.perk_cooldowns.get(&perk).is_none_or(|left| *left <= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_kinds_need_every_forbidder_to_allow() {
        let mut forbidden = ForbiddenActions::default();
        forbidden.forbid("web", [ActionKind::MoveTo]);
        forbidden.forbid("cutscene", [ActionKind::MoveTo, ActionKind::Attack]);

        forbidden.allow("web", [ActionKind::MoveTo]);
        assert!(forbidden.is_forbidden(ActionKind::MoveTo));

        forbidden.allow_all("cutscene");
        assert!(!forbidden.is_forbidden(ActionKind::MoveTo));
        assert!(!forbidden.is_forbidden(ActionKind::Attack));
    }

    #[test]
    fn inventory_merges_and_drains_stacks() {
        let potion = ItemId(3);
        let mut inventory = Inventory::default();
        inventory.add(ItemStack { item: potion, count: 1 });
        inventory.add(ItemStack { item: potion, count: 1 });
        assert_eq!(inventory.count(potion), 2);

        assert!(inventory.take_one(potion));
        assert!(inventory.take_one(potion));
        assert!(!inventory.take_one(potion));
        assert!(inventory.stacks().is_empty());
    }

    #[test]
    fn lethal_damage_switches_to_death_animation() {
        let timings = AnimationTimings::default();
        let mut goblin = Entity::new(EntityId(4), "goblin", Capabilities::NPC);
        goblin.stats.hp = ResourceMeter::full(6);

        assert_eq!(goblin.take_damage(10, &timings), 6);
        assert!(!goblin.is_alive());
        assert_eq!(goblin.animation.state, AnimationState::Death);
    }

    #[test]
    fn factions_only_clash_with_opposites() {
        assert!(Faction::Player.is_hostile_to(Faction::Hostile));
        assert!(!Faction::Neutral.is_hostile_to(Faction::Hostile));
    }
}
