//! Scenario loader: who and what to place on the map.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tactics_core::state::{Equipment, Skill};
use tactics_core::{
    Capabilities, Entity, EntityId, Faction, ItemStack, Orientation, PerkId, Position,
    ResourceMeter, ScriptBook, ScriptId, Simulation, WorldObject,
};

use crate::loaders::{LoadResult, read_ron};

/// Actor placement for RON files. Unset stats keep the entity defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorSpec {
    pub id: u32,
    pub name: String,
    /// Player characters are controllable and get the full verb set.
    #[serde(default)]
    pub player: bool,
    #[serde(default)]
    pub faction: Faction,
    pub tile: Position,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default)]
    pub ap: Option<i32>,
    #[serde(default)]
    pub hp: Option<i32>,
    #[serde(default)]
    pub speed: Option<f32>,
    #[serde(default)]
    pub armor_rating: i32,
    #[serde(default)]
    pub skills: Vec<(Skill, i32)>,
    #[serde(default)]
    pub equipment: Equipment,
    #[serde(default)]
    pub inventory: Vec<ItemStack>,
    #[serde(default)]
    pub perks: Vec<PerkId>,
    #[serde(default)]
    pub sneaking: bool,
    #[serde(default)]
    pub dialogue: Option<String>,
    /// Decision script driving the actor's brain.
    #[serde(default)]
    pub script: Option<String>,
}

impl ActorSpec {
    pub fn entity_id(&self) -> EntityId {
        EntityId(self.id)
    }

    pub fn to_entity(&self) -> Entity {
        let capabilities = if self.player {
            Capabilities::PC
        } else {
            Capabilities::NPC
        };
        let mut entity = Entity::new(self.entity_id(), self.name.clone(), capabilities)
            .at(self.tile)
            .with_faction(self.faction);
        entity.orientation = self.orientation;
        entity.controllable = self.player;
        entity.sneaking = self.sneaking;
        entity.dialogue = self.dialogue.clone();
        if let Some(ap) = self.ap {
            entity.stats.ap = ResourceMeter::full(ap);
        }
        if let Some(hp) = self.hp {
            entity.stats.hp = ResourceMeter::full(hp);
        }
        if let Some(speed) = self.speed {
            entity.speed = speed;
        }
        entity.stats.armor_rating = self.armor_rating;
        for &(skill, rank) in &self.skills {
            entity.stats.skills.set(skill, rank);
        }
        entity.equipment = self.equipment.clone();
        for &stack in &self.inventory {
            entity.inventory.add(stack);
        }
        entity.perks.extend(self.perks.iter().copied());
        entity
    }

    pub fn script_id(&self) -> Option<ScriptId> {
        self.script.as_deref().map(ScriptId::new)
    }
}

/// Scenario structure for RON files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub actors: Vec<ActorSpec>,
    #[serde(default)]
    pub objects: Vec<WorldObject>,
}

impl Scenario {
    /// Checks that ids are unique and every referenced script exists.
    pub fn validate(&self, scripts: &ScriptBook) -> LoadResult<()> {
        let mut seen = BTreeSet::new();
        let ids = self
            .actors
            .iter()
            .map(ActorSpec::entity_id)
            .chain(self.objects.iter().map(|o| o.id));
        for id in ids {
            if !seen.insert(id) {
                anyhow::bail!("scenario '{}' uses {} twice", self.name, id);
            }
        }
        for actor in &self.actors {
            if let Some(script) = actor.script_id()
                && !scripts.contains(&script)
            {
                anyhow::bail!(
                    "actor '{}' uses unknown script '{}'",
                    actor.name,
                    script
                );
            }
        }
        Ok(())
    }

    /// Places every object and actor into `sim`.
    pub fn populate(&self, sim: &mut Simulation) {
        for object in &self.objects {
            sim.world_mut().insert_object(object.clone());
        }
        for actor in &self.actors {
            sim.spawn(actor.to_entity(), actor.script_id());
        }
        tracing::info!(
            "scenario '{}': {} actors, {} objects",
            self.name,
            self.actors.len(),
            self.objects.len()
        );
    }
}

/// Loader for scenarios from RON files.
pub struct ScenarioLoader;

impl ScenarioLoader {
    pub fn load(path: &Path) -> LoadResult<Scenario> {
        read_ron(path, "scenario")
    }
}
