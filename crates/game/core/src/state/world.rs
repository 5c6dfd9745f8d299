use std::collections::BTreeMap;

use crate::combat::Projectiles;

use super::{Entity, EntityId, Position, WorldObject};

/// Everything that lives on the map, minus the per-entity action machinery.
///
/// Action containers and brains are held by the simulation next to this
/// struct, so an action can borrow the world mutably while its own container
/// is being iterated.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct World {
    entities: BTreeMap<EntityId, Entity>,
    objects: BTreeMap<EntityId, WorldObject>,
    pub projectiles: Projectiles,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_entity(&mut self, entity: Entity) {
        self.entities.insert(entity.id, entity);
    }

    pub fn insert_object(&mut self, object: WorldObject) {
        self.objects.insert(object.id, object);
    }

    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    pub fn remove_object(&mut self, id: EntityId) -> Option<WorldObject> {
        self.objects.remove(&id)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn object(&self, id: EntityId) -> Option<&WorldObject> {
        self.objects.get(&id)
    }

    pub fn object_mut(&mut self, id: EntityId) -> Option<&mut WorldObject> {
        self.objects.get_mut(&id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn entities_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    pub fn objects(&self) -> impl Iterator<Item = &WorldObject> {
        self.objects.values()
    }

    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    /// True if an entity or object with this id exists.
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id) || self.objects.contains_key(&id)
    }

    /// Tile of an entity or object.
    pub fn tile_of(&self, id: EntityId) -> Option<Position> {
        self.entity(id)
            .map(Entity::tile)
            .or_else(|| self.object(id).map(|o| o.tile))
    }

    /// True if a living entity (other than `except`) or a solid object stands on the tile.
    pub fn is_occupied(&self, tile: Position, except: EntityId) -> bool {
        self.entities
            .values()
            .any(|e| e.id != except && e.is_alive() && e.tile() == tile)
            || self.objects.values().any(|o| o.solid && o.tile == tile)
    }

    pub fn entity_at(&self, tile: Position) -> Option<&Entity> {
        self.entities
            .values()
            .find(|e| e.is_alive() && e.tile() == tile)
    }

    /// Living entities hostile to `id`.
    pub fn hostiles_of(&self, id: EntityId) -> impl Iterator<Item = &Entity> {
        let me = self.entity(id);
        self.entities
            .values()
            .filter(move |other| me.is_some_and(|me| other.is_alive() && me.is_hostile_to(other)))
    }

    /// Next unused id in the shared entity/object space.
    pub fn next_id(&self) -> EntityId {
        let max_entity = self.entities.keys().next_back().map_or(0, |id| id.0 + 1);
        let max_object = self.objects.keys().next_back().map_or(0, |id| id.0 + 1);
        EntityId(max_entity.max(max_object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Capabilities, Faction};

    #[test]
    fn shared_id_space_resolves_both_kinds() {
        let mut world = World::new();
        world.insert_entity(Entity::new(EntityId(1), "hero", Capabilities::PC).at(Position::new(2, 2)));
        world.insert_object(WorldObject::new(EntityId(9), "chest", Position::new(4, 4)));

        assert_eq!(world.tile_of(EntityId(1)), Some(Position::new(2, 2)));
        assert_eq!(world.tile_of(EntityId(9)), Some(Position::new(4, 4)));
        assert_eq!(world.tile_of(EntityId(3)), None);
        assert_eq!(world.next_id(), EntityId(10));
    }

    #[test]
    fn occupancy_ignores_the_asking_entity() {
        let mut world = World::new();
        world.insert_entity(Entity::new(EntityId(1), "hero", Capabilities::PC).at(Position::new(2, 2)));
        assert!(!world.is_occupied(Position::new(2, 2), EntityId(1)));
        assert!(world.is_occupied(Position::new(2, 2), EntityId(5)));
    }

    #[test]
    fn hostiles_follow_faction() {
        let mut world = World::new();
        world.insert_entity(
            Entity::new(EntityId(1), "hero", Capabilities::PC).with_faction(Faction::Player),
        );
        world.insert_entity(
            Entity::new(EntityId(2), "orc", Capabilities::NPC).with_faction(Faction::Hostile),
        );
        world.insert_entity(Entity::new(EntityId(3), "cat", Capabilities::NPC));

        let hostile: Vec<_> = world.hostiles_of(EntityId(1)).map(|e| e.id).collect();
        assert_eq!(hostile, vec![EntityId(2)]);
    }
}
