//! Missiles in flight.
//!
//! A ranged attack leg launches a [`Projectile`] and waits. The simulation
//! moves projectiles every frame and marks them arrived; the attack that
//! launched one observes the arrival and only then rolls to hit.

use std::collections::BTreeMap;

use crate::state::{EntityId, WorldPos};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProjectileId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Flight {
    InFlight,
    Arrived,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Projectile {
    pub shooter: EntityId,
    pub target: EntityId,
    pub position: WorldPos,
    pub destination: WorldPos,
    pub flight: Flight,
}

#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Projectiles {
    next_id: u64,
    active: BTreeMap<ProjectileId, Projectile>,
}

impl Projectiles {
    pub fn launch(&mut self, shooter: EntityId, target: EntityId, from: WorldPos, to: WorldPos) -> ProjectileId {
        let id = ProjectileId(self.next_id);
        self.next_id += 1;
        self.active.insert(
            id,
            Projectile {
                shooter,
                target,
                position: from,
                destination: to,
                flight: Flight::InFlight,
            },
        );
        id
    }

    pub fn get(&self, id: ProjectileId) -> Option<&Projectile> {
        self.active.get(&id)
    }

    pub fn has_arrived(&self, id: ProjectileId) -> bool {
        self.active
            .get(&id)
            .is_some_and(|p| p.flight == Flight::Arrived)
    }

    /// Removes a projectile once its owner has dealt with it.
    pub fn retire(&mut self, id: ProjectileId) -> Option<Projectile> {
        self.active.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Moves every projectile `speed * dt` tiles toward its destination.
    pub fn advance(&mut self, dt: f32, speed: f32) {
        let step = speed * dt;
        for projectile in self.active.values_mut() {
            if projectile.flight == Flight::Arrived {
                continue;
            }
            let dx = projectile.destination.x - projectile.position.x;
            let dy = projectile.destination.y - projectile.position.y;
            let remaining = (dx * dx + dy * dy).sqrt();
            if remaining <= step {
                projectile.position = projectile.destination;
                projectile.flight = Flight::Arrived;
            } else {
                projectile.position.x += dx / remaining * step;
                projectile.position.y += dy / remaining * step;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projectile_arrives_after_enough_flight() {
        let mut projectiles = Projectiles::default();
        let id = projectiles.launch(
            EntityId(1),
            EntityId(2),
            WorldPos::new(0.0, 0.0),
            WorldPos::new(3.0, 4.0),
        );

        projectiles.advance(0.5, 4.0);
        assert!(!projectiles.has_arrived(id));
        projectiles.advance(1.0, 4.0);
        assert!(projectiles.has_arrived(id));

        assert!(projectiles.retire(id).is_some());
        assert!(projectiles.is_empty());
    }
}
