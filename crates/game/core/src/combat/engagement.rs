//! Melee vs ranged selection.

use arrayvec::ArrayVec;

use crate::state::{Entity, Hand, Position};

/// The weapons an attack will swing or loose, and whether it is ranged.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Engagement {
    pub ranged: bool,
    /// Hands whose weapons take part. Empty means fists (melee) or nothing usable.
    pub hands: ArrayVec<Hand, 2>,
}

impl Engagement {
    /// Picks weapons for an attack from `from` on `target`.
    ///
    /// Adjacent targets are struck with every non-ranged weapon held; an
    /// attacker holding nothing fights unarmed. Holding only ranged weapons
    /// next to the target yields a ranged engagement with no usable hands,
    /// which the attack treats as impossible. At distance only ranged weapons
    /// count.
    pub fn determine(attacker: &Entity, from: Position, target: Position) -> Self {
        let mut engagement = Self::default();
        let weapons = attacker.equipment.weapons();

        if from.is_next_to_or_on(target) {
            engagement.ranged = true;
            for (hand, weapon) in &weapons {
                if !weapon.ranged {
                    engagement.hands.push(*hand);
                    engagement.ranged = false;
                }
            }
            if attacker.equipment.is_unarmed() {
                engagement.ranged = false;
            }
        } else {
            for (hand, weapon) in &weapons {
                if weapon.ranged {
                    engagement.hands.push(*hand);
                    engagement.ranged = true;
                }
            }
        }

        engagement
    }

    pub fn is_unarmed(&self) -> bool {
        self.hands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Capabilities, EntityId, Skill, Weapon};

    fn fighter() -> Entity {
        Entity::new(EntityId(1), "fighter", Capabilities::NPC).at(Position::new(0, 0))
    }

    #[test]
    fn adjacent_melee_weapon_forces_melee() {
        let mut attacker = fighter();
        attacker.equipment.right = Some(Weapon::melee("sword", Skill::Sword, 2, 6));

        let e = Engagement::determine(&attacker, Position::new(0, 0), Position::new(1, 1));
        assert!(!e.ranged);
        assert_eq!(e.hands.as_slice(), &[Hand::Right]);
    }

    #[test]
    fn adjacent_bow_only_is_ranged_without_hands() {
        let mut attacker = fighter();
        attacker.equipment.left = Some(Weapon::bow("bow", 1, 4));

        let e = Engagement::determine(&attacker, Position::new(0, 0), Position::new(1, 0));
        assert!(e.ranged);
        assert!(e.is_unarmed());
    }

    #[test]
    fn adjacent_unarmed_is_melee() {
        let e = Engagement::determine(&fighter(), Position::new(0, 0), Position::new(0, 1));
        assert!(!e.ranged);
        assert!(e.is_unarmed());
    }

    #[test]
    fn distant_target_uses_only_ranged_weapons() {
        let mut attacker = fighter();
        attacker.equipment.right = Some(Weapon::melee("axe", Skill::Axe, 2, 6));
        attacker.equipment.left = Some(Weapon::bow("bow", 1, 4));

        let e = Engagement::determine(&attacker, Position::new(0, 0), Position::new(5, 0));
        assert!(e.ranged);
        assert_eq!(e.hands.as_slice(), &[Hand::Left]);

        let near = Engagement::determine(&attacker, Position::new(0, 0), Position::new(1, 0));
        assert!(!near.ranged);
        assert_eq!(near.hands.as_slice(), &[Hand::Right]);
    }

    #[test]
    fn distant_melee_only_is_not_ranged() {
        let mut attacker = fighter();
        attacker.equipment.right = Some(Weapon::melee("club", Skill::Staff, 1, 3));
        let e = Engagement::determine(&attacker, Position::new(0, 0), Position::new(4, 4));
        assert!(!e.ranged);
        assert!(e.hands.is_empty());
    }
}
