//! Up-front AP costs of actions.

use crate::action::ActionKind;
use crate::config::GameRules;
use crate::state::{Entity, Skill, WorldObject};

/// AP cost of one attack for this entity, from its skill with the main weapon.
///
/// Armed: -1 above rank 2 and again above rank 4.
/// Unarmed: -1 above ranks 0, 2 and 4. Never below 1.
pub fn attack_ap_cost(attacker: &Entity, base: i32) -> i32 {
    let skills = &attacker.stats.skills;
    let weapon = attacker
        .equipment
        .right
        .as_ref()
        .or(attacker.equipment.left.as_ref());

    let mut cost = base;
    match weapon {
        Some(w) => {
            let rank = skills.rank(w.skill);
            if rank > 2 {
                cost -= 1;
            }
            if rank > 4 {
                cost -= 1;
            }
        }
        None => {
            let rank = skills.rank(Skill::Unarmed);
            for threshold in [0, 2, 4] {
                if rank > threshold {
                    cost -= 1;
                }
            }
        }
    }

    (cost + attacker.stats.modifiers.ap_cost_to_attack).max(1)
}

/// AP a verb will cost, for front-ends that show it before issuing.
///
/// Movement is priced per step by the path, so it reports 0 here.
pub fn action_ap_cost(
    kind: ActionKind,
    actor: &Entity,
    rules: &GameRules,
    object: Option<&WorldObject>,
) -> i32 {
    match kind {
        ActionKind::Attack => attack_ap_cost(actor, rules.ap.attack),
        ActionKind::PickUp => rules.ap.pick_up,
        ActionKind::UseGameObject => object
            .and_then(|o| o.usable.as_ref())
            .map_or(rules.ap.open, |u| u.ap_cost),
        ActionKind::Lockpick | ActionKind::UseInventoryItem => rules.ap.use_item,
        ActionKind::DisarmTrap => rules.ap.disarm_trap,
        _ => 0,
    }
}
