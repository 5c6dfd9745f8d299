mod common;

use common::{DT, corridor, settle, simulation};
use tactics_core::{
    ActionCommand, ActionKind, Capabilities, ChainParams, Destination, Element, Entity, EntityId,
    Position, SimEvent,
};

const BOSS: EntityId = EntityId(1);
const MINION: EntityId = EntityId(7);

fn boss() -> Entity {
    Entity::new(BOSS, "boss", Capabilities::NPC).at(Position::new(1, 1))
}

fn minion() -> Entity {
    Entity::new(MINION, "minion", Capabilities::NPC).at(Position::new(3, 1))
}

#[test]
fn chain_restored_before_its_performer_waits_then_drives_it() {
    let mut original = simulation(corridor());
    original.spawn(boss(), None);
    original.spawn(minion(), None);
    original
        .add_action(
            BOSS,
            &ActionCommand::Chain(ChainParams {
                performer: Some(MINION),
                steps: vec![
                    ActionCommand::MoveTo(Destination::tile(Position::new(6, 1))),
                    ActionCommand::Shout {
                        text: "Done".into(),
                    },
                ],
            }),
        )
        .unwrap();
    let saved = original.save();

    // The minion lives in an area that is not loaded yet.
    let mut restored = simulation(corridor());
    *restored.world_mut() = original.world().clone();
    restored.world_mut().remove_entity(MINION);
    restored.load(&saved).unwrap();

    for _ in 0..40 {
        restored.update(DT);
    }
    let waiting = restored.container(BOSS).unwrap();
    assert_eq!(waiting.len(), 1);
    assert!(waiting.find(ActionKind::Chain).is_some());

    restored.spawn(minion(), None);
    settle(&mut restored, BOSS);

    assert_eq!(restored.world().tile_of(MINION), Some(Position::new(6, 1)));
    assert_eq!(restored.world().tile_of(BOSS), Some(Position::new(1, 1)));
    assert!(restored.events().iter().any(|e| matches!(
        e,
        SimEvent::Shouted { actor: MINION, text } if text == "Done"
    )));
}

#[test]
fn saved_document_names_actions_by_tag() {
    let mut sim = simulation(corridor());
    sim.spawn(boss(), None);
    sim.add_action(BOSS, &ActionCommand::MoveTo(Destination::tile(Position::new(5, 1))))
        .unwrap();
    sim.add_action(BOSS, &ActionCommand::Shout { text: "Hey".into() })
        .unwrap();

    let saved = sim.save();
    let actions = saved
        .children
        .iter()
        .find(|c| c.entity("id") == Ok(BOSS))
        .and_then(|actor| actor.child("actions"))
        .unwrap();
    let tags: Vec<&str> = actions.children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(tags, ["move_to", "shout"]);
    assert_eq!(actions.children[0].get("x"), Some("5"));
    assert_eq!(actions.children[1].get("text"), Some("Hey"));
}

#[test]
fn unknown_saved_actions_are_skipped() {
    let mut sim = simulation(corridor());
    sim.spawn(boss(), None);

    let mut actions = Element::new("actions");
    actions.push(Element::new("teleport").with("x", 4).with("y", 1));
    actions.push(Element::new("wait").with("seconds", 2.0));
    let mut actor = Element::new("actor");
    actor.set_entity("id", BOSS);
    actor.push(actions);
    let mut document = Element::new("simulation").with("seed", 9).with("nonce", 3);
    document.push(actor);

    sim.load(&document).unwrap();
    let container = sim.container(BOSS).unwrap();
    assert_eq!(container.len(), 1);
    assert!(container.find(ActionKind::Wait).is_some());
    assert_eq!(sim.dice().nonce, 3);
}

#[test]
fn attack_pause_requests_reach_the_target() {
    let mut sim = simulation(corridor());
    sim.spawn(boss(), None);
    sim.spawn(minion(), None);
    let chore = sim.add_action(MINION, &ActionCommand::wait(60.0)).unwrap();
    sim.add_action(BOSS, &ActionCommand::Attack { target: MINION })
        .unwrap();

    let paused = sim
        .container(MINION)
        .and_then(|c| c.get(chore))
        .is_some_and(|a| a.is_paused());
    assert!(paused);

    settle(&mut sim, BOSS);
    let resumed = sim
        .container(MINION)
        .and_then(|c| c.get(chore))
        .is_some_and(|a| !a.is_paused());
    assert!(resumed);
}
