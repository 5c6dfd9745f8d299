//! The shipped `content/` directory must load and play.

use std::path::PathBuf;

use tactics_content::ContentFactory;
use tactics_core::{EntityId, ItemId, ItemOracle, MapOracle, PerkId, PerkOracle, Position, ScriptId};

fn factory() -> ContentFactory {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../../content");
    ContentFactory::new(dir)
}

#[test]
fn every_file_parses() {
    let factory = factory();
    let rules = factory.load_rules().unwrap();
    assert_eq!(rules.brain.search_radius, 4);

    let catalog = factory.load_catalog().unwrap();
    assert!(catalog.item(ItemId(1)).is_some());
    assert!(catalog.spell(PerkId(11)).is_some());
    assert!(catalog.perk(PerkId(12)).is_some_and(|p| !p.activated));

    let map = factory.load_map().unwrap();
    assert_eq!(map.dimensions().width, 14);
    assert!(map.is_dark(Position::new(11, 7)));

    let scripts = factory.load_scripts().unwrap();
    for id in ["brute", "archer", "villager"] {
        assert!(scripts.contains(&ScriptId::new(id)), "{id}");
    }

    let scenario = factory.load_scenario().unwrap();
    scenario.validate(&scripts).unwrap();
    assert_eq!(scenario.actors.len(), 5);
    assert_eq!(scenario.objects.len(), 2);
}

#[test]
fn scenario_builds_a_runnable_simulation() {
    let mut sim = factory().build_simulation(7).unwrap();
    let world = sim.world();
    assert!(world.entity(EntityId(1)).is_some_and(|ayla| ayla.controllable));
    assert!(world.object(EntityId(30)).is_some_and(|chest| chest.is_locked()));
    assert_eq!(
        sim.brain(EntityId(10)).and_then(|b| b.script()),
        Some(&ScriptId::new("brute"))
    );

    for _ in 0..100 {
        sim.update(0.05);
    }
    let ayla = sim.world().entity(EntityId(1)).unwrap();
    assert_eq!(ayla.tile(), Position::new(1, 4), "nobody orders the party around");
}
