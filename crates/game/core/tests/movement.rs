mod common;

use common::{DT, Rig, corridor, room, settle, simulation};
use tactics_core::action::MoveTo;
use tactics_core::{
    Action, ActionCommand, Capabilities, Destination, Entity, EntityId, Position, ResourceMeter,
};

const WALKER: EntityId = EntityId(1);

fn walker(tile: Position) -> Entity {
    Entity::new(WALKER, "walker", Capabilities::NPC).at(tile)
}

#[test]
fn every_reachable_tile_is_reached_in_finite_frames() {
    let start = Position::new(1, 1);
    for y in 1..=5 {
        for x in 1..=5 {
            let goal = Position::new(x, y);
            if goal == start {
                continue;
            }
            let mut rig = Rig::new(room()).with(walker(start));
            let mut mover = MoveTo::default();
            mover
                .init(WALKER, &ActionCommand::move_to(goal), &mut rig.ctx(false))
                .unwrap();
            let last = mover.path().and_then(|p| p.last()).map(|s| s.tile);
            assert_eq!(last, Some(goal));

            let frames = rig.run(&mut mover, false);
            assert!(frames > 0);
            let walker = rig.entity(WALKER);
            assert_eq!(walker.tile(), goal);
            assert!(walker.position.is_on(goal), "{goal} left off-tile");
        }
    }
}

#[test]
fn pause_waits_for_the_tile_in_progress() {
    let mut rig = Rig::new(corridor()).with(walker(Position::new(1, 1)));
    let mut mover = MoveTo::default();
    mover
        .init(WALKER, &ActionCommand::move_to(Position::new(7, 1)), &mut rig.ctx(false))
        .unwrap();
    for _ in 0..3 {
        mover.update(DT, &mut rig.ctx(false));
    }
    let tile = rig.entity(WALKER).tile();
    assert!(!rig.entity(WALKER).position.is_on(tile), "walker should be mid-tile");

    mover.pause();
    let mut frames = 0;
    while !mover.is_paused() {
        mover.update(DT, &mut rig.ctx(false));
        frames += 1;
        assert!(frames < 100, "pause never honoured");
    }
    let halted = rig.entity(WALKER).position;
    assert!(halted.is_on(rig.entity(WALKER).tile()));

    for _ in 0..20 {
        mover.update(DT, &mut rig.ctx(false));
    }
    assert_eq!(rig.entity(WALKER).position, halted);

    mover.resume(&mut rig.ctx(false));
    rig.run(&mut mover, false);
    assert_eq!(rig.entity(WALKER).tile(), Position::new(7, 1));
}

#[test]
fn strict_turn_walks_stop_when_ap_runs_out() {
    let mut sim = simulation(corridor());
    let mut tired = walker(Position::new(1, 1));
    tired.stats.ap = ResourceMeter::full(3);
    sim.spawn(tired, None);
    sim.start_combat();
    sim.begin_turn(WALKER);

    sim.add_action(WALKER, &ActionCommand::MoveTo(Destination::tile(Position::new(7, 1))))
        .unwrap();
    let mut frames = 0;
    while sim.container(WALKER).is_some_and(|c| !c.is_empty()) {
        sim.update_turn(DT);
        frames += 1;
        assert!(frames < 2000);
    }

    let walker = sim.world().entity(WALKER).unwrap();
    assert_eq!(walker.tile(), Position::new(4, 1));
    assert_eq!(walker.stats.ap.current, 0);
    assert!(sim.finished_turn());
}

#[test]
fn peace_walks_cost_nothing() {
    let mut sim = simulation(corridor());
    sim.spawn(walker(Position::new(1, 1)), None);
    sim.add_action(WALKER, &ActionCommand::MoveTo(Destination::tile(Position::new(7, 1))))
        .unwrap();
    settle(&mut sim, WALKER);

    let walker = sim.world().entity(WALKER).unwrap();
    assert_eq!(walker.tile(), Position::new(7, 1));
    assert_eq!(walker.stats.ap.current, walker.stats.ap.maximum);
}

#[test]
fn blocked_destination_stops_next_to_it() {
    let mut sim = simulation(corridor());
    sim.spawn(walker(Position::new(1, 1)), None);
    sim.spawn(
        Entity::new(EntityId(2), "crate", Capabilities::empty()).at(Position::new(5, 1)),
        None,
    );
    sim.add_action(WALKER, &ActionCommand::MoveTo(Destination::tile(Position::new(5, 1))))
        .unwrap();
    settle(&mut sim, WALKER);
    assert_eq!(sim.world().tile_of(WALKER), Some(Position::new(4, 1)));
}

#[test]
fn node_blocked_mid_walk_ends_the_move() {
    let mut rig = Rig::new(corridor()).with(walker(Position::new(1, 1)));
    let mut mover = MoveTo::default();
    mover
        .init(WALKER, &ActionCommand::move_to(Position::new(7, 1)), &mut rig.ctx(false))
        .unwrap();
    assert!(mover.path().is_some());

    rig.world
        .insert_entity(Entity::new(EntityId(2), "boulder", Capabilities::empty()).at(Position::new(4, 1)));
    rig.run(&mut mover, false);

    let walker = rig.entity(WALKER);
    assert_eq!(walker.tile(), Position::new(3, 1));
    assert!(walker.position.is_on(Position::new(3, 1)));
    assert!(mover.path().is_none());
}

/// Distance covered on each axis by the first frame of a walk to `goal`.
fn first_stride(mut rig: Rig, goal: Position, combat: bool) -> (f32, f32) {
    let start = rig.entity(WALKER).position;
    let mut mover = MoveTo::default();
    mover
        .init(WALKER, &ActionCommand::move_to(goal), &mut rig.ctx(combat))
        .unwrap();
    mover.update(DT, &mut rig.ctx(combat));
    let now = rig.entity(WALKER).position;
    ((now.x - start.x).abs(), (now.y - start.y).abs())
}

fn close(actual: f32, expected: f32) -> bool {
    (actual - expected).abs() < 1e-4
}

#[test]
fn walking_speed_follows_the_speed_rules() {
    let stride = walker(Position::new(1, 1)).speed * DT;
    let east = Position::new(7, 1);

    let (dx, dy) = first_stride(Rig::new(corridor()).with(walker(Position::new(1, 1))), east, false);
    assert!(close(dx, stride) && dy == 0.0, "{dx}");

    let (dx, _) = first_stride(Rig::new(corridor()).with(walker(Position::new(1, 1))), east, true);
    let combat = tactics_core::GameRules::default().speed.combat_multiplier;
    assert!(close(dx, stride * combat), "{dx}");

    let mut rig = Rig::new(corridor().world_map(true)).with(walker(Position::new(1, 1)));
    rig.rules.speed.world_map_multiplier = 3.0;
    let (dx, _) = first_stride(rig, east, false);
    assert!(close(dx, stride * 3.0), "{dx}");
}

#[test]
fn isometric_diagonals_move_at_half_speed() {
    let stride = walker(Position::new(1, 1)).speed * DT;
    let up_right = Position::new(2, 2);

    let (dx, dy) = first_stride(Rig::new(room()).with(walker(Position::new(1, 1))), up_right, false);
    assert!(close(dx, stride) && close(dy, stride), "{dx} {dy}");

    let (dx, dy) = first_stride(
        Rig::new(room().isometric(true)).with(walker(Position::new(1, 1))),
        up_right,
        false,
    );
    assert!(close(dx, stride / 2.0) && close(dy, stride / 2.0), "{dx} {dy}");
}
