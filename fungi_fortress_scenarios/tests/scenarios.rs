// End-to-end scenarios for the task scheduling and action engine.
//
// Each test draws a small map, designates work the way the interaction layer
// does, and drives the real tick loop until the work is done, then checks
// the map, inventory, hooks and emitted events. Unit-level behavior (A*
// edge cases, individual handlers) is tested next to the code in
// `fungi_fortress_sim`; these tests cover how the pieces fit together.

use std::collections::BTreeSet;

use fungi_fortress_scenarios::{Scenario, ScenarioBuilder, config_from_json, init_tracing};
use fungi_fortress_sim::agent::AgentState;
use fungi_fortress_sim::event::{SimEvent, SimEventKind};
use fungi_fortress_sim::grid::TileMap;
use fungi_fortress_sim::sim::{AgentSnapshot, DesignateError, SimState};
use fungi_fortress_sim::task::{Task, TaskKind};
use fungi_fortress_sim::types::TileCoord;

fn scenario(rows: &[&str]) -> Scenario {
    init_tracing();
    ScenarioBuilder::new(rows).build()
}

fn all_idle(sim: &SimState) -> bool {
    sim.task_manager.is_empty() && sim.dwarves.iter().all(|d| d.is_available() && d.task_queue.is_empty())
}

fn count(events: &[SimEvent], pred: impl Fn(&SimEventKind) -> bool) -> usize {
    events.iter().filter(|e| pred(&e.kind)).count()
}

fn assert_designation_consistent(sim: &SimState) {
    let expected: BTreeSet<TileCoord> = sim.task_manager.pending().filter_map(|t| t.target).collect();
    let actual: BTreeSet<TileCoord> = sim.task_manager.designated().collect();
    assert_eq!(actual, expected, "designated set drifted at tick {}", sim.tick);
}

// ---------------------------------------------------------------------------
// Assignment and movement
// ---------------------------------------------------------------------------

#[test]
fn chop_three_steps_away_is_assigned_then_completed() {
    let mut s = scenario(&["D...T"]);
    let task = s
        .sim
        .designate(TaskKind::Chop, TileCoord::new(4, 0), None)
        .unwrap();
    assert_eq!(task.anchor, TileCoord::new(3, 0));

    let mut events = Vec::new();
    s.sim.assign_pending_tasks(&mut events);
    assert_eq!(s.sim.dwarves[0].state, AgentState::Moving);
    assert_eq!(s.sim.dwarves[0].path.len(), 3);
    assert!(s.sim.task_manager.is_empty());

    let events = s.run_until(50, all_idle);
    assert_eq!(s.sim.inventory.count("wood"), 11);
    assert_eq!(s.key_at(4, 0), "grass");
    assert_eq!(s.sim.dwarves[0].position, TileCoord::new(3, 0));
    assert_eq!(
        count(&events, |k| matches!(
            k,
            SimEventKind::TaskCompleted {
                kind: TaskKind::Chop,
                ..
            }
        )),
        1
    );
}

#[test]
fn mined_stone_becomes_floor_after_base_ticks() {
    let mut s = scenario(&["D#", ".."]);
    s.sim
        .designate(TaskKind::Mine, TileCoord::new(1, 0), None)
        .unwrap();

    // Tick 1 assigns (empty path) and starts mining; five more finish it.
    s.tick();
    assert_eq!(s.sim.dwarves[0].state, AgentState::Mining);
    s.run(4);
    assert_eq!(s.key_at(1, 0), "stone_wall");
    s.tick();
    assert_eq!(s.sim.inventory.count("stone"), 6);
    assert_eq!(s.key_at(1, 0), "grass");
}

#[test]
fn queue_capacity_two_rejects_third_mine() {
    init_tracing();
    let mut s = ScenarioBuilder::new(&["D......", "..#.#.#"])
        .with_config(|c| c.task_capacity = 2)
        .build();
    assert!(s.sim.designate(TaskKind::Mine, TileCoord::new(2, 1), None).is_ok());
    assert!(s.sim.designate(TaskKind::Mine, TileCoord::new(4, 1), None).is_ok());
    assert_eq!(
        s.sim.designate(TaskKind::Mine, TileCoord::new(6, 1), None),
        Err(DesignateError::QueueFull)
    );
    assert_eq!(s.sim.task_manager.len(), 2);
    assert!(!s.sim.task_manager.is_designated(TileCoord::new(6, 1)));

    let extra = Task::with_target(TileCoord::new(6, 0), TaskKind::Mine, TileCoord::new(6, 1));
    assert!(!s.sim.submit(extra.clone()));

    // Once a task is handed out there is room again.
    s.tick();
    assert_eq!(s.sim.task_manager.len(), 1);
    assert!(s.sim.submit(extra));
}

#[test]
fn two_dwarves_on_one_tile_separate_within_a_tick() {
    let mut s = scenario(&["...", ".D.", "..."]);
    s.sim.spawn_dwarf(TileCoord::new(1, 1)).unwrap();
    let events = s.tick();
    assert_ne!(s.sim.dwarves[0].position, s.sim.dwarves[1].position);
    assert_eq!(s.sim.dwarves[0].position, TileCoord::new(1, 1));
    assert_eq!(
        count(&events, |k| matches!(k, SimEventKind::ActorDisplaced { .. })),
        1
    );
}

#[test]
fn busy_colony_keeps_designations_consistent() {
    let mut s = scenario(&[
        "D..T..#..",
        ".#...T...",
        "D..#...T.",
        "....#....",
        "D.T...#..",
    ]);
    for (x, y) in [(3, 0), (5, 1), (7, 2), (2, 4)] {
        s.sim
            .designate(TaskKind::Chop, TileCoord::new(x, y), None)
            .unwrap();
        assert_designation_consistent(&s.sim);
    }
    for (x, y) in [(6, 0), (1, 1), (3, 2), (4, 3), (6, 4)] {
        s.sim
            .designate(TaskKind::Mine, TileCoord::new(x, y), None)
            .unwrap();
        assert_designation_consistent(&s.sim);
    }
    assert_eq!(s.sim.task_manager.len(), 9);

    for _ in 0..200 {
        s.tick();
        assert_designation_consistent(&s.sim);
        assert!(s.sim.dwarves.iter().all(|d| !d.state.is_working() || d.task.is_some()));
        assert!(s.sim.dwarves.iter().all(|d| d.state != AgentState::Idle || d.path.is_empty()));
        if all_idle(&s.sim) {
            break;
        }
    }
    assert!(all_idle(&s.sim));
    assert_eq!(s.sim.inventory.count("wood"), 14);
    assert_eq!(s.sim.inventory.count("stone"), 10);
}

#[test]
fn unreachable_task_waits_until_path_opens() {
    let mut s = scenario(&["D.#."]);
    assert!(s.sim.submit(Task::new(TileCoord::new(3, 0), TaskKind::Move)));
    s.run(5);
    assert_eq!(s.sim.task_manager.len(), 1);
    assert_eq!(s.sim.task_manager.get(0).unwrap().unreachable_ticks, 0);
    assert!(s.sim.dwarves[0].is_available());

    s.sim
        .designate(TaskKind::Mine, TileCoord::new(2, 0), None)
        .unwrap();
    s.run_until(30, all_idle);
    assert_eq!(s.sim.dwarves[0].position, TileCoord::new(3, 0));
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

#[test]
fn mycelial_nexus_consumes_its_full_cost() {
    let mut s = scenario(&["D....", "....."]);
    s.sim
        .designate(
            TaskKind::Build,
            TileCoord::new(3, 1),
            Some("Mycelial Nexus".to_string()),
        )
        .unwrap();
    let events = s.run_until(60, all_idle);

    assert_eq!(s.key_at(3, 1), "Mycelial Nexus");
    assert_eq!(s.sim.inventory.count("wood"), 0);
    assert_eq!(s.sim.inventory.count("fungi"), 0);
    assert_eq!(s.sim.inventory.count("Sclerotium"), 0);
    assert_eq!(
        count(&events, |k| matches!(k, SimEventKind::StructureBuilt { .. })),
        1
    );
}

#[test]
fn unaffordable_sporeforge_is_declined_after_full_duration() {
    let mut s = scenario(&["D...."]);
    s.sim
        .designate(
            TaskKind::Build,
            TileCoord::new(0, 0),
            Some("Dwarven Sporeforge".to_string()),
        )
        .unwrap();
    // One tick to arrive, then the structure's own 15 ticks.
    let events = s.run(15);
    assert_eq!(s.sim.dwarves[0].state, AgentState::Building);
    assert_eq!(count(&events, |k| matches!(k, SimEventKind::ActionFailed { .. })), 0);

    let events = s.tick();
    assert!(s.sim.dwarves[0].is_available());
    assert_eq!(s.key_at(0, 0), "grass");
    assert_eq!(s.sim.inventory.count("stone"), 5);
    assert_eq!(count(&events, |k| matches!(k, SimEventKind::ActionFailed { .. })), 1);
}

#[test]
fn bridge_opens_a_route_across_water() {
    let mut s = scenario(&["D.~.."]);
    assert_eq!(
        s.sim.designate(TaskKind::Move, TileCoord::new(2, 0), None),
        Err(DesignateError::NotWalkable(TileCoord::new(2, 0)))
    );
    let bridge = s
        .sim
        .designate(TaskKind::BuildBridge, TileCoord::new(2, 0), None)
        .unwrap();
    assert_eq!(bridge.anchor, TileCoord::new(1, 0));
    s.run_until(30, all_idle);
    assert_eq!(s.key_at(2, 0), "bridge");
    assert_eq!(s.sim.inventory.count("wood"), 9);

    s.sim
        .designate(TaskKind::Move, TileCoord::new(4, 0), None)
        .unwrap();
    s.run_until(30, all_idle);
    assert_eq!(s.sim.dwarves[0].position, TileCoord::new(4, 0));
}

// ---------------------------------------------------------------------------
// Hooks: sublevels, illumination, conversation
// ---------------------------------------------------------------------------

#[test]
fn entering_the_grotto_calls_the_hook_and_level_changes() {
    let mut s = scenario(&["D.G"]);
    s.sim
        .designate(TaskKind::Enter, TileCoord::new(2, 0), None)
        .unwrap();
    s.run_until(10, all_idle);
    assert_eq!(s.hooks.sublevels_entered.len(), 1);
    let (agent, entrance, at) = &s.hooks.sublevels_entered[0];
    assert_eq!(*agent, s.sim.dwarves[0].id);
    assert_eq!(entrance, "Shadowed Grotto");
    assert_eq!(*at, TileCoord::new(2, 0));

    // The level generator would now swap the map in.
    let floor = s.sim.config.entities.tile("stone_floor").unwrap();
    let wall = s.sim.config.entities.tile("stone_wall").unwrap();
    let mut below = TileMap::filled(3, 1, floor);
    below.set(TileCoord::new(2, 0), wall);
    s.sim.change_level(below, 1);
    s.sim.dwarves[0].position = TileCoord::new(0, 0);

    s.sim
        .designate(TaskKind::Mine, TileCoord::new(2, 0), None)
        .unwrap();
    s.run_until(20, all_idle);
    assert_eq!(s.key_at(2, 0), "stone_floor");
}

#[test]
fn magic_fungi_light_up_the_network() {
    let mut s = scenario(&["DF.."]);
    let task = s
        .sim
        .designate(TaskKind::Mine, TileCoord::new(1, 0), None)
        .unwrap();
    assert_eq!(task.anchor, TileCoord::new(0, 0));
    let events = s.run_until(20, all_idle);
    assert_eq!(s.hooks.illuminations, vec![TileCoord::new(0, 0)]);
    assert_eq!(s.sim.spore_exposure, 55);
    assert_eq!(s.sim.inventory.count("magic_fungi"), 1);
    assert_eq!(
        count(&events, |k| matches!(k, SimEventKind::SporeExposure { gained: 5, .. })),
        1
    );
}

#[test]
fn low_exposure_colony_does_not_illuminate() {
    init_tracing();
    let mut s = ScenarioBuilder::new(&["DF.."])
        .with_config(|c| c.starting_spore_exposure = 0)
        .build();
    s.sim
        .designate(TaskKind::Mine, TileCoord::new(1, 0), None)
        .unwrap();
    s.run_until(20, all_idle);
    assert!(s.hooks.illuminations.is_empty());
    assert_eq!(s.sim.spore_exposure, 5);
}

#[test]
fn talking_reaches_the_dialogue_hook() {
    let mut s = scenario(&["D..c"]);
    s.hooks.accept_talk = true;
    s.sim
        .designate(TaskKind::Talk, TileCoord::new(3, 0), None)
        .unwrap();
    let events = s.run_until(20, all_idle);
    assert_eq!(
        s.hooks.conversations,
        vec![(s.sim.dwarves[0].id, "Stranger 0".to_string())]
    );
    assert_eq!(
        count(&events, |k| matches!(
            k,
            SimEventKind::Conversation { handled: true, .. }
        )),
        1
    );
}

// ---------------------------------------------------------------------------
// Combat and food
// ---------------------------------------------------------------------------

#[test]
fn hunting_a_still_animal_yields_food() {
    init_tracing();
    let mut s = ScenarioBuilder::new(&["D..a"])
        .with_config(|c| c.animal_move_chance = 0.0)
        .build();
    s.sim
        .designate(TaskKind::Fight, TileCoord::new(3, 0), None)
        .unwrap();
    let events = s.run_until(30, all_idle);
    assert!(!s.sim.animals[0].alive);
    assert_eq!(s.sim.inventory.count("food"), 4);
    assert_eq!(
        count(&events, |k| matches!(k, SimEventKind::AnimalHunted { .. })),
        1
    );
}

#[test]
fn repeated_fights_defeat_a_character() {
    init_tracing();
    let mut s = ScenarioBuilder::new(&["D.c"])
        .with_config(|c| {
            c.character_health = 20;
            c.durations.fighting_ticks = 2;
        })
        .build();
    for _ in 0..2 {
        let task = Task::with_target(TileCoord::new(1, 0), TaskKind::Fight, TileCoord::new(2, 0));
        assert!(s.sim.submit(task));
        s.run_until(20, all_idle);
    }
    assert!(!s.sim.characters[0].alive);
}

#[test]
fn fishing_needs_no_target() {
    let mut s = scenario(&["D~"]);
    s.sim
        .designate(TaskKind::Fish, TileCoord::new(1, 0), None)
        .unwrap();
    s.run_until(20, all_idle);
    assert_eq!(s.sim.inventory.count("food"), 3);
}

// ---------------------------------------------------------------------------
// Personal queues, config, snapshots, determinism
// ---------------------------------------------------------------------------

#[test]
fn personal_queue_runs_alongside_the_task_manager() {
    let mut s = scenario(&["D....", "D...T"]);
    let first = s.sim.dwarves[0].id;
    s.sim.push_personal_task(first, Task::new(TileCoord::new(4, 0), TaskKind::Move));
    s.sim
        .designate(TaskKind::Chop, TileCoord::new(4, 1), None)
        .unwrap();

    // The manager task goes to the first idle dwarf; the personal task
    // starts in the same tick's update.
    let events = s.tick();
    assert_eq!(s.sim.dwarves[0].task_kind(), Some(TaskKind::Chop));
    assert_eq!(
        count(&events, |k| matches!(k, SimEventKind::QueuedTaskStarted { .. })),
        0
    );

    s.run_until(60, all_idle);
    assert_eq!(s.sim.dwarves[0].position, TileCoord::new(4, 0));
    assert_eq!(s.sim.inventory.count("wood"), 11);
}

#[test]
fn json_config_override_speeds_up_mining() {
    init_tracing();
    let config = config_from_json(r#"{ "durations": { "base_mining_ticks": 1 } }"#);
    let mut s = ScenarioBuilder::new(&["D#"]).config(config).build();
    s.sim
        .designate(TaskKind::Mine, TileCoord::new(1, 0), None)
        .unwrap();
    s.run(2);
    assert_eq!(s.key_at(1, 0), "grass");
}

#[test]
fn snapshots_serialize_for_display() {
    let mut s = scenario(&["D...."]);
    s.sim
        .designate(TaskKind::Move, TileCoord::new(4, 0), None)
        .unwrap();
    s.tick();
    let snapshots = s.sim.agent_snapshots();
    let json = serde_json::to_string(&snapshots).unwrap();
    let restored: Vec<AgentSnapshot> = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, snapshots);
    assert_eq!(restored[0].state, AgentState::Moving);
    assert_eq!(restored[0].path.len(), 3);
}

#[test]
fn same_seed_same_fortress() {
    let run = |seed| {
        init_tracing();
        let mut s = ScenarioBuilder::new(&[
            "D..f....",
            "........",
            "..a..f..",
            "....a...",
        ])
        .seed(seed)
        .build();
        for (x, y) in [(3, 0), (5, 2)] {
            s.sim
                .designate(TaskKind::Mine, TileCoord::new(x, y), None)
                .unwrap();
        }
        let events = s.run(60);
        (s.render(), s.sim.animals.iter().map(|a| a.position).collect::<Vec<_>>(), events)
    };
    let (map_a, animals_a, events_a) = run(7);
    let (map_b, animals_b, events_b) = run(7);
    assert_eq!(map_a, map_b);
    assert_eq!(animals_a, animals_b);
    assert_eq!(events_a, events_b);
}
