mod common;

use common::*;
use screeps_steward::algorithms::mincut::*;
use screeps_steward::config::*;
use screeps_steward::constants::*;
use screeps_steward::creep::*;
use screeps_steward::pathing::cursor::*;
use screeps_steward::pathing::search::*;
use screeps_steward::room::coord::*;
use screeps_steward::room::data::*;
use screeps_steward::spawnsystem::*;
use screeps_steward::store::*;
use screeps_steward::transfer::requests::*;
use screeps_steward::transfer::transfersystem::*;
use screeps_steward::Engine;

fn engine() -> Engine {
    Engine::with_seed(EngineConfig::default(), 7)
}

fn bootstrapped() -> (SimHost, Engine) {
    let mut host = SimHost::with_territory("W1N1", 300, 300);
    host.add_node("W1N1", "src1", pos("W1N1", 10, 10), Coord::new(11, 11).unwrap());

    let mut engine = engine();
    engine.tick(&mut host);

    (host, engine)
}

#[test]
fn first_tick_spawns_a_miner_for_the_local_node() {
    let (host, engine) = bootstrapped();
    let room = room("W1N1");

    assert_eq!(host.spawned.len(), 1);

    let (name, body) = &host.spawned[0];
    assert!(name.starts_with("m_"));
    assert_eq!(body.len(), 4);

    let agent = AgentId::new(name.as_str());
    let record = engine.agent_record(&agent).unwrap();
    assert_eq!(record.node, Some(NodeId::new("src1")));

    assert_eq!(engine.economy(room).unwrap().active_nodes, 1);
    assert!(engine.agents_of(&AgentOwner::Territory(room)).contains(&agent));
}

#[test]
fn hauler_follows_the_miner() {
    let (mut host, mut engine) = bootstrapped();

    host.next_tick();
    engine.tick(&mut host);

    assert_eq!(host.spawned.len(), 2);
    assert!(host.spawned[1].0.starts_with("h_"));
}

#[test]
fn loaded_hauler_delivers_and_keeps_its_target() {
    let mut host = SimHost::with_territory("W1N1", 200, 300);
    host.add_agent("W1N1", hauler("h_1", pos("W1N1", 22, 22), 100));
    host.fill_targets.insert(room("W1N1"), vec![extension("e1", pos("W1N1", 20, 20))]);

    let mut engine = engine();
    let agent = AgentId::new("h_1");

    let expected = TransportDirective::Deliver {
        target: TargetId::Structure("e1".to_owned()),
        pos: pos("W1N1", 20, 20),
    };

    engine.tick(&mut host);
    assert_eq!(engine.get_transport_assignment(&agent), Some(expected.clone()));
    assert_eq!(engine.agent_record(&agent).unwrap().delivery, Some(TargetId::Structure("e1".to_owned())));

    host.next_tick();
    host.view_mut("W1N1").energy_available = 200;

    engine.tick(&mut host);
    assert_eq!(engine.get_transport_assignment(&agent), Some(expected));
}

#[test]
fn idle_hauler_raises_spawn_balance() {
    let mut host = SimHost::with_territory("W1N1", 200, 300);
    host.add_agent("W1N1", hauler("h_1", pos("W1N1", 21, 21), 100));
    host.add_agent("W1N1", hauler("h_2", pos("W1N1", 30, 30), 100));
    host.fill_targets.insert(room("W1N1"), vec![extension("e1", pos("W1N1", 20, 20))]);

    let mut engine = engine();
    engine.tick(&mut host);

    let room = room("W1N1");
    let balance = engine.spawn_balance(room);

    assert!(balance > 0.0);
    assert!(balance < SpawnBalance::STEP);

    assert_eq!(engine.get_transport_assignment(&AgentId::new("h_2")), Some(TransportDirective::Idle));

    assert!(engine.report_energy_shortage(room, host.time));
    assert!(!engine.report_energy_shortage(room, host.time));
    assert!(engine.spawn_balance(room) < balance);
}

#[test]
fn state_survives_save_and_load() {
    let (host, engine) = bootstrapped();
    let room = room("W1N1");
    let node = NodeId::new("src1");
    let agent = AgentId::new(host.spawned[0].0.as_str());

    let mut backend = InMemoryBackend::new();
    engine.save(&mut backend).unwrap();

    let mut restored = Engine::with_seed(EngineConfig::default(), 11);
    restored.load(&backend).unwrap();

    assert_eq!(restored.node_info(&node).unwrap().home_room, room);
    assert_eq!(restored.agent_record(&agent).unwrap().node, Some(node.clone()));

    let route = restored.get_cached_route(room, &node).unwrap();
    assert!(!route.is_empty());
    assert_eq!(route, engine.get_cached_route(room, &node).unwrap());
}

#[test]
fn agent_advances_along_cached_route() {
    let (host, mut engine) = bootstrapped();
    let room = room("W1N1");
    let node = NodeId::new("src1");
    let agent = AgentId::new(host.spawned[0].0.as_str());

    let route = engine.get_cached_route(room, &node).unwrap();
    assert!(route.len() > 1);

    let step = engine.advance_on_route(room, &agent, &node, route[0], host.time, false).unwrap();
    assert_eq!(step, CursorStep::Move(route[1]));

    assert!(engine.get_cached_route(room, &NodeId::new("unknown")).is_none());
    assert!(engine.advance_on_route(room, &agent, &NodeId::new("unknown"), route[0], host.time, false).is_err());
}

#[test]
fn lost_territory_is_forgotten() {
    let (mut host, mut engine) = bootstrapped();
    let room = room("W1N1");

    assert_eq!(engine.territories(), vec![room]);

    host.territories.clear();
    host.next_tick();
    engine.tick(&mut host);

    assert!(engine.territories().is_empty());
    assert!(engine.economy(room).is_none());
    assert!(engine.node_info(&NodeId::new("src1")).is_none());
    assert!(engine.remotes_of(room).is_empty());
}

#[test]
fn removed_mission_drops_its_spawns() {
    let mut host = SimHost::with_territory("W1N1", 300, 300);
    let room = room("W1N1");
    let mission = MissionId::new("upgrade");

    let mut engine = engine();
    engine.register_mission(mission.clone(), room);

    let request = SpawnRequest::new(AgentRole::Upgrader, vec![Part::Work, Part::Carry, Part::Move], AgentOwner::Mission(mission.clone()));
    engine.enqueue_spawn_request(room, request).unwrap();
    assert_eq!(engine.pending_spawns(room).len(), 1);

    engine.remove_mission(&mission);
    engine.tick(&mut host);

    assert!(engine.pending_spawns(room).is_empty());
    assert!(host.spawned.is_empty());
}

#[test]
fn unaffordable_request_blocks_lower_priorities() {
    let mut host = SimHost::with_territory("W1N1", 100, 300);
    let room = room("W1N1");
    let owner = AgentOwner::Territory(room);

    let mut engine = engine();

    let hauler = SpawnRequest::new(AgentRole::Hauler, vec![Part::Carry, Part::Move, Part::Carry, Part::Move, Part::Carry, Part::Move], owner.clone()).urgent(true);
    let upgrader = SpawnRequest::new(AgentRole::Upgrader, vec![Part::Carry, Part::Move], owner);

    engine.enqueue_spawn_request(room, upgrader).unwrap();
    engine.enqueue_spawn_request(room, hauler).unwrap();

    engine.tick(&mut host);

    assert!(host.spawned.is_empty());

    let pending = engine.pending_spawns(room);
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].role, AgentRole::Hauler);
    assert_eq!(pending[1].role, AgentRole::Upgrader);
}

#[test]
fn mincut_seals_the_only_gap() {
    let host = SimHost::with_territory("W1N1", 300, 300);
    let engine = engine();

    let center = Coord::new(25, 25).unwrap();
    let gap = Coord::new(28, 25).unwrap();

    let mut grid = FlowGrid::open(ROOM_SIZE, ROOM_SIZE);

    for tile in center.ring(3) {
        if tile != gap {
            grid.set(tile, BLOCKED_COST);
        }
    }

    let result = engine.compute_mincut(&host, room("W1N1"), &[center], &grid.border_exits(), Some(&grid)).unwrap();

    assert_eq!(result.cuts.len(), 1);
    assert!(result.insides.contains(&center));
}

#[test]
fn path_search_uses_cached_matrices() {
    let host = SimHost::with_territory("W1N1", 300, 300);
    let mut engine = engine();

    let start = pos("W1N1", 10, 10);
    let goal = pos("W1N1", 20, 20);

    let path = engine.find_path(&host, start, &[SearchGoal::new(goal, 1)], host.time).unwrap();

    assert!(!path.is_empty());
    assert!(path.last().unwrap().world_range_to(&goal) <= 1);
}

#[test]
fn storage_level_territory_keeps_porters() {
    let mut host = SimHost::with_territory("W1N1", 800, 800);
    host.view_mut("W1N1").level = 4;

    let mut engine = engine();
    engine.tick(&mut host);

    assert_eq!(host.spawned.len(), 1);
    assert!(host.spawned[0].0.starts_with("p_"));
    assert_eq!(host.spawned[0].1.iter().filter(|p| **p == Part::Carry).count(), 10);

    // Ten carry parts are short of the fifteen a single spawn keeps.
    host.next_tick();
    engine.tick(&mut host);

    assert_eq!(host.spawned.len(), 2);
    assert!(host.spawned[1].0.starts_with("p_"));

    host.next_tick();
    engine.tick(&mut host);

    assert_eq!(host.spawned.len(), 2);
    assert!(engine.pending_spawns(room("W1N1")).is_empty());
}
