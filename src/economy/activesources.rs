//! Choice of the nodes a territory works: every local node, plus the remote prefixes that fit
//! the spawn time left over.

use super::income::*;
use super::knapsack::*;
use super::remotes::*;
use crate::config::*;
use crate::constants::*;
use crate::creep::*;
use crate::error::*;
use crate::host::*;
use crate::room::data::*;
use crate::room::name::*;
use crate::store::*;
use log::*;
use rand::{Rng, RngCore};

/// Carry parts per spawn kept for porters once the storage economy starts.
const PORTER_CARRY_PER_SPAWN: u32 = 15;

/// Spawn time per porter carry part: two carries share a move.
const PORTER_PART_USAGE: f32 = 1.5;

const PORTER_LEVEL: u8 = 4;

/// Porter carry parts a territory keeps: a share per spawn from `PORTER_LEVEL` on, plus the
/// controller haulers at exactly that level.
pub fn porter_carry_target(level: u8, num_spawn: u32, controller_num_carry: u32) -> u32 {
    let mut carry = 0;

    if level >= PORTER_LEVEL {
        carry += num_spawn * PORTER_CARRY_PER_SPAWN;
    }

    if level == PORTER_LEVEL {
        carry += controller_num_carry;
    }

    carry
}

pub fn active_source_inputs(view: &TerritoryView, num_remotes: usize) -> ActiveSourceInputs {
    ActiveSourceInputs {
        num_spawn: view.num_spawns,
        reserve: view.energy_capacity_available >= RESERVER_COST,
        constructed: view.energy_capacity_available > REMOTE_BUILDER_COST,
        level: view.level,
        num_remotes,
    }
}

fn porter_part_income() -> f32 {
    (2 * Part::Carry.cost() + Part::Move.cost()) as f32 / 2.0 / CREEP_LIFE_TIME as f32
}

/// Returns the territory's active set, reusing the cached one unless a refresh is rolled and its
/// inputs have changed or it has aged out. A cache that names unknown nodes is rebuilt.
pub fn compute_active_sources(
    map: &dyn MapView,
    view: &TerritoryView,
    store: &mut MemoryStore,
    config: &EngineConfig,
    time: u32,
    rng: &mut dyn RngCore,
) -> EngineResult<ActiveSourceSet> {
    let num_remotes = store.remotes_of(view.name).map(|r| r.len()).unwrap_or(0);
    let inputs = active_source_inputs(view, num_remotes);

    if let Some(cached) = store.active_sources.get(&view.name).cloned() {
        let missing = store.missing_nodes(cached.node_ids.iter());

        if !missing.is_empty() {
            let err = EngineError::InconsistentCache(format!("active sources of {} reference {} unknown nodes", view.name, missing.len()));

            warn!("Discarding active sources - Territory: {} - Error: {}", view.name, err);

            store.active_sources.remove(&view.name);
        } else if !rng.gen_bool(config.cache.active_source_refresh_chance.clamp(0.0, 1.0)) || cached.is_valid_for(&inputs, time, CREEP_LIFE_TIME) {
            return Ok(cached);
        }
    }

    info!("Regenerating active sources - Territory: {}", view.name);

    let set = plan_active_sources(map, view, store, config, inputs, time)?;

    store.active_sources.insert(view.name, set.clone());

    Ok(set)
}

fn refresh_local_node(map: &dyn MapView, view: &TerritoryView, node: &LocalNode, store: &mut MemoryStore, movement: &MovementConfig) -> Option<NodeId> {
    if store.node(&node.id).is_none() {
        match plan_local_node(map, view, node, movement) {
            Ok(info) => store.insert_node(info),
            Err(err) => {
                debug!("Unable to plan local node - Node: {} - Territory: {} - Error: {}", node.id, view.name, err);
                return None;
            }
        }
    }

    let info = store.node_mut(&node.id)?;

    info.linked = node.linked;
    info.constructed = node.constructed;
    info.constructing = node.constructing;
    info.num_open = node.num_open;

    Some(node.id.clone())
}

fn remote_candidates(map: &dyn MapView, view: &TerritoryView, store: &mut MemoryStore, inputs: &ActiveSourceInputs) -> Vec<RemoteCandidate> {
    let mut candidates = Vec::new();

    let Some(remotes) = store.remotes.get(&view.name) else {
        return candidates;
    };

    let mut planned: Vec<(RoomName, RoomType, Vec<NodeId>)> = Vec::new();

    for (room, remote) in remotes.iter() {
        if remote.node_ids.is_empty() {
            continue;
        }

        if remote.room_type.requires_escort() && view.energy_capacity_available < KEEPER_KILLER_COST {
            continue;
        }

        if map.room_intel(*room).map(|intel| intel.stronghold).unwrap_or(false) {
            continue;
        }

        planned.push((*room, remote.room_type, remote.node_ids.clone()));
    }

    let options = RemoteNodeOptions {
        reserve: inputs.reserve,
        constructed: inputs.constructed,
        level: inputs.level,
    };

    for (room, room_type, mut node_ids) in planned {
        node_ids.retain(|id| store.node(id).is_some());
        node_ids.sort_by_key(|id| store.node(id).map(|info| info.distance).unwrap_or(u32::MAX));

        let mut value = 0.0;
        let mut weight = 0.0;

        if room_type == RoomType::Normal {
            if inputs.reserve {
                value -= RESERVER_COST as f32 / (CREEP_CLAIM_LIFE_TIME - RESERVER_TRAVEL_TICKS) as f32;
                weight += 5.0;
            }
        } else if room_type.requires_escort() {
            value -= KEEPER_KILLER_COST as f32 / (CREEP_LIFE_TIME - KEEPER_KILLER_TRAVEL_TICKS) as f32;
            weight += MAX_CREEP_SIZE as f32;
        }

        let mut intermediates: Vec<RoomName> = Vec::new();

        for (depth, node_id) in node_ids.iter().enumerate() {
            let Some(info) = store.node_mut(node_id) else {
                continue;
            };

            let net_income = remote_node_income(info, &options);
            let spawn_usage = remote_node_spawn_usage(info, &options);

            for intermediate in info.intermediates.iter() {
                if !intermediates.contains(intermediate) {
                    intermediates.push(*intermediate);
                }
            }

            info.max_income = net_income;

            value += net_income;
            weight += spawn_usage;

            candidates.push(RemoteCandidate {
                room,
                node_ids: node_ids[..=depth].to_vec(),
                value,
                weight,
                intermediates: intermediates.clone(),
            });
        }
    }

    candidates
}

/// Recomputes the active set from scratch. Local nodes come first in distance order, followed by
/// the chosen remote prefixes, densest first.
pub fn plan_active_sources(
    map: &dyn MapView,
    view: &TerritoryView,
    store: &mut MemoryStore,
    config: &EngineConfig,
    inputs: ActiveSourceInputs,
    time: u32,
) -> EngineResult<ActiveSourceSet> {
    let mut set = ActiveSourceSet {
        node_ids: Vec::new(),
        inputs: inputs.clone(),
        tick: time,
        default_income: 0.0,
        max_income: 0.0,
        spawn_usage_ratio: 0.0,
    };

    if inputs.num_spawn == 0 {
        return Ok(set);
    }

    let num_spawn = inputs.num_spawn as f32;
    let spawn_usage_max = num_spawn * CREEP_LIFE_TIME as f32 / CREEP_SPAWN_TIME as f32;

    let mut spawn_usage = spawn_usage_max;
    let mut max_income = 0.0;

    let porter_carry = porter_carry_target(inputs.level, inputs.num_spawn, view.controller_num_carry) as f32;

    spawn_usage -= porter_carry * PORTER_PART_USAGE;
    max_income -= porter_carry * porter_part_income();

    set.default_income = max_income;

    let mut local: Vec<(u32, NodeId)> = Vec::new();

    for node in view.nodes.iter() {
        let Some(node_id) = refresh_local_node(map, view, node, store, &config.movement) else {
            continue;
        };

        let Some(info) = store.node_mut(&node_id) else {
            continue;
        };

        let options = LocalNodeOptions {
            constructed: inputs.constructed,
            linked: node.linked,
            level: inputs.level,
        };

        spawn_usage -= local_node_spawn_usage(info, &options);
        info.max_income = local_node_income(info, &options);
        max_income += info.max_income;

        local.push((info.distance, node_id));
    }

    local.sort_by_key(|(distance, _)| *distance);

    set.node_ids = local.into_iter().map(|(_, id)| id).collect();

    let candidates = remote_candidates(map, view, store, &inputs);

    let buffer = num_spawn * config.spawn.remote_buffer_per_spawn;
    let capacity = (spawn_usage - buffer).floor() as i64;

    let selection = select_remotes(&candidates, capacity)?;

    if let Some(remotes) = store.remotes.get_mut(&view.name) {
        for remote in remotes.values_mut() {
            if remote.room_type.requires_escort() {
                remote.active_source_ids.clear();
            }
        }
    }

    for index in selection.selected.iter() {
        let candidate = &candidates[*index];

        max_income += candidate.value;

        if let Some(remote) = store.remotes.get_mut(&view.name).and_then(|r| r.get_mut(&candidate.room)) {
            if remote.room_type.requires_escort() {
                remote.active_source_ids = candidate.node_ids.clone();
            }
        }

        set.node_ids.extend(candidate.node_ids.iter().cloned());
    }

    let remaining = capacity.max(0) as f32 - selection.weight as f32 + buffer;

    set.max_income = max_income;
    set.spawn_usage_ratio = 1.0 - remaining / spawn_usage_max;

    debug!(
        "Active sources - Territory: {} - Nodes: {} - Remotes: {} - Max income: {:.2} - Spawn usage: {:.2}",
        view.name,
        set.node_ids.len(),
        selection.selected.len(),
        set.max_income,
        set.spawn_usage_ratio
    );

    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::coord::*;
    use crate::room::terrain::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    struct HomeMap {
        terrains: HashMap<RoomName, RoomTerrain>,
    }

    impl MapView for HomeMap {
        fn terrain(&self, room: RoomName) -> Option<&RoomTerrain> {
            self.terrains.get(&room)
        }

        fn adjacent_rooms(&self, _room: RoomName) -> Vec<RoomName> {
            Vec::new()
        }

        fn room_structures(&self, _room: RoomName) -> Option<Vec<StructureView>> {
            None
        }

        fn room_intel(&self, _room: RoomName) -> Option<RoomIntel> {
            None
        }
    }

    fn room(name: &str) -> RoomName {
        name.parse().unwrap()
    }

    fn home_map() -> HomeMap {
        HomeMap {
            terrains: [(room("W1N1"), RoomTerrain::plain())].into_iter().collect(),
        }
    }

    fn pos(name: &str, x: u8, y: u8) -> Position {
        Position::new(room(name), Coord::new(x, y).unwrap())
    }

    fn remote_node(id: &str, room_name: &str, distance: u32) -> ResourceNodeInfo {
        ResourceNodeInfo {
            id: NodeId::new(id),
            pos: pos(room_name, 25, 25),
            home_room: room("W1N1"),
            room_type: room(room_name).room_type(),
            owned: false,
            distance,
            energy_per_tick: 10.0,
            num_open: 2,
            container_coord: Coord::new(25, 26),
            constructed: false,
            constructing: false,
            linked: false,
            road_coords: Vec::new(),
            intermediates: Vec::new(),
            max_income: 0.0,
            runtime: NodeRuntime::default(),
        }
    }

    fn view(num_spawns: u32) -> TerritoryView {
        TerritoryView {
            name: room("W1N1"),
            level: 3,
            energy_available: 800,
            energy_capacity_available: 800,
            num_spawns,
            free_spawns: Vec::new(),
            anchor: Some(pos("W1N1", 25, 25)),
            nodes: vec![LocalNode {
                id: NodeId::new("local"),
                pos: pos("W1N1", 10, 25),
                container_coord: Coord::new(11, 25),
                linked: false,
                constructed: true,
                constructing: false,
                num_open: 3,
            }],
            storage: None,
            controller: None,
            controller_num_carry: 0,
        }
    }

    fn store_with_remotes() -> MemoryStore {
        let mut store = MemoryStore::new();
        let mut remotes = std::collections::BTreeMap::new();

        for (room_name, ids) in [("W2N1", vec![("a", 40), ("b", 60)]), ("W1N2", vec![("c", 50)])] {
            let mut remote = RemoteInfo::new(room(room_name));

            for (id, distance) in ids {
                store.insert_node(remote_node(id, room_name, distance));
                remote.node_ids.push(NodeId::new(id));
            }

            remotes.insert(room(room_name), remote);
        }

        store.remotes.insert(room("W1N1"), remotes);
        store
    }

    #[test]
    fn no_spawn_selects_nothing() {
        let mut store = store_with_remotes();
        let inputs = active_source_inputs(&view(0), 2);

        let set = plan_active_sources(&home_map(), &view(0), &mut store, &EngineConfig::default(), inputs, 10).unwrap();

        assert!(set.node_ids.is_empty());
    }

    #[test]
    fn local_nodes_lead_and_remotes_follow() {
        let mut store = store_with_remotes();
        let inputs = active_source_inputs(&view(1), 2);

        let set = plan_active_sources(&home_map(), &view(1), &mut store, &EngineConfig::default(), inputs, 10).unwrap();

        assert_eq!(set.node_ids[0], NodeId::new("local"));
        assert!(store.node(&NodeId::new("local")).unwrap().owned);
        assert!(set.node_ids.len() > 1);
        assert!(set.max_income > 0.0);
        assert!(set.spawn_usage_ratio > 0.0 && set.spawn_usage_ratio <= 1.0);

        let b = set.node_ids.iter().position(|id| *id == NodeId::new("b"));
        let a = set.node_ids.iter().position(|id| *id == NodeId::new("a"));

        if let Some(b) = b {
            assert!(a.map(|a| a < b).unwrap_or(false));
        }
    }

    #[test]
    fn cache_is_reused_until_inputs_change() {
        let mut store = store_with_remotes();
        let config = EngineConfig {
            cache: CacheConfig {
                active_source_refresh_chance: 1.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(7);

        let first = compute_active_sources(&home_map(), &view(1), &mut store, &config, 10, &mut rng).unwrap();
        let second = compute_active_sources(&home_map(), &view(1), &mut store, &config, 20, &mut rng).unwrap();

        assert_eq!(first.tick, 10);
        assert_eq!(second.tick, 10);

        let third = compute_active_sources(&home_map(), &view(2), &mut store, &config, 30, &mut rng).unwrap();
        assert_eq!(third.tick, 30);

        let aged = compute_active_sources(&home_map(), &view(2), &mut store, &config, 30 + CREEP_LIFE_TIME, &mut rng).unwrap();
        assert_eq!(aged.tick, 30 + CREEP_LIFE_TIME);
    }

    #[test]
    fn inconsistent_cache_is_rebuilt() {
        let mut store = store_with_remotes();
        let config = EngineConfig::default();
        let mut rng = StdRng::seed_from_u64(1);

        let first = compute_active_sources(&home_map(), &view(1), &mut store, &config, 10, &mut rng).unwrap();
        let dropped = first.node_ids.last().cloned().unwrap();

        store.nodes.remove(&dropped);
        if let Some(remotes) = store.remotes.get_mut(&room("W1N1")) {
            for remote in remotes.values_mut() {
                remote.node_ids.retain(|id| *id != dropped);
            }
        }

        let rebuilt = compute_active_sources(&home_map(), &view(1), &mut store, &config, 11, &mut rng).unwrap();

        assert_eq!(rebuilt.tick, 11);
        assert!(!rebuilt.node_ids.contains(&dropped));
    }

    #[test]
    fn keeper_rooms_wait_for_escort_capacity() {
        let mut store = MemoryStore::new();
        let keeper = room("W5N5");
        let mut remote = RemoteInfo::new(keeper);

        store.insert_node(remote_node("k", "W5N5", 60));
        remote.node_ids.push(NodeId::new("k"));

        let mut remotes = std::collections::BTreeMap::new();
        remotes.insert(keeper, remote);
        store.remotes.insert(room("W1N1"), remotes);

        let inputs = active_source_inputs(&view(3), 1);
        let set = plan_active_sources(&home_map(), &view(3), &mut store, &EngineConfig::default(), inputs, 0).unwrap();

        assert!(!set.node_ids.contains(&NodeId::new("k")));
    }

    #[test]
    fn porter_target_starts_at_storage_level() {
        assert_eq!(porter_carry_target(3, 2, 10), 0);
        assert_eq!(porter_carry_target(4, 2, 10), 2 * 15 + 10);
        assert_eq!(porter_carry_target(5, 2, 10), 2 * 15);
    }
}
