//! Discovery of nodes: local nodes of an owned room and remote rooms within reach.

use crate::algorithms::floodfill::*;
use crate::config::*;
use crate::constants::*;
use crate::error::*;
use crate::host::*;
use crate::pathing::costmatrix::*;
use crate::pathing::route::*;
use crate::pathing::search::*;
use crate::room::coord::*;
use crate::room::data::*;
use crate::room::name::*;
use crate::room::terrain::*;
use crate::store::*;
use log::*;
use std::collections::{HashMap, HashSet};

/// Walkable tiles around `pos` not taken by an obstacle.
pub fn count_open(map: &dyn MapView, pos: Position) -> u8 {
    let obstacles: HashSet<Coord> = map
        .room_structures(pos.room)
        .map(|structures| {
            structures
                .iter()
                .filter(|s| !s.construction_site && s.kind.is_obstacle())
                .map(|s| s.pos.coord)
                .collect()
        })
        .unwrap_or_default();

    pos.coord
        .ring(1)
        .into_iter()
        .filter(|coord| map.terrain_at(pos.room, *coord) != Terrain::Wall && !obstacles.contains(coord))
        .count() as u8
}

/// Open tile next to `node` nearest to `anchor` by path, for nodes without a container site.
pub fn nearest_container_tile(map: &dyn MapView, anchor: Position, node: Position, movement: &MovementConfig) -> Option<Coord> {
    if anchor.room != node.room {
        return None;
    }

    let room = node.room;
    let costs = default_room_matrix(map, room, None);

    let step_cost = |coord: Coord| {
        if coord == node.coord {
            BLOCKED_COST
        } else {
            costs.tile_cost(coord, map.terrain_at(room, coord), movement.plain_cost, movement.swamp_cost)
        }
    };

    let open: Vec<Coord> = node.coord.ring(1).into_iter().filter(|coord| step_cost(*coord) != BLOCKED_COST).collect();

    sort_by_path(&[anchor.coord], &open, step_cost).first().map(|(coord, _)| *coord)
}

/// Record of a node inside an owned room, routed from the territory anchor to its container.
/// Without a container site the container goes on the open tile nearest the anchor.
pub fn plan_local_node(map: &dyn MapView, view: &TerritoryView, node: &LocalNode, movement: &MovementConfig) -> EngineResult<ResourceNodeInfo> {
    let anchor = view
        .anchor
        .ok_or_else(|| EngineError::StaleReference(format!("territory {} has no anchor", view.name)))?;

    let container_coord = match node.container_coord {
        Some(coord) => coord,
        None => nearest_container_tile(map, anchor, node.pos, movement)
            .ok_or_else(|| EngineError::StaleReference(format!("node {} has no open tile for a container", node.id)))?,
    };

    let container = Position::new(node.pos.room, container_coord);

    let options = PathOptions {
        max_rooms: 1,
        find_route: false,
        ..PathOptions::from_config(movement)
    };

    let path = find_path(map, anchor, &[SearchGoal::new(container, 1)], &options, |room| {
        Some(default_room_matrix(map, room, None))
    })?;

    let mut info = ResourceNodeInfo {
        id: node.id.clone(),
        pos: node.pos,
        home_room: view.name,
        room_type: view.name.room_type(),
        owned: true,
        distance: path.len() as u32,
        energy_per_tick: SOURCE_ENERGY_CAPACITY as f32 / ENERGY_REGEN_TIME as f32,
        num_open: node.num_open,
        container_coord: Some(container_coord),
        constructed: node.constructed,
        constructing: node.constructing,
        linked: node.linked,
        road_coords: Vec::new(),
        intermediates: Vec::new(),
        max_income: 0.0,
        runtime: NodeRuntime::default(),
    };

    info.set_road_positions(&path);

    Ok(info)
}

/// Road tiles already claimed by the territory's remote routes, so new routes share them.
pub fn remote_road_tiles(store: &MemoryStore, territory: RoomName) -> HashMap<RoomName, Vec<Coord>> {
    let mut roads: HashMap<RoomName, Vec<Coord>> = HashMap::new();

    let Some(remotes) = store.remotes_of(territory) else {
        return roads;
    };

    for node_id in remotes.values().flat_map(|remote| remote.node_ids.iter()) {
        if let Some(info) = store.node(node_id) {
            for pos in info.road_positions() {
                roads.entry(pos.room).or_default().push(pos.coord);
            }
        }
    }

    roads
}

/// Rooms close enough on the room graph to be mined from `home` that have no remote record yet,
/// or whose record is waiting to retry nodes that failed to route.
pub fn unplanned_remote_rooms(map: &dyn MapView, home: RoomName, territories: &HashSet<RoomName>, store: &MemoryStore, config: &RemoteConfig, time: u32) -> Vec<RoomName> {
    let tree = map_shortest_path_tree(map, home, config.max_remote_room_distance);
    let planned = store.remotes_of(home);

    tree.sorted
        .iter()
        .copied()
        .filter(|room| *room != home && !territories.contains(room))
        .filter(|room| match planned.and_then(|p| p.get(room)) {
            Some(remote) => remote.retry_at.map(|at| at <= time).unwrap_or(false),
            None => true,
        })
        .collect()
}

/// Nodes of one room planned by `plan_remote`.
#[derive(Clone, Debug)]
pub struct RemotePlan {
    pub remote: RemoteInfo,
    pub nodes: Vec<ResourceNodeInfo>,
    /// Nodes whose route search failed. They may route once the map changes.
    pub unrouted: usize,
}

/// Plans the nodes of a scouted room that are not in `skip`. Nodes further than the configured
/// distance are left out for good. A claimed room, or one without nodes, yields `None`.
pub fn plan_remote(
    map: &dyn MapView,
    start: Position,
    target: RoomName,
    intel: &RoomIntel,
    skip: &[NodeId],
    roads: &mut HashMap<RoomName, Vec<Coord>>,
    config: &RemoteConfig,
) -> Option<RemotePlan> {
    if intel.claimed_by_other || intel.nodes.is_empty() {
        return None;
    }

    let room_type = target.room_type();

    let mut remote = RemoteInfo::new(target);

    if room_type == RoomType::Normal {
        remote.controller_num_open = intel.controller.map(|pos| count_open(map, pos)).unwrap_or(0);
    }

    let mut nodes = Vec::new();
    let mut unrouted = 0;

    for (node_id, pos) in intel.nodes.iter().filter(|(id, _)| !skip.contains(id)) {
        let route = match plan_node_route(map, start, *pos, roads, config) {
            Ok(route) => route,
            Err(err) => {
                debug!("Remote node has no route - Node: {} - Room: {} - Error: {}", node_id, target, err);
                unrouted += 1;
                continue;
            }
        };

        if route.distance > config.max_remote_distance {
            continue;
        }

        for tile in route.path.iter() {
            roads.entry(tile.room).or_default().push(tile.coord);
        }

        let energy_per_tick = if room_type.requires_escort() {
            (SOURCE_ENERGY_KEEPER_CAPACITY + KEEPER_DROP_ENERGY) as f32 / ENERGY_REGEN_TIME as f32
        } else {
            SOURCE_ENERGY_CAPACITY as f32 / ENERGY_REGEN_TIME as f32
        };

        let mut info = ResourceNodeInfo {
            id: node_id.clone(),
            pos: *pos,
            home_room: start.room,
            room_type,
            owned: false,
            distance: route.distance,
            energy_per_tick,
            num_open: count_open(map, *pos),
            container_coord: Some(route.container.coord),
            constructed: false,
            constructing: false,
            linked: false,
            road_coords: Vec::new(),
            intermediates: route.intermediates.clone(),
            max_income: 0.0,
            runtime: NodeRuntime::default(),
        };

        info.set_road_positions(&route.path);

        for room in route.intermediates.iter() {
            if !remote.intermediates.contains(room) {
                remote.intermediates.push(*room);
            }
        }

        remote.node_ids.push(node_id.clone());
        nodes.push(info);
    }

    Some(RemotePlan { remote, nodes, unrouted })
}

/// Plans at most one remote room per call, keeping the cost of discovery bounded per tick. A room
/// whose nodes failed to route keeps a `retry_at` tick and only its missing nodes are planned then.
pub fn discover_next_remote(
    map: &dyn MapView,
    view: &TerritoryView,
    territories: &HashSet<RoomName>,
    store: &mut MemoryStore,
    config: &RemoteConfig,
    time: u32,
) -> Option<RoomName> {
    let start = view.storage.or(view.anchor)?;

    let candidates = unplanned_remote_rooms(map, view.name, territories, store, config, time);

    for room in candidates {
        let Some(intel) = map.room_intel(room) else {
            continue;
        };

        let mut roads = remote_road_tiles(store, view.name);

        let existing = store.remotes.get_mut(&view.name).and_then(|remotes| remotes.remove(&room));
        let replanning = existing.is_some();
        let mut remote = existing.unwrap_or_else(|| RemoteInfo::new(room));

        match plan_remote(map, start, room, &intel, &remote.node_ids, &mut roads, config) {
            Some(plan) => {
                info!(
                    "Planned remote - Territory: {} - Room: {} - Nodes: {} - Unrouted: {}",
                    view.name,
                    room,
                    plan.nodes.len(),
                    plan.unrouted
                );

                remote.controller_num_open = plan.remote.controller_num_open;
                remote.node_ids.extend(plan.remote.node_ids);

                for intermediate in plan.remote.intermediates {
                    if !remote.intermediates.contains(&intermediate) {
                        remote.intermediates.push(intermediate);
                    }
                }

                remote.retry_at = (plan.unrouted > 0).then(|| time.saturating_add(config.route_retry_ticks));

                if replanning && !plan.nodes.is_empty() {
                    store.active_sources.remove(&view.name);
                }

                for node in plan.nodes {
                    store.insert_node(node);
                }
            }
            None => {
                remote.retry_at = None;
            }
        }

        store.remotes.entry(view.name).or_default().insert(room, remote);

        return Some(room);
    }

    None
}
