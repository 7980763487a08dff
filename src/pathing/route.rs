use super::costmatrix::*;
use super::search::*;
use crate::algorithms::minheap::*;
use crate::config::*;
use crate::constants::*;
use crate::error::*;
use crate::host::*;
use crate::room::coord::*;
use crate::room::name::*;
use crate::room::terrain::*;
use log::*;
use std::collections::{HashMap, HashSet};

/// Cost of entering a room during room level routing. `None` makes the room impassable.
pub fn default_route_cost(map: &dyn MapView, room: RoomName) -> Option<f32> {
    if !map.is_room_accessible(room) {
        return None;
    }

    Some(room.room_type().route_cost())
}

fn reconstruct_route(came_from: &HashMap<RoomName, RoomName>, mut current: RoomName) -> Vec<RoomName> {
    let mut route = vec![current];

    while let Some(previous) = came_from.get(&current) {
        current = *previous;
        route.push(current);
    }

    route.reverse();

    route
}

/// A* over the room graph. The returned route starts with `from` and ends with one of `to`.
/// Gives up with `NoPathFound` once more than `max_rooms` rooms have been expanded.
pub fn find_route<F>(map: &dyn MapView, from: RoomName, to: &[RoomName], max_rooms: u32, route_cost: F) -> EngineResult<Vec<RoomName>>
where
    F: Fn(RoomName) -> Option<f32>,
{
    if to.is_empty() {
        return Err(EngineError::InvalidInput("route has no destination".to_owned()));
    }

    let heuristic = |room: RoomName| to.iter().map(|target| room.manhattan_distance(*target)).min().unwrap_or(0) as f32;
    let key = |entry: &(f32, RoomName)| entry.0;

    let mut g_score: HashMap<RoomName, f32> = HashMap::new();
    let mut came_from: HashMap<RoomName, RoomName> = HashMap::new();
    let mut closed: HashSet<RoomName> = HashSet::new();
    let mut open = MinHeap::new();

    g_score.insert(from, 0.0);
    open.insert_by((heuristic(from), from), key);

    while let Some((_, current)) = open.remove_min_by(key) {
        if to.contains(&current) {
            return Ok(reconstruct_route(&came_from, current));
        }

        if !closed.insert(current) {
            continue;
        }

        if closed.len() as u32 > max_rooms {
            debug!("Room route over limit - From: {} - Rooms: {}", from, max_rooms);

            return Err(EngineError::NoPathFound);
        }

        let current_g = g_score.get(&current).copied().unwrap_or(f32::INFINITY);

        for adjacent in map.adjacent_rooms(current) {
            if closed.contains(&adjacent) {
                continue;
            }

            let Some(cost) = route_cost(adjacent) else {
                continue;
            };

            let tentative = current_g + cost;

            if tentative < g_score.get(&adjacent).copied().unwrap_or(f32::INFINITY) {
                came_from.insert(adjacent, current);
                g_score.insert(adjacent, tentative);
                open.insert_by((tentative + heuristic(adjacent), adjacent), key);
            }
        }
    }

    Err(EngineError::NoPathFound)
}

#[derive(Clone, Debug, Default)]
pub struct ShortestPathTree {
    pub distances: HashMap<RoomName, u32>,
    pub parents: HashMap<RoomName, RoomName>,
    /// Rooms in the order they were settled.
    pub sorted: Vec<RoomName>,
}

impl ShortestPathTree {
    pub fn distance(&self, room: RoomName) -> Option<u32> {
        self.distances.get(&room).copied()
    }
}

/// Unit cost Dijkstra over the room graph out to `max_rooms` hops. Inaccessible rooms are skipped.
pub fn map_shortest_path_tree(map: &dyn MapView, from: RoomName, max_rooms: u32) -> ShortestPathTree {
    let mut tree = ShortestPathTree::default();
    let key = |entry: &(u32, RoomName)| entry.0;
    let mut queue = MinHeap::new();

    tree.distances.insert(from, 0);
    queue.insert_by((0, from), key);

    while let Some((distance, current)) = queue.remove_min_by(key) {
        if tree.distance(current).map(|d| distance > d).unwrap_or(true) {
            continue;
        }

        tree.sorted.push(current);

        for adjacent in map.adjacent_rooms(current) {
            if !map.is_room_accessible(adjacent) {
                continue;
            }

            let next = distance + 1;

            if tree.distance(adjacent).map(|d| next < d).unwrap_or(true) {
                tree.distances.insert(adjacent, next);
                tree.parents.insert(adjacent, current);

                if next < max_rooms {
                    queue.insert_by((next, adjacent), key);
                }
            }
        }
    }

    tree
}

/// Options for a tile level path between positions.
#[derive(Clone, Debug)]
pub struct PathOptions {
    pub plain_cost: u8,
    pub swamp_cost: u8,
    pub max_rooms: u32,
    pub max_ops_per_room: u32,
    pub heuristic_weight: f32,
    pub flee: bool,
    /// Restrict the tile search to the rooms of a room level route.
    pub find_route: bool,
    pub avoid_obstacles: bool,
}

impl PathOptions {
    pub fn from_config(config: &MovementConfig) -> PathOptions {
        PathOptions {
            plain_cost: config.plain_cost,
            swamp_cost: config.swamp_cost,
            max_rooms: config.max_rooms,
            max_ops_per_room: config.max_ops_per_room,
            heuristic_weight: config.heuristic_weight,
            flee: false,
            find_route: true,
            avoid_obstacles: true,
        }
    }
}

/// Tile path from `start` into range of any goal. Fails with `NoPathFound` when the search is
/// incomplete within its operation budget.
pub fn find_path<F>(map: &dyn MapView, start: Position, goals: &[SearchGoal], options: &PathOptions, mut room_costs: F) -> EngineResult<Vec<Position>>
where
    F: FnMut(RoomName) -> Option<LocalCostMatrix>,
{
    let mut allowed_rooms: HashSet<RoomName> = HashSet::new();
    allowed_rooms.insert(start.room);

    let route_rooms = options.find_route && !options.flee;

    if route_rooms {
        let targets: Vec<RoomName> = goals.iter().map(|g| g.pos.room).collect();
        let route = find_route(map, start.room, &targets, options.max_rooms, |room| default_route_cost(map, room))?;

        allowed_rooms.extend(route);
    }

    let max_ops = if route_rooms {
        allowed_rooms.len() as u32 * options.max_ops_per_room
    } else {
        options.max_ops_per_room * options.max_rooms
    };

    let search_options = SearchOptions {
        plain_cost: options.plain_cost,
        swamp_cost: options.swamp_cost,
        max_ops,
        max_rooms: options.max_rooms,
        heuristic_weight: options.heuristic_weight,
        flee: options.flee,
    };

    let result = search(map, start, goals, &search_options, |room| {
        if route_rooms && !allowed_rooms.contains(&room) {
            return None;
        }

        if options.avoid_obstacles {
            room_costs(room)
        } else {
            Some(LocalCostMatrix::new())
        }
    });

    if result.incomplete {
        debug!("Incomplete path - From: {} - Ops: {}", start, result.ops);

        return Err(EngineError::NoPathFound);
    }

    Ok(result.path)
}

/// Route from a territory anchor to a remote node, with the container tile split off.
#[derive(Clone, Debug)]
pub struct NodeRoute {
    /// Road tiles in travel order, excluding the container tile.
    pub path: Vec<Position>,
    pub container: Position,
    /// Path length including the container tile.
    pub distance: u32,
    /// Rooms crossed that are neither home nor target.
    pub intermediates: Vec<RoomName>,
}

/// Plans the road from `start` to a node. Existing roads are preferred and the tiles around
/// controllers and other nodes are avoided so roads never block harvesting.
pub fn plan_node_route(map: &dyn MapView, start: Position, node: Position, existing_roads: &HashMap<RoomName, Vec<Coord>>, config: &RemoteConfig) -> EngineResult<NodeRoute> {
    let home = start.room;
    let target = node.room;

    let room_costs = |room: RoomName| {
        let mut costs = LocalCostMatrix::new();

        if let Some(roads) = existing_roads.get(&room) {
            for coord in roads.iter() {
                costs.set(*coord, config.route_road_cost);
            }
        }

        if let Some(structures) = map.room_structures(room) {
            for structure in structures.iter().filter(|s| !s.construction_site) {
                if structure.kind == StructureKind::Controller {
                    for coord in structure.pos.coord.disc(1) {
                        if map.terrain_at(room, coord) != Terrain::Wall {
                            costs.raise(coord, config.route_avoid_cost);
                        }
                    }
                }

                if structure.kind.is_obstacle() {
                    costs.set(structure.pos.coord, BLOCKED_COST);
                } else if structure.kind == StructureKind::Road {
                    costs.raise(structure.pos.coord, config.route_road_cost);
                }
            }
        }

        if let Some(intel) = map.room_intel(room) {
            for (_, other) in intel.nodes.iter().filter(|(_, p)| *p != node) {
                for coord in other.coord.ring(1) {
                    if map.terrain_at(room, coord) != Terrain::Wall {
                        costs.raise(coord, config.route_avoid_cost);
                    }
                }
            }
        }

        Some(costs)
    };

    let options = SearchOptions {
        plain_cost: config.route_plain_cost,
        swamp_cost: config.route_swamp_cost,
        max_ops: config.route_max_ops,
        max_rooms: 16,
        heuristic_weight: 1.0,
        flee: false,
    };

    let result = search(map, start, &[SearchGoal::new(node, 1)], &options, room_costs);

    if result.incomplete {
        return Err(EngineError::NoPathFound);
    }

    let mut path = result.path;
    let distance = path.len() as u32;
    let container = path.pop().ok_or(EngineError::NoPathFound)?;

    let mut intermediates: Vec<RoomName> = Vec::new();

    for pos in path.iter() {
        if pos.room != home && pos.room != target && !intermediates.contains(&pos.room) {
            intermediates.push(pos.room);
        }
    }

    Ok(NodeRoute {
        path,
        container,
        distance,
        intermediates,
    })
}
