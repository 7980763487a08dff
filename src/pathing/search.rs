//! Weighted A* over world tile coordinates, spanning rooms.

use super::costmatrix::*;
use crate::algorithms::minheap::*;
use crate::constants::*;
use crate::host::*;
use crate::room::name::*;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SearchGoal {
    pub pos: Position,
    pub range: u32,
}

impl SearchGoal {
    pub fn new(pos: Position, range: u32) -> SearchGoal {
        SearchGoal { pos, range }
    }
}

#[derive(Clone, Debug)]
pub struct SearchOptions {
    pub plain_cost: u8,
    pub swamp_cost: u8,
    pub max_ops: u32,
    pub max_rooms: u32,
    /// Scales the tile distance estimate, which is priced at the cheaper terrain cost.
    pub heuristic_weight: f32,
    /// Move out of range of every goal instead of into range of one.
    pub flee: bool,
}

impl Default for SearchOptions {
    fn default() -> SearchOptions {
        SearchOptions {
            plain_cost: 1,
            swamp_cost: 5,
            max_ops: 2000,
            max_rooms: 16,
            heuristic_weight: 1.2,
            flee: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SearchResult {
    /// Steps after the start position, ending at the goal (or the closest reached tile).
    pub path: Vec<Position>,
    pub cost: u32,
    pub ops: u32,
    pub incomplete: bool,
}

struct NodeState {
    g: u32,
    parent: Option<(i32, i32)>,
    closed: bool,
}

type WorldXY = (i32, i32);

fn world_range(a: WorldXY, b: WorldXY) -> u32 {
    (a.0 - b.0).unsigned_abs().max((a.1 - b.1).unsigned_abs())
}

/// Remaining distance estimate, zero once the goal condition holds.
fn heuristic(pos: WorldXY, goals: &[(WorldXY, u32)], flee: bool) -> u32 {
    if flee {
        goals
            .iter()
            .map(|(goal, range)| range.saturating_sub(world_range(pos, *goal)))
            .max()
            .unwrap_or(0)
    } else {
        goals
            .iter()
            .map(|(goal, range)| world_range(pos, *goal).saturating_sub(*range))
            .min()
            .unwrap_or(0)
    }
}

/// Runs the search. `room_costs` supplies the matrix for a room or `None` to forbid entering it.
pub fn search<F>(map: &dyn MapView, start: Position, goals: &[SearchGoal], options: &SearchOptions, mut room_costs: F) -> SearchResult
where
    F: FnMut(RoomName) -> Option<LocalCostMatrix>,
{
    let world_goals: Vec<(WorldXY, u32)> = goals.iter().map(|g| (g.pos.world_xy(), g.range)).collect();
    let start_xy = start.world_xy();

    let mut matrices: HashMap<RoomName, Option<LocalCostMatrix>> = HashMap::new();
    let mut visited_rooms: HashSet<RoomName> = HashSet::new();

    let mut nodes: HashMap<WorldXY, NodeState> = HashMap::new();
    let mut open = MinHeap::new();
    let weight = options.heuristic_weight.max(0.0) * options.plain_cost.min(options.swamp_cost).max(1) as f32;

    let f_score = |g: u32, h: u32| g as f32 + h as f32 * weight;
    let key = |entry: &(f32, u32, WorldXY)| (entry.0, entry.1);

    nodes.insert(
        start_xy,
        NodeState {
            g: 0,
            parent: None,
            closed: false,
        },
    );

    visited_rooms.insert(start.room);
    matrices.insert(start.room, room_costs(start.room));

    let start_h = heuristic(start_xy, &world_goals, options.flee);
    open.insert_by((f_score(0, start_h), start_h, start_xy), key);

    let mut ops = 0;
    let mut best = (start_h, start_xy);
    let mut found = None;

    while let Some((_, h, current)) = open.remove_min_by(key) {
        let Some(state) = nodes.get_mut(&current) else {
            continue;
        };

        if state.closed {
            continue;
        }

        state.closed = true;
        let current_g = state.g;

        if h == 0 {
            found = Some(current);
            break;
        }

        if h < best.0 {
            best = (h, current);
        }

        ops += 1;

        if ops > options.max_ops {
            break;
        }

        for (dx, dy) in crate::room::coord::NEIGHBORS_8.iter() {
            let next = (current.0 + dx, current.1 + dy);

            let Some(next_pos) = Position::from_world_xy(next.0, next.1) else {
                continue;
            };

            if !visited_rooms.contains(&next_pos.room) {
                if visited_rooms.len() as u32 >= options.max_rooms {
                    continue;
                }

                if !matrices.contains_key(&next_pos.room) {
                    let costs = if map.terrain(next_pos.room).is_some() {
                        room_costs(next_pos.room)
                    } else {
                        None
                    };

                    matrices.insert(next_pos.room, costs);
                }

                if matches!(matrices.get(&next_pos.room), Some(None)) {
                    continue;
                }

                visited_rooms.insert(next_pos.room);
            }

            let Some(Some(matrix)) = matrices.get(&next_pos.room) else {
                continue;
            };

            let terrain = map.terrain_at(next_pos.room, next_pos.coord);
            let step = matrix.tile_cost(next_pos.coord, terrain, options.plain_cost, options.swamp_cost);

            if step == BLOCKED_COST {
                continue;
            }

            let g = current_g + step.max(1) as u32;

            let improved = match nodes.entry(next) {
                Entry::Occupied(mut occupied) => {
                    let state = occupied.get_mut();

                    if g < state.g {
                        state.g = g;
                        state.parent = Some(current);
                        state.closed = false;
                        true
                    } else {
                        false
                    }
                }
                Entry::Vacant(vacant) => {
                    vacant.insert(NodeState {
                        g,
                        parent: Some(current),
                        closed: false,
                    });
                    true
                }
            };

            if improved {
                let h = heuristic(next, &world_goals, options.flee);

                open.insert_by((f_score(g, h), h, next), key);
            }
        }
    }

    let (end, incomplete) = match found {
        Some(end) => (end, false),
        None => (best.1, true),
    };

    let mut path = Vec::new();
    let mut cursor = Some(end);

    while let Some(xy) = cursor {
        if xy == start_xy {
            break;
        }

        if let Some(pos) = Position::from_world_xy(xy.0, xy.1) {
            path.push(pos);
        }

        cursor = nodes.get(&xy).and_then(|s| s.parent);
    }

    path.reverse();

    SearchResult {
        path,
        cost: nodes.get(&end).map(|s| s.g).unwrap_or(0),
        ops,
        incomplete,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::coord::*;
    use crate::room::terrain::*;
    use pathfinding::prelude::dijkstra;

    struct TestMap {
        terrains: HashMap<RoomName, RoomTerrain>,
    }

    impl MapView for TestMap {
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

    fn pos(name: &str, x: u8, y: u8) -> Position {
        Position::new(room(name), Coord::new(x, y).unwrap())
    }

    fn walled_map() -> TestMap {
        // Vertical wall with a single gap at the bottom.
        let terrain = RoomTerrain::from_fn(|c| {
            if c.x() == 25 && c.y() < 45 {
                Terrain::Wall
            } else if c.x() > 30 && c.y() > 40 {
                Terrain::Swamp
            } else {
                Terrain::Plain
            }
        });

        TestMap {
            terrains: [(room("W1N1"), terrain)].into_iter().collect(),
        }
    }

    fn options() -> SearchOptions {
        SearchOptions {
            plain_cost: 2,
            swamp_cost: 10,
            max_ops: 5000,
            max_rooms: 1,
            heuristic_weight: 1.0,
            flee: false,
        }
    }

    #[test]
    fn matches_dijkstra_in_single_room() {
        let map = walled_map();
        let terrain = map.terrain(room("W1N1")).unwrap().clone();
        let start = pos("W1N1", 10, 10);
        let goal = pos("W1N1", 40, 10);

        let result = search(&map, start, &[SearchGoal::new(goal, 0)], &options(), |_| Some(LocalCostMatrix::new()));

        assert!(!result.incomplete);
        assert_eq!(result.path.last(), Some(&goal));

        let expected = dijkstra(
            &start.coord,
            |c: &Coord| {
                c.neighbors()
                    .filter(|n| terrain.get(*n) != Terrain::Wall)
                    .map(|n| (n, if terrain.get(n) == Terrain::Swamp { 10u32 } else { 2u32 }))
                    .collect::<Vec<_>>()
            },
            |c| *c == goal.coord,
        )
        .unwrap();

        assert_eq!(result.cost, expected.1);
    }

    #[test]
    fn range_goal_stops_early() {
        let map = walled_map();
        let start = pos("W1N1", 10, 10);
        let goal = pos("W1N1", 10, 20);

        let result = search(&map, start, &[SearchGoal::new(goal, 3)], &options(), |_| Some(LocalCostMatrix::new()));

        assert!(!result.incomplete);
        assert_eq!(result.path.len(), 7);
        assert_eq!(result.path.last().unwrap().range_to(&goal), Some(3));
    }

    #[test]
    fn flee_leaves_range() {
        let map = walled_map();
        let start = pos("W1N1", 10, 10);

        let flee = SearchOptions { flee: true, ..options() };
        let result = search(&map, start, &[SearchGoal::new(start, 5)], &flee, |_| Some(LocalCostMatrix::new()));

        assert!(!result.incomplete);
        assert_eq!(result.path.len(), 5);
        assert!(result.path.last().unwrap().range_to(&start).unwrap() >= 5);
    }

    #[test]
    fn op_budget_marks_incomplete() {
        let map = walled_map();
        let tight = SearchOptions { max_ops: 20, ..options() };

        let result = search(
            &map,
            pos("W1N1", 10, 10),
            &[SearchGoal::new(pos("W1N1", 40, 10), 0)],
            &tight,
            |_| Some(LocalCostMatrix::new()),
        );

        assert!(result.incomplete);
        assert!(result.ops <= 21);
    }

    #[test]
    fn crosses_into_allowed_room() {
        let mut map = walled_map();
        map.terrains.insert(room("W0N1"), RoomTerrain::plain());

        let multi = SearchOptions { max_rooms: 2, ..options() };
        let start = pos("W1N1", 45, 10);
        let goal = pos("W0N1", 5, 10);

        let result = search(&map, start, &[SearchGoal::new(goal, 1)], &multi, |_| Some(LocalCostMatrix::new()));

        assert!(!result.incomplete);
        assert!(result.path.iter().any(|p| p.room == room("W0N1")));

        let blocked = search(&map, start, &[SearchGoal::new(goal, 1)], &multi, |r| {
            if r == room("W0N1") {
                None
            } else {
                Some(LocalCostMatrix::new())
            }
        });

        assert!(blocked.incomplete);
    }
}
