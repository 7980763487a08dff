//! Minimum vertex cut between a protected region and the room exits.
//!
//! Every tile is split into an inner and an outer node. The inner node feeds the outer node with
//! the tile's cost as capacity, and every outer node feeds the inner node of each walkable
//! neighbour with effectively infinite capacity. Max flow is found with Dinic's algorithm; the
//! saturated inner to outer edges on the source side of the final level graph are the cut.

use crate::constants::*;
use crate::error::*;
use crate::room::coord::*;
use crate::room::terrain::*;
use log::*;

/// Capacity of edges that must never be cut.
pub const INF_CAP: i32 = 10000;

/// Upper bound on level graph rebuilds before the network is declared degenerate.
pub const MAX_PHASES: u32 = 50;

/// Exit tiles protect their surroundings up to this range.
pub const EXIT_RANGE: u8 = 2;

const SLOTS: usize = 9;
const INSIDE_SLOT: usize = 8;

/// Tile costs for the flow network. `0` and `255` mark excluded tiles.
#[derive(Clone, Debug)]
pub struct FlowGrid {
    width: u8,
    height: u8,
    costs: Vec<u8>,
}

impl FlowGrid {
    pub fn open(width: u8, height: u8) -> FlowGrid {
        let width = width.min(ROOM_SIZE);
        let height = height.min(ROOM_SIZE);

        FlowGrid {
            width,
            height,
            costs: vec![1; width as usize * height as usize],
        }
    }

    pub fn from_terrain(terrain: &RoomTerrain) -> FlowGrid {
        let mut grid = FlowGrid::open(ROOM_SIZE, ROOM_SIZE);

        for index in 0..ROOM_AREA as u16 {
            if let Some(coord) = Coord::unpack(index) {
                if terrain.is_wall(coord) {
                    grid.set(coord, BLOCKED_COST);
                }
            }
        }

        grid
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    pub fn contains(&self, coord: Coord) -> bool {
        coord.x() < self.width && coord.y() < self.height
    }

    fn index(&self, coord: Coord) -> usize {
        coord.y() as usize * self.width as usize + coord.x() as usize
    }

    fn coord(&self, index: usize) -> Option<Coord> {
        Coord::checked((index % self.width as usize) as i32, (index / self.width as usize) as i32)
    }

    pub fn get(&self, coord: Coord) -> u8 {
        if self.contains(coord) {
            self.costs[self.index(coord)]
        } else {
            BLOCKED_COST
        }
    }

    pub fn set(&mut self, coord: Coord, cost: u8) {
        if self.contains(coord) {
            let index = self.index(coord);

            self.costs[index] = cost;
        }
    }

    pub fn is_passable(&self, coord: Coord) -> bool {
        let cost = self.get(coord);

        cost != 0 && cost != BLOCKED_COST
    }

    fn tile_count(&self) -> usize {
        self.costs.len()
    }

    /// Walkable border tiles of the grid.
    pub fn border_exits(&self) -> Vec<Coord> {
        (0..self.tile_count())
            .filter_map(|i| self.coord(i))
            .filter(|c| c.x() == 0 || c.y() == 0 || c.x() == self.width - 1 || c.y() == self.height - 1)
            .filter(|c| self.is_passable(*c))
            .collect()
    }
}

#[derive(Clone, Debug)]
pub struct MincutResult {
    pub cuts: Vec<Coord>,
    pub insides: Vec<Coord>,
    pub outsides: Vec<Coord>,
    /// Level of each tile's inner node in the final level graph, `-1` when unreachable.
    pub levels: Vec<i32>,
}

struct FlowNetwork<'a> {
    grid: &'a FlowGrid,
    capacity: Vec<i32>,
    level: Vec<i32>,
    next_slot: Vec<usize>,
    is_sink: Vec<bool>,
    sources: Vec<usize>,
}

fn inner(tile: usize) -> usize {
    tile * 2
}

fn outer(tile: usize) -> usize {
    tile * 2 + 1
}

fn is_outer(node: usize) -> bool {
    node & 1 == 1
}

impl<'a> FlowNetwork<'a> {
    fn new(grid: &'a FlowGrid, sources: &[Coord], sinks: &[Coord]) -> FlowNetwork<'a> {
        let node_count = grid.tile_count() * 2;
        let mut capacity = vec![0; node_count * SLOTS];

        for tile in 0..grid.tile_count() {
            let Some(coord) = grid.coord(tile) else {
                continue;
            };

            if !grid.is_passable(coord) {
                continue;
            }

            capacity[inner(tile) * SLOTS + INSIDE_SLOT] = grid.get(coord) as i32;

            for direction in Direction::ALL {
                if coord.step(direction).map_or(false, |n| grid.is_passable(n)) {
                    capacity[outer(tile) * SLOTS + direction.index()] = INF_CAP;
                }
            }
        }

        let mut source_nodes = Vec::with_capacity(sources.len());

        for source in sources {
            let tile = grid.index(*source);

            capacity[inner(tile) * SLOTS + INSIDE_SLOT] = INF_CAP;
            source_nodes.push(inner(tile));
        }

        let mut is_sink = vec![false; node_count];

        for sink in sinks {
            is_sink[outer(grid.index(*sink))] = true;
        }

        FlowNetwork {
            grid,
            capacity,
            level: vec![-1; node_count],
            next_slot: vec![0; node_count],
            is_sink,
            sources: source_nodes,
        }
    }

    fn end_node(&self, node: usize, slot: usize) -> Option<usize> {
        if slot == INSIDE_SLOT {
            return Some(node ^ 1);
        }

        let coord = self.grid.coord(node / 2)?;
        let neighbor = coord.step(Direction::from_index(slot)).filter(|n| self.grid.contains(*n))?;
        let tile = self.grid.index(neighbor);

        if is_outer(node) {
            Some(inner(tile))
        } else {
            Some(outer(tile))
        }
    }

    fn reverse_edge(&self, node: usize, slot: usize) -> Option<usize> {
        if slot == INSIDE_SLOT {
            Some((node ^ 1) * SLOTS + INSIDE_SLOT)
        } else {
            let end = self.end_node(node, slot)?;

            Some(end * SLOTS + Direction::from_index(slot).reverse().index())
        }
    }

    /// Rebuilds the level graph. Returns true if any sink is reachable.
    fn build_levels(&mut self) -> bool {
        self.level.iter_mut().for_each(|l| *l = -1);

        let mut queue = std::collections::VecDeque::new();

        for source in self.sources.iter() {
            if self.level[*source] < 0 {
                self.level[*source] = 0;
                queue.push_back(*source);
            }
        }

        let mut connected = false;

        while let Some(node) = queue.pop_front() {
            for slot in 0..SLOTS {
                if self.capacity[node * SLOTS + slot] <= 0 {
                    continue;
                }

                if let Some(end) = self.end_node(node, slot) {
                    if self.level[end] < 0 {
                        self.level[end] = self.level[node] + 1;

                        if self.is_sink[end] {
                            connected = true;
                        }

                        queue.push_back(end);
                    }
                }
            }
        }

        connected
    }

    /// Pushes one augmenting path from `source` along the level graph, returning the flow sent.
    fn augment(&mut self, source: usize) -> i32 {
        let mut path: Vec<(usize, usize)> = Vec::new();
        let mut node = source;

        loop {
            if self.is_sink[node] {
                let flow = path
                    .iter()
                    .map(|(n, s)| self.capacity[n * SLOTS + s])
                    .min()
                    .unwrap_or(INF_CAP)
                    .min(INF_CAP);

                for (n, s) in path.iter() {
                    self.capacity[n * SLOTS + s] -= flow;

                    if let Some(reverse) = self.reverse_edge(*n, *s) {
                        self.capacity[reverse] += flow;
                    }
                }

                return flow;
            }

            let mut advanced = false;

            while self.next_slot[node] < SLOTS {
                let slot = self.next_slot[node];

                if self.capacity[node * SLOTS + slot] > 0 {
                    if let Some(end) = self.end_node(node, slot) {
                        if self.level[end] == self.level[node] + 1 {
                            path.push((node, slot));
                            node = end;
                            advanced = true;
                            break;
                        }
                    }
                }

                self.next_slot[node] += 1;
            }

            if !advanced {
                match path.pop() {
                    Some((parent, _)) => {
                        node = parent;
                        self.next_slot[node] += 1;
                    }
                    None => return 0,
                }
            }
        }
    }

    fn blocking_flow(&mut self) -> i32 {
        self.next_slot.iter_mut().for_each(|s| *s = 0);

        let sources = self.sources.clone();
        let mut total = 0;

        for source in sources {
            loop {
                let flow = self.augment(source);

                if flow <= 0 {
                    break;
                }

                total += flow;
            }
        }

        total
    }

    fn partition(&self) -> MincutResult {
        let mut result = MincutResult {
            cuts: Vec::new(),
            insides: Vec::new(),
            outsides: Vec::new(),
            levels: Vec::with_capacity(self.grid.tile_count()),
        };

        for tile in 0..self.grid.tile_count() {
            result.levels.push(self.level[inner(tile)]);

            let Some(coord) = self.grid.coord(tile) else {
                continue;
            };

            if !self.grid.is_passable(coord) {
                continue;
            }

            if self.level[inner(tile)] < 0 {
                result.outsides.push(coord);
            } else if self.level[outer(tile)] < 0 {
                result.cuts.push(coord);
            } else {
                result.insides.push(coord);
            }
        }

        result
    }
}

/// Tiles within `EXIT_RANGE` of any exit.
fn sink_tiles(grid: &FlowGrid, exits: &[Coord]) -> Vec<Coord> {
    let mut marked = vec![false; grid.tile_count()];
    let mut result = Vec::new();

    for exit in exits {
        for coord in exit.disc(EXIT_RANGE) {
            if grid.is_passable(coord) {
                let index = grid.index(coord);

                if !marked[index] {
                    marked[index] = true;
                    result.push(coord);
                }
            }
        }
    }

    result
}

/// Computes the cheapest set of tiles separating `sources` from `exits`.
pub fn compute_mincut(grid: &FlowGrid, sources: &[Coord], exits: &[Coord]) -> EngineResult<MincutResult> {
    for source in sources {
        if !grid.is_passable(*source) {
            return Err(EngineError::InvalidInput(format!("mincut source {} is not passable", source)));
        }
    }

    if let Some(exit) = exits.iter().find(|e| !grid.contains(**e)) {
        return Err(EngineError::InvalidInput(format!("mincut exit {} is outside the grid", exit)));
    }

    let sinks = sink_tiles(grid, exits);

    if let Some(source) = sources.iter().find(|s| sinks.contains(s)) {
        return Err(EngineError::InvalidInput(format!("mincut source {} lies within exit range", source)));
    }

    let mut network = FlowNetwork::new(grid, sources, &sinks);
    let mut total_flow = 0;

    for phase in 0..MAX_PHASES {
        if !network.build_levels() {
            let result = network.partition();

            debug!(
                "Mincut separated after {} phases - Flow: {} - Cut tiles: {}",
                phase,
                total_flow,
                result.cuts.len()
            );

            return Ok(result);
        }

        total_flow += network.blocking_flow();
    }

    warn!("Mincut exceeded {} phases without separating sources from exits", MAX_PHASES);

    Err(EngineError::InfeasibleNetwork)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(x: u8, y: u8) -> Coord {
        Coord::new(x, y).unwrap()
    }

    #[test]
    fn source_within_exit_range_is_rejected() {
        let grid = FlowGrid::open(10, 10);
        let exits = grid.border_exits();

        let result = compute_mincut(&grid, &[coord(2, 5)], &exits);

        assert!(matches!(result, Err(EngineError::InvalidInput(_))));
    }

    #[test]
    fn wall_source_is_rejected() {
        let mut grid = FlowGrid::open(10, 10);
        grid.set(coord(5, 5), BLOCKED_COST);

        let result = compute_mincut(&grid, &[coord(5, 5)], &grid.border_exits());

        assert!(matches!(result, Err(EngineError::InvalidInput(_))));
    }

    #[test]
    fn enclosed_source_needs_no_cut() {
        let mut grid = FlowGrid::open(10, 10);

        for c in coord(5, 5).ring(1) {
            grid.set(c, BLOCKED_COST);
        }

        let result = compute_mincut(&grid, &[coord(5, 5)], &grid.border_exits()).unwrap();

        assert!(result.cuts.is_empty());
        assert_eq!(result.insides, vec![coord(5, 5)]);
        assert_eq!(result.levels[5 * 10 + 5], 0);
    }

    #[test]
    fn corridor_is_cut_at_cheapest_tile() {
        // A single row corridor from the source to the exit.
        let mut grid = FlowGrid::open(10, 3);

        for x in 0..10 {
            grid.set(coord(x, 0), BLOCKED_COST);
            grid.set(coord(x, 2), BLOCKED_COST);
        }

        grid.set(coord(4, 1), 3);
        grid.set(coord(6, 1), 2);

        let result = compute_mincut(&grid, &[coord(0, 1)], &[coord(9, 1)]).unwrap();

        assert_eq!(result.cuts.len(), 1);
        assert!(result.cuts[0] == coord(1, 1) || result.cuts[0] == coord(2, 1) || result.cuts[0] == coord(3, 1));
        assert!(result.outsides.contains(&coord(7, 1)));
    }

    #[test]
    fn open_room_is_cut_around_the_source() {
        let grid = FlowGrid::open(10, 10);
        let source = coord(5, 5);

        let result = compute_mincut(&grid, &[source], &grid.border_exits()).unwrap();

        assert_eq!(result.cuts.len(), 8);
        assert!(result.cuts.iter().all(|c| c.range_to(source) == 1));
        assert_eq!(result.insides, vec![source]);
    }

    /// Independent max flow over the same split-node network.
    fn oracle_flow(grid: &FlowGrid, sources: &[Coord], exits: &[Coord]) -> i32 {
        use pathfinding::directed::edmonds_karp::edmonds_karp_sparse;

        let tiles = grid.tile_count();
        let super_source = tiles * 2;
        let super_sink = tiles * 2 + 1;

        let mut caps: Vec<((usize, usize), i32)> = Vec::new();

        for tile in 0..tiles {
            let coord = grid.coord(tile).unwrap();

            if !grid.is_passable(coord) {
                continue;
            }

            let cost = if sources.contains(&coord) { INF_CAP } else { grid.get(coord) as i32 };
            caps.push(((inner(tile), outer(tile)), cost));

            for direction in Direction::ALL {
                if let Some(neighbor) = coord.step(direction).filter(|n| grid.is_passable(*n)) {
                    caps.push(((outer(tile), inner(grid.index(neighbor))), INF_CAP));
                }
            }
        }

        for source in sources {
            caps.push(((super_source, inner(grid.index(*source))), INF_CAP));
        }

        for sink in sink_tiles(grid, exits) {
            caps.push(((outer(grid.index(sink)), super_sink), INF_CAP));
        }

        let vertices: Vec<usize> = (0..tiles * 2 + 2).collect();

        let (_, flow, _) = edmonds_karp_sparse(&vertices, &super_source, &super_sink, caps);

        flow
    }

    #[test]
    fn cut_weight_matches_max_flow() {
        for seed in 0..3u32 {
            let mut grid = FlowGrid::open(12, 12);

            for y in 0..12u8 {
                for x in 0..12u8 {
                    let mix = (x as u32 * 7 + y as u32 * 3 + seed * 5) % 11;

                    let cost = match mix {
                        0 => BLOCKED_COST,
                        n => (n % 4 + 1) as u8,
                    };

                    grid.set(coord(x, y), cost);
                }
            }

            let source = coord(6, 6);
            grid.set(source, 1);

            let exits = grid.border_exits();
            let result = compute_mincut(&grid, &[source], &exits).unwrap();

            let cut_weight: i32 = result.cuts.iter().map(|c| grid.get(*c) as i32).sum();

            assert_eq!(cut_weight, oracle_flow(&grid, &[source], &exits), "seed {}", seed);
            assert!(result.insides.contains(&source));
        }
    }
}
