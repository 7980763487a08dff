use crate::constants::*;
use crate::host::*;
use crate::room::coord::*;
use crate::room::name::*;
use crate::room::terrain::*;
use log::*;
use rand::{Rng, RngCore};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Per tile movement costs for one room. Zero means "use the terrain cost".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalCostMatrix {
    costs: Vec<u8>,
}

impl Default for LocalCostMatrix {
    fn default() -> LocalCostMatrix {
        LocalCostMatrix { costs: vec![0; ROOM_AREA] }
    }
}

impl LocalCostMatrix {
    pub fn new() -> LocalCostMatrix {
        LocalCostMatrix::default()
    }

    pub fn get(&self, coord: Coord) -> u8 {
        self.costs[coord.index()]
    }

    pub fn set(&mut self, coord: Coord, cost: u8) {
        self.costs[coord.index()] = cost;
    }

    /// Only ever raises the cost of a tile.
    pub fn raise(&mut self, coord: Coord, cost: u8) {
        let current = &mut self.costs[coord.index()];

        if *current < cost {
            *current = cost;
        }
    }

    pub fn is_blocked(&self, coord: Coord) -> bool {
        self.get(coord) == BLOCKED_COST
    }

    /// Effective step cost using terrain defaults for unset tiles.
    pub fn tile_cost(&self, coord: Coord, terrain: Terrain, plain_cost: u8, swamp_cost: u8) -> u8 {
        match self.get(coord) {
            0 => match terrain {
                Terrain::Plain => plain_cost,
                Terrain::Swamp => swamp_cost,
                Terrain::Wall => BLOCKED_COST,
            },
            cost => cost,
        }
    }
}

/// Territory specific inputs to the default matrix of an owned room.
#[derive(Clone, Debug, Default)]
pub struct OwnedRoomContext {
    pub anchor: Option<Coord>,
    /// Tiles next to nodes currently occupied by our miners.
    pub miner_tiles: Vec<Coord>,
}

pub const ANCHOR_COST: u8 = 20;
pub const OCCUPIED_MINER_COST: u8 = 5;
pub const UNSEEN_HAZARD_COST: u8 = 5;
pub const UNSEEN_HAZARD_RANGE: u8 = 4;

/// Matrix for a room without visibility: tiles around keeper lairs and nodes are discouraged.
pub fn unseen_room_matrix(map: &dyn MapView, room: RoomName) -> LocalCostMatrix {
    let mut costs = LocalCostMatrix::new();

    let Some(intel) = map.room_intel(room) else {
        return costs;
    };

    if intel.keeper_lairs.is_empty() {
        return costs;
    }

    let hazards = intel
        .keeper_lairs
        .iter()
        .map(|p| p.coord)
        .chain(intel.nodes.iter().map(|(_, p)| p.coord));

    for hazard in hazards {
        for coord in hazard.disc(UNSEEN_HAZARD_RANGE) {
            if map.terrain_at(room, coord) != Terrain::Wall {
                costs.set(coord, UNSEEN_HAZARD_COST);
            }
        }
    }

    costs
}

/// Roads, obstacles and hostile ramparts of a visible room, plus the owned room adjustments.
pub fn default_room_matrix(map: &dyn MapView, room: RoomName, owned: Option<&OwnedRoomContext>) -> LocalCostMatrix {
    let Some(structures) = map.room_structures(room) else {
        return unseen_room_matrix(map, room);
    };

    let mut costs = unseen_room_matrix(map, room);

    for structure in structures.iter().filter(|s| s.kind == StructureKind::Road && !s.construction_site) {
        costs.set(structure.pos.coord, 1);
    }

    for structure in structures.iter() {
        let blocks = if structure.construction_site {
            structure.my && structure.kind.is_obstacle()
        } else {
            structure.kind.is_obstacle() || (structure.kind == StructureKind::Rampart && !structure.my)
        };

        if blocks {
            costs.set(structure.pos.coord, BLOCKED_COST);
        }
    }

    if let Some(context) = owned {
        if let Some(anchor) = context.anchor {
            costs.set(anchor, ANCHOR_COST);
        }

        for coord in context.miner_tiles.iter() {
            if map.terrain_at(room, *coord) != Terrain::Wall && !costs.is_blocked(*coord) {
                costs.raise(*coord, OCCUPIED_MINER_COST);
            }
        }
    }

    costs
}

struct CachedMatrix {
    matrix: LocalCostMatrix,
    built_at: u32,
}

/// Memoized default matrices for the rooms a territory paths through. Entries are rebuilt with a
/// small probability on each access so structure changes are eventually picked up.
pub struct CostMatrixCache {
    entries: HashMap<RoomName, CachedMatrix>,
    refresh_chance: f64,
    rebuilds: u32,
}

impl CostMatrixCache {
    pub fn new(refresh_chance: f64) -> CostMatrixCache {
        CostMatrixCache {
            entries: HashMap::new(),
            refresh_chance: refresh_chance.clamp(0.0, 1.0),
            rebuilds: 0,
        }
    }

    pub fn rebuilds(&self) -> u32 {
        self.rebuilds
    }

    pub fn invalidate(&mut self, room: RoomName) {
        self.entries.remove(&room);
    }

    pub fn get_or_build<F>(&mut self, room: RoomName, time: u32, rng: &mut dyn RngCore, build: F) -> &LocalCostMatrix
    where
        F: FnOnce() -> LocalCostMatrix,
    {
        let refresh = rng.gen_bool(self.refresh_chance);

        let entry = match self.entries.entry(room) {
            Entry::Occupied(mut occupied) => {
                if refresh {
                    trace!("Refreshing cost matrix - Room: {} - Time: {}", room, time);

                    self.rebuilds += 1;
                    occupied.insert(CachedMatrix {
                        matrix: build(),
                        built_at: time,
                    });
                }

                occupied.into_mut()
            }
            Entry::Vacant(vacant) => {
                self.rebuilds += 1;
                vacant.insert(CachedMatrix {
                    matrix: build(),
                    built_at: time,
                })
            }
        };

        &entry.matrix
    }

    pub fn built_at(&self, room: RoomName) -> Option<u32> {
        self.entries.get(&room).map(|e| e.built_at)
    }
}
