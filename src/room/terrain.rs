use super::coord::*;
use crate::constants::*;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Terrain {
    #[default]
    Plain,
    Swamp,
    Wall,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomTerrain {
    tiles: Vec<Terrain>,
}

impl Default for RoomTerrain {
    fn default() -> RoomTerrain {
        RoomTerrain::plain()
    }
}

impl RoomTerrain {
    pub fn plain() -> RoomTerrain {
        RoomTerrain {
            tiles: vec![Terrain::Plain; ROOM_AREA],
        }
    }

    pub fn from_fn<F>(f: F) -> RoomTerrain
    where
        F: Fn(Coord) -> Terrain,
    {
        let tiles = (0..ROOM_AREA as u16)
            .filter_map(Coord::unpack)
            .map(f)
            .collect();

        RoomTerrain { tiles }
    }

    pub fn get(&self, coord: Coord) -> Terrain {
        self.tiles[coord.index()]
    }

    pub fn set(&mut self, coord: Coord, terrain: Terrain) {
        self.tiles[coord.index()] = terrain;
    }

    pub fn is_wall(&self, coord: Coord) -> bool {
        self.get(coord) == Terrain::Wall
    }

    /// Edge tiles that are walkable, i.e. the room's exits.
    pub fn exits(&self) -> Vec<Coord> {
        (0..ROOM_AREA as u16)
            .filter_map(Coord::unpack)
            .filter(|c| c.is_edge() && !self.is_wall(*c))
            .collect()
    }

    pub fn walkable_tiles(&self) -> usize {
        self.tiles.iter().filter(|t| **t != Terrain::Wall).count()
    }
}
