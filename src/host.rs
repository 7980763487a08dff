//! Interfaces the engine needs from the game host.

use crate::creep::*;
use crate::room::coord::*;
use crate::room::data::*;
use crate::room::name::*;
use crate::room::terrain::*;
use crate::transfer::requests::FillTarget;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StructureKind {
    Road,
    Container,
    Rampart,
    Wall,
    Spawn,
    Extension,
    Tower,
    Lab,
    Link,
    Storage,
    Terminal,
    Factory,
    Nuker,
    Controller,
    KeeperLair,
    Other,
}

impl StructureKind {
    /// Structures that block movement.
    pub fn is_obstacle(self) -> bool {
        !matches!(self, StructureKind::Road | StructureKind::Container | StructureKind::Rampart)
    }
}

#[derive(Clone, Debug)]
pub struct StructureView {
    pub kind: StructureKind,
    pub pos: Position,
    pub my: bool,
    /// Planned but not yet built.
    pub construction_site: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    DroppedEnergy,
    Tombstone,
    Container,
}

#[derive(Clone, Debug)]
pub struct ObjectRef {
    pub id: String,
    pub kind: ObjectKind,
    pub pos: Position,
    pub energy: u32,
}

#[derive(Clone, Debug)]
pub struct SpawnSlot {
    pub id: String,
    pub pos: Position,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SpawnFailure {
    NotEnoughEnergy,
    NameExists,
    Busy,
    InvalidBody,
}

/// A node inside an owned territory as the host currently sees it.
#[derive(Clone, Debug)]
pub struct LocalNode {
    pub id: NodeId,
    pub pos: Position,
    pub container_coord: Option<Coord>,
    pub linked: bool,
    pub constructed: bool,
    pub constructing: bool,
    pub num_open: u8,
}

/// Snapshot of an owned room at the start of a tick.
#[derive(Clone, Debug)]
pub struct TerritoryView {
    pub name: RoomName,
    pub level: u8,
    pub energy_available: u32,
    pub energy_capacity_available: u32,
    pub num_spawns: u32,
    pub free_spawns: Vec<SpawnSlot>,
    /// Tile hauling routes start from.
    pub anchor: Option<Position>,
    pub nodes: Vec<LocalNode>,
    pub storage: Option<Position>,
    pub controller: Option<Position>,
    /// Carry parts of the haulers feeding the controller.
    pub controller_num_carry: u32,
}

/// Scouted information about a room that is not owned.
#[derive(Clone, Debug, Default)]
pub struct RoomIntel {
    pub nodes: Vec<(NodeId, Position)>,
    pub controller: Option<Position>,
    pub controller_num_open: u8,
    pub keeper_lairs: Vec<Position>,
    /// Owned or reserved by another player.
    pub claimed_by_other: bool,
    pub stronghold: bool,
}

#[derive(Copy, Clone, Debug, Default)]
pub struct NodeStatus {
    pub energy: u32,
    pub ticks_to_regeneration: u32,
}

/// Static map queries.
pub trait MapView {
    fn terrain(&self, room: RoomName) -> Option<&RoomTerrain>;

    fn adjacent_rooms(&self, room: RoomName) -> Vec<RoomName>;

    fn terrain_at(&self, room: RoomName, coord: Coord) -> Terrain {
        self.terrain(room).map(|t| t.get(coord)).unwrap_or(Terrain::Wall)
    }

    /// Rooms outside the playable area or closed to us.
    fn is_room_accessible(&self, _room: RoomName) -> bool {
        true
    }

    /// Structures in a visible room, `None` without visibility.
    fn room_structures(&self, room: RoomName) -> Option<Vec<StructureView>>;

    fn room_intel(&self, room: RoomName) -> Option<RoomIntel>;
}

/// Per tick queries and commands against the game.
pub trait HostEnvironment: MapView {
    fn time(&self) -> u32;

    fn territories(&self) -> Vec<RoomName>;

    fn territory(&self, room: RoomName) -> Option<TerritoryView>;

    fn live_agents_of(&self, territory: RoomName) -> Vec<AgentView>;

    fn objects_in_range(&self, pos: Position, radius: u32, kind: ObjectKind) -> Vec<ObjectRef>;

    fn fill_targets(&self, territory: RoomName) -> Vec<FillTarget>;

    fn node_status(&self, node: &NodeId) -> Option<NodeStatus>;

    /// Ticks of our reservation on a room, negative when reserved by someone else.
    fn reservation_ticks(&self, room: RoomName) -> i32;

    fn spawn_agent(&mut self, slot: &SpawnSlot, body: &[Part], name: &str) -> Result<(), SpawnFailure>;
}
