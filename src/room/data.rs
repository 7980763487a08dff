use super::coord::*;
use super::name::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Host identity of a harvestable node.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    pub fn new<S: Into<String>>(id: S) -> NodeId {
        NodeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per tick figures, rebuilt from live agents and never persisted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeRuntime {
    pub harvest_power: u32,
    pub num_miner: u32,
    pub energy: u32,
    /// Energy at the node not yet promised to a hauler. Negative when over committed.
    pub pending_energy: i32,
    pub regeneration: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceNodeInfo {
    #[serde(rename = "i")]
    pub id: NodeId,
    #[serde(rename = "p")]
    pub pos: Position,
    #[serde(rename = "h")]
    pub home_room: RoomName,
    #[serde(rename = "t")]
    pub room_type: RoomType,
    #[serde(rename = "o")]
    pub owned: bool,
    #[serde(rename = "d")]
    pub distance: u32,
    #[serde(rename = "e")]
    pub energy_per_tick: f32,
    #[serde(rename = "n")]
    pub num_open: u8,
    #[serde(rename = "cc")]
    pub container_coord: Option<Coord>,
    #[serde(rename = "c")]
    pub constructed: bool,
    #[serde(rename = "cg")]
    pub constructing: bool,
    #[serde(rename = "l")]
    pub linked: bool,
    /// Road tiles grouped by room, in path order from the home anchor to the container.
    #[serde(rename = "r")]
    pub road_coords: Vec<(RoomName, Vec<u16>)>,
    #[serde(rename = "ir")]
    pub intermediates: Vec<RoomName>,
    #[serde(rename = "mi")]
    pub max_income: f32,
    #[serde(skip)]
    pub runtime: NodeRuntime,
}

impl ResourceNodeInfo {
    pub fn room_name(&self) -> RoomName {
        self.pos.room
    }

    pub fn container_pos(&self) -> Option<Position> {
        self.container_coord.map(|coord| Position::new(self.pos.room, coord))
    }

    pub fn reset_runtime(&mut self) {
        self.runtime = NodeRuntime::default();
    }

    /// Rebuilds the cached route from the persisted road tiles.
    pub fn road_positions(&self) -> Vec<Position> {
        self.road_coords
            .iter()
            .flat_map(|(room, packed)| packed.iter().filter_map(move |p| Coord::unpack(*p).map(|c| Position::new(*room, c))))
            .collect()
    }

    pub fn set_road_positions(&mut self, path: &[Position]) {
        let mut grouped: Vec<(RoomName, Vec<u16>)> = Vec::new();

        for pos in path {
            match grouped.last_mut() {
                Some((room, coords)) if *room == pos.room => coords.push(pos.coord.pack()),
                _ => grouped.push((pos.room, vec![pos.coord.pack()])),
            }
        }

        self.road_coords = grouped;
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RemoteRuntime {
    /// Reserved by us, or a reserver is on its way.
    pub reserve: bool,
    pub reserve_power: u32,
    pub num_reserver: u32,
    pub spawn_reserver: bool,
    pub spawn_keeper_killer: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoteInfo {
    #[serde(rename = "r")]
    pub room: RoomName,
    #[serde(rename = "t")]
    pub room_type: RoomType,
    #[serde(rename = "n")]
    pub node_ids: Vec<NodeId>,
    #[serde(rename = "co")]
    pub controller_num_open: u8,
    #[serde(rename = "ir")]
    pub intermediates: Vec<RoomName>,
    #[serde(rename = "a")]
    pub active_source_ids: Vec<NodeId>,
    /// Tick after which nodes that failed to route are planned again.
    #[serde(rename = "rt", default)]
    pub retry_at: Option<u32>,
    #[serde(skip)]
    pub runtime: RemoteRuntime,
}

impl RemoteInfo {
    pub fn new(room: RoomName) -> RemoteInfo {
        RemoteInfo {
            room,
            room_type: room.room_type(),
            node_ids: Vec::new(),
            controller_num_open: 0,
            intermediates: Vec::new(),
            active_source_ids: Vec::new(),
            retry_at: None,
            runtime: RemoteRuntime::default(),
        }
    }
}

/// Inputs an active source selection was computed from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSourceInputs {
    pub num_spawn: u32,
    /// Energy capacity can afford a reserver.
    pub reserve: bool,
    /// Energy capacity can afford infrastructure sized bodies.
    pub constructed: bool,
    pub level: u8,
    pub num_remotes: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActiveSourceSet {
    #[serde(rename = "n")]
    pub node_ids: Vec<NodeId>,
    #[serde(rename = "i")]
    pub inputs: ActiveSourceInputs,
    #[serde(rename = "t")]
    pub tick: u32,
    /// Income before any node is counted: porter and controller hauler upkeep.
    #[serde(rename = "di")]
    pub default_income: f32,
    #[serde(rename = "mi")]
    pub max_income: f32,
    /// Share of spawn time the selection keeps busy.
    #[serde(rename = "u")]
    pub spawn_usage_ratio: f32,
}

impl ActiveSourceSet {
    pub fn is_valid_for(&self, inputs: &ActiveSourceInputs, time: u32, lifespan: u32) -> bool {
        self.inputs == *inputs && time < self.tick + lifespan
    }
}
