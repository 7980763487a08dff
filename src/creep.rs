use crate::constants::*;
use crate::pathing::cursor::PathCursor;
use crate::room::data::*;
use crate::room::name::*;
use crate::transfer::requests::TargetId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Part {
    Move,
    Work,
    Carry,
    Attack,
    RangedAttack,
    Heal,
    Claim,
    Tough,
}

impl Part {
    pub fn cost(self) -> u32 {
        match self {
            Part::Move => 50,
            Part::Work => 100,
            Part::Carry => 50,
            Part::Attack => 80,
            Part::RangedAttack => 150,
            Part::Heal => 250,
            Part::Claim => 600,
            Part::Tough => 10,
        }
    }
}

pub fn body_cost(body: &[Part]) -> u32 {
    body.iter().map(|p| p.cost()).sum()
}

/// Behaviour variant of an agent.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgentRole {
    Miner,
    Hauler,
    Porter,
    Distributor,
    Builder,
    Upgrader,
    Reserver,
    KeeperKiller,
    Defender,
    CoreAttacker,
    SourceBuilder,
    SourceRepairer,
    Scout,
    RampartRepairer,
}

impl AgentRole {
    /// Prefix used when naming new agents.
    pub fn code(self) -> &'static str {
        match self {
            AgentRole::Miner => "m",
            AgentRole::Hauler => "h",
            AgentRole::Porter => "p",
            AgentRole::Distributor => "d",
            AgentRole::Builder => "b",
            AgentRole::Upgrader => "u",
            AgentRole::Reserver => "r",
            AgentRole::KeeperKiller => "k",
            AgentRole::Defender => "bl",
            AgentRole::CoreAttacker => "c",
            AgentRole::SourceBuilder => "sb",
            AgentRole::SourceRepairer => "sr",
            AgentRole::Scout => "s",
            AgentRole::RampartRepairer => "rr",
        }
    }

    /// Roles whose demand for energy is continuous while they work.
    pub fn consumes_energy(self) -> bool {
        matches!(self, AgentRole::Builder | AgentRole::Upgrader)
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(String);

impl AgentId {
    pub fn new<S: Into<String>>(name: S) -> AgentId {
        AgentId(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persisted engine-side state of an agent.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AgentRecord {
    #[serde(rename = "n")]
    pub node: Option<NodeId>,
    #[serde(rename = "t")]
    pub target_room: Option<RoomName>,
    #[serde(rename = "d")]
    pub delivery: Option<TargetId>,
    #[serde(rename = "s")]
    pub supplying: bool,
    #[serde(rename = "p")]
    pub cursor: Option<PathCursor>,
}

impl AgentRecord {
    /// Flips between fetching and supplying: an empty carrier starts fetching again and a full
    /// one starts supplying. Returns true when the state changed.
    pub fn update_supplying(&mut self, agent: &AgentView) -> bool {
        if self.supplying && agent.energy == 0 {
            self.supplying = false;
            self.node = None;
            self.delivery = None;

            true
        } else if !self.supplying && agent.free_capacity() == 0 {
            self.supplying = true;

            true
        } else {
            false
        }
    }

    /// Sends a carrier home regardless of its load, dropping its node.
    pub fn force_supplying(&mut self) {
        self.supplying = true;
        self.node = None;
    }
}

/// Host view of a live agent.
#[derive(Clone, Debug)]
pub struct AgentView {
    pub id: AgentId,
    pub role: AgentRole,
    pub pos: Position,
    /// `None` while still spawning.
    pub ticks_to_live: Option<u32>,
    pub body: Vec<Part>,
    pub energy: u32,
}

impl AgentView {
    pub fn count_parts(&self, part: Part) -> u32 {
        self.body.iter().filter(|p| **p == part).count() as u32
    }

    /// Spawning agents count as having a full lifespan ahead of them.
    pub fn ticks_to_live_or_full(&self) -> u32 {
        self.ticks_to_live.unwrap_or(CREEP_LIFE_TIME)
    }

    pub fn carry_capacity(&self) -> u32 {
        self.count_parts(Part::Carry) * CARRY_CAPACITY
    }

    pub fn free_capacity(&self) -> u32 {
        self.carry_capacity().saturating_sub(self.energy)
    }

    /// Ticks needed to spawn a replacement.
    pub fn spawn_ticks(&self) -> u32 {
        self.body.len() as u32 * CREEP_SPAWN_TIME
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MissionId(String);

impl MissionId {
    pub fn new<S: Into<String>>(id: S) -> MissionId {
        MissionId(id.into())
    }
}

impl fmt::Display for MissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Record an agent is bound to for liveness bookkeeping.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgentOwner {
    #[serde(rename = "t")]
    Territory(RoomName),
    #[serde(rename = "m")]
    Mission(MissionId),
}

impl fmt::Display for AgentOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentOwner::Territory(room) => write!(f, "territory {}", room),
            AgentOwner::Mission(mission) => write!(f, "mission {}", mission),
        }
    }
}
