use crate::creep::*;
use crate::error::*;
use crate::room::data::*;
use crate::room::name::*;
use crate::serialize::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

pub const STATE_KEY: &str = "steward";

/// Raw text storage the persisted state is written to between ticks.
pub trait StorageBackend {
    fn get(&self, key: &str) -> EngineResult<Option<String>>;

    fn set(&mut self, key: &str, data: String) -> EngineResult<()>;
}

#[derive(Default)]
pub struct InMemoryBackend {
    segments: HashMap<String, String>,
}

impl InMemoryBackend {
    pub fn new() -> InMemoryBackend {
        InMemoryBackend::default()
    }
}

impl StorageBackend for InMemoryBackend {
    fn get(&self, key: &str) -> EngineResult<Option<String>> {
        Ok(self.segments.get(key).cloned())
    }

    fn set(&mut self, key: &str, data: String) -> EngineResult<()> {
        self.segments.insert(key.to_owned(), data);

        Ok(())
    }
}

/// Running signal of whether the territory has spare energy for consumers. Idle haulers push it
/// up, starved consumers push it down, and it decays toward zero.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpawnBalance {
    #[serde(rename = "v")]
    pub value: f32,
    #[serde(rename = "a")]
    added_at: Option<u32>,
    #[serde(rename = "s")]
    subtracted_at: Option<u32>,
}

impl SpawnBalance {
    pub const STEP: f32 = 0.02;
    pub const URGENT_THRESHOLD: f32 = 0.5;

    /// Raises the balance once per tick.
    pub fn add(&mut self, time: u32) -> bool {
        if self.added_at == Some(time) {
            return false;
        }

        self.added_at = Some(time);
        self.value = (self.value + Self::STEP).min(1.0);

        true
    }

    /// Lowers the balance once per tick.
    pub fn subtract(&mut self, time: u32) -> bool {
        if self.subtracted_at == Some(time) {
            return false;
        }

        self.subtracted_at = Some(time);
        self.value = (self.value - Self::STEP).max(-1.0);

        true
    }

    pub fn decay(&mut self, half_life: f32) {
        if half_life > 0.0 {
            self.value *= 2f32.powf(-1.0 / half_life);
        }
    }

    /// Consumers are spawned ahead of the normal band while energy keeps piling up.
    pub fn is_urgent(&self) -> bool {
        self.value > Self::URGENT_THRESHOLD
    }
}

/// Every piece of engine state that must survive between ticks. Each table has a single writer:
/// economy owns `nodes`, `active_sources` and `remotes`; spawning owns `owners` and
/// `spawn_balances`.
#[derive(Default, Serialize, Deserialize)]
pub struct MemoryStore {
    #[serde(rename = "n")]
    pub nodes: HashMap<NodeId, ResourceNodeInfo>,
    #[serde(rename = "a")]
    pub active_sources: HashMap<RoomName, ActiveSourceSet>,
    #[serde(rename = "r")]
    pub remotes: HashMap<RoomName, BTreeMap<RoomName, RemoteInfo>>,
    #[serde(rename = "g")]
    pub agents: HashMap<AgentId, AgentRecord>,
    #[serde(rename = "o")]
    pub owners: BTreeMap<AgentOwner, Vec<AgentId>>,
    #[serde(rename = "m")]
    pub missions: BTreeMap<MissionId, RoomName>,
    #[serde(rename = "b", default)]
    pub spawn_balances: HashMap<RoomName, SpawnBalance>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn load(backend: &dyn StorageBackend) -> EngineResult<MemoryStore> {
        match backend.get(STATE_KEY)? {
            Some(data) if !data.is_empty() => decode_from_string(&data),
            _ => Ok(MemoryStore::default()),
        }
    }

    pub fn save(&self, backend: &mut dyn StorageBackend) -> EngineResult<()> {
        let data = encode_to_string(self)?;

        backend.set(STATE_KEY, data)
    }

    pub fn node(&self, id: &NodeId) -> Option<&ResourceNodeInfo> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut ResourceNodeInfo> {
        self.nodes.get_mut(id)
    }

    pub fn insert_node(&mut self, info: ResourceNodeInfo) {
        self.nodes.insert(info.id.clone(), info);
    }

    pub fn remotes_of(&self, territory: RoomName) -> Option<&BTreeMap<RoomName, RemoteInfo>> {
        self.remotes.get(&territory)
    }

    /// Node ids referenced by `ids` that have no backing record.
    pub fn missing_nodes<'a, I>(&self, ids: I) -> Vec<NodeId>
    where
        I: IntoIterator<Item = &'a NodeId>,
    {
        ids.into_iter().filter(|id| !self.nodes.contains_key(*id)).cloned().collect()
    }

    pub fn agent(&self, id: &AgentId) -> Option<&AgentRecord> {
        self.agents.get(id)
    }

    pub fn agent_mut(&mut self, id: &AgentId) -> &mut AgentRecord {
        self.agents.entry(id.clone()).or_default()
    }

    pub fn register_agent(&mut self, owner: AgentOwner, id: AgentId, record: AgentRecord) {
        self.agents.insert(id.clone(), record);
        self.owners.entry(owner).or_default().push(id);
    }

    pub fn agents_of(&self, owner: &AgentOwner) -> &[AgentId] {
        self.owners.get(owner).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn owner_exists(&self, owner: &AgentOwner, territories: &HashSet<RoomName>) -> bool {
        match owner {
            AgentOwner::Territory(room) => territories.contains(room),
            AgentOwner::Mission(mission) => self
                .missions
                .get(mission)
                .map(|room| territories.contains(room))
                .unwrap_or(false),
        }
    }

    /// Drops records of agents that are no longer alive. Spawning agents must be in `alive`.
    pub fn prune_agents(&mut self, alive: &HashSet<AgentId>) -> usize {
        let before = self.agents.len();

        self.agents.retain(|id, _| alive.contains(id));

        for agents in self.owners.values_mut() {
            agents.retain(|id| alive.contains(id));
        }

        self.owners.retain(|_, agents| !agents.is_empty());

        before - self.agents.len()
    }

    pub fn spawn_balance(&self, territory: RoomName) -> f32 {
        self.spawn_balances.get(&territory).map(|b| b.value).unwrap_or(0.0)
    }

    pub fn spawn_balance_mut(&mut self, territory: RoomName) -> &mut SpawnBalance {
        self.spawn_balances.entry(territory).or_default()
    }

    pub fn register_mission(&mut self, mission: MissionId, territory: RoomName) {
        self.missions.insert(mission, territory);
    }

    /// Tears down a mission, returning the agents that were bound to it.
    pub fn remove_mission(&mut self, mission: &MissionId) -> Vec<AgentId> {
        self.missions.remove(mission);

        self.owners.remove(&AgentOwner::Mission(mission.clone())).unwrap_or_default()
    }
}
