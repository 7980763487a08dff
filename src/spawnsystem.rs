use crate::algorithms::minheap::*;
use crate::config::*;
use crate::creep::*;
use crate::error::*;
use crate::host::*;
use crate::room::name::*;
use crate::store::*;
use log::*;
use specs::prelude::*;
use std::collections::{HashMap, HashSet};

/// Spawn order, most important first. A role without an urgent entry uses its normal one.
const SPAWN_ORDER: &[(AgentRole, bool)] = &[
    (AgentRole::Miner, true),
    (AgentRole::Hauler, true),
    (AgentRole::Distributor, false),
    (AgentRole::Porter, false),
    (AgentRole::Defender, false),
    (AgentRole::KeeperKiller, false),
    (AgentRole::CoreAttacker, false),
    (AgentRole::Builder, true),
    (AgentRole::Upgrader, true),
    (AgentRole::Reserver, false),
    (AgentRole::Miner, false),
    (AgentRole::SourceBuilder, false),
    (AgentRole::Hauler, false),
    (AgentRole::SourceRepairer, false),
    (AgentRole::Scout, false),
    (AgentRole::RampartRepairer, false),
    (AgentRole::Builder, false),
    (AgentRole::Upgrader, false),
];

const MAX_NAME_ATTEMPTS: u32 = 10;

pub fn role_priority(role: AgentRole, urgent: bool) -> u32 {
    SPAWN_ORDER
        .iter()
        .position(|entry| *entry == (role, urgent))
        .or_else(|| SPAWN_ORDER.iter().position(|entry| *entry == (role, false)))
        .unwrap_or(SPAWN_ORDER.len()) as u32
}

pub fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value == 0 {
        return "0".to_owned();
    }

    let mut digits = Vec::new();

    while value > 0 {
        digits.push(DIGITS[(value % 36) as usize] as char);
        value /= 36;
    }

    digits.iter().rev().collect()
}

/// Agent name unique per territory and tick: `<role code>_<base36(room code, tick mod 100000)>`.
pub fn agent_name(role: AgentRole, territory: RoomName, time: u32) -> String {
    let serial = territory.encode() * 100_000 + (time % 100_000) as u64;

    format!("{}_{}", role.code(), to_base36(serial))
}

#[derive(Clone, Debug)]
pub struct SpawnRequest {
    pub role: AgentRole,
    pub body: Vec<Part>,
    pub owner: AgentOwner,
    pub urgent: bool,
    /// Distinguishes requests of the same role and owner, such as the node a miner is for.
    pub tag: Option<String>,
    /// Initial record of the agent once spawned.
    pub record: AgentRecord,
    sequence: u64,
}

impl SpawnRequest {
    pub fn new(role: AgentRole, body: Vec<Part>, owner: AgentOwner) -> SpawnRequest {
        SpawnRequest {
            role,
            body,
            owner,
            urgent: false,
            tag: None,
            record: AgentRecord::default(),
            sequence: 0,
        }
    }

    pub fn urgent(mut self, urgent: bool) -> SpawnRequest {
        self.urgent = urgent;
        self
    }

    pub fn tag<S: Into<String>>(mut self, tag: S) -> SpawnRequest {
        self.tag = Some(tag.into());
        self
    }

    pub fn record(mut self, record: AgentRecord) -> SpawnRequest {
        self.record = record;
        self
    }

    pub fn cost(&self) -> u32 {
        body_cost(&self.body)
    }

    pub fn priority(&self) -> u32 {
        role_priority(self.role, self.urgent)
    }

    fn is_same_slot(&self, other: &SpawnRequest) -> bool {
        self.role == other.role && self.owner == other.owner && self.tag == other.tag
    }
}

pub(crate) fn request_key(request: &SpawnRequest) -> (u32, u64) {
    (request.priority(), request.sequence)
}

/// Pending spawn requests per territory. Ordered by priority, then arrival.
#[derive(Default)]
pub struct SpawnQueue {
    next_sequence: u64,
    requests: HashMap<RoomName, MinHeap<SpawnRequest>>,
}

impl SpawnQueue {
    /// Queues a request, replacing any pending one for the same role, owner and tag in its place
    /// in line. A full queue evicts its least important request if the new one ranks above it.
    pub fn request(&mut self, territory: RoomName, mut request: SpawnRequest, capacity: usize) -> EngineResult<()> {
        let queue = self.requests.entry(territory).or_default();

        match queue.remove_where(|pending| pending.is_same_slot(&request), request_key) {
            Some(pending) => request.sequence = pending.sequence,
            None => {
                request.sequence = self.next_sequence;
                self.next_sequence += 1;
            }
        }

        if queue.len() >= capacity {
            let worst = queue.peek_max_by(request_key).map(request_key);

            match worst {
                Some(worst) if request_key(&request) < worst => {
                    queue.remove_where(|pending| request_key(pending) == worst, request_key);
                }
                _ => return Err(EngineError::CapacityExhausted),
            }
        }

        queue.insert_by(request, request_key);

        Ok(())
    }

    pub fn len(&self, territory: RoomName) -> usize {
        self.requests.get(&territory).map(|q| q.len()).unwrap_or(0)
    }

    pub fn is_empty(&self, territory: RoomName) -> bool {
        self.len(territory) == 0
    }

    pub fn peek(&self, territory: RoomName) -> Option<&SpawnRequest> {
        self.requests.get(&territory).and_then(|q| q.peek_min())
    }

    pub fn iter_requests(&self, territory: RoomName) -> impl Iterator<Item = &SpawnRequest> {
        self.requests.get(&territory).into_iter().flat_map(|q| q.iter())
    }

    fn pop(&mut self, territory: RoomName) -> Option<SpawnRequest> {
        self.requests.get_mut(&territory).and_then(|q| q.remove_min_by(request_key))
    }

    /// Puts a popped request back without losing its place in line.
    fn restore(&mut self, territory: RoomName, request: SpawnRequest) {
        self.requests.entry(territory).or_default().insert_by(request, request_key);
    }

    /// Drops queues of lost territories and requests whose owner no longer exists.
    pub fn discard_orphans(&mut self, store: &MemoryStore, territories: &HashSet<RoomName>) -> usize {
        let mut discarded = 0;

        self.requests.retain(|territory, queue| {
            if !territories.contains(territory) {
                discarded += queue.len();
                return false;
            }

            while queue.remove_where(|r| !store.owner_exists(&r.owner, territories), request_key).is_some() {
                discarded += 1;
            }

            true
        });

        discarded
    }
}

/// Raises energy consumers into the urgent band while the territory has energy to spare.
pub fn escalate_consumer(request: SpawnRequest, balance: &SpawnBalance) -> SpawnRequest {
    if request.role.consumes_energy() && balance.is_urgent() {
        request.urgent(true)
    } else {
        request
    }
}

#[derive(SystemData)]
pub struct SpawnSystemData<'a> {
    spawn_queue: Write<'a, SpawnQueue>,
    store: Write<'a, MemoryStore>,
    config: Read<'a, EngineConfig>,
}

pub struct SpawnSystem<'h> {
    host: &'h mut dyn HostEnvironment,
}

impl<'h> SpawnSystem<'h> {
    pub fn new(host: &'h mut dyn HostEnvironment) -> SpawnSystem<'h> {
        SpawnSystem { host }
    }

    fn spawn_agent(host: &mut dyn HostEnvironment, slot: &SpawnSlot, request: &SpawnRequest, territory: RoomName, time: u32) -> Result<String, SpawnFailure> {
        let base = agent_name(request.role, territory, time);

        for additional in 0..MAX_NAME_ATTEMPTS {
            let name = if additional == 0 { base.clone() } else { format!("{}_{}", base, additional) };

            match host.spawn_agent(slot, &request.body, &name) {
                Ok(()) => return Ok(name),
                Err(SpawnFailure::NameExists) => continue,
                Err(err) => return Err(err),
            }
        }

        Err(SpawnFailure::NameExists)
    }

    /// Drains the territory's queue into its free spawns. Stops at the first request that cannot
    /// be paid for yet so lower priorities never jump the line.
    fn process_territory_spawns(host: &mut dyn HostEnvironment, view: &TerritoryView, queue: &mut SpawnQueue, store: &mut MemoryStore, time: u32) -> u32 {
        let mut spawns = view.free_spawns.clone();
        let mut available_energy = view.energy_available;
        let energy_capacity = view.energy_capacity_available;
        let mut spawned = 0;

        while !spawns.is_empty() {
            let Some(request) = queue.pop(view.name) else {
                break;
            };

            let body_cost = request.cost();

            if request.body.is_empty() || body_cost > energy_capacity {
                debug!(
                    "Dropping unaffordable spawn request - Territory: {} - Role: {} - Cost: {} - Capacity: {}",
                    view.name, request.role, body_cost, energy_capacity
                );
                continue;
            }

            if body_cost > available_energy {
                queue.restore(view.name, request);
                break;
            }

            match Self::spawn_agent(host, &spawns[0], &request, view.name, time) {
                Ok(name) => {
                    info!("Spawning - Territory: {} - Role: {} - Name: {} - Owner: {}", view.name, request.role, name, request.owner);

                    spawns.remove(0);
                    available_energy -= body_cost;
                    spawned += 1;

                    store.register_agent(request.owner, AgentId::new(name), request.record);
                }
                Err(SpawnFailure::NotEnoughEnergy) => {
                    queue.restore(view.name, request);
                    break;
                }
                Err(SpawnFailure::Busy) => {
                    spawns.remove(0);
                    queue.restore(view.name, request);
                }
                Err(err) => {
                    warn!("Failed spawning - Territory: {} - Role: {} - Error: {:?}", view.name, request.role, err);
                }
            }
        }

        spawned
    }
}

impl<'a, 'h> System<'a> for SpawnSystem<'h> {
    type SystemData = SpawnSystemData<'a>;

    fn run(&mut self, mut data: Self::SystemData) {
        let time = self.host.time();

        let mut territories = self.host.territories();
        territories.sort();

        let territory_set: HashSet<RoomName> = territories.iter().copied().collect();

        let discarded = data.spawn_queue.discard_orphans(&data.store, &territory_set);

        if discarded > 0 {
            debug!("Discarded orphaned spawn requests - Count: {}", discarded);
        }

        for territory in territories {
            data.store.spawn_balance_mut(territory).decay(data.config.spawn.balance_half_life);

            if data.spawn_queue.is_empty(territory) {
                continue;
            }

            let Some(view) = self.host.territory(territory) else {
                continue;
            };

            Self::process_territory_spawns(&mut *self.host, &view, &mut data.spawn_queue, &mut data.store, time);
        }
    }
}
