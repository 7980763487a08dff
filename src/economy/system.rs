use super::accounting::*;
use super::activesources::*;
use super::bodies::*;
use super::remotes::*;
use crate::config::*;
use crate::constants::*;
use crate::creep::*;
use crate::host::*;
use crate::room::data::*;
use crate::room::name::*;
use crate::spawnsystem::*;
use crate::store::*;
use crate::territory::*;
use log::*;
use rand::rngs::StdRng;
use specs::prelude::*;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Smallest miner worth spawning when income is negative.
const MIN_MINER_ENERGY: u32 = 300;

#[derive(SystemData)]
pub struct EconomySystemData<'a> {
    store: Write<'a, MemoryStore>,
    config: Read<'a, EngineConfig>,
    spawn_queue: Write<'a, SpawnQueue>,
    rng: WriteExpect<'a, StdRng>,
    mapping: Read<'a, TerritoryMapping>,
    territory_data: WriteStorage<'a, TerritoryData>,
}

/// Accounts the labor working each territory's nodes and asks the spawn queue for the single
/// most pressing worker.
pub struct EconomySystem<'h> {
    host: &'h dyn HostEnvironment,
}

/// Scratch totals of one territory's live agents.
#[derive(Default)]
struct LaborCensus {
    hauler_carry: u32,
    /// Carry parts of porters that outlive their replacement's spawn.
    porter_carry: u32,
    idle_haulers: Vec<AgentView>,
    fading_nodes: BTreeSet<NodeId>,
}

impl<'h> EconomySystem<'h> {
    pub fn new(host: &'h dyn HostEnvironment) -> EconomySystem<'h> {
        EconomySystem { host }
    }

    /// Clears per tick figures and refreshes what visibility tells us about remote containers.
    fn reset_runtime(&self, store: &mut MemoryStore, territory: RoomName, active: &ActiveSourceSet) {
        for id in active.node_ids.iter() {
            if let Some(info) = store.node_mut(id) {
                info.reset_runtime();
                info.runtime.regeneration = ENERGY_REGEN_TIME;
            }
        }

        let MemoryStore { remotes, nodes, active_sources, .. } = store;

        let Some(remotes) = remotes.get_mut(&territory) else {
            return;
        };

        for (room, remote) in remotes.iter_mut() {
            remote.runtime = RemoteRuntime {
                spawn_keeper_killer: remote.room_type.requires_escort(),
                ..RemoteRuntime::default()
            };

            if self.host.room_intel(*room).map(|intel| intel.stronghold).unwrap_or(false) && active_sources.remove(&territory).is_some() {
                info!("Stronghold in remote, dropping active sources - Territory: {} - Room: {}", territory, room);
            }

            let Some(structures) = self.host.room_structures(*room) else {
                continue;
            };

            for id in remote.node_ids.iter() {
                let Some(info) = nodes.get_mut(id) else {
                    continue;
                };

                let Some(container) = info.container_pos() else {
                    continue;
                };

                let at_container = structures.iter().filter(|s| s.kind == StructureKind::Container && s.pos == container);

                let mut constructed = false;
                let mut constructing = false;

                for structure in at_container {
                    if structure.construction_site {
                        constructing = true;
                    } else {
                        constructed = true;
                    }
                }

                info.constructed = constructed;
                info.constructing = constructing && !constructed;
            }
        }
    }

    /// Counts live labor against the nodes it serves and sorts out which haulers are free.
    fn census(&self, store: &mut MemoryStore, territory: RoomName, active: &ActiveSourceSet) -> LaborCensus {
        let mut census = LaborCensus::default();

        let active_ids: HashSet<&NodeId> = active.node_ids.iter().collect();

        let MemoryStore { nodes, remotes, agents, .. } = store;

        let mut remotes = remotes.get_mut(&territory);

        for agent in self.host.live_agents_of(territory) {
            let record = agents.entry(agent.id.clone()).or_default();

            match agent.role {
                AgentRole::Miner => {
                    let Some(info) = (match record.node.as_ref() {
                        Some(id) => nodes.get_mut(id),
                        None => None,
                    }) else {
                        continue;
                    };

                    if !active_ids.contains(&info.id) {
                        census.fading_nodes.insert(info.id.clone());
                    } else if miner_is_productive(&agent, info.distance) {
                        info.runtime.harvest_power += agent.count_parts(Part::Work) * HARVEST_POWER;
                        info.runtime.num_miner += 1;
                    }
                }
                AgentRole::Hauler => {
                    if hauler_is_productive(&agent) {
                        census.hauler_carry += agent.carry_capacity();
                    }

                    if agent.ticks_to_live.is_none() {
                        continue;
                    }

                    record.update_supplying(&agent);

                    if record.supplying {
                        continue;
                    }

                    match record.node.clone() {
                        Some(id) => match nodes.get_mut(&id) {
                            Some(info) => info.runtime.pending_energy -= agent.free_capacity() as i32,
                            None => record.force_supplying(),
                        },
                        None => census.idle_haulers.push(agent),
                    }
                }
                AgentRole::Porter => {
                    if hauler_is_productive(&agent) {
                        census.porter_carry += agent.count_parts(Part::Carry);
                    }
                }
                AgentRole::Reserver => {
                    if !escort_is_productive(&agent, CREEP_CLAIM_LIFE_TIME, RESERVER_TRAVEL_TICKS) {
                        continue;
                    }

                    let remote = match (record.target_room, remotes.as_deref_mut()) {
                        (Some(room), Some(remotes)) => remotes.get_mut(&room),
                        _ => None,
                    };

                    if let Some(remote) = remote {
                        remote.runtime.reserve_power += agent.count_parts(Part::Claim);
                        remote.runtime.num_reserver += 1;
                    }
                }
                AgentRole::KeeperKiller => {
                    if !escort_is_productive(&agent, CREEP_LIFE_TIME, KEEPER_KILLER_TRAVEL_TICKS) {
                        continue;
                    }

                    let remote = match (record.target_room, remotes.as_deref_mut()) {
                        (Some(room), Some(remotes)) => remotes.get_mut(&room),
                        _ => None,
                    };

                    if let Some(remote) = remote {
                        remote.runtime.spawn_keeper_killer = false;
                    }
                }
                _ => {}
            }
        }

        census
    }

    /// Sends idle haulers to the nearest node that will have a load ready for them.
    fn assign_idle_haulers(&self, store: &mut MemoryStore, active: &ActiveSourceSet, census: &LaborCensus) {
        let merged: Vec<NodeId> = active.node_ids.iter().chain(census.fading_nodes.iter()).cloned().collect();

        let mut candidates: Vec<ResourceNodeInfo> = Vec::with_capacity(merged.len());

        for id in merged.iter() {
            let Some(info) = store.node_mut(id) else {
                continue;
            };

            if let Some(status) = self.host.node_status(id) {
                info.runtime.energy = status.energy;
                info.runtime.regeneration = if status.ticks_to_regeneration > 0 {
                    status.ticks_to_regeneration
                } else {
                    ENERGY_REGEN_TIME
                };
            }

            let pending = node_pending_energy(self.host, info);

            info.runtime.pending_energy += pending;

            candidates.push(info.clone());
        }

        for agent in census.idle_haulers.iter() {
            let Some(index) = select_node_for_hauler(&candidates, agent.ticks_to_live_or_full(), agent.carry_capacity()) else {
                continue;
            };

            let node = &mut candidates[index];

            node.runtime.pending_energy -= agent.free_capacity() as i32;

            trace!("Assigning hauler - Agent: {} - Node: {}", agent.id, node.id);

            store.agent_mut(&agent.id).node = Some(node.id.clone());
        }

        for candidate in candidates {
            if let Some(info) = store.node_mut(&candidate.id) {
                info.runtime = candidate.runtime;
            }
        }
    }

    /// Walks the active nodes in order, splitting hauler carry between them, and returns the
    /// territory summary alongside the spawn requests to file.
    fn plan_workers(&self, store: &mut MemoryStore, view: &TerritoryView, active: &ActiveSourceSet, census: &LaborCensus, config: &EngineConfig) -> (TerritoryEconomy, Vec<SpawnRequest>) {
        let owner = AgentOwner::Territory(view.name);

        let mut income = active.default_income;
        let mut carry_left = census.hauler_carry as f32;
        let mut carry_total = 0.0;

        let mut charged_rooms = HashSet::new();
        let mut requests = Vec::new();
        let mut requested = false;

        for id in active.node_ids.iter() {
            let Some(info) = store.node(id).cloned() else {
                continue;
            };

            let room = info.room_name();

            let remote = if info.owned {
                None
            } else {
                store.remotes.get_mut(&view.name).and_then(|r| r.get_mut(&room)).map(|remote| {
                    if charged_rooms.insert(room) {
                        if remote.room_type == RoomType::Normal && view.energy_capacity_available >= RESERVER_COST {
                            income -= remote_upkeep(remote.room_type);

                            update_reservation(remote, self.host.reservation_ticks(room), config.remote.reservation_tick_threshold);
                        } else if remote.room_type.requires_escort() {
                            income -= remote_upkeep(remote.room_type);
                        }
                    }

                    remote.runtime.clone()
                })
            };

            let reserve = remote.as_ref().map(|r| r.reserve).unwrap_or(false);

            let labor = assess_node(&info, reserve, view.level, carry_left, config.spawn.pending_energy_pad_threshold);

            carry_left -= labor.max_carry;
            carry_total += labor.max_carry;
            income += labor.earned(&info);

            if requested {
                continue;
            }

            if remote.as_ref().map(|r| r.spawn_keeper_killer).unwrap_or(false) {
                let record = AgentRecord {
                    target_room: Some(room),
                    ..AgentRecord::default()
                };

                requests.push(SpawnRequest::new(AgentRole::KeeperKiller, keeper_killer_body(), owner.clone()).tag(room.to_string()).record(record));
            }

            let Some(demand) = worker_demand(&info, remote.as_ref(), &labor) else {
                continue;
            };

            let request = match demand {
                WorkerDemand::Reserver { room, reserve_power } => {
                    let record = AgentRecord {
                        target_room: Some(room),
                        ..AgentRecord::default()
                    };

                    SpawnRequest::new(AgentRole::Reserver, reserver_body(view.energy_capacity_available, reserve_power), owner.clone())
                        .tag(room.to_string())
                        .record(record)
                }
                WorkerDemand::Miner { node, max_work, urgent } => {
                    let energy = if income > 0.0 { view.energy_capacity_available } else { view.energy_available };

                    let record = AgentRecord {
                        node: Some(node.clone()),
                        ..AgentRecord::default()
                    };

                    SpawnRequest::new(AgentRole::Miner, miner_body(energy.max(MIN_MINER_ENERGY), max_work, true), owner.clone())
                        .urgent(urgent)
                        .tag(node.to_string())
                        .record(record)
                }
                WorkerDemand::Hauler { urgent } => SpawnRequest::new(AgentRole::Hauler, hauler_body(view.energy_available, false), owner.clone()).urgent(urgent),
            };

            if !request.body.is_empty() {
                requests.push(request);
            }

            requested = true;
        }

        if census.porter_carry < porter_carry_target(view.level, view.num_spawns, view.controller_num_carry) {
            let energy = if income > 0.0 { view.energy_capacity_available } else { view.energy_available };

            let body = porter_body(energy);

            if !body.is_empty() {
                requests.push(SpawnRequest::new(AgentRole::Porter, body, owner));
            }
        }

        let economy = TerritoryEconomy {
            income,
            max_income: active.max_income,
            default_income: active.default_income,
            spawn_usage_ratio: active.spawn_usage_ratio,
            active_nodes: active.node_ids.len(),
            hauler_carry: census.hauler_carry,
            hauler_carry_total: carry_total,
        };

        (economy, requests)
    }
}

impl<'a, 'h> System<'a> for EconomySystem<'h> {
    type SystemData = EconomySystemData<'a>;

    fn run(&mut self, mut data: Self::SystemData) {
        let time = self.host.time();

        let mut territories = self.host.territories();
        territories.sort();

        let owned: HashSet<RoomName> = territories.iter().copied().collect();

        let mut summaries: HashMap<RoomName, TerritoryEconomy> = HashMap::new();

        for territory in territories {
            let Some(view) = self.host.territory(territory) else {
                continue;
            };

            if let Some(room) = discover_next_remote(self.host, &view, &owned, &mut data.store, &data.config.remote, time) {
                debug!("Discovered remote - Territory: {} - Room: {}", territory, room);
            }

            let active = match compute_active_sources(self.host, &view, &mut data.store, &data.config, time, &mut *data.rng) {
                Ok(active) => active,
                Err(err) => {
                    warn!("Failed computing active sources - Territory: {} - Error: {}", territory, err);
                    continue;
                }
            };

            self.reset_runtime(&mut data.store, territory, &active);

            let census = self.census(&mut data.store, territory, &active);

            if !census.idle_haulers.is_empty() {
                self.assign_idle_haulers(&mut data.store, &active, &census);
            }

            let (economy, requests) = self.plan_workers(&mut data.store, &view, &active, &census, &data.config);

            for request in requests {
                let role = request.role;

                if let Err(err) = data.spawn_queue.request(territory, request, data.config.spawn.queue_capacity) {
                    debug!("Spawn request rejected - Territory: {} - Role: {} - Error: {}", territory, role, err);
                }
            }

            summaries.insert(territory, economy);
        }

        for (territory, economy) in summaries {
            let Some(entity) = data.mapping.get(territory) else {
                continue;
            };

            if let Some(territory_data) = data.territory_data.get_mut(entity) {
                territory_data.economy = economy;
            }
        }
    }
}
