use super::matching::*;
use super::requests::*;
use crate::config::*;
use crate::creep::*;
use crate::host::*;
use crate::room::name::*;
use crate::store::*;
use log::*;
use specs::prelude::*;
use std::collections::HashMap;

/// What a carrier should do with its load this tick.
#[derive(Clone, Debug, PartialEq)]
pub enum TransportDirective {
    Deliver { target: TargetId, pos: Position },
    /// Go back to storage for more energy.
    Refill,
    Idle,
}

#[derive(Default)]
pub struct TransportAssignments {
    directives: HashMap<AgentId, TransportDirective>,
}

impl TransportAssignments {
    pub fn get(&self, agent: &AgentId) -> Option<&TransportDirective> {
        self.directives.get(agent)
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    fn clear(&mut self) {
        self.directives.clear();
    }
}

/// A loaded agent taking part in this tick's matching.
#[derive(Clone, Debug)]
pub struct Carrier {
    pub agent: AgentView,
    /// Target it was delivering to last tick.
    pub delivery: Option<TargetId>,
}

impl Carrier {
    fn is_porter(&self) -> bool {
        self.agent.role == AgentRole::Porter
    }
}

#[derive(Clone, Debug, Default)]
pub struct TransportPlan {
    pub directives: Vec<(AgentId, TransportDirective)>,
    /// A hauler was left without work while requests were open, so the territory has energy to
    /// spare.
    pub surplus: bool,
}

/// Hands each carrier a directive. Carriers still heading to a target that wants energy keep it
/// and are taken out of the matching.
pub fn plan_transport(requests: &mut [TransportRequest], carriers: &[Carrier], limits: &MatchingLimits) -> TransportPlan {
    let mut plan = TransportPlan::default();
    let mut matched: Vec<&Carrier> = Vec::new();
    let mut candidates: Vec<HaulerCandidate> = Vec::new();

    for carrier in carriers.iter() {
        let agent = &carrier.agent;

        if agent.energy == 0 {
            let directive = if carrier.is_porter() { TransportDirective::Refill } else { TransportDirective::Idle };

            plan.directives.push((agent.id.clone(), directive));
            continue;
        }

        let current = match carrier.delivery.as_ref() {
            Some(target) => requests.iter_mut().find(|request| request.target == *target && request.is_open()),
            None => None,
        };

        if let Some(request) = current {
            let range = agent.pos.world_range_to(&request.pos);

            request.claim(agent.energy, range);

            plan.directives.push((
                agent.id.clone(),
                TransportDirective::Deliver {
                    target: request.target.clone(),
                    pos: request.pos,
                },
            ));
            continue;
        }

        matched.push(carrier);
        candidates.push(HaulerCandidate {
            id: agent.id.clone(),
            pos: agent.pos,
            amount: agent.energy,
            is_porter: carrier.is_porter(),
            ticks_to_live: agent.ticks_to_live_or_full(),
        });
    }

    let result = match_haulers(requests, &candidates, limits);

    trace!("Transport matching - Requests: {} - Haulers: {} - Proposals: {}", requests.len(), candidates.len(), result.proposals);

    for (index, carrier) in matched.into_iter().enumerate() {
        let agent = &carrier.agent;

        let directive = match result.assigned_to(index) {
            Some(request_index) => {
                let request = &requests[request_index];

                TransportDirective::Deliver {
                    target: request.target.clone(),
                    pos: request.pos,
                }
            }
            None if carrier.is_porter() && agent.free_capacity() > 0 => TransportDirective::Refill,
            None => {
                if !carrier.is_porter() && !requests.is_empty() {
                    plan.surplus = true;
                }

                TransportDirective::Idle
            }
        };

        plan.directives.push((agent.id.clone(), directive));
    }

    plan
}

#[derive(SystemData)]
pub struct TransportSystemData<'a> {
    assignments: Write<'a, TransportAssignments>,
    store: Write<'a, MemoryStore>,
    config: Read<'a, EngineConfig>,
}

/// Matches loaded haulers and porters against the energy requests of each territory.
pub struct TransportSystem<'h> {
    host: &'h dyn HostEnvironment,
}

impl<'h> TransportSystem<'h> {
    pub fn new(host: &'h dyn HostEnvironment) -> TransportSystem<'h> {
        TransportSystem { host }
    }

    /// Porters always take part. Haulers only once they head home with a load.
    fn carriers(&self, territory: RoomName, store: &mut MemoryStore) -> Vec<Carrier> {
        let mut carriers = Vec::new();

        for agent in self.host.live_agents_of(territory) {
            if agent.ticks_to_live.is_none() {
                continue;
            }

            let record = match agent.role {
                AgentRole::Porter => {
                    let record = store.agent_mut(&agent.id);

                    record.update_supplying(&agent);

                    record
                }
                AgentRole::Hauler => match store.agents.get_mut(&agent.id) {
                    Some(record) if record.supplying => record,
                    _ => continue,
                },
                _ => continue,
            };

            carriers.push(Carrier {
                delivery: record.delivery.clone(),
                agent,
            });
        }

        carriers
    }
}

impl<'a, 'h> System<'a> for TransportSystem<'h> {
    type SystemData = TransportSystemData<'a>;

    fn run(&mut self, mut data: Self::SystemData) {
        let time = self.host.time();

        data.assignments.clear();

        let mut territories = self.host.territories();
        territories.sort();

        for territory in territories {
            let Some(view) = self.host.territory(territory) else {
                continue;
            };

            let spawn_energy_full = view.energy_available >= view.energy_capacity_available;

            let mut requests = build_requests(&self.host.fill_targets(territory), spawn_energy_full, &data.config.transport);

            let carriers = self.carriers(territory, &mut data.store);

            if carriers.is_empty() {
                continue;
            }

            let limits = MatchingLimits {
                porter_priority_threshold: porter_priority_threshold(view.storage.is_some()),
                porter_min_ticks_to_live: data.config.transport.porter_min_ticks_to_live,
            };

            let plan = plan_transport(&mut requests, &carriers, &limits);

            if plan.surplus && data.store.spawn_balance_mut(territory).add(time) {
                debug!("Idle hauler raised spawn balance - Territory: {} - Balance: {}", territory, data.store.spawn_balance(territory));
            }

            for (agent, directive) in plan.directives {
                let record = data.store.agent_mut(&agent);

                record.delivery = match &directive {
                    TransportDirective::Deliver { target, .. } => Some(target.clone()),
                    _ => None,
                };

                data.assignments.directives.insert(agent, directive);
            }
        }
    }
}
