//! Per tick labor accounting for the active nodes of a territory: how much of each node is
//! covered by live miners and haulers, what that earns, and the one worker most worth spawning.

use super::income::*;
use crate::constants::*;
use crate::creep::*;
use crate::host::*;
use crate::room::data::*;
use crate::room::name::*;

/// Hauler carry padding for a remote node sitting on a large backlog.
const BACKLOG_CARRY_PAD: f32 = 500.0;

/// Energy a node's container site is expected to absorb before it is built.
const CONSTRUCTION_ENERGY: i32 = 500;

/// Ticks of slack a hauler needs beyond the round trip to accept a node.
const HAULER_TRIP_SLACK: u32 = 30;

/// Miners count toward a node only while they outlive the spawn and walk of their replacement.
pub fn miner_is_productive(agent: &AgentView, distance: u32) -> bool {
    agent.ticks_to_live_or_full() > agent.spawn_ticks() + distance
}

pub fn hauler_is_productive(agent: &AgentView) -> bool {
    agent.ticks_to_live_or_full() >= agent.spawn_ticks()
}

/// Reservers and escorts count while they outlive their replacement's spawn and travel.
pub fn escort_is_productive(agent: &AgentView, lifespan: u32, travel: u32) -> bool {
    agent.ticks_to_live.unwrap_or(lifespan) >= agent.spawn_ticks() + travel
}

/// Energy a node will have produced by the time a hauler arrives.
pub fn expected_energy_delta(info: &ResourceNodeInfo) -> f32 {
    let runtime = &info.runtime;
    let harvest_power = runtime.harvest_power as f32;
    let distance = info.distance as f32;
    let regeneration = runtime.regeneration as f32;
    let energy = runtime.energy as f32;

    if distance < regeneration {
        energy.min(harvest_power * distance)
    } else {
        energy.min(harvest_power * regeneration) + harvest_power * (distance - regeneration)
    }
}

/// Picks the nearest node whose projected energy fills at least half of `capacity`, among those
/// the hauler can still reach and return from.
pub fn select_node_for_hauler(nodes: &[ResourceNodeInfo], ticks_to_live: u32, capacity: u32) -> Option<usize> {
    nodes
        .iter()
        .enumerate()
        .filter(|(_, info)| ticks_to_live >= 2 * info.distance + HAULER_TRIP_SLACK)
        .filter(|(_, info)| info.runtime.pending_energy as f32 + expected_energy_delta(info) >= 0.5 * capacity as f32)
        .min_by_key(|(_, info)| info.distance)
        .map(|(index, _)| index)
}

/// Loose energy waiting at a node: drops, keeper tombstones and its container.
pub fn node_pending_energy(host: &dyn HostEnvironment, info: &ResourceNodeInfo) -> i32 {
    let keeper = info.room_type.requires_escort();
    let range = if keeper { 5 } else { 1 };

    let mut pending: u32 = host
        .objects_in_range(info.pos, range, ObjectKind::DroppedEnergy)
        .iter()
        .map(|o| o.energy)
        .sum();

    if keeper {
        pending += host.objects_in_range(info.pos, range, ObjectKind::Tombstone).iter().map(|o| o.energy).sum::<u32>();
    }

    pending += host
        .objects_in_range(info.pos, 1, ObjectKind::Container)
        .first()
        .map(|o| o.energy)
        .unwrap_or(0);

    let mut pending = pending as i32;

    if info.constructing {
        pending -= CONSTRUCTION_ENERGY;
    }

    pending
}

/// Labor coverage of one node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeLabor {
    pub energy_per_tick: f32,
    pub max_harvest_power: f32,
    pub miner_ratio: f32,
    pub max_carry: f32,
    pub hauler_ratio: f32,
    pub net_income: f32,
}

impl NodeLabor {
    pub fn earned(&self, info: &ResourceNodeInfo) -> f32 {
        if info.constructing {
            0.0
        } else {
            self.net_income * self.miner_ratio.min(self.hauler_ratio)
        }
    }
}

/// Measures a node against the labor assigned to it. `carry_left` is the hauler capacity not yet
/// claimed by nodes earlier in the active order.
pub fn assess_node(info: &ResourceNodeInfo, reserve: bool, level: u8, carry_left: f32, pad_threshold: u32) -> NodeLabor {
    let energy_per_tick = if info.owned { info.energy_per_tick } else { remote_energy_per_tick(info, reserve) };

    let max_harvest_power = max_harvest_power(energy_per_tick, info.room_type, info.constructed);
    let miner_ratio = (info.runtime.harvest_power as f32 / energy_per_tick).clamp(0.0, 1.0);

    let (max_carry, net_income) = if info.owned {
        let options = LocalNodeOptions {
            constructed: info.constructed,
            linked: info.linked,
            level,
        };

        let carry = if info.linked { 0.0 } else { required_carry(info, energy_per_tick, true) };

        (carry, local_node_income(info, &options))
    } else {
        let options = RemoteNodeOptions {
            reserve,
            constructed: info.constructed,
            level,
        };

        let carry = if info.constructing {
            0.0
        } else if info.runtime.pending_energy >= pad_threshold as i32 {
            required_carry(info, energy_per_tick, false) + BACKLOG_CARRY_PAD
        } else {
            required_carry(info, energy_per_tick, false)
        };

        (carry, remote_node_income(info, &options))
    };

    let hauler_ratio = if max_carry > 0.0 { (carry_left / max_carry).clamp(0.0, 1.0) } else { 1.0 };

    NodeLabor {
        energy_per_tick,
        max_harvest_power,
        miner_ratio,
        max_carry,
        hauler_ratio,
        net_income,
    }
}

/// Worker a node asks for.
#[derive(Clone, Debug, PartialEq)]
pub enum WorkerDemand {
    Reserver { room: RoomName, reserve_power: u32 },
    Miner { node: NodeId, max_work: u32, urgent: bool },
    Hauler { urgent: bool },
}

/// The single most pressing worker for a node, or `None` when it is fully covered. Reservers
/// come first, then a missing miner or hauler, then topping up whichever side lags.
pub fn worker_demand(info: &ResourceNodeInfo, remote: Option<&RemoteRuntime>, labor: &NodeLabor) -> Option<WorkerDemand> {
    if let Some(remote) = remote.filter(|r| r.spawn_reserver) {
        return Some(WorkerDemand::Reserver {
            room: info.room_name(),
            reserve_power: remote.reserve_power,
        });
    }

    if labor.miner_ratio >= 1.0 && labor.hauler_ratio >= 1.0 && !info.constructing {
        return None;
    }

    let miner = |urgent| WorkerDemand::Miner {
        node: info.id.clone(),
        max_work: max_work_parts(labor.max_harvest_power),
        urgent,
    };

    if labor.miner_ratio == 0.0 {
        return Some(miner(info.owned));
    }

    if labor.hauler_ratio == 0.0 {
        return Some(WorkerDemand::Hauler { urgent: info.owned });
    }

    if labor.miner_ratio < 1.0 && info.runtime.num_miner < info.num_open as u32 {
        return Some(miner(false));
    }

    if labor.hauler_ratio < labor.miner_ratio {
        return Some(WorkerDemand::Hauler { urgent: false });
    }

    None
}

/// Reservation state of a normal remote for this tick.
pub fn update_reservation(remote: &mut RemoteInfo, reservation_ticks: i32, threshold: u32) {
    let runtime = &mut remote.runtime;

    runtime.spawn_reserver = reservation_ticks <= threshold as i32
        && runtime.reserve_power < super::bodies::RESERVE_POWER_MAX
        && runtime.num_reserver < remote.controller_num_open as u32;

    runtime.reserve = reservation_ticks > 0 || runtime.reserve_power > 0;
}

/// Upkeep of a remote's reservers or escorts, charged once per room.
pub fn remote_upkeep(room_type: RoomType) -> f32 {
    if room_type == RoomType::Normal {
        RESERVER_COST as f32 / (CREEP_CLAIM_LIFE_TIME - RESERVER_TRAVEL_TICKS) as f32
    } else if room_type.requires_escort() {
        KEEPER_KILLER_COST as f32 / (CREEP_LIFE_TIME - KEEPER_KILLER_TRAVEL_TICKS) as f32
    } else {
        0.0
    }
}

/// Summary of a territory's economy after the last accounting pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TerritoryEconomy {
    pub income: f32,
    pub max_income: f32,
    pub default_income: f32,
    pub spawn_usage_ratio: f32,
    pub active_nodes: usize,
    /// Carry capacity of live haulers.
    pub hauler_carry: u32,
    /// Carry capacity the active nodes need.
    pub hauler_carry_total: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::coord::*;

    fn node(id: &str, distance: u32, owned: bool) -> ResourceNodeInfo {
        let room: RoomName = if owned { "W1N1".parse().unwrap() } else { "W2N1".parse().unwrap() };

        ResourceNodeInfo {
            id: NodeId::new(id),
            pos: Position::new(room, Coord::new(10, 10).unwrap()),
            home_room: "W1N1".parse().unwrap(),
            room_type: RoomType::Normal,
            owned,
            distance,
            energy_per_tick: 10.0,
            num_open: 3,
            container_coord: Coord::new(11, 10),
            constructed: true,
            constructing: false,
            linked: false,
            road_coords: Vec::new(),
            intermediates: Vec::new(),
            max_income: 0.0,
            runtime: NodeRuntime {
                regeneration: ENERGY_REGEN_TIME,
                ..Default::default()
            },
        }
    }

    fn agent(role: AgentRole, ticks_to_live: Option<u32>, body: Vec<Part>) -> AgentView {
        AgentView {
            id: AgentId::new("x"),
            role,
            pos: Position::new("W1N1".parse().unwrap(), Coord::new(20, 20).unwrap()),
            ticks_to_live,
            body,
            energy: 0,
        }
    }

    #[test]
    fn liveness_thresholds() {
        let miner = agent(AgentRole::Miner, Some(50), vec![Part::Work; 10]);

        assert!(miner_is_productive(&miner, 19));
        assert!(!miner_is_productive(&miner, 20));

        let spawning = agent(AgentRole::Miner, None, vec![Part::Work; 10]);
        assert!(miner_is_productive(&spawning, 200));

        let reserver = agent(AgentRole::Reserver, Some(111), vec![Part::Claim, Part::Move]);
        assert!(escort_is_productive(&reserver, CREEP_CLAIM_LIFE_TIME, RESERVER_TRAVEL_TICKS));

        let late = agent(AgentRole::Reserver, Some(105), vec![Part::Claim, Part::Move]);
        assert!(!escort_is_productive(&late, CREEP_CLAIM_LIFE_TIME, RESERVER_TRAVEL_TICKS));
    }

    #[test]
    fn expected_delta_spans_regeneration() {
        let mut info = node("a", 50, false);
        info.runtime.harvest_power = 10;
        info.runtime.energy = 3000;
        info.runtime.regeneration = 100;

        assert_eq!(expected_energy_delta(&info), 500.0);

        info.runtime.regeneration = 20;
        info.runtime.energy = 100;

        assert_eq!(expected_energy_delta(&info), 100.0 + 10.0 * 30.0);
    }

    #[test]
    fn hauler_goes_to_nearest_stocked_node() {
        let mut near = node("near", 20, false);
        near.runtime.pending_energy = 10;

        let mut far = node("far", 60, false);
        far.runtime.pending_energy = 400;

        let mut nearer_but_empty = node("empty", 10, false);
        nearer_but_empty.runtime.pending_energy = -200;

        let nodes = vec![far, near, nearer_but_empty];

        assert_eq!(select_node_for_hauler(&nodes, 1000, 300), Some(0));

        let mut stocked = nodes.clone();
        stocked[1].runtime.pending_energy = 200;
        assert_eq!(select_node_for_hauler(&stocked, 1000, 300), Some(1));

        assert_eq!(select_node_for_hauler(&stocked, 60, 300), None);
    }

    #[test]
    fn uncovered_owned_node_asks_for_urgent_miner() {
        let info = node("a", 20, true);
        let labor = assess_node(&info, true, 4, 1000.0, 2000);

        assert_eq!(labor.miner_ratio, 0.0);
        assert_eq!(labor.hauler_ratio, 1.0);
        assert_eq!(labor.earned(&info), 0.0);

        match worker_demand(&info, None, &labor) {
            Some(WorkerDemand::Miner { urgent, max_work, .. }) => {
                assert!(urgent);
                assert_eq!(max_work, 6);
            }
            other => panic!("unexpected demand {:?}", other),
        }
    }

    #[test]
    fn missing_haulers_come_before_extra_miners() {
        let mut info = node("a", 40, false);
        info.runtime.harvest_power = 6;
        info.runtime.num_miner = 1;

        let labor = assess_node(&info, true, 8, 0.0, 2000);
        assert_eq!(worker_demand(&info, None, &labor), Some(WorkerDemand::Hauler { urgent: false }));

        let covered = assess_node(&info, true, 8, 10000.0, 2000);
        assert!(matches!(worker_demand(&info, None, &covered), Some(WorkerDemand::Miner { urgent: false, .. })));

        info.runtime.num_miner = 3;
        assert_eq!(worker_demand(&info, None, &covered), None);
    }

    #[test]
    fn reserver_preempts_other_demand() {
        let info = node("a", 40, false);
        let labor = assess_node(&info, false, 8, 0.0, 2000);

        let runtime = RemoteRuntime {
            spawn_reserver: true,
            reserve_power: 1,
            ..Default::default()
        };

        assert_eq!(
            worker_demand(&info, Some(&runtime), &labor),
            Some(WorkerDemand::Reserver {
                room: info.room_name(),
                reserve_power: 1
            })
        );
    }

    #[test]
    fn unreserved_remote_halves_output_and_backlog_pads_carry() {
        let mut info = node("a", 40, false);

        let reserved = assess_node(&info, true, 8, 0.0, 2000);
        let unreserved = assess_node(&info, false, 8, 0.0, 2000);

        assert_eq!(unreserved.energy_per_tick, 5.0);
        assert!(unreserved.max_carry < reserved.max_carry);

        info.runtime.pending_energy = 2500;
        let padded = assess_node(&info, true, 8, 0.0, 2000);

        assert_eq!(padded.max_carry, reserved.max_carry + 500.0);
    }

    #[test]
    fn reservation_state() {
        let mut remote = RemoteInfo::new("W2N1".parse().unwrap());
        remote.controller_num_open = 2;

        update_reservation(&mut remote, 0, 1000);
        assert!(remote.runtime.spawn_reserver);
        assert!(!remote.runtime.reserve);

        remote.runtime.reserve_power = 2;
        update_reservation(&mut remote, 3000, 1000);
        assert!(!remote.runtime.spawn_reserver);
        assert!(remote.runtime.reserve);

        remote.runtime.reserve_power = 0;
        remote.runtime.num_reserver = 2;
        update_reservation(&mut remote, -500, 1000);
        assert!(!remote.runtime.spawn_reserver);
        assert!(!remote.runtime.reserve);
    }
}
