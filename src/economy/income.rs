//! Per node income and labor models. Labor is measured in body parts kept alive, so a spawn
//! supports `CREEP_LIFE_TIME / CREEP_SPAWN_TIME` units.

use super::bodies::*;
use crate::constants::*;
use crate::room::data::*;
use crate::room::name::*;

/// Share of a node's hauling labor per tile of distance and unit of energy per tick.
const HAUL_FACTOR: f32 = 0.04;

/// Labor units the controller upgraders burn per unit of net income.
const UPGRADE_LABOR_FACTOR: f32 = 1.4;

/// Energy cost of a 6 work, 3 carry, 1 move (or 5 work, 5 move, 1 carry) miner.
const LOCAL_MINER_COST: f32 = 800.0;

/// Labor units of a local miner.
const LOCAL_MINER_PARTS: f32 = 12.0;

const FULL_LEVEL: u8 = 8;

#[derive(Copy, Clone, Debug, Default)]
pub struct LocalNodeOptions {
    pub constructed: bool,
    pub linked: bool,
    pub level: u8,
}

#[derive(Copy, Clone, Debug, Default)]
pub struct RemoteNodeOptions {
    pub reserve: bool,
    pub constructed: bool,
    pub level: u8,
}

fn working_ticks(distance: u32) -> f32 {
    CREEP_LIFE_TIME.saturating_sub(distance).max(1) as f32
}

fn upgrade_labor(net_income: f32, level: u8) -> f32 {
    if level < FULL_LEVEL {
        net_income * UPGRADE_LABOR_FACTOR
    } else {
        0.0
    }
}

/// Harvest power needed to drain a node before it regenerates.
pub fn max_harvest_power(energy_per_tick: f32, room_type: RoomType, constructed: bool) -> f32 {
    let extra = if room_type.requires_escort() {
        6.0
    } else if constructed {
        1.0
    } else {
        0.0
    };

    energy_per_tick + extra
}

pub fn max_work_parts(max_harvest_power: f32) -> u32 {
    (max_harvest_power / HARVEST_POWER as f32).ceil() as u32
}

pub fn local_node_income(info: &ResourceNodeInfo, options: &LocalNodeOptions) -> f32 {
    let energy_per_tick = info.energy_per_tick;

    let miner_cost = LOCAL_MINER_COST / working_ticks(info.distance);

    let hauler_cost = if options.linked {
        0.0
    } else {
        let part_cost = if options.constructed { 75.0 } else { 100.0 };

        energy_per_tick * info.distance as f32 * HAUL_FACTOR * part_cost / CREEP_LIFE_TIME as f32
    };

    let loss = if options.constructed { CONTAINER_REPAIR_LOSS_OWNED } else { 1.0 };

    energy_per_tick - miner_cost - hauler_cost - loss
}

pub fn local_node_spawn_usage(info: &ResourceNodeInfo, options: &LocalNodeOptions) -> f32 {
    let mut usage = LOCAL_MINER_PARTS;

    if !options.linked {
        let loss = if options.constructed { CONTAINER_REPAIR_LOSS_OWNED } else { 1.0 };
        let factor = if options.constructed { 1.5 } else { 2.0 };

        usage += info.distance as f32 * HAUL_FACTOR * (info.energy_per_tick - loss) * factor;
    }

    usage + upgrade_labor(local_node_income(info, options), options.level)
}

/// Energy per tick actually harvestable: unreserved normal rooms only regenerate half.
pub fn remote_energy_per_tick(info: &ResourceNodeInfo, reserve: bool) -> f32 {
    if info.room_type == RoomType::Normal && !reserve {
        info.energy_per_tick * 0.5
    } else {
        info.energy_per_tick
    }
}

pub fn remote_node_income(info: &ResourceNodeInfo, options: &RemoteNodeOptions) -> f32 {
    let income = remote_energy_per_tick(info, options.reserve);

    let harvest_power = max_harvest_power(income, info.room_type, options.constructed);
    let miner_part_cost = if options.constructed { 70.0 } else { 80.0 };
    let miner_cost = harvest_power * miner_part_cost / working_ticks(info.distance);

    let hauler_part_cost = if options.constructed { 75.0 } else { 100.0 };
    let hauler_cost = info.distance as f32 * income * HAUL_FACTOR * hauler_part_cost / CREEP_LIFE_TIME as f32;

    let loss = if options.constructed { CONTAINER_REPAIR_LOSS } else { 1.0 };

    income - miner_cost - hauler_cost - loss
}

pub fn remote_node_spawn_usage(info: &ResourceNodeInfo, options: &RemoteNodeOptions) -> f32 {
    let energy_per_tick = remote_energy_per_tick(info, options.reserve);

    let harvest_power = max_harvest_power(energy_per_tick, info.room_type, options.constructed);
    let miner_parts = miner_body(10000, max_work_parts(harvest_power), false).len() as f32;

    let factor = if options.constructed { 1.5 } else { 2.0 };
    let hauler_usage = energy_per_tick * info.distance as f32 * HAUL_FACTOR * factor;

    miner_parts + hauler_usage + upgrade_labor(remote_node_income(info, options), options.level)
}

/// Carry capacity needed to keep up with a node: a round trip of `distance` tiles per load.
pub fn required_carry(info: &ResourceNodeInfo, energy_per_tick: f32, owned: bool) -> f32 {
    let loss = match (info.constructed, owned) {
        (true, true) => CONTAINER_REPAIR_LOSS_OWNED,
        (true, false) => CONTAINER_REPAIR_LOSS,
        (false, _) => 1.0,
    };

    2.0 * info.distance as f32 * (energy_per_tick - loss)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::coord::*;

    fn info(room_type: RoomType, distance: u32, energy_per_tick: f32) -> ResourceNodeInfo {
        let room: RoomName = "W2N1".parse().unwrap();

        ResourceNodeInfo {
            id: NodeId::new("n"),
            pos: Position::new(room, Coord::new(10, 10).unwrap()),
            home_room: "W1N1".parse().unwrap(),
            room_type,
            owned: false,
            distance,
            energy_per_tick,
            num_open: 2,
            container_coord: None,
            constructed: false,
            constructing: false,
            linked: false,
            road_coords: Vec::new(),
            intermediates: Vec::new(),
            max_income: 0.0,
            runtime: NodeRuntime::default(),
        }
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn local_income_of_linked_node() {
        let node = info(RoomType::Normal, 20, 10.0);
        let options = LocalNodeOptions {
            constructed: true,
            linked: true,
            level: 8,
        };

        let expected = 10.0 - 800.0 / 1480.0 - CONTAINER_REPAIR_LOSS_OWNED;

        assert!(close(local_node_income(&node, &options), expected));
        assert!(close(local_node_spawn_usage(&node, &options), 12.0));
    }

    #[test]
    fn local_usage_includes_haulers_and_upgraders() {
        let node = info(RoomType::Normal, 25, 10.0);
        let options = LocalNodeOptions {
            constructed: false,
            linked: false,
            level: 3,
        };

        let income = local_node_income(&node, &options);
        let expected = 12.0 + 25.0 * 0.04 * 9.0 * 2.0 + income * 1.4;

        assert!(close(local_node_spawn_usage(&node, &options), expected));
    }

    #[test]
    fn unreserved_remote_earns_half() {
        let node = info(RoomType::Normal, 60, 10.0);

        let reserved = remote_node_income(
            &node,
            &RemoteNodeOptions {
                reserve: true,
                constructed: true,
                level: 8,
            },
        );

        let unreserved = remote_node_income(
            &node,
            &RemoteNodeOptions {
                reserve: false,
                constructed: true,
                level: 8,
            },
        );

        let expected_reserved = 10.0 - 11.0 * 70.0 / 1440.0 - 60.0 * 10.0 * 0.04 * 75.0 / 1500.0 - CONTAINER_REPAIR_LOSS;

        assert!(close(reserved, expected_reserved));
        assert!(unreserved < reserved);
    }

    #[test]
    fn remote_usage_counts_miner_parts() {
        let node = info(RoomType::Normal, 50, 10.0);
        let options = RemoteNodeOptions {
            reserve: true,
            constructed: true,
            level: 8,
        };

        let expected = 10.0 + 10.0 * 50.0 * 0.04 * 1.5;

        assert!(close(remote_node_spawn_usage(&node, &options), expected));
    }

    #[test]
    fn keeper_nodes_need_extra_harvest_power() {
        assert_eq!(max_harvest_power(10.0, RoomType::Normal, false), 10.0);
        assert_eq!(max_harvest_power(10.0, RoomType::Normal, true), 11.0);
        assert_eq!(max_harvest_power(15.0, RoomType::Keeper, false), 21.0);
        assert_eq!(max_work_parts(11.0), 6);
    }
}
