//! Game constants the economic model depends on.

pub const ROOM_SIZE: u8 = 50;
pub const ROOM_AREA: usize = ROOM_SIZE as usize * ROOM_SIZE as usize;

pub const CREEP_LIFE_TIME: u32 = 1500;
pub const CREEP_CLAIM_LIFE_TIME: u32 = 600;
pub const CREEP_SPAWN_TIME: u32 = 3;
pub const MAX_CREEP_SIZE: u32 = 50;

pub const ENERGY_REGEN_TIME: u32 = 300;
pub const SOURCE_ENERGY_CAPACITY: u32 = 3000;
pub const SOURCE_ENERGY_NEUTRAL_CAPACITY: u32 = 1500;
pub const SOURCE_ENERGY_KEEPER_CAPACITY: u32 = 4000;

pub const CARRY_CAPACITY: u32 = 50;
pub const HARVEST_POWER: u32 = 2;

pub const REPAIR_COST: f32 = 0.01;
pub const CONTAINER_DECAY: f32 = 5000.0;
pub const CONTAINER_DECAY_TIME: f32 = 100.0;
pub const CONTAINER_DECAY_TIME_OWNED: f32 = 500.0;

/// Energy lost per tick keeping a remote container repaired.
pub const CONTAINER_REPAIR_LOSS: f32 = REPAIR_COST * CONTAINER_DECAY / CONTAINER_DECAY_TIME;
/// Energy lost per tick keeping a container in an owned room repaired.
pub const CONTAINER_REPAIR_LOSS_OWNED: f32 = REPAIR_COST * CONTAINER_DECAY / CONTAINER_DECAY_TIME_OWNED;

/// Energy per regeneration window recovered from slain keepers around a node.
pub const KEEPER_DROP_ENERGY: u32 = 630;

/// CLAIM + MOVE.
pub const RESERVER_COST: u32 = 650;
/// Energy capacity that affords bodies sized for built containers and roads.
pub const REMOTE_BUILDER_COST: u32 = 750;

/// 25 MOVE, 19 ATTACK, 6 HEAL.
pub const KEEPER_KILLER_COST: u32 = 4270;

/// Ticks a reserver spends walking before it starts to work.
pub const RESERVER_TRAVEL_TICKS: u32 = 100;

/// Ticks the keeper killer needs to reach its post.
pub const KEEPER_KILLER_TRAVEL_TICKS: u32 = 100;

/// Cost value marking a tile as impassable.
pub const BLOCKED_COST: u8 = 255;
