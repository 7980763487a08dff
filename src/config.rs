use crate::error::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    pub plain_cost: u8,
    pub swamp_cost: u8,
    pub max_rooms: u32,
    pub max_ops_per_room: u32,
    pub heuristic_weight: f32,
    pub repath_if_stuck: u32,
}

impl Default for MovementConfig {
    fn default() -> MovementConfig {
        MovementConfig {
            plain_cost: 2,
            swamp_cost: 10,
            max_rooms: 30,
            max_ops_per_room: 2000,
            heuristic_weight: 1.1,
            repath_if_stuck: 5,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub max_remote_distance: u32,
    pub max_remote_room_distance: u32,
    pub reservation_tick_threshold: u32,
    pub route_plain_cost: u8,
    pub route_swamp_cost: u8,
    pub route_road_cost: u8,
    pub route_avoid_cost: u8,
    pub route_max_ops: u32,
    /// Ticks before a room whose nodes failed to route is planned again.
    pub route_retry_ticks: u32,
}

impl Default for RemoteConfig {
    fn default() -> RemoteConfig {
        RemoteConfig {
            max_remote_distance: 200,
            max_remote_room_distance: 3,
            reservation_tick_threshold: 1000,
            route_plain_cost: 5,
            route_swamp_cost: 6,
            route_road_cost: 4,
            route_avoid_cost: 50,
            route_max_ops: 20000,
            route_retry_ticks: 500,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Chance per access that a memoized cost grid is rebuilt.
    pub cost_matrix_refresh_chance: f64,
    /// Chance per tick that a cached active source set is validated against its inputs.
    pub active_source_refresh_chance: f64,
}

impl Default for CacheConfig {
    fn default() -> CacheConfig {
        CacheConfig {
            cost_matrix_refresh_chance: 0.1,
            active_source_refresh_chance: 0.1,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub tower_threshold: u32,
    pub lab_threshold: u32,
    /// Porters with at least this much lifespan skip low priority requests.
    pub porter_min_ticks_to_live: u32,
    /// Free fraction above which a consuming agent is considered near empty.
    pub near_empty_ratio: f32,
}

impl Default for TransportConfig {
    fn default() -> TransportConfig {
        TransportConfig {
            tower_threshold: 400,
            lab_threshold: 500,
            porter_min_ticks_to_live: 20,
            near_empty_ratio: 0.5,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    pub queue_capacity: usize,
    pub balance_half_life: f32,
    /// Labor units per spawn held back from remote mining.
    pub remote_buffer_per_spawn: f32,
    /// Stored energy above which a node's hauler demand is padded.
    pub pending_energy_pad_threshold: u32,
}

impl Default for SpawnConfig {
    fn default() -> SpawnConfig {
        SpawnConfig {
            queue_capacity: 32,
            balance_half_life: 50.0,
            remote_buffer_per_spawn: 20.0,
            pending_energy_pad_threshold: 2000,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub movement: MovementConfig,
    pub remote: RemoteConfig,
    pub cache: CacheConfig,
    pub transport: TransportConfig,
    pub spawn: SpawnConfig,
}

impl EngineConfig {
    pub fn from_json(data: &str) -> EngineResult<EngineConfig> {
        serde_json::from_str(data).map_err(|e| EngineError::InvalidInput(e.to_string()))
    }
}
