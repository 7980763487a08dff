use crate::config::*;
use crate::creep::*;
use crate::room::name::*;
use bitflags::*;
use serde::{Deserialize, Serialize};
use std::borrow::*;
use std::fmt;

/// Identity of something that can receive energy.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TargetId {
    #[serde(rename = "s")]
    Structure(String),
    #[serde(rename = "a")]
    Agent(AgentId),
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetId::Structure(id) => write!(f, "structure {}", id),
            TargetId::Agent(id) => write!(f, "agent {}", id),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FillKind {
    Extension = 0,
    Spawn = 1,
    Lab = 2,
    Tower = 3,
    Builder = 4,
    Container = 5,
    Upgrader = 6,
    Terminal = 7,
    Factory = 8,
    Nuker = 9,
    Storage = 10,
}

/// Priorities are kept in half steps so consumers can be boosted by half a step.
pub const PRIORITY_STEP: u32 = 2;

impl FillKind {
    /// Lower is more urgent.
    pub fn priority(self) -> u32 {
        let table = match self {
            FillKind::Extension | FillKind::Spawn | FillKind::Lab | FillKind::Tower => 1,
            FillKind::Builder => 2,
            FillKind::Container => 3,
            FillKind::Upgrader => 4,
            FillKind::Terminal => 5,
            FillKind::Factory => 6,
            FillKind::Nuker => 7,
            FillKind::Storage => 8,
        };

        table * PRIORITY_STEP
    }

    pub fn is_agent(self) -> bool {
        FillKindFlags::AGENTS.contains(self.into())
    }
}

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct FillKindFlags: u16 {
        const UNSET = 0;

        const EXTENSION = 1u16 << (FillKind::Extension as u8);
        const SPAWN = 1u16 << (FillKind::Spawn as u8);
        const LAB = 1u16 << (FillKind::Lab as u8);
        const TOWER = 1u16 << (FillKind::Tower as u8);
        const BUILDER = 1u16 << (FillKind::Builder as u8);
        const CONTAINER = 1u16 << (FillKind::Container as u8);
        const UPGRADER = 1u16 << (FillKind::Upgrader as u8);
        const TERMINAL = 1u16 << (FillKind::Terminal as u8);
        const FACTORY = 1u16 << (FillKind::Factory as u8);
        const NUKER = 1u16 << (FillKind::Nuker as u8);
        const STORAGE = 1u16 << (FillKind::Storage as u8);

        /// Only requested while the spawn energy pool is not full.
        const SPAWN_ENERGY = Self::EXTENSION.bits() | Self::SPAWN.bits();
        const AGENTS = Self::BUILDER.bits() | Self::UPGRADER.bits();
        const ALL = (1u16 << 11) - 1;
    }
}

impl<T> From<T> for FillKindFlags
where
    T: Borrow<FillKind>,
{
    fn from(kind: T) -> FillKindFlags {
        FillKindFlags::from_bits_truncate(1u16 << (*kind.borrow() as u8))
    }
}

/// Something the host reports as able to take energy this tick.
#[derive(Clone, Debug)]
pub struct FillTarget {
    pub id: TargetId,
    pub kind: FillKind,
    pub pos: Position,
    pub free_capacity: u32,
    pub capacity: u32,
    /// Energy the target spends per tick while working.
    pub use_rate: f32,
}

#[derive(Clone, Debug)]
pub struct TransportRequest {
    pub target: TargetId,
    pub kind: FillKind,
    pub pos: Position,
    pub priority: u32,
    pub requested_amount: u32,
    /// Still unclaimed. Goes negative when a hauler brings more than needed.
    pub amount: f32,
    pub use_rate: Option<f32>,
}

impl TransportRequest {
    pub fn from_target(target: &FillTarget, config: &TransportConfig) -> TransportRequest {
        let mut priority = target.kind.priority();
        let mut use_rate = None;

        if target.kind.is_agent() && target.capacity > 0 && target.free_capacity as f32 / target.capacity as f32 > config.near_empty_ratio {
            priority -= PRIORITY_STEP / 2;
            use_rate = Some(target.use_rate.max(0.0));
        }

        TransportRequest {
            target: target.id.clone(),
            kind: target.kind,
            pos: target.pos,
            priority,
            requested_amount: target.free_capacity,
            amount: target.free_capacity as f32,
            use_rate,
        }
    }

    /// Claims `payload` for a hauler `range` tiles away.
    pub fn claim(&mut self, payload: u32, range: u32) {
        self.amount -= payload as f32;

        if let Some(rate) = self.use_rate {
            self.amount += rate * range as f32;
        }
    }

    /// Undoes `claim` when the hauler is taken by a better request.
    pub fn release(&mut self, payload: u32, range: u32) {
        self.amount += payload as f32;

        if let Some(rate) = self.use_rate {
            self.amount -= rate * range as f32;
        }
    }

    pub fn is_open(&self) -> bool {
        self.amount > 0.0
    }
}

pub fn fill_threshold(kind: FillKind, config: &TransportConfig) -> u32 {
    match kind {
        FillKind::Tower => config.tower_threshold,
        FillKind::Lab => config.lab_threshold,
        _ => 0,
    }
}

/// Turns host fill targets into this tick's requests. Structures must be missing more than their
/// threshold; consuming agents always get a request.
pub fn build_requests(targets: &[FillTarget], spawn_energy_full: bool, config: &TransportConfig) -> Vec<TransportRequest> {
    let skipped = if spawn_energy_full {
        FillKindFlags::SPAWN_ENERGY
    } else {
        FillKindFlags::UNSET
    };

    targets
        .iter()
        .filter(|target| !skipped.intersects(target.kind.into()))
        .filter(|target| target.kind.is_agent() || target.free_capacity > fill_threshold(target.kind, config))
        .map(|target| TransportRequest::from_target(target, config))
        .collect()
}

/// Porters keep away from requests at or past this priority.
pub fn porter_priority_threshold(has_storage: bool) -> u32 {
    if has_storage {
        FillKind::Storage.priority()
    } else {
        FillKind::Container.priority()
    }
}
