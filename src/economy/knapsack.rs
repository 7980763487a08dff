//! Remote selection as a 0/1 knapsack over labor units. Each room contributes one candidate per
//! prefix of its nodes (sorted by distance), so picking a room means picking how deep to mine
//! it. A room's candidates exclude each other, and a candidate whose route crosses other rooms
//! is only accepted on top of a cell that already holds those rooms.

use crate::error::*;
use crate::room::data::*;
use crate::room::name::*;
use std::cmp::Ordering;

#[derive(Clone, Debug, PartialEq)]
pub struct RemoteCandidate {
    pub room: RoomName,
    pub node_ids: Vec<NodeId>,
    pub value: f32,
    pub weight: f32,
    pub intermediates: Vec<RoomName>,
}

impl RemoteCandidate {
    pub fn density(&self) -> f32 {
        if self.weight > 0.0 {
            self.value / self.weight
        } else {
            f32::INFINITY
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RemoteSelection {
    /// Indices into the candidate list, densest first.
    pub selected: Vec<usize>,
    pub value: f32,
    /// Labor units used, in the same discretization as the capacity.
    pub weight: u32,
}

/// Picks the candidates maximizing total value within `capacity` labor units. Weights are
/// rounded up to whole units. Equal best values keep the smallest weight found first.
pub fn select_remotes(candidates: &[RemoteCandidate], capacity: i64) -> EngineResult<RemoteSelection> {
    if let Some(bad) = candidates.iter().find(|c| c.weight < 0.0 || !c.weight.is_finite()) {
        return Err(EngineError::InvalidInput(format!("remote {} has weight {}", bad.room, bad.weight)));
    }

    if capacity <= 0 {
        return Ok(RemoteSelection::default());
    }

    // No selection weighs more than every candidate that fits on its own.
    let total_weight = candidates
        .iter()
        .map(|c| c.weight.ceil() as u64)
        .filter(|weight| *weight <= capacity as u64)
        .fold(0u64, |total, weight| total.saturating_add(weight));
    let capacity = (capacity as u64).min(total_weight) as usize;

    let mut table = vec![0.0f32; capacity + 1];
    let mut cells: Vec<Vec<usize>> = vec![Vec::new(); capacity + 1];

    for (index, candidate) in candidates.iter().enumerate() {
        // Saturating cast, so oversized weights land above the capacity.
        let weight = candidate.weight.ceil() as usize;
        let value = candidate.value;

        if weight > capacity {
            continue;
        }

        for j in (0..=capacity).rev() {
            let next = match j.checked_add(weight) {
                Some(next) if next <= capacity => next,
                _ => continue,
            };

            if cells[j].is_empty() {
                continue;
            }

            let cell = &cells[j];

            if cell.iter().any(|i| candidates[*i].room == candidate.room) {
                continue;
            }

            let satisfied = candidate
                .intermediates
                .iter()
                .all(|room| cell.iter().any(|i| candidates[*i].room == *room));

            if !satisfied {
                continue;
            }

            if table[j] + value > table[next] {
                let mut merged = cell.clone();
                merged.push(index);

                table[next] = table[j] + value;
                cells[next] = merged;
            }
        }

        if !candidate.intermediates.is_empty() {
            continue;
        }

        if value > table[weight] {
            table[weight] = value;
            cells[weight] = vec![index];
        }
    }

    let mut best = RemoteSelection::default();

    for (weight, value) in table.iter().enumerate() {
        if *value > best.value {
            best.value = *value;
            best.weight = weight as u32;
            best.selected = cells[weight].clone();
        }
    }

    best.selected.sort_by(|a, b| candidates[*b].density().partial_cmp(&candidates[*a].density()).unwrap_or(Ordering::Equal));

    Ok(best)
}
