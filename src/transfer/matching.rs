//! Deferred acceptance between fill requests and loaded haulers.

use super::requests::*;
use crate::algorithms::minheap::*;
use crate::creep::*;
use crate::room::name::*;

#[derive(Clone, Debug)]
pub struct HaulerCandidate {
    pub id: AgentId,
    pub pos: Position,
    /// Energy carried right now.
    pub amount: u32,
    pub is_porter: bool,
    pub ticks_to_live: u32,
}

#[derive(Clone, Debug, Default)]
pub struct MatchResult {
    /// Request index per hauler, in hauler order.
    pub assignments: Vec<Option<usize>>,
    pub proposals: u32,
}

impl MatchResult {
    pub fn assigned_to(&self, hauler: usize) -> Option<usize> {
        self.assignments.get(hauler).copied().flatten()
    }
}

#[derive(Copy, Clone, Debug)]
pub struct MatchingLimits {
    pub porter_priority_threshold: u32,
    pub porter_min_ticks_to_live: u32,
}

impl MatchingLimits {
    pub fn is_eligible(&self, hauler: &HaulerCandidate, request: &TransportRequest) -> bool {
        !(hauler.is_porter && hauler.ticks_to_live >= self.porter_min_ticks_to_live && request.priority >= self.porter_priority_threshold)
    }
}

fn range(a: &Position, b: &Position) -> u32 {
    a.world_range_to(b)
}

/// Assigns haulers to requests. Each request proposes to its candidates nearest first and a
/// hauler only trades up: to a strictly more urgent request, or an equally urgent one that is
/// strictly closer. A request never proposes to the same hauler twice, so the number of
/// proposals is bounded by requests times haulers.
pub fn match_haulers(requests: &mut [TransportRequest], haulers: &[HaulerCandidate], limits: &MatchingLimits) -> MatchResult {
    let key = |entry: &(u32, usize)| *entry;

    let mut pools: Vec<KeyedMinHeap<(u32, usize), _>> = requests
        .iter()
        .map(|request| {
            let eligible = haulers
                .iter()
                .enumerate()
                .filter(|(_, hauler)| limits.is_eligible(hauler, request))
                .map(|(index, hauler)| (range(&request.pos, &hauler.pos), index));

            KeyedMinHeap::from_items(eligible, key)
        })
        .collect();

    let mut result = MatchResult {
        assignments: vec![None; haulers.len()],
        proposals: 0,
    };

    loop {
        let free: Vec<usize> = (0..requests.len())
            .filter(|index| requests[*index].is_open() && !pools[*index].is_empty())
            .collect();

        if free.is_empty() {
            break;
        }

        for request_index in free {
            let Some((distance, hauler_index)) = pools[request_index].remove_min() else {
                continue;
            };

            result.proposals += 1;

            let hauler = &haulers[hauler_index];

            let Some(before_index) = result.assignments[hauler_index] else {
                requests[request_index].claim(hauler.amount, distance);
                result.assignments[hauler_index] = Some(request_index);

                continue;
            };

            let before = &requests[before_index];
            let request = &requests[request_index];

            if before.priority < request.priority {
                continue;
            }

            let before_distance = range(&hauler.pos, &before.pos);

            if before.priority == request.priority && before_distance <= distance {
                continue;
            }

            requests[before_index].release(hauler.amount, before_distance);
            requests[request_index].claim(hauler.amount, distance);
            result.assignments[hauler_index] = Some(request_index);
        }
    }

    result
}
