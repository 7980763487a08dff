use super::minheap::*;
use crate::constants::*;
use crate::room::coord::*;

pub const UNREACHABLE: u32 = u32::MAX;

/// Multi-source weighted distance over a room. `cost` returns the price of stepping onto a tile;
/// `BLOCKED_COST` tiles are never entered. Origins are seeded at distance zero.
pub fn flood_fill<F>(origins: &[Coord], cost: F) -> Vec<u32>
where
    F: Fn(Coord) -> u8,
{
    let mut distances = vec![UNREACHABLE; ROOM_AREA];
    let mut heap = MinHeap::with_capacity(ROOM_AREA);

    for origin in origins {
        if distances[origin.index()] != 0 {
            distances[origin.index()] = 0;
            heap.insert_by((0u32, *origin), |e: &(u32, Coord)| e.0);
        }
    }

    while let Some((distance, coord)) = heap.remove_min_by(|e: &(u32, Coord)| e.0) {
        if distance > distances[coord.index()] {
            continue;
        }

        for neighbor in coord.neighbors() {
            let step = cost(neighbor);

            if step == BLOCKED_COST {
                continue;
            }

            let next = distance + step.max(1) as u32;

            if next < distances[neighbor.index()] {
                distances[neighbor.index()] = next;
                heap.insert_by((next, neighbor), |e: &(u32, Coord)| e.0);
            }
        }
    }

    distances
}

/// Orders `goals` by weighted path distance from the nearest origin. Unreachable goals are dropped.
pub fn sort_by_path<F>(origins: &[Coord], goals: &[Coord], cost: F) -> Vec<(Coord, u32)>
where
    F: Fn(Coord) -> u8,
{
    let distances = flood_fill(origins, cost);

    let mut result: Vec<_> = goals
        .iter()
        .map(|goal| (*goal, distances[goal.index()]))
        .filter(|(_, distance)| *distance != UNREACHABLE)
        .collect();

    result.sort_by_key(|(_, distance)| *distance);

    result
}
