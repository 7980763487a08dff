//! Body layouts for the roles the economy spawns.

use crate::constants::*;
use crate::creep::*;
use std::iter::repeat;

struct BodyCounts {
    work: u32,
    carry: u32,
    moves: u32,
    cost: u32,
}

impl BodyCounts {
    fn parts(&self) -> u32 {
        self.work + self.carry + self.moves
    }

    fn can_add(&self, energy: u32, part: Part) -> bool {
        energy >= self.cost + part.cost()
    }

    fn add(&mut self, part: Part) {
        match part {
            Part::Work => self.work += 1,
            Part::Carry => self.carry += 1,
            Part::Move => self.moves += 1,
            _ => return,
        }

        self.cost += part.cost();
    }
}

fn layout(sections: &[(Part, u32)]) -> Vec<Part> {
    sections.iter().flat_map(|(part, count)| repeat(*part).take(*count as usize)).collect()
}

/// Static harvester. Gets five work parts first, then enough move to walk, one carry to
/// repair its container, and extra work up to `max_work`.
pub fn miner_body(energy: u32, max_work: u32, need_carry: bool) -> Vec<Part> {
    let mut counts = BodyCounts {
        work: 0,
        carry: 0,
        moves: 1,
        cost: Part::Move.cost(),
    };

    if need_carry {
        counts.add(Part::Carry);
    }

    while counts.cost < energy && counts.parts() < MAX_CREEP_SIZE {
        if counts.work < 5 && counts.work < max_work && counts.can_add(energy, Part::Work) {
            counts.add(Part::Work);
            continue;
        }

        if counts.work > 2 * counts.moves && counts.can_add(energy, Part::Move) {
            counts.add(Part::Move);
            continue;
        }

        if counts.work >= 5 && counts.carry < 1 && counts.can_add(energy, Part::Carry) {
            counts.add(Part::Carry);
            continue;
        }

        if max_work > 0 && counts.work >= max_work {
            break;
        }

        if counts.can_add(energy, Part::Work) {
            counts.add(Part::Work);
            continue;
        }

        break;
    }

    if counts.work == 0 {
        return Vec::new();
    }

    layout(&[
        (Part::Work, counts.work - 1),
        (Part::Carry, counts.carry),
        (Part::Move, counts.moves),
        (Part::Work, 1),
    ])
}

/// Carry and move pairs, or two carries per move when roads are built.
pub fn hauler_body(energy: u32, for_road: bool) -> Vec<Part> {
    let (segment, segment_cost, max_segments): (&[Part], u32, u32) = if for_road {
        (&[Part::Carry, Part::Carry, Part::Move], 150, 16)
    } else {
        (&[Part::Carry, Part::Move], 100, 25)
    };

    let segments = (energy / segment_cost).min(max_segments) as usize;

    segment.iter().copied().cycle().take(segment.len() * segments).collect()
}

/// Porters only walk inside the base, always on roads.
pub fn porter_body(energy: u32) -> Vec<Part> {
    hauler_body(energy, true)
}

pub const RESERVE_POWER_MAX: u32 = 3;

pub fn reserver_body(energy_capacity: u32, reserve_power: u32) -> Vec<Part> {
    let claims = RESERVE_POWER_MAX.saturating_sub(reserve_power).min(energy_capacity / RESERVER_COST);

    repeat([Part::Claim, Part::Move]).take(claims as usize).flatten().collect()
}

pub fn keeper_killer_body() -> Vec<Part> {
    layout(&[(Part::Move, 25), (Part::Attack, 18), (Part::Heal, 5), (Part::Attack, 1), (Part::Heal, 1)])
}
