use crate::constants::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tile coordinate local to a room, both axes in `0..50`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    #[serde(rename = "x")]
    x: u8,
    #[serde(rename = "y")]
    y: u8,
}

pub fn is_valid(x: i32, y: i32) -> bool {
    x >= 0 && y >= 0 && x < ROOM_SIZE as i32 && y < ROOM_SIZE as i32
}

impl Coord {
    pub fn new(x: u8, y: u8) -> Option<Coord> {
        if x < ROOM_SIZE && y < ROOM_SIZE {
            Some(Coord { x, y })
        } else {
            None
        }
    }

    pub fn checked(x: i32, y: i32) -> Option<Coord> {
        if is_valid(x, y) {
            Some(Coord { x: x as u8, y: y as u8 })
        } else {
            None
        }
    }

    pub fn x(&self) -> u8 {
        self.x
    }

    pub fn y(&self) -> u8 {
        self.y
    }

    /// Row-major index, `y * 50 + x`. Fits in 12 bits.
    pub fn pack(&self) -> u16 {
        self.y as u16 * ROOM_SIZE as u16 + self.x as u16
    }

    pub fn unpack(packed: u16) -> Option<Coord> {
        if (packed as usize) < ROOM_AREA {
            Some(Coord {
                x: (packed % ROOM_SIZE as u16) as u8,
                y: (packed / ROOM_SIZE as u16) as u8,
            })
        } else {
            None
        }
    }

    pub fn index(&self) -> usize {
        self.pack() as usize
    }

    /// Chebyshev distance.
    pub fn range_to(&self, other: Coord) -> u8 {
        let dx = (self.x as i16 - other.x as i16).unsigned_abs();
        let dy = (self.y as i16 - other.y as i16).unsigned_abs();

        dx.max(dy) as u8
    }

    pub fn is_edge(&self) -> bool {
        self.x == 0 || self.y == 0 || self.x == ROOM_SIZE - 1 || self.y == ROOM_SIZE - 1
    }

    pub fn range_to_edge(&self) -> u8 {
        let max = ROOM_SIZE - 1;

        self.x.min(self.y).min(max - self.x).min(max - self.y)
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Option<Coord> {
        Coord::checked(self.x as i32 + dx, self.y as i32 + dy)
    }

    pub fn step(&self, direction: Direction) -> Option<Coord> {
        let (dx, dy) = direction.delta();

        self.offset(dx, dy)
    }

    pub fn neighbors(self) -> impl Iterator<Item = Coord> {
        Direction::ALL.into_iter().filter_map(move |d| self.step(d))
    }

    /// Coordinates at exactly `range`, clipped to the room.
    pub fn ring(&self, range: u8) -> Vec<Coord> {
        if range == 0 {
            return vec![*self];
        }

        let r = range as i32;
        let (cx, cy) = (self.x as i32, self.y as i32);
        let mut result = Vec::new();

        for x in (cx - r)..=(cx + r) {
            for y in (cy - r)..=(cy + r) {
                if (x - cx).abs() == r || (y - cy).abs() == r {
                    if let Some(coord) = Coord::checked(x, y) {
                        result.push(coord);
                    }
                }
            }
        }

        result
    }

    /// Coordinates within `range` inclusive, clipped to the room.
    pub fn disc(&self, range: u8) -> Vec<Coord> {
        let r = range as i32;
        let (cx, cy) = (self.x as i32, self.y as i32);

        ((cx - r)..=(cx + r))
            .flat_map(|x| ((cy - r)..=(cy + r)).map(move |y| (x, y)))
            .filter_map(|(x, y)| Coord::checked(x, y))
            .collect()
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Top = 0,
    TopRight = 1,
    Right = 2,
    BottomRight = 3,
    Bottom = 4,
    BottomLeft = 5,
    Left = 6,
    TopLeft = 7,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::Top,
        Direction::TopRight,
        Direction::Right,
        Direction::BottomRight,
        Direction::Bottom,
        Direction::BottomLeft,
        Direction::Left,
        Direction::TopLeft,
    ];

    pub fn from_index(index: usize) -> Direction {
        Direction::ALL[index % 8]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn delta(self) -> (i32, i32) {
        NEIGHBORS_8[self as usize]
    }

    pub fn reverse(self) -> Direction {
        Direction::from_index(self as usize + 4)
    }
}

/// Offsets indexed by `Direction`.
pub const NEIGHBORS_8: [(i32, i32); 8] = [(0, -1), (1, -1), (1, 0), (1, 1), (0, 1), (-1, 1), (-1, 0), (-1, -1)];

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn coord(x: u8, y: u8) -> Coord {
        Coord::new(x, y).unwrap()
    }

    #[test]
    fn ring_is_clipped_at_corner() {
        let ring = coord(0, 0).ring(1);

        assert_eq!(ring.len(), 3);
        assert!(ring.iter().all(|c| c.range_to(coord(0, 0)) == 1));
    }

    #[test]
    fn disc_counts() {
        assert_eq!(coord(25, 25).disc(2).len(), 25);
        assert_eq!(coord(0, 25).disc(1).len(), 6);
        assert_eq!(coord(25, 25).ring(0), vec![coord(25, 25)]);
    }

    #[test]
    fn edge_tests() {
        assert!(coord(0, 10).is_edge());
        assert!(coord(10, 49).is_edge());
        assert!(!coord(1, 48).is_edge());
        assert_eq!(coord(3, 40).range_to_edge(), 3);
        assert_eq!(coord(45, 47).range_to_edge(), 2);
    }

    #[test]
    fn out_of_room_is_rejected() {
        assert!(Coord::new(50, 0).is_none());
        assert!(Coord::unpack(2500).is_none());
        assert_eq!(Coord::unpack(2499), Some(coord(49, 49)));
    }

    #[test]
    fn reverse_direction() {
        for direction in Direction::ALL.iter() {
            let (dx, dy) = direction.delta();
            let (rx, ry) = direction.reverse().delta();

            assert_eq!((dx + rx, dy + ry), (0, 0));
        }
    }

    proptest! {
        #[test]
        fn range_is_symmetric(ax in 0u8..50, ay in 0u8..50, bx in 0u8..50, by in 0u8..50) {
            let a = coord(ax, ay);
            let b = coord(bx, by);

            prop_assert_eq!(a.range_to(b), b.range_to(a));
        }

        #[test]
        fn pack_round_trips(x in 0u8..50, y in 0u8..50) {
            let c = coord(x, y);

            prop_assert!(c.pack() < 4096);
            prop_assert_eq!(Coord::unpack(c.pack()), Some(c));
        }

        #[test]
        fn ring_members_are_at_range(x in 0u8..50, y in 0u8..50, r in 0u8..6) {
            let c = coord(x, y);

            for other in c.ring(r) {
                prop_assert_eq!(c.range_to(other), r);
            }

            prop_assert_eq!(c.disc(r).len(), (0..=r).map(|i| c.ring(i).len()).sum::<usize>());
        }
    }
}
