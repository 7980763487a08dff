use super::coord::*;
use crate::constants::*;
use crate::error::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomType {
    #[serde(rename = "n")]
    Normal,
    #[serde(rename = "h")]
    Highway,
    #[serde(rename = "c")]
    Center,
    #[serde(rename = "k")]
    Keeper,
}

impl RoomType {
    /// Rooms whose nodes are only safe to harvest with a combat escort.
    pub fn requires_escort(self) -> bool {
        matches!(self, RoomType::Keeper | RoomType::Center)
    }

    /// Default weight of entering a room of this type during inter-room routing.
    pub fn route_cost(self) -> f32 {
        match self {
            RoomType::Highway => 1.0,
            RoomType::Normal => 1.1,
            RoomType::Center => 1.0,
            RoomType::Keeper => 2.0,
        }
    }

    pub fn node_energy_capacity(self, reserved: bool) -> u32 {
        match self {
            RoomType::Normal if reserved => SOURCE_ENERGY_CAPACITY,
            RoomType::Normal | RoomType::Highway => SOURCE_ENERGY_NEUTRAL_CAPACITY,
            RoomType::Center | RoomType::Keeper => SOURCE_ENERGY_KEEPER_CAPACITY,
        }
    }
}

/// Room identifier stored as its signed macro coordinate. West and north map to negative values
/// so `W0` sits directly left of `E0`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomName {
    x: i32,
    y: i32,
}

impl RoomName {
    pub fn from_xy(x: i32, y: i32) -> RoomName {
        RoomName { x, y }
    }

    pub fn to_xy(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    /// The numbers as written in the name, e.g. `(5, 3)` for `W5N3`.
    fn name_numbers(&self) -> (i32, i32) {
        let xx = if self.x < 0 { -self.x - 1 } else { self.x };
        let yy = if self.y < 0 { -self.y - 1 } else { self.y };

        (xx, yy)
    }

    pub fn room_type(&self) -> RoomType {
        let (xx, yy) = self.name_numbers();
        let (xm, ym) = (xx % 10, yy % 10);

        if xm == 0 || ym == 0 {
            RoomType::Highway
        } else if !(4..=6).contains(&xm) || !(4..=6).contains(&ym) {
            RoomType::Normal
        } else if xm == 5 && ym == 5 {
            RoomType::Center
        } else {
            RoomType::Keeper
        }
    }

    pub fn offset(&self, dx: i32, dy: i32) -> RoomName {
        RoomName {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Macro grid Chebyshev distance.
    pub fn linear_distance(&self, other: RoomName) -> u32 {
        (self.x - other.x).unsigned_abs().max((self.y - other.y).unsigned_abs())
    }

    pub fn manhattan_distance(&self, other: RoomName) -> u32 {
        (self.x - other.x).unsigned_abs() + (self.y - other.y).unsigned_abs()
    }

    /// Numeric encoding used in agent names: `W`→1, `E`→2, `N`→1, `S`→2, numbers padded to three digits.
    pub fn encode(&self) -> u64 {
        let (xx, yy) = self.name_numbers();
        let we = if self.x < 0 { 1 } else { 2 };
        let ns = if self.y < 0 { 1 } else { 2 };

        ((we * 1000 + xx as u64) * 10 + ns) * 1000 + yy as u64
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (xx, yy) = self.name_numbers();
        let we = if self.x < 0 { 'W' } else { 'E' };
        let ns = if self.y < 0 { 'N' } else { 'S' };

        write!(f, "{}{}{}{}", we, xx, ns, yy)
    }
}

impl fmt::Debug for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for RoomName {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<RoomName, EngineError> {
        let invalid = || EngineError::InvalidInput(format!("invalid room name: {}", s));

        if !s.is_ascii() || s.len() < 4 {
            return Err(invalid());
        }

        let bytes = s.as_bytes();
        let we = bytes[0];
        let ns_index = s[1..].find(['N', 'S', 'n', 's']).map(|i| i + 1).ok_or_else(invalid)?;

        let xx: i32 = s[1..ns_index].parse().map_err(|_| invalid())?;
        let yy: i32 = s[ns_index + 1..].parse().map_err(|_| invalid())?;

        let x = match we {
            b'W' | b'w' => -xx - 1,
            b'E' | b'e' => xx,
            _ => return Err(invalid()),
        };

        let y = match bytes[ns_index] {
            b'N' | b'n' => -yy - 1,
            _ => yy,
        };

        Ok(RoomName { x, y })
    }
}

impl Serialize for RoomName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RoomName {
    fn deserialize<D>(deserializer: D) -> Result<RoomName, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;

        name.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    #[serde(rename = "r")]
    pub room: RoomName,
    #[serde(rename = "c")]
    pub coord: Coord,
}

impl Position {
    pub fn new(room: RoomName, coord: Coord) -> Position {
        Position { room, coord }
    }

    pub fn world_xy(&self) -> (i32, i32) {
        let (rx, ry) = self.room.to_xy();

        (rx * ROOM_SIZE as i32 + self.coord.x() as i32, ry * ROOM_SIZE as i32 + self.coord.y() as i32)
    }

    pub fn from_world_xy(x: i32, y: i32) -> Option<Position> {
        let size = ROOM_SIZE as i32;
        let room = RoomName::from_xy(x.div_euclid(size), y.div_euclid(size));
        let coord = Coord::checked(x.rem_euclid(size), y.rem_euclid(size))?;

        Some(Position { room, coord })
    }

    /// Chebyshev distance within a room, `None` across rooms.
    pub fn range_to(&self, other: &Position) -> Option<u32> {
        if self.room == other.room {
            Some(self.coord.range_to(other.coord) as u32)
        } else {
            None
        }
    }

    /// Chebyshev distance in world tiles, valid across rooms.
    pub fn world_range_to(&self, other: &Position) -> u32 {
        let (ax, ay) = self.world_xy();
        let (bx, by) = other.world_xy();

        (ax - bx).unsigned_abs().max((ay - by).unsigned_abs())
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {},{}]", self.room, self.coord.x(), self.coord.y())
    }
}
