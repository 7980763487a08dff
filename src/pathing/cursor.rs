use crate::room::name::*;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CursorState {
    /// Not on the path yet.
    Seeking,
    Following,
    Arrived,
    /// On the path but has not moved since the last tick.
    Stuck,
    /// Stuck long enough that the path should be replaced.
    Repathing,
}

/// What the agent should do this tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CursorStep {
    Move(Position),
    Arrived,
    /// Not on or next to the path start; move onto the path first.
    Lost,
    Repath,
}

/// Persisted progress of an agent along a cached path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathCursor {
    #[serde(rename = "i")]
    index: Option<u32>,
    #[serde(rename = "r")]
    reverse: bool,
    #[serde(rename = "s")]
    state: CursorState,
    #[serde(rename = "p")]
    last_pos: Option<Position>,
    #[serde(rename = "t")]
    last_tick: Option<u32>,
    #[serde(rename = "k")]
    stuck: u32,
}

impl PathCursor {
    pub fn new(reverse: bool) -> PathCursor {
        PathCursor {
            index: None,
            reverse,
            state: CursorState::Seeking,
            last_pos: None,
            last_tick: None,
            stuck: 0,
        }
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    pub fn is_reverse(&self) -> bool {
        self.reverse
    }

    pub fn stuck_ticks(&self) -> u32 {
        self.stuck
    }

    /// Index of the tile the agent was last told to step onto.
    pub fn index(&self) -> Option<usize> {
        self.index.map(|i| i as usize)
    }

    /// Switches direction, keeping the position on the path.
    pub fn set_reverse(&mut self, reverse: bool) {
        if self.reverse != reverse {
            self.reverse = reverse;
            self.index = None;
            self.state = CursorState::Seeking;
        }
    }

    /// Starts over on a new path.
    pub fn restart(&mut self) {
        self.index = None;
        self.state = CursorState::Seeking;
        self.stuck = 0;
    }

    fn update_stuck(&mut self, current: Position, time: u32) {
        if self.last_tick == Some(time) {
            return;
        }

        let following = matches!(self.state, CursorState::Following | CursorState::Stuck | CursorState::Repathing);

        if following && self.last_pos == Some(current) {
            self.stuck += 1;
        } else {
            self.stuck = 0;
        }

        self.last_pos = Some(current);
        self.last_tick = Some(time);
    }

    fn locate(&self, path: &[Position], current: Position) -> Option<i64> {
        let delta: i64 = if self.reverse { -1 } else { 1 };

        if let Some(cached) = self.index {
            let cached = cached as i64;

            for candidate in [cached, cached - delta, cached + delta] {
                if candidate >= 0 && path.get(candidate as usize) == Some(&current) {
                    return Some(candidate);
                }
            }
        }

        if self.reverse {
            path.iter().rposition(|p| *p == current).map(|i| i as i64)
        } else {
            path.iter().position(|p| *p == current).map(|i| i as i64)
        }
    }

    /// Advances along `path` from `current`. Repeated calls with the same position and tick
    /// return the same step.
    pub fn resume(&mut self, path: &[Position], current: Position, time: u32, repath_if_stuck: u32) -> CursorStep {
        self.update_stuck(current, time);

        if repath_if_stuck > 0 && self.stuck >= repath_if_stuck {
            self.state = CursorState::Repathing;

            return CursorStep::Repath;
        }

        let delta: i64 = if self.reverse { -1 } else { 1 };
        let len = path.len() as i64;

        let index = match self.locate(path, current) {
            Some(index) => index,
            None => {
                let start = if self.reverse { path.last() } else { path.first() };

                match start {
                    Some(start) if start.world_range_to(&current) <= 1 => {
                        if self.reverse {
                            len
                        } else {
                            -1
                        }
                    }
                    _ => {
                        self.state = CursorState::Seeking;

                        return CursorStep::Lost;
                    }
                }
            }
        };

        let next = index + delta;

        if next < 0 || next >= len {
            self.state = CursorState::Arrived;

            return CursorStep::Arrived;
        }

        self.index = Some(next as u32);
        self.state = if self.stuck > 0 { CursorState::Stuck } else { CursorState::Following };

        CursorStep::Move(path[next as usize])
    }
}
