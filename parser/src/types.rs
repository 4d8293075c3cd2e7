use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-replay player identifier. Stable across the player records, the slot
/// table and the event stream for human players; computer players carry 0.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u8);

impl PlayerId {
    pub const COMPUTER: PlayerId = PlayerId(0);

    pub fn raw(self) -> u8 {
        self.0
    }

    pub fn is_computer(self) -> bool {
        self == Self::COMPUTER
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for PlayerId {
    fn from(v: u8) -> Self {
        PlayerId(v)
    }
}

/// Position in the lobby's slot table, 0-based.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(pub u8);

impl SlotId {
    pub fn raw(self) -> u8 {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for SlotId {
    fn from(v: u8) -> Self {
        SlotId(v)
    }
}

/// Cumulative event-stream time in milliseconds since the game started.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameClock(pub u32);

impl GameClock {
    pub fn millis(self) -> u32 {
        self.0
    }

    /// Advances the clock by a time-slice increment, saturating at `u32::MAX`.
    pub fn advance(&mut self, increment_ms: u16) {
        self.0 = self.0.saturating_add(u32::from(increment_ms));
    }
}

/// Formats as `m:ss`.
impl fmt::Display for GameClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let seconds = self.0 / 1000;
        write!(f, "{}:{:02}", seconds / 60, seconds % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_display() {
        assert_eq!(GameClock(2500).to_string(), "0:02");
        assert_eq!(GameClock(61_000).to_string(), "1:01");
        assert_eq!(GameClock(600_000).to_string(), "10:00");
    }

    #[test]
    fn clock_advance_saturates() {
        let mut clock = GameClock(u32::MAX - 1);
        clock.advance(100);
        assert_eq!(clock.millis(), u32::MAX);
    }
}
