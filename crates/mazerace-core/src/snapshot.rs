use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::board::Wall;
use crate::player::{PLAYER_ONE, PLAYER_TWO, Player, PlayerId, opponent_of};

/// Canonical shared game state. Published snapshots are never patched; each
/// transition produces a whole new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub players: BTreeMap<PlayerId, Player>,
    pub walls: Vec<Wall>,
    pub current_player_id: PlayerId,
    pub winner: Option<Player>,
    /// Seconds since the match started.
    pub game_time: u32,
    /// Seconds left in the current turn.
    pub turn_time: u32,
    /// Wall-clock milliseconds when this snapshot was produced.
    pub timestamp: u64,
    pub turn_number: u64,
}

/// Lifecycle derived from snapshot contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchPhase {
    WaitingForPlayers,
    InProgress,
    Finished,
}

/// `(turn_number, timestamp)` pair that totally orders snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogicalClock {
    pub turn_number: u64,
    pub timestamp: u64,
}

impl LogicalClock {
    pub const fn new(turn_number: u64, timestamp: u64) -> Self {
        Self {
            turn_number,
            timestamp,
        }
    }
}

impl PartialOrd for LogicalClock {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LogicalClock {
    fn cmp(&self, other: &Self) -> Ordering {
        self.turn_number
            .cmp(&other.turn_number)
            .then(self.timestamp.cmp(&other.timestamp))
    }
}

impl GameSnapshot {
    /// A fresh snapshot with the given players, player 1 to move.
    pub fn new(players: impl IntoIterator<Item = Player>, turn_time: u32, timestamp: u64) -> Self {
        Self {
            players: players.into_iter().map(|p| (p.id, p)).collect(),
            walls: Vec::new(),
            current_player_id: PLAYER_ONE,
            winner: None,
            game_time: 0,
            turn_time,
            timestamp,
            turn_number: 1,
        }
    }

    pub fn clock(&self) -> LogicalClock {
        LogicalClock::new(self.turn_number, self.timestamp)
    }

    pub fn phase(&self) -> MatchPhase {
        if self.winner.is_some() {
            MatchPhase::Finished
        } else if self.players.contains_key(&PLAYER_ONE) && self.players.contains_key(&PLAYER_TWO)
        {
            MatchPhase::InProgress
        } else {
            MatchPhase::WaitingForPlayers
        }
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn opponent(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&opponent_of(id))
    }

    pub fn is_finished(&self) -> bool {
        self.winner.is_some()
    }

    pub fn winner_id(&self) -> Option<PlayerId> {
        self.winner.as_ref().map(|p| p.id)
    }
}
