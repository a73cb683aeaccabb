use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Opaque ID types for type safety
pub type PlayerId = String;
pub type Term = String;

/// A card is a 4x4 grid, stored row-major
pub const CARD_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Operator,
    Player,
    Viewer,
}

/// Whether a marked cell counts toward scoring or is waiting to be reverted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MarkState {
    Confirmed,
    Provisional,
}

/// Tunable constants of the marking state machine
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameRules {
    /// Mark attempts inside the window at which marks turn provisional
    pub spam_threshold: usize,
    pub spam_window_ms: u64,
    /// Lifetime of a provisional mark before it reverts
    pub provisional_ms: u64,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            spam_threshold: 4,
            spam_window_ms: 4_000,
            provisional_ms: 10_000,
        }
    }
}

impl GameRules {
    pub fn spam_window(&self) -> Duration {
        Duration::from_millis(self.spam_window_ms)
    }

    pub fn provisional_delay(&self) -> Duration {
        Duration::from_millis(self.provisional_ms)
    }
}

/// Public view of the term registry plus the live player count
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameSnapshot {
    pub terms: Vec<Term>,
    pub announced: Vec<Term>,
    pub player_count: usize,
}

/// One row of the ranked leaderboard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub id: PlayerId,
    pub name: String,
    pub valid_clicks: u32,
    pub total_clicks: u32,
    pub has_win: bool,
    pub win_position: Option<u32>,
    /// RFC 3339 timestamp of the win
    pub win_time: Option<String>,
    pub disconnected: bool,
    pub marked_terms: Vec<Term>,
}

/// A declared win, in declaration order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WinRecord {
    pub player_id: PlayerId,
    pub name: String,
    pub position: u32,
    pub time: String,
}
