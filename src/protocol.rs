use crate::error::GameError;
use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Elevate this connection to the operator role
    OperatorLogin {
        secret: String,
    },
    RegisterPlayer {
        name: String,
    },
    /// Ask for this player's card (drawn on first request)
    RequestCard,
    /// Client's copy of its card, stored for diagnostics only
    SubmitCard {
        card: Vec<Term>,
    },
    MarkTerm {
        term: Term,
    },
    UnmarkTerm {
        term: Term,
    },
    DeclareWin,
    GetState,
    GetLeaderboard,
    // Operator-only messages
    OperatorAddTerm {
        term: Term,
    },
    OperatorRemoveTerm {
        index: usize,
    },
    OperatorAnnounce {
        term: Term,
    },
    OperatorUnannounce {
        term: Term,
    },
    OperatorReset,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        role: Role,
        state: GameSnapshot,
        leaderboard: Vec<LeaderboardEntry>,
        server_now: String,
    },
    OperatorAuthenticated,
    PlayerRegistered {
        player_id: PlayerId,
        name: String,
    },
    CardAssigned {
        card: Vec<Term>,
    },
    /// Answer to a mark request
    MarkAck {
        term: Term,
        state: MarkState,
    },
    Unmarked {
        term: Term,
    },
    /// Sent to one player: a provisional mark expired
    MarkReverted {
        term: Term,
    },
    /// Sent to one player: a provisional mark became confirmed
    MarkConfirmed {
        term: Term,
    },
    /// Sent to one player: a mark was removed because its term was un-announced
    MarkRevoked {
        term: Term,
    },
    /// Sent to the winning player only
    WinConfirmed {
        position: u32,
    },
    TermsChanged {
        terms: Vec<Term>,
    },
    TermAnnounced {
        term: Term,
        announced: Vec<Term>,
    },
    TermUnannounced {
        term: Term,
        announced: Vec<Term>,
    },
    SessionReset,
    LeaderboardUpdated {
        entries: Vec<LeaderboardEntry>,
    },
    PlayerCount {
        count: usize,
    },
    GameState {
        state: GameSnapshot,
    },
    Error {
        code: String,
        msg: String,
    },
}

impl From<GameError> for ServerMessage {
    fn from(e: GameError) -> Self {
        ServerMessage::Error {
            code: e.code().to_string(),
            msg: e.to_string(),
        }
    }
}

/// A message for a single player's connections
#[derive(Debug, Clone, PartialEq)]
pub struct DirectMessage {
    pub player_id: PlayerId,
    pub msg: ServerMessage,
}
