//! Rejection taxonomy for operator and player actions
//!
//! Every variant is recoverable: the action is refused, the initiator gets a
//! rejection, and shared state is left untouched.

use crate::types::Term;

/// Broad class of a rejection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed, duplicate or missing input
    Validation,
    /// Operator action without a valid credential
    Authorization,
    /// Action not allowed in the current state
    StateConflict,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Term must not be empty")]
    EmptyTerm,

    #[error("Term already exists: {0}")]
    DuplicateTerm(Term),

    #[error("Term index {index} out of range ({len} terms)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Unknown term: {0}")]
    UnknownTerm(Term),

    #[error("Unknown player")]
    UnknownPlayer,

    #[error("Player name must not be empty")]
    EmptyName,

    #[error("Need at least {needed} terms to build a card, only {available} available")]
    NotEnoughTerms { needed: usize, available: usize },

    #[error("Invalid card: {0}")]
    InvalidCard(String),

    #[error("Operator credential required")]
    Unauthorized,

    #[error("Term already announced: {0}")]
    AlreadyAnnounced(Term),

    #[error("Term is not announced: {0}")]
    NotAnnounced(Term),

    #[error("Connection already registered a player")]
    AlreadyRegistered,

    #[error("Player already has a card")]
    CardAlreadyAssigned,

    #[error("Player already has a win")]
    AlreadyWon,

    #[error("Not a valid win")]
    InvalidWin,
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        use GameError::*;

        match self {
            EmptyTerm
            | DuplicateTerm(_)
            | IndexOutOfRange { .. }
            | UnknownTerm(_)
            | UnknownPlayer
            | EmptyName
            | NotEnoughTerms { .. }
            | InvalidCard(_) => ErrorKind::Validation,
            Unauthorized => ErrorKind::Authorization,
            AlreadyAnnounced(_)
            | NotAnnounced(_)
            | AlreadyRegistered
            | CardAlreadyAssigned
            | AlreadyWon
            | InvalidWin => ErrorKind::StateConflict,
        }
    }

    /// Stable wire code sent to clients
    pub fn code(&self) -> &'static str {
        use GameError::*;

        match self {
            EmptyTerm => "EMPTY_TERM",
            DuplicateTerm(_) => "DUPLICATE_TERM",
            IndexOutOfRange { .. } => "INDEX_OUT_OF_RANGE",
            UnknownTerm(_) => "UNKNOWN_TERM",
            UnknownPlayer => "UNKNOWN_PLAYER",
            EmptyName => "EMPTY_NAME",
            NotEnoughTerms { .. } => "NOT_ENOUGH_TERMS",
            InvalidCard(_) => "INVALID_CARD",
            Unauthorized => "UNAUTHORIZED",
            AlreadyAnnounced(_) => "ALREADY_ANNOUNCED",
            NotAnnounced(_) => "NOT_ANNOUNCED",
            AlreadyRegistered => "ALREADY_REGISTERED",
            CardAlreadyAssigned => "CARD_ALREADY_ASSIGNED",
            AlreadyWon => "ALREADY_WON",
            InvalidWin => "INVALID_WIN",
        }
    }

    /// Rejections that are dropped without answering the initiator
    pub fn is_silent(&self) -> bool {
        matches!(self, GameError::UnknownPlayer | GameError::UnknownTerm(_))
    }
}
