//! Per-cell marking state machine
//!
//! A mark on an announced term, made while the player is not spamming, is
//! confirmed. Anything else is provisional and reverts after
//! `GameRules::provisional_ms` unless the cell changes state first.
//!
//! Scoring: a mark adds to `total_clicks` and `valid_clicks` when its term is
//! announced and it has not been scored yet. This includes spam marks on
//! announced terms, which score immediately but still revert.

use super::player::CellMark;
use super::session::{cancel_player_reverts, cancel_revert, GameSession, RevertTicket};
use crate::error::GameError;
use crate::types::*;
use tokio::time::Instant;

/// Result of a mark request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkOutcome {
    Confirmed {
        cell: usize,
    },
    /// The caller must schedule `revert`
    Provisional {
        cell: usize,
        revert: RevertTicket,
    },
    /// Cell was already confirmed
    Unchanged,
}

impl MarkOutcome {
    pub fn state(&self) -> MarkState {
        match self {
            MarkOutcome::Confirmed { .. } | MarkOutcome::Unchanged => MarkState::Confirmed,
            MarkOutcome::Provisional { .. } => MarkState::Provisional,
        }
    }
}

/// A mark that fired its revert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevertedMark {
    pub player_id: PlayerId,
    pub term: Term,
    /// Whether the player's counts went down
    pub rescored: bool,
}

/// A mark changed by an announcement correction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkChange {
    pub player_id: PlayerId,
    pub term: Term,
}

impl GameSession {
    pub fn mark(&mut self, player_id: &str, term: &str, now: Instant) -> Result<MarkOutcome, GameError> {
        let rules = self.rules;
        let announced = self.terms.is_announced(term);
        let player = self
            .players
            .get_mut(player_id)
            .ok_or(GameError::UnknownPlayer)?;
        if player.has_win {
            return Err(GameError::AlreadyWon);
        }
        let cell = player
            .cell_of(term)
            .ok_or_else(|| GameError::UnknownTerm(term.to_string()))?;

        // A confirmed cell is final; repeats do not count toward the spam window
        let previous = player.marks.get(&cell).copied();
        if previous.is_some_and(|m| m.state == MarkState::Confirmed) {
            return Ok(MarkOutcome::Unchanged);
        }

        let spamming = player.record_mark_attempt(now, &rules);

        // Re-marking a provisional cell replaces its pending revert
        let key = (player_id.to_string(), cell);
        cancel_revert(&mut self.reverts, &key);

        let mut scored = previous.is_some_and(|m| m.scored);
        if announced && !scored {
            player.add_score();
            scored = true;
        }

        let state = if announced && !spamming {
            MarkState::Confirmed
        } else {
            MarkState::Provisional
        };
        player.marks.insert(cell, CellMark { state, scored });

        match state {
            MarkState::Confirmed => Ok(MarkOutcome::Confirmed { cell }),
            MarkState::Provisional => {
                let revert = self.issue_ticket(player_id, cell, now);
                Ok(MarkOutcome::Provisional { cell, revert })
            }
        }
    }

    /// Remove a mark; returns false when the cell was not marked
    pub fn unmark(&mut self, player_id: &str, term: &str) -> Result<bool, GameError> {
        let player = self
            .players
            .get_mut(player_id)
            .ok_or(GameError::UnknownPlayer)?;
        if player.has_win {
            return Err(GameError::AlreadyWon);
        }
        let cell = player
            .cell_of(term)
            .ok_or_else(|| GameError::UnknownTerm(term.to_string()))?;

        let Some(mark) = player.marks.remove(&cell) else {
            return Ok(false);
        };
        if mark.scored {
            player.remove_score();
        }
        cancel_revert(&mut self.reverts, &(player_id.to_string(), cell));
        Ok(true)
    }

    /// Fire a scheduled revert
    ///
    /// Re-validates everything: a ticket whose cell changed state since it was
    /// issued is ignored.
    pub fn expire_provisional(&mut self, ticket: &RevertTicket) -> Option<RevertedMark> {
        if !self.is_revert_pending(ticket) {
            return None;
        }
        self.reverts.remove(&(ticket.player_id.clone(), ticket.cell));

        let player = self.players.get_mut(&ticket.player_id)?;
        if player.has_win {
            return None;
        }
        match player.marks.get(&ticket.cell) {
            Some(mark) if mark.state == MarkState::Provisional => {}
            _ => return None,
        }

        let mark = player.marks.remove(&ticket.cell)?;
        if mark.scored {
            player.remove_score();
        }
        Some(RevertedMark {
            player_id: player.id.clone(),
            term: player.card.get(ticket.cell).cloned().unwrap_or_default(),
            rescored: mark.scored,
        })
    }

    /// Announce a term and promote provisional marks whose term is now announced
    pub fn announce(&mut self, term: &str) -> Result<Vec<MarkChange>, GameError> {
        self.terms.announce(term)?;

        let mut promoted = Vec::new();
        for player in self.players.iter_mut() {
            if player.has_win {
                continue;
            }
            for (cell, mark) in player.marks.iter_mut() {
                if mark.state != MarkState::Provisional {
                    continue;
                }
                let Some(cell_term) = player.card.get(*cell) else {
                    continue;
                };
                if !self.terms.is_announced(cell_term) {
                    continue;
                }

                mark.state = MarkState::Confirmed;
                if !mark.scored {
                    mark.scored = true;
                    player.total_clicks += 1;
                    player.valid_clicks += 1;
                }
                cancel_revert(&mut self.reverts, &(player.id.clone(), *cell));
                promoted.push(MarkChange {
                    player_id: player.id.clone(),
                    term: cell_term.clone(),
                });
            }
        }
        Ok(promoted)
    }

    /// Retract an announcement and remove every mark on that term
    pub fn unannounce(&mut self, term: &str) -> Result<Vec<MarkChange>, GameError> {
        self.terms.unannounce(term)?;

        let mut revoked = Vec::new();
        for player in self.players.iter_mut() {
            if player.has_win {
                continue;
            }
            let Some(cell) = player.cell_of(term) else {
                continue;
            };
            let Some(mark) = player.marks.remove(&cell) else {
                continue;
            };
            if mark.scored {
                player.valid_clicks = player.valid_clicks.saturating_sub(1);
            }
            cancel_revert(&mut self.reverts, &(player.id.clone(), cell));
            revoked.push(MarkChange {
                player_id: player.id.clone(),
                term: term.to_string(),
            });
        }
        Ok(revoked)
    }

    pub(super) fn freeze_player(&mut self, player_id: &str) {
        cancel_player_reverts(&mut self.reverts, player_id);
    }
}
