//! The authoritative game session
//!
//! `GameSession` owns every piece of mutable game state. It is plain,
//! synchronous data; `AppState` wraps it in a mutex so each action is applied
//! to completion before the next one starts.

use super::player::{draw_card, validate_card, Player, PlayerRegistry};
use super::terms::TermRegistry;
use crate::error::GameError;
use crate::types::*;
use rand::Rng;
use std::collections::HashMap;
use tokio::task::AbortHandle;
use tokio::time::Instant;

/// Identifies one cell of one player's card
pub type CellKey = (PlayerId, usize);

/// A scheduled revert of a provisional mark
///
/// The id is unique per session, so a ticket that outlived its cell (because
/// the cell changed state) is recognised as stale when it fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevertTicket {
    pub id: u64,
    pub player_id: PlayerId,
    pub cell: usize,
    pub due: Instant,
}

#[derive(Debug)]
pub(super) struct PendingRevert {
    pub(super) ticket_id: u64,
    pub(super) handle: Option<AbortHandle>,
}

#[derive(Debug)]
pub struct GameSession {
    pub(super) rules: GameRules,
    pub(super) terms: TermRegistry,
    pub(super) players: PlayerRegistry,
    pub(super) winners: Vec<WinRecord>,
    /// Position handed to the next valid win
    pub(super) next_win_position: u32,
    pub(super) reverts: HashMap<CellKey, PendingRevert>,
    pub(super) next_ticket: u64,
}

impl GameSession {
    pub fn new(rules: GameRules, initial_terms: Vec<Term>) -> Self {
        Self {
            rules,
            terms: TermRegistry::with_terms(initial_terms),
            players: PlayerRegistry::default(),
            winners: Vec::new(),
            next_win_position: 1,
            reverts: HashMap::new(),
            next_ticket: 0,
        }
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn terms(&self) -> &TermRegistry {
        &self.terms
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn players(&self) -> &PlayerRegistry {
        &self.players
    }

    pub fn winners(&self) -> &[WinRecord] {
        &self.winners
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            terms: self.terms.active().to_vec(),
            announced: self.terms.announced().to_vec(),
            player_count: self.players.connected_count(),
        }
    }

    // ---- Term registry (operator) ----

    pub fn add_term(&mut self, text: Term) -> Result<(), GameError> {
        self.terms.add(text)
    }

    pub fn remove_term(&mut self, index: usize) -> Result<Term, GameError> {
        self.terms.remove(index)
    }

    // ---- Player registry ----

    pub fn register_player(&mut self, name: &str) -> Result<Player, GameError> {
        self.players.register(name)
    }

    pub fn disconnect_player(&mut self, id: &str) -> bool {
        self.players.mark_disconnected(id)
    }

    /// Give the player a card, or return the card they already hold
    pub fn assign_card<R: Rng + ?Sized>(
        &mut self,
        player_id: &str,
        rng: &mut R,
    ) -> Result<Vec<Term>, GameError> {
        let pool = self.terms.card_pool();
        let player = self
            .players
            .get_mut(player_id)
            .ok_or(GameError::UnknownPlayer)?;
        if !player.card.is_empty() {
            return Ok(player.card.clone());
        }

        player.card = draw_card(&pool, rng)?;
        Ok(player.card.clone())
    }

    /// Install a specific card; a card can only be set once per game
    #[cfg(test)]
    pub fn set_card(&mut self, player_id: &str, card: Vec<Term>) -> Result<(), GameError> {
        let pool = self.terms.card_pool();
        let player = self
            .players
            .get_mut(player_id)
            .ok_or(GameError::UnknownPlayer)?;
        if !player.card.is_empty() {
            return Err(GameError::CardAlreadyAssigned);
        }

        validate_card(&card, &pool)?;
        player.card = card;
        Ok(())
    }

    /// Store the client's view of its card; returns whether it matches ours
    pub fn report_card(&mut self, player_id: &str, card: Vec<Term>) -> Result<bool, GameError> {
        let pool = self.terms.card_pool();
        let player = self
            .players
            .get_mut(player_id)
            .ok_or(GameError::UnknownPlayer)?;
        if let Err(e) = validate_card(&card, &pool) {
            tracing::warn!("Player {} reported a malformed card: {}", player_id, e);
        }
        let matches = player.card == card;
        player.reported_card = Some(card);
        Ok(matches)
    }

    // ---- Reset ----

    /// Clear announcements, winners and all player progress
    ///
    /// Registered identities and names are kept.
    pub fn reset(&mut self) {
        self.terms.reset();
        self.winners.clear();
        self.next_win_position = 1;
        for player in self.players.iter_mut() {
            player.clear_progress();
        }
        for (_, pending) in self.reverts.drain() {
            if let Some(handle) = pending.handle {
                handle.abort();
            }
        }
    }

    // ---- Revert bookkeeping ----

    pub(super) fn issue_ticket(&mut self, player_id: &str, cell: usize, now: Instant) -> RevertTicket {
        self.next_ticket += 1;
        let ticket = RevertTicket {
            id: self.next_ticket,
            player_id: player_id.to_string(),
            cell,
            due: now + self.rules.provisional_delay(),
        };
        self.reverts.insert(
            (ticket.player_id.clone(), cell),
            PendingRevert {
                ticket_id: ticket.id,
                handle: None,
            },
        );
        ticket
    }

    /// Attach the task that will fire `ticket`
    ///
    /// If the ticket was cancelled in the meantime the task is aborted right
    /// away.
    pub fn attach_revert_handle(&mut self, ticket: &RevertTicket, handle: AbortHandle) {
        let key = (ticket.player_id.clone(), ticket.cell);
        match self.reverts.get_mut(&key) {
            Some(pending) if pending.ticket_id == ticket.id => pending.handle = Some(handle),
            _ => handle.abort(),
        }
    }

    /// Whether `ticket` is still the live revert for its cell
    pub fn is_revert_pending(&self, ticket: &RevertTicket) -> bool {
        self.reverts
            .get(&(ticket.player_id.clone(), ticket.cell))
            .is_some_and(|pending| pending.ticket_id == ticket.id)
    }

    pub fn pending_revert_count(&self) -> usize {
        self.reverts.len()
    }
}

/// Cancel the revert scheduled for `key`, if any. Idempotent.
pub(super) fn cancel_revert(reverts: &mut HashMap<CellKey, PendingRevert>, key: &CellKey) {
    if let Some(pending) = reverts.remove(key) {
        if let Some(handle) = pending.handle {
            handle.abort();
        }
    }
}

/// Cancel every revert scheduled for one player
pub(super) fn cancel_player_reverts(reverts: &mut HashMap<CellKey, PendingRevert>, player_id: &str) {
    reverts.retain(|(owner, _), pending| {
        if owner != player_id {
            return true;
        }
        if let Some(handle) = pending.handle.take() {
            handle.abort();
        }
        false
    });
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new(GameRules::default(), Vec::new())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn terms(n: usize) -> Vec<Term> {
        (0..n).map(|i| format!("term-{}", i)).collect()
    }

    /// Session with 20 active terms and one player holding terms 0..16
    pub(crate) fn session_with_player() -> (GameSession, PlayerId) {
        let mut session = GameSession::new(GameRules::default(), terms(20));
        let player = session.register_player("Alice").unwrap();
        session.set_card(&player.id, terms(16)).unwrap();
        (session, player.id)
    }

    #[test]
    fn test_assign_card_is_idempotent() {
        let mut session = GameSession::new(GameRules::default(), terms(20));
        let player = session.register_player("Alice").unwrap();

        let first = session.assign_card(&player.id, &mut rand::rng()).unwrap();
        let second = session.assign_card(&player.id, &mut rand::rng()).unwrap();
        assert_eq!(first.len(), CARD_SIZE);
        assert_eq!(first, second);
        assert_eq!(
            session.set_card(&player.id, terms(16)),
            Err(GameError::CardAlreadyAssigned)
        );
    }

    #[test]
    fn test_assign_card_requires_enough_terms() {
        let mut session = GameSession::new(GameRules::default(), terms(10));
        let player = session.register_player("Alice").unwrap();

        assert!(matches!(
            session.assign_card(&player.id, &mut rand::rng()),
            Err(GameError::NotEnoughTerms { .. })
        ));
        assert_eq!(
            session.assign_card("ghost", &mut rand::rng()),
            Err(GameError::UnknownPlayer)
        );
    }

    #[test]
    fn test_card_pool_includes_removed_announced_terms() {
        let mut session = GameSession::new(GameRules::default(), terms(16));
        session.terms.announce("term-0").unwrap();
        session.remove_term(0).unwrap();
        let player = session.register_player("Alice").unwrap();

        // 15 active + 1 announced-but-removed
        let card = session.assign_card(&player.id, &mut rand::rng()).unwrap();
        assert!(card.contains(&"term-0".to_string()));
    }

    #[test]
    fn test_report_card_is_informational() {
        let (mut session, id) = session_with_player();
        assert_eq!(session.report_card(&id, terms(16)), Ok(true));
        // Malformed reports are kept for diagnostics, not rejected
        assert_eq!(session.report_card(&id, vec!["x".to_string()]), Ok(false));
        assert_eq!(
            session.player(&id).unwrap().reported_card,
            Some(vec!["x".to_string()])
        );
        // Authoritative card unchanged
        assert_eq!(session.player(&id).unwrap().card, terms(16));
    }

    #[test]
    fn test_ticket_bookkeeping() {
        let (mut session, id) = session_with_player();
        let now = Instant::now();
        let first = session.issue_ticket(&id, 3, now);
        assert!(session.is_revert_pending(&first));

        // A newer ticket for the same cell supersedes the old one
        let second = session.issue_ticket(&id, 3, now);
        assert!(!session.is_revert_pending(&first));
        assert!(session.is_revert_pending(&second));
        assert_eq!(second.due, now + session.rules().provisional_delay());

        cancel_revert(&mut session.reverts, &(id.clone(), 3));
        cancel_revert(&mut session.reverts, &(id.clone(), 3));
        assert!(!session.is_revert_pending(&second));
        assert_eq!(session.pending_revert_count(), 0);
    }
}
