use super::player::Player;
use super::session::GameSession;
use super::terms::TermRegistry;
use crate::error::GameError;
use crate::types::WinRecord;
use chrono::{DateTime, Utc};

/// Whether the player's marks are exactly the announced cells of their card
///
/// A card with no announced cells never wins.
pub fn evaluate(player: &Player, terms: &TermRegistry) -> bool {
    let mut announced_cells = 0;
    for (cell, term) in player.card.iter().enumerate() {
        let announced = terms.is_announced(term);
        let marked = player.marks.contains_key(&cell);
        if announced != marked {
            return false;
        }
        if announced {
            announced_cells += 1;
        }
    }
    announced_cells > 0
}

impl GameSession {
    #[cfg(test)]
    pub fn evaluate_win(&self, player_id: &str) -> Result<bool, GameError> {
        let player = self.players.get(player_id).ok_or(GameError::UnknownPlayer)?;
        Ok(evaluate(player, &self.terms))
    }

    /// Validate and record a win, returning the frozen position
    pub fn declare_win(&mut self, player_id: &str, now: DateTime<Utc>) -> Result<u32, GameError> {
        let player = self.players.get(player_id).ok_or(GameError::UnknownPlayer)?;
        if player.has_win {
            return Err(GameError::AlreadyWon);
        }
        if !evaluate(player, &self.terms) {
            return Err(GameError::InvalidWin);
        }

        let position = self.next_win_position;
        self.next_win_position += 1;

        let player = self
            .players
            .get_mut(player_id)
            .ok_or(GameError::UnknownPlayer)?;
        player.has_win = true;
        player.win_position = Some(position);
        player.win_time = Some(now);
        self.winners.push(WinRecord {
            player_id: player.id.clone(),
            name: player.name.clone(),
            position,
            time: now.to_rfc3339(),
        });

        self.freeze_player(player_id);
        Ok(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::marking::MarkOutcome;
    use crate::state::session::tests::{session_with_player, terms};
    use crate::types::GameRules;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Mark terms slowly enough to stay under the spam threshold
    fn mark_all(session: &mut GameSession, id: &str, marks: &[&str]) {
        let start = Instant::now();
        for (i, term) in marks.iter().enumerate() {
            session
                .mark(id, term, start + Duration::from_secs(5 * i as u64))
                .unwrap();
        }
    }

    #[test]
    fn test_no_announced_cells_never_wins() {
        let (session, id) = session_with_player();
        assert_eq!(session.evaluate_win(&id), Ok(false));
    }

    #[test]
    fn test_exact_match_wins() {
        let (mut session, id) = session_with_player();
        let called = ["term-0", "term-3", "term-6", "term-9", "term-12"];
        for term in called {
            session.announce(term).unwrap();
        }
        // Announced but not on the card
        session.announce("term-19").unwrap();

        mark_all(&mut session, &id, &called[..4]);
        assert_eq!(session.evaluate_win(&id), Ok(false));

        mark_all(&mut session, &id, &called[4..]);
        assert_eq!(session.evaluate_win(&id), Ok(true));

        // One extra unannounced mark spoils the win
        let outcome = session
            .mark(&id, "term-1", Instant::now() + Duration::from_secs(60))
            .unwrap();
        assert!(matches!(outcome, MarkOutcome::Provisional { .. }));
        assert_eq!(session.evaluate_win(&id), Ok(false));
    }

    #[test]
    fn test_declare_invalid_win_changes_nothing() {
        let (mut session, id) = session_with_player();
        session.announce("term-0").unwrap();

        assert_eq!(
            session.declare_win(&id, Utc::now()),
            Err(GameError::InvalidWin)
        );
        let player = session.player(&id).unwrap();
        assert!(!player.has_win);
        assert!(session.winners().is_empty());
        assert_eq!(session.declare_win("ghost", Utc::now()), Err(GameError::UnknownPlayer));
    }

    #[test]
    fn test_win_positions_follow_processing_order() {
        let mut session = GameSession::new(GameRules::default(), terms(20));
        let alice = session.register_player("Alice").unwrap().id;
        let bob = session.register_player("Bob").unwrap().id;
        session.set_card(&alice, terms(16)).unwrap();
        session.set_card(&bob, terms(20)[4..].to_vec()).unwrap();

        session.announce("term-5").unwrap();
        mark_all(&mut session, &alice, &["term-5"]);
        mark_all(&mut session, &bob, &["term-5"]);

        assert_eq!(session.declare_win(&bob, Utc::now()), Ok(1));
        assert_eq!(session.declare_win(&alice, Utc::now()), Ok(2));
        assert_eq!(
            session.declare_win(&alice, Utc::now()),
            Err(GameError::AlreadyWon)
        );

        let positions: Vec<u32> = session.winners().iter().map(|w| w.position).collect();
        assert_eq!(positions, vec![1, 2]);
        assert_eq!(session.winners()[0].name, "Bob");
    }

    #[test]
    fn test_winner_is_frozen() {
        let (mut session, id) = session_with_player();
        session.announce("term-0").unwrap();
        mark_all(&mut session, &id, &["term-0"]);
        session.declare_win(&id, Utc::now()).unwrap();

        assert_eq!(
            session.mark(&id, "term-1", Instant::now()),
            Err(GameError::AlreadyWon)
        );
        assert_eq!(session.unmark(&id, "term-0"), Err(GameError::AlreadyWon));

        // Corrections by the operator leave the winner untouched
        session.unannounce("term-0").unwrap();
        let player = session.player(&id).unwrap();
        assert_eq!(player.valid_clicks, 1);
        assert_eq!(player.win_position, Some(1));
    }

    #[test]
    fn test_reset_restarts_positions() {
        let (mut session, id) = session_with_player();
        session.announce("term-0").unwrap();
        mark_all(&mut session, &id, &["term-0"]);
        session.declare_win(&id, Utc::now()).unwrap();

        session.reset();
        let player = session.player(&id).unwrap();
        assert!(!player.has_win);
        assert_eq!(player.name, "Alice");
        assert!(session.winners().is_empty());
        assert!(session.terms().announced().is_empty());

        session.set_card(&id, terms(16)).unwrap();
        session.announce("term-1").unwrap();
        mark_all(&mut session, &id, &["term-1"]);
        assert_eq!(session.declare_win(&id, Utc::now()), Ok(1));
    }
}
