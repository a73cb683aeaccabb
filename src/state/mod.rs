mod leaderboard;
mod marking;
mod player;
mod session;
mod terms;
mod win;

pub use leaderboard::rank;
pub use marking::{MarkChange, MarkOutcome, RevertedMark};
pub use player::{CellMark, Player, PlayerRegistry};
pub use session::{GameSession, RevertTicket};
pub use terms::TermRegistry;
pub use win::evaluate;

use crate::auth::AuthConfig;
use crate::timers::spawn_revert_timer;
use crate::error::GameError;
use crate::protocol::{DirectMessage, ServerMessage};
use crate::types::*;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

/// Shared application state
///
/// Every action locks the session for its whole duration, so actions are
/// applied one at a time in arrival order. Events are published while the
/// lock is held so subscribers see them in the same order.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Mutex<GameSession>>,
    /// Events for every connected client
    pub broadcast: broadcast::Sender<ServerMessage>,
    /// Events addressed to one player
    pub direct: broadcast::Sender<DirectMessage>,
    pub auth: Arc<AuthConfig>,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_config(GameRules::default(), Vec::new(), AuthConfig::disabled())
    }

    pub fn with_config(rules: GameRules, initial_terms: Vec<Term>, auth: AuthConfig) -> Self {
        let (broadcast, _rx) = broadcast::channel(256);
        let (direct, _rx) = broadcast::channel(256);
        Self {
            session: Arc::new(Mutex::new(GameSession::new(rules, initial_terms))),
            broadcast,
            direct,
            auth: Arc::new(auth),
        }
    }

    pub fn broadcast_to_all(&self, msg: ServerMessage) {
        // No receivers connected is fine
        let _ = self.broadcast.send(msg);
    }

    pub fn send_to_player(&self, player_id: &str, msg: ServerMessage) {
        let _ = self.direct.send(DirectMessage {
            player_id: player_id.to_string(),
            msg,
        });
    }

    fn broadcast_leaderboard(&self, session: &GameSession) {
        self.broadcast_to_all(ServerMessage::LeaderboardUpdated {
            entries: session.leaderboard(),
        });
    }

    fn broadcast_player_count(&self, session: &GameSession) {
        self.broadcast_to_all(ServerMessage::PlayerCount {
            count: session.players().connected_count(),
        });
    }

    // ---- Queries ----

    pub async fn snapshot(&self) -> GameSnapshot {
        self.session.lock().await.snapshot()
    }

    pub async fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        self.session.lock().await.leaderboard()
    }

    pub async fn active_terms(&self) -> Vec<Term> {
        self.session.lock().await.terms().active().to_vec()
    }

    pub async fn winners(&self) -> Vec<WinRecord> {
        self.session.lock().await.winners().to_vec()
    }

    // ---- Operator actions ----

    pub async fn add_term(&self, term: Term) -> Result<Vec<Term>, GameError> {
        let mut session = self.session.lock().await;
        session.add_term(term.clone())?;
        tracing::info!("Term added: {}", term);

        let terms = session.terms().active().to_vec();
        self.broadcast_to_all(ServerMessage::TermsChanged {
            terms: terms.clone(),
        });
        Ok(terms)
    }

    pub async fn remove_term(&self, index: usize) -> Result<Vec<Term>, GameError> {
        let mut session = self.session.lock().await;
        let removed = session.remove_term(index)?;
        tracing::info!("Term removed at {}: {}", index, removed);

        let terms = session.terms().active().to_vec();
        self.broadcast_to_all(ServerMessage::TermsChanged {
            terms: terms.clone(),
        });
        Ok(terms)
    }

    pub async fn announce_term(&self, term: &str) -> Result<Vec<Term>, GameError> {
        let mut session = self.session.lock().await;
        let promoted = session.announce(term)?;
        tracing::info!(
            "Term announced: {} ({} provisional marks promoted)",
            term,
            promoted.len()
        );

        let announced = session.terms().announced().to_vec();
        self.broadcast_to_all(ServerMessage::TermAnnounced {
            term: term.to_string(),
            announced: announced.clone(),
        });
        for change in promoted {
            self.send_to_player(
                &change.player_id,
                ServerMessage::MarkConfirmed { term: change.term },
            );
        }
        self.broadcast_leaderboard(&session);
        Ok(announced)
    }

    pub async fn unannounce_term(&self, term: &str) -> Result<Vec<Term>, GameError> {
        let mut session = self.session.lock().await;
        let revoked = session.unannounce(term)?;
        tracing::info!(
            "Term un-announced: {} ({} marks revoked)",
            term,
            revoked.len()
        );

        let announced = session.terms().announced().to_vec();
        self.broadcast_to_all(ServerMessage::TermUnannounced {
            term: term.to_string(),
            announced: announced.clone(),
        });
        for change in revoked {
            self.send_to_player(
                &change.player_id,
                ServerMessage::MarkRevoked { term: change.term },
            );
        }
        self.broadcast_leaderboard(&session);
        Ok(announced)
    }

    pub async fn reset_session(&self) {
        let mut session = self.session.lock().await;
        session.reset();
        tracing::info!("Session reset ({} players kept)", session.players().len());

        self.broadcast_to_all(ServerMessage::SessionReset);
        self.broadcast_leaderboard(&session);
    }

    // ---- Player actions ----

    pub async fn register_player(&self, name: &str) -> Result<Player, GameError> {
        let mut session = self.session.lock().await;
        let player = session.register_player(name)?;
        tracing::info!(
            "Player registered: {} ({} total)",
            player.name,
            session.players().len()
        );

        self.broadcast_player_count(&session);
        self.broadcast_leaderboard(&session);
        Ok(player)
    }

    pub async fn assign_card(&self, player_id: &str) -> Result<Vec<Term>, GameError> {
        let mut session = self.session.lock().await;
        session.assign_card(player_id, &mut rand::rng())
    }

    pub async fn report_card(&self, player_id: &str, card: Vec<Term>) -> Result<(), GameError> {
        let matches = self.session.lock().await.report_card(player_id, card)?;
        if !matches {
            tracing::warn!("Player {} reported a card that differs from theirs", player_id);
        }
        Ok(())
    }

    pub async fn mark_term(&self, player_id: &str, term: &str) -> Result<MarkState, GameError> {
        let mut session = self.session.lock().await;
        let outcome = session.mark(player_id, term, tokio::time::Instant::now())?;

        let state = outcome.state();
        match outcome {
            MarkOutcome::Unchanged => return Ok(state),
            MarkOutcome::Confirmed { .. } => {}
            MarkOutcome::Provisional { revert, .. } => {
                let handle = spawn_revert_timer(self.clone(), revert.clone());
                session.attach_revert_handle(&revert, handle);
            }
        }
        tracing::debug!("Player {} marked {} ({:?})", player_id, term, state);

        self.broadcast_leaderboard(&session);
        Ok(state)
    }

    /// Returns whether a mark was removed
    pub async fn unmark_term(&self, player_id: &str, term: &str) -> Result<bool, GameError> {
        let mut session = self.session.lock().await;
        let changed = session.unmark(player_id, term)?;
        if changed {
            tracing::debug!("Player {} unmarked {}", player_id, term);
            self.broadcast_leaderboard(&session);
        }
        Ok(changed)
    }

    pub async fn declare_win(&self, player_id: &str) -> Result<u32, GameError> {
        let mut session = self.session.lock().await;
        let position = session.declare_win(player_id, chrono::Utc::now())?;
        tracing::info!("Win declared by {} at position {}", player_id, position);

        self.broadcast_leaderboard(&session);
        Ok(position)
    }

    pub async fn disconnect_player(&self, player_id: &str) {
        let mut session = self.session.lock().await;
        if session.disconnect_player(player_id) {
            tracing::info!("Player disconnected (kept in leaderboard): {}", player_id);
            self.broadcast_player_count(&session);
            self.broadcast_leaderboard(&session);
        }
    }

    /// Called by the revert timer when it fires
    pub async fn expire_provisional(&self, ticket: RevertTicket) {
        let mut session = self.session.lock().await;
        let Some(reverted) = session.expire_provisional(&ticket) else {
            tracing::debug!("Stale revert ticket {} ignored", ticket.id);
            return;
        };
        tracing::debug!(
            "Provisional mark reverted: player {} term {}",
            reverted.player_id,
            reverted.term
        );

        self.send_to_player(
            &reverted.player_id,
            ServerMessage::MarkReverted {
                term: reverted.term,
            },
        );
        if reverted.rescored {
            self.broadcast_leaderboard(&session);
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
