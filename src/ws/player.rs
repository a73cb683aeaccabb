//! Player message handlers
//!
//! Handlers for registration, cards, marking and win declarations. Every
//! handler except registration acts on the player bound to the connection.

use crate::error::GameError;
use crate::protocol::ServerMessage;
use crate::state::AppState;
use crate::types::{PlayerId, Role, Term};
use std::sync::Arc;

use super::Connection;

/// Reply for a rejected action, or nothing when the rejection is silent
fn rejection(e: GameError) -> Option<ServerMessage> {
    if e.is_silent() {
        tracing::debug!("Silently dropped action: {}", e);
        None
    } else {
        Some(e.into())
    }
}

fn bound_player(conn: &Connection) -> Result<&PlayerId, GameError> {
    conn.player_id.as_ref().ok_or(GameError::UnknownPlayer)
}

pub async fn handle_register_player(
    state: &Arc<AppState>,
    conn: &mut Connection,
    name: String,
) -> Option<ServerMessage> {
    if conn.player_id.is_some() {
        return Some(GameError::AlreadyRegistered.into());
    }
    tracing::info!("Player registration: {}", name);
    match state.register_player(&name).await {
        Ok(player) => {
            conn.player_id = Some(player.id.clone());
            if conn.role == Role::Viewer {
                conn.role = Role::Player;
            }
            Some(ServerMessage::PlayerRegistered {
                player_id: player.id,
                name: player.name,
            })
        }
        Err(e) => rejection(e),
    }
}

pub async fn handle_request_card(
    state: &Arc<AppState>,
    conn: &Connection,
) -> Option<ServerMessage> {
    let player_id = match bound_player(conn) {
        Ok(id) => id,
        Err(e) => return rejection(e),
    };
    match state.assign_card(player_id).await {
        Ok(card) => Some(ServerMessage::CardAssigned { card }),
        Err(e) => rejection(e),
    }
}

pub async fn handle_submit_card(
    state: &Arc<AppState>,
    conn: &Connection,
    card: Vec<Term>,
) -> Option<ServerMessage> {
    let player_id = match bound_player(conn) {
        Ok(id) => id,
        Err(e) => return rejection(e),
    };
    state.report_card(player_id, card).await.err().and_then(rejection)
}

pub async fn handle_mark(
    state: &Arc<AppState>,
    conn: &Connection,
    term: Term,
) -> Option<ServerMessage> {
    let player_id = match bound_player(conn) {
        Ok(id) => id,
        Err(e) => return rejection(e),
    };
    match state.mark_term(player_id, &term).await {
        Ok(mark_state) => Some(ServerMessage::MarkAck {
            term,
            state: mark_state,
        }),
        Err(e) => rejection(e),
    }
}

pub async fn handle_unmark(
    state: &Arc<AppState>,
    conn: &Connection,
    term: Term,
) -> Option<ServerMessage> {
    let player_id = match bound_player(conn) {
        Ok(id) => id,
        Err(e) => return rejection(e),
    };
    match state.unmark_term(player_id, &term).await {
        Ok(_) => Some(ServerMessage::Unmarked { term }),
        Err(e) => rejection(e),
    }
}

pub async fn handle_declare_win(
    state: &Arc<AppState>,
    conn: &Connection,
) -> Option<ServerMessage> {
    let player_id = match bound_player(conn) {
        Ok(id) => id,
        Err(e) => return rejection(e),
    };
    match state.declare_win(player_id).await {
        Ok(position) => Some(ServerMessage::WinConfirmed { position }),
        Err(e) => {
            tracing::info!("Rejected win declaration from {}: {}", player_id, e);
            rejection(e)
        }
    }
}
