//! Operator-only command handlers
//!
//! All handlers in this module except login require the Operator role.
//! Authorization is checked in the main dispatch layer before calling these.
//! Successful commands reply with nothing; their effect reaches every client
//! through the broadcast channel.

use crate::error::GameError;
use crate::protocol::ServerMessage;
use crate::state::AppState;
use crate::types::{Role, Term};
use std::sync::Arc;

use super::Connection;

pub fn handle_login(
    state: &Arc<AppState>,
    conn: &mut Connection,
    secret: &str,
) -> Option<ServerMessage> {
    if !state.auth.validate(secret) {
        tracing::warn!("Operator login failed");
        return Some(GameError::Unauthorized.into());
    }
    tracing::info!("Connection elevated to operator");
    conn.role = Role::Operator;
    Some(ServerMessage::OperatorAuthenticated)
}

pub async fn handle_add_term(state: &Arc<AppState>, term: Term) -> Option<ServerMessage> {
    tracing::info!("Operator adding term: {}", term);
    state.add_term(term).await.err().map(Into::into)
}

pub async fn handle_remove_term(state: &Arc<AppState>, index: usize) -> Option<ServerMessage> {
    tracing::info!("Operator removing term at index {}", index);
    state.remove_term(index).await.err().map(Into::into)
}

pub async fn handle_announce(state: &Arc<AppState>, term: Term) -> Option<ServerMessage> {
    state.announce_term(&term).await.err().map(Into::into)
}

pub async fn handle_unannounce(state: &Arc<AppState>, term: Term) -> Option<ServerMessage> {
    state.unannounce_term(&term).await.err().map(Into::into)
}

pub async fn handle_reset(state: &Arc<AppState>) -> Option<ServerMessage> {
    tracing::info!("Operator resetting the session");
    state.reset_session().await;
    None
}
