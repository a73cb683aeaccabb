//! WebSocket message dispatch
//!
//! This module provides the main entry point for handling client messages.
//! Authorization is checked here, then dispatched to role-specific handler modules.

use crate::error::GameError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::Role;
use std::sync::Arc;

use super::{operator, player, Connection};

/// Macro to check operator authorization and return early if unauthorized
macro_rules! check_operator {
    ($conn:expr, $action:expr) => {
        if $conn.role != Role::Operator {
            tracing::warn!("Rejected operator action from {:?}: {}", $conn.role, $action);
            return Some(GameError::Unauthorized.into());
        }
    };
}

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    conn: &mut Connection,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::OperatorLogin { secret } => operator::handle_login(state, conn, &secret),

        // Queries
        ClientMessage::GetState => Some(ServerMessage::GameState {
            state: state.snapshot().await,
        }),

        ClientMessage::GetLeaderboard => Some(ServerMessage::LeaderboardUpdated {
            entries: state.leaderboard().await,
        }),

        // Player messages
        ClientMessage::RegisterPlayer { name } => {
            player::handle_register_player(state, conn, name).await
        }

        ClientMessage::RequestCard => player::handle_request_card(state, conn).await,

        ClientMessage::SubmitCard { card } => player::handle_submit_card(state, conn, card).await,

        ClientMessage::MarkTerm { term } => player::handle_mark(state, conn, term).await,

        ClientMessage::UnmarkTerm { term } => player::handle_unmark(state, conn, term).await,

        ClientMessage::DeclareWin => player::handle_declare_win(state, conn).await,

        // Operator-only commands (authorization checked before dispatch)
        ClientMessage::OperatorAddTerm { term } => {
            check_operator!(conn, "add terms");
            operator::handle_add_term(state, term).await
        }

        ClientMessage::OperatorRemoveTerm { index } => {
            check_operator!(conn, "remove terms");
            operator::handle_remove_term(state, index).await
        }

        ClientMessage::OperatorAnnounce { term } => {
            check_operator!(conn, "announce terms");
            operator::handle_announce(state, term).await
        }

        ClientMessage::OperatorUnannounce { term } => {
            check_operator!(conn, "un-announce terms");
            operator::handle_unannounce(state, term).await
        }

        ClientMessage::OperatorReset => {
            check_operator!(conn, "reset the session");
            operator::handle_reset(state).await
        }
    }
}
