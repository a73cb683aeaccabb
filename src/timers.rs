use crate::state::{AppState, RevertTicket};
use tokio::task::AbortHandle;

/// Spawn the task that reverts a provisional mark once its ticket is due
///
/// The returned handle lets the session cancel the revert when the cell
/// changes state first. The session re-checks the ticket when it fires, so a
/// task that slips past cancellation does nothing.
pub fn spawn_revert_timer(state: AppState, ticket: RevertTicket) -> AbortHandle {
    tokio::spawn(async move {
        tokio::time::sleep_until(ticket.due).await;
        state.expire_provisional(ticket).await;
    })
    .abort_handle()
}
