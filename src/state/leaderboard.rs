use super::player::Player;
use super::session::GameSession;
use crate::types::LeaderboardEntry;

/// Rank players: winners by frozen position, then everyone else by valid clicks
///
/// `players` must be in registration order; it breaks ties between
/// non-winners. Recomputed from scratch on every call.
pub fn rank<'a, I>(players: I) -> Vec<LeaderboardEntry>
where
    I: IntoIterator<Item = &'a Player>,
{
    let (mut winners, mut others): (Vec<&Player>, Vec<&Player>) =
        players.into_iter().partition(|p| p.has_win);

    winners.sort_by_key(|p| p.win_position.unwrap_or(u32::MAX));
    // Stable sort keeps registration order among equal scores
    others.sort_by(|a, b| b.valid_clicks.cmp(&a.valid_clicks));

    let winner_count = winners.len() as u32;
    let ranked_winners = winners
        .into_iter()
        .map(|p| entry(p, p.win_position.unwrap_or(0)));
    let ranked_others = others
        .into_iter()
        .enumerate()
        .map(|(i, p)| entry(p, winner_count + i as u32 + 1));

    ranked_winners.chain(ranked_others).collect()
}

fn entry(player: &Player, rank: u32) -> LeaderboardEntry {
    LeaderboardEntry {
        rank,
        id: player.id.clone(),
        name: player.name.clone(),
        valid_clicks: player.valid_clicks,
        total_clicks: player.total_clicks,
        has_win: player.has_win,
        win_position: player.win_position,
        win_time: player.win_time.map(|t| t.to_rfc3339()),
        disconnected: !player.connected,
        marked_terms: player.marked_terms(),
    }
}

impl GameSession {
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        rank(self.players.in_join_order())
    }
}
