use crate::error::GameError;
use crate::types::*;
use chrono::{DateTime, Utc};
use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use std::collections::{BTreeMap, HashMap, VecDeque};
use tokio::time::Instant;

/// A marked cell on a player's card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellMark {
    pub state: MarkState,
    /// Whether this mark has been added to `total_clicks`/`valid_clicks`
    pub scored: bool,
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Registration order, used as the leaderboard tie-breaker
    pub joined_seq: u64,
    /// Empty until a card is assigned
    pub card: Vec<Term>,
    /// Card as last reported by the client (informational)
    pub reported_card: Option<Vec<Term>>,
    /// Marked cells keyed by card index
    pub marks: BTreeMap<usize, CellMark>,
    pub valid_clicks: u32,
    pub total_clicks: u32,
    pub has_win: bool,
    pub win_position: Option<u32>,
    pub win_time: Option<DateTime<Utc>>,
    pub connected: bool,
    /// Timestamps of recent mark attempts, oldest first
    pub recent_marks: VecDeque<Instant>,
}

impl Player {
    pub fn new(id: PlayerId, name: String, joined_seq: u64) -> Self {
        Self {
            id,
            name,
            joined_seq,
            card: Vec::new(),
            reported_card: None,
            marks: BTreeMap::new(),
            valid_clicks: 0,
            total_clicks: 0,
            has_win: false,
            win_position: None,
            win_time: None,
            connected: true,
            recent_marks: VecDeque::new(),
        }
    }

    /// Card index holding `term`, if the term is on this player's card
    pub fn cell_of(&self, term: &str) -> Option<usize> {
        self.card.iter().position(|t| t == term)
    }

    pub fn marked_terms(&self) -> Vec<Term> {
        self.marks
            .keys()
            .filter_map(|cell| self.card.get(*cell).cloned())
            .collect()
    }

    /// Record a mark attempt and report whether the player is spamming
    ///
    /// The current attempt counts toward the threshold.
    pub fn record_mark_attempt(&mut self, now: Instant, rules: &GameRules) -> bool {
        let window = rules.spam_window();
        while let Some(oldest) = self.recent_marks.front() {
            if now.saturating_duration_since(*oldest) >= window {
                self.recent_marks.pop_front();
            } else {
                break;
            }
        }
        self.recent_marks.push_back(now);
        self.recent_marks.len() >= rules.spam_threshold
    }

    pub fn add_score(&mut self) {
        self.total_clicks += 1;
        self.valid_clicks += 1;
    }

    pub fn remove_score(&mut self) {
        self.total_clicks = self.total_clicks.saturating_sub(1);
        self.valid_clicks = self.valid_clicks.saturating_sub(1);
    }

    /// Wipe card, marks, scores and win state; identity and name survive
    pub fn clear_progress(&mut self) {
        self.card.clear();
        self.reported_card = None;
        self.marks.clear();
        self.valid_clicks = 0;
        self.total_clicks = 0;
        self.has_win = false;
        self.win_position = None;
        self.win_time = None;
        self.recent_marks.clear();
    }
}

/// All players ever registered in this process, connected or not
#[derive(Debug, Clone, Default)]
pub struct PlayerRegistry {
    players: HashMap<PlayerId, Player>,
    next_seq: u64,
}

impl PlayerRegistry {
    pub fn register(&mut self, name: &str) -> Result<Player, GameError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GameError::EmptyName);
        }

        let player = Player::new(ulid::Ulid::new().to_string(), name.to_string(), self.next_seq);
        self.next_seq += 1;
        self.players.insert(player.id.clone(), player.clone());
        Ok(player)
    }

    pub fn get(&self, id: &str) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.values_mut()
    }

    /// Players in registration order
    pub fn in_join_order(&self) -> Vec<&Player> {
        let mut players: Vec<&Player> = self.players.values().collect();
        players.sort_by_key(|p| p.joined_seq);
        players
    }

    pub fn connected_count(&self) -> usize {
        self.players.values().filter(|p| p.connected).count()
    }

    /// Flag a player as disconnected; returns false for unknown ids
    pub fn mark_disconnected(&mut self, id: &str) -> bool {
        match self.players.get_mut(id) {
            Some(player) => {
                player.connected = false;
                true
            }
            None => false,
        }
    }
}

/// Draw `CARD_SIZE` distinct terms from `pool` in random order
pub fn draw_card<R: Rng + ?Sized>(pool: &[Term], rng: &mut R) -> Result<Vec<Term>, GameError> {
    if pool.len() < CARD_SIZE {
        return Err(GameError::NotEnoughTerms {
            needed: CARD_SIZE,
            available: pool.len(),
        });
    }

    let mut card: Vec<Term> = pool.choose_multiple(rng, CARD_SIZE).cloned().collect();
    card.shuffle(rng);
    Ok(card)
}

/// Check that `card` holds exactly `CARD_SIZE` distinct terms, all from `pool`
pub fn validate_card(card: &[Term], pool: &[Term]) -> Result<(), GameError> {
    if card.len() != CARD_SIZE {
        return Err(GameError::InvalidCard(format!(
            "expected {} terms, got {}",
            CARD_SIZE,
            card.len()
        )));
    }
    for (i, term) in card.iter().enumerate() {
        if card[..i].contains(term) {
            return Err(GameError::InvalidCard(format!("duplicate term {}", term)));
        }
        if !pool.contains(term) {
            return Err(GameError::InvalidCard(format!("unknown term {}", term)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn pool(n: usize) -> Vec<Term> {
        (0..n).map(|i| format!("term-{}", i)).collect()
    }

    #[test]
    fn test_register_player() {
        let mut players = PlayerRegistry::default();
        let alice = players.register("  Alice ").unwrap();
        let bob = players.register("Bob").unwrap();

        assert_eq!(alice.name, "Alice");
        assert_ne!(alice.id, bob.id);
        assert!(alice.joined_seq < bob.joined_seq);
        assert_eq!(players.connected_count(), 2);
        assert_eq!(players.register("   ").unwrap_err(), GameError::EmptyName);
    }

    #[test]
    fn test_disconnect_keeps_player() {
        let mut players = PlayerRegistry::default();
        let alice = players.register("Alice").unwrap();

        assert!(players.mark_disconnected(&alice.id));
        assert!(!players.mark_disconnected("nobody"));
        assert_eq!(players.connected_count(), 0);
        assert_eq!(players.len(), 1);
    }

    #[test]
    fn test_draw_card_distinct_terms() {
        let pool = pool(20);
        let card = draw_card(&pool, &mut rand::rng()).unwrap();

        assert_eq!(card.len(), CARD_SIZE);
        assert!(validate_card(&card, &pool).is_ok());
    }

    #[test]
    fn test_draw_card_needs_enough_terms() {
        let result = draw_card(&pool(15), &mut rand::rng());
        assert_eq!(
            result,
            Err(GameError::NotEnoughTerms {
                needed: 16,
                available: 15
            })
        );
    }

    #[test]
    fn test_validate_card() {
        let pool = pool(16);
        assert!(validate_card(&pool, &pool).is_ok());

        let mut dup = pool.clone();
        dup[15] = dup[0].clone();
        assert!(matches!(
            validate_card(&dup, &pool),
            Err(GameError::InvalidCard(_))
        ));

        assert!(matches!(
            validate_card(&pool[..15], &pool),
            Err(GameError::InvalidCard(_))
        ));

        let mut foreign = pool.clone();
        foreign[3] = "elsewhere".to_string();
        assert!(matches!(
            validate_card(&foreign, &pool),
            Err(GameError::InvalidCard(_))
        ));
    }

    #[test]
    fn test_spam_window() {
        let rules = GameRules::default();
        let mut player = Player::new("p".to_string(), "P".to_string(), 0);
        let start = Instant::now();

        assert!(!player.record_mark_attempt(start, &rules));
        assert!(!player.record_mark_attempt(start + Duration::from_millis(500), &rules));
        assert!(!player.record_mark_attempt(start + Duration::from_millis(1000), &rules));
        // Fourth attempt inside four seconds
        assert!(player.record_mark_attempt(start + Duration::from_millis(1500), &rules));

        // Attempts older than the window drop out
        assert!(!player.record_mark_attempt(start + Duration::from_millis(9000), &rules));
        assert_eq!(player.recent_marks.len(), 1);
    }

    #[test]
    fn test_clear_progress_keeps_identity() {
        let mut player = Player::new("p".to_string(), "P".to_string(), 7);
        player.card = pool(16);
        player.marks.insert(
            0,
            CellMark {
                state: MarkState::Confirmed,
                scored: true,
            },
        );
        player.add_score();
        player.has_win = true;
        player.win_position = Some(1);

        player.clear_progress();

        assert_eq!(player.id, "p");
        assert_eq!(player.name, "P");
        assert_eq!(player.joined_seq, 7);
        assert!(player.card.is_empty());
        assert!(player.marks.is_empty());
        assert_eq!((player.valid_clicks, player.total_clicks), (0, 0));
        assert!(!player.has_win);
        assert_eq!(player.win_position, None);
    }

    #[test]
    fn test_remove_score_floors_at_zero() {
        let mut player = Player::new("p".to_string(), "P".to_string(), 0);
        player.remove_score();
        assert_eq!((player.valid_clicks, player.total_clicks), (0, 0));
    }
}
