use crate::error::GameError;
use crate::types::Term;

/// Operator-managed candidate terms and the ordered list of announced terms
///
/// Announced terms are a subset of every term ever added: removing an active
/// term does not retract its announcement.
#[derive(Debug, Clone, Default)]
pub struct TermRegistry {
    active: Vec<Term>,
    announced: Vec<Term>,
}

impl TermRegistry {
    /// Build a registry from initial terms, skipping empties and duplicates
    pub fn with_terms<I>(terms: I) -> Self
    where
        I: IntoIterator<Item = Term>,
    {
        let mut registry = Self::default();
        for term in terms {
            if let Err(e) = registry.add(term) {
                tracing::warn!("Skipping initial term: {}", e);
            }
        }
        registry
    }

    pub fn active(&self) -> &[Term] {
        &self.active
    }

    pub fn announced(&self) -> &[Term] {
        &self.announced
    }

    pub fn contains(&self, term: &str) -> bool {
        self.active.iter().any(|t| t == term)
    }

    pub fn is_announced(&self, term: &str) -> bool {
        self.announced.iter().any(|t| t == term)
    }

    pub fn add(&mut self, text: Term) -> Result<(), GameError> {
        if text.trim().is_empty() {
            return Err(GameError::EmptyTerm);
        }
        if self.contains(&text) {
            return Err(GameError::DuplicateTerm(text));
        }
        self.active.push(text);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<Term, GameError> {
        if index >= self.active.len() {
            return Err(GameError::IndexOutOfRange {
                index,
                len: self.active.len(),
            });
        }
        Ok(self.active.remove(index))
    }

    pub fn announce(&mut self, term: &str) -> Result<(), GameError> {
        if !self.contains(term) {
            return Err(GameError::UnknownTerm(term.to_string()));
        }
        if self.is_announced(term) {
            return Err(GameError::AlreadyAnnounced(term.to_string()));
        }
        self.announced.push(term.to_string());
        Ok(())
    }

    pub fn unannounce(&mut self, term: &str) -> Result<(), GameError> {
        let index = self
            .announced
            .iter()
            .position(|t| t == term)
            .ok_or_else(|| GameError::NotAnnounced(term.to_string()))?;
        self.announced.remove(index);
        Ok(())
    }

    /// Clear announcements; the active list is untouched
    pub fn reset(&mut self) {
        self.announced.clear();
    }

    /// Terms a card may be drawn from: active terms, then announced terms
    /// that are no longer active
    pub fn card_pool(&self) -> Vec<Term> {
        let mut pool = self.active.clone();
        for term in &self.announced {
            if !pool.contains(term) {
                pool.push(term.clone());
            }
        }
        pool
    }
}
