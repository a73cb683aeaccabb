//! Process configuration from environment variables

use crate::types::{GameRules, Term};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Directory served for everything that is not an API or WebSocket route
    pub static_dir: String,
    /// Active terms at startup
    pub initial_terms: Vec<Term>,
    pub rules: GameRules,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            static_dir: "public".to_string(),
            initial_terms: Vec::new(),
            rules: GameRules::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let default_rules = defaults.rules;

        let port = env_parse("PORT").unwrap_or(defaults.port);
        let static_dir = std::env::var("STATIC_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.static_dir);
        let initial_terms = std::env::var("BINGO_TERMS")
            .map(|v| parse_terms(&v))
            .unwrap_or_default();

        let rules = GameRules {
            spam_threshold: env_parse("BINGO_SPAM_THRESHOLD").unwrap_or(default_rules.spam_threshold),
            spam_window_ms: env_parse("BINGO_SPAM_WINDOW_MS").unwrap_or(default_rules.spam_window_ms),
            provisional_ms: env_parse("BINGO_PROVISIONAL_MS").unwrap_or(default_rules.provisional_ms),
        };

        tracing::info!(
            port,
            initial_terms = initial_terms.len(),
            spam_threshold = rules.spam_threshold,
            spam_window_ms = rules.spam_window_ms,
            provisional_ms = rules.provisional_ms,
            "Config loaded"
        );

        Self {
            port,
            static_dir,
            initial_terms,
            rules,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let value = std::env::var(key).ok()?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!("Ignoring invalid value for {}: {:?}", key, value);
            None
        }
    }
}

/// Split a comma-separated term list, trimming and dropping empties
pub fn parse_terms(raw: &str) -> Vec<Term> {
    raw.split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "PORT",
        "STATIC_DIR",
        "BINGO_TERMS",
        "BINGO_SPAM_THRESHOLD",
        "BINGO_SPAM_WINDOW_MS",
        "BINGO_PROVISIONAL_MS",
    ];

    fn clear_env() {
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_parse_terms() {
        assert_eq!(
            parse_terms(" synergy, ,leverage ,,  deep dive"),
            vec!["synergy", "leverage", "deep dive"]
        );
        assert!(parse_terms("").is_empty());
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = Config::from_env();
        assert_eq!(config.port, 8080);
        assert_eq!(config.static_dir, "public");
        assert!(config.initial_terms.is_empty());
        assert_eq!(config.rules, GameRules::default());
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear_env();
        std::env::set_var("PORT", "9000");
        std::env::set_var("BINGO_TERMS", "a,b,c");
        std::env::set_var("BINGO_SPAM_THRESHOLD", "6");
        std::env::set_var("BINGO_PROVISIONAL_MS", "not a number");

        let config = Config::from_env();
        assert_eq!(config.port, 9000);
        assert_eq!(config.initial_terms, vec!["a", "b", "c"]);
        assert_eq!(config.rules.spam_threshold, 6);
        assert_eq!(config.rules.provisional_ms, 10_000);

        clear_env();
    }
}
