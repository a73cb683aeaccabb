// Public API for integration tests and potential library usage

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod protocol;
pub mod state;
pub mod timers;
pub mod types;
pub mod ws;
