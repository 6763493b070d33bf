// src/config.rs

use std::{env, time::Duration};

use dotenvy::dotenv;

/// Minimum number of whitespace-separated words a written answer needs.
pub const MIN_WRITTEN_WORDS: usize = 2;

/// Marker inside `question_type` identifying a written (free-text) question.
pub const FREE_TEXT_MARKER: &str = "Schriftlicher";

/// Percentage from which a result counts as excellent.
pub const EXCELLENT_PERCENTAGE: u32 = 80;

/// Percentage from which a result counts as passed.
pub const PASSING_PERCENTAGE: u32 = 50;

/// Leaderboard bonus per exam taken.
pub const EXAMS_TAKEN_RANK_WEIGHT: u32 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    /// Upper bound for a single round-trip to the exam store.
    pub store_timeout_secs: u64,
    /// Sessions untouched for this long are discarded.
    pub session_idle_secs: u64,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let store_timeout_secs = env::var("STORE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        let session_idle_secs = env::var("SESSION_IDLE_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&secs| secs > 0)
            .unwrap_or(3600);

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        Self {
            database_url,
            jwt_secret,
            rust_log,
            store_timeout_secs,
            session_idle_secs,
            bind_addr,
        }
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    pub fn session_idle_ttl(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }
}
