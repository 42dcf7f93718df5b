use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if a variable is present but malformed.
#[derive(Debug, Clone)]
pub struct Config {
    /// Optional: without it the generation endpoint answers 422.
    pub anthropic_api_key: Option<String>,
    pub port: u16,
    pub rust_log: String,
    /// Quiet window before a burst of edits triggers one background relayout.
    pub layout_debounce: Duration,
    /// How long the measurement surface lets layout settle before reading heights.
    pub measure_settle: Duration,
    /// Documents not touched for this long are evicted.
    pub session_idle_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            layout_debounce: millis_env("LAYOUT_DEBOUNCE_MS", 200)?,
            measure_settle: millis_env("MEASURE_SETTLE_MS", 50)?,
            session_idle_ttl: secs_env("SESSION_IDLE_TTL_SECS", 3600)?,
        })
    }
}

/// Unset and blank both read as `None`.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn millis_env(key: &str, default_ms: u64) -> Result<Duration> {
    match optional_env(key) {
        None => Ok(Duration::from_millis(default_ms)),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .with_context(|| format!("{key} must be a whole number of milliseconds, got '{raw}'")),
    }
}

fn secs_env(key: &str, default_secs: u64) -> Result<Duration> {
    match optional_env(key) {
        None => Ok(Duration::from_secs(default_secs)),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .with_context(|| format!("{key} must be a whole number of seconds, got '{raw}'")),
    }
}
