use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::game::engine::SessionConfig;

pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub data_dir: String,
    /// Fetch sentences from another backend instead of the local store
    pub sentence_api_url: Option<String>,
    pub session: SessionConfig,
    pub judge: JudgeConfig,
}

/// Language model settings. Without an API key every mode is judged locally.
pub struct JudgeConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = SessionConfig::default();

        Self {
            port: parse_or("PORT", 3000),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://verbotron.db?mode=rwc".to_string()),
            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            sentence_api_url: non_empty("SENTENCE_API_URL"),
            session: SessionConfig {
                session_seconds: parse_or("SESSION_SECONDS", defaults.session_seconds),
                countdown_ticks: parse_or("COUNTDOWN_TICKS", defaults.countdown_ticks),
                pacing: Duration::from_millis(parse_or("ROUND_PACING_MS", 800)),
                retry_backoff: Duration::from_millis(parse_or("JUDGE_RETRY_BACKOFF_MS", 1000)),
                ..defaults
            },
            judge: JudgeConfig {
                api_key: non_empty("JUDGE_API_KEY"),
                base_url: env::var("JUDGE_BASE_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
                model: env::var("JUDGE_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
                timeout: Duration::from_secs(parse_or("JUDGE_TIMEOUT_SECS", 20)),
            },
        }
    }

    pub fn addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
