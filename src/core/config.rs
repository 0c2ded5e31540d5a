//! # Configuration
//!
//! Environment-driven configuration, loaded once at startup after
//! `dotenvy::dotenv()`. Required values fail fast with a descriptive error;
//! everything else has a sensible default.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

use anyhow::{Context, Result};
use std::env;

/// Default OpenRouter-compatible chat completions endpoint.
const DEFAULT_AI_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_AI_MODEL: &str = "deepseek/deepseek-r1-0528:free";

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the companion REST backend, e.g. http://localhost:3001/api
    pub api_base_url: String,
    /// Caregiver account credentials used to open the session.
    pub username: String,
    pub password: String,
    /// Chat completions endpoint and model for conversational replies.
    pub ai_api_url: String,
    pub ai_model: String,
    /// Optional AI API key. When absent the companion runs entirely on
    /// canned fallback responses.
    pub ai_api_key: Option<String>,
    pub log_level: String,
    /// Reminder polling cadence in seconds (default 30).
    pub reminder_check_secs: u64,
    /// Memory prompt cadence in seconds (default 300).
    pub memory_prompt_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let api_base_url = env::var("HALO_API_URL")
            .unwrap_or_else(|_| "http://localhost:3001/api".to_string());
        let username =
            env::var("HALO_USERNAME").context("HALO_USERNAME must be set (caregiver account)")?;
        let password =
            env::var("HALO_PASSWORD").context("HALO_PASSWORD must be set (caregiver account)")?;

        let ai_api_key = env::var("AI_API_KEY").ok().filter(|k| !k.is_empty());

        Ok(Config {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            username,
            password,
            ai_api_url: env::var("AI_API_URL").unwrap_or_else(|_| DEFAULT_AI_URL.to_string()),
            ai_model: env::var("AI_MODEL").unwrap_or_else(|_| DEFAULT_AI_MODEL.to_string()),
            ai_api_key,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            reminder_check_secs: parse_secs("REMINDER_CHECK_SECONDS", 30),
            memory_prompt_secs: parse_secs("MEMORY_PROMPT_SECONDS", 300),
        })
    }
}

fn parse_secs(var: &str, default: u64) -> u64 {
    env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|&v| v > 0)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_secs_default_on_missing() {
        env::remove_var("HALO_TEST_SECS");
        assert_eq!(parse_secs("HALO_TEST_SECS", 30), 30);
    }

    #[test]
    fn test_parse_secs_rejects_zero() {
        env::set_var("HALO_TEST_SECS_ZERO", "0");
        assert_eq!(parse_secs("HALO_TEST_SECS_ZERO", 300), 300);
        env::remove_var("HALO_TEST_SECS_ZERO");
    }

    #[test]
    fn test_parse_secs_reads_value() {
        env::set_var("HALO_TEST_SECS_VAL", "45");
        assert_eq!(parse_secs("HALO_TEST_SECS_VAL", 30), 45);
        env::remove_var("HALO_TEST_SECS_VAL");
    }
}
