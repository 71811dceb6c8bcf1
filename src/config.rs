//! Configuration loading from TOML with environment variable overrides.
//!
//! Reads an optional `config.toml` and deserializes it into strongly-typed
//! structs. Every field has a default, so a missing file is a valid
//! configuration. The process environment (`POLL_INTERVAL`, `REDIS_URL`,
//! `FETCH_LIMIT`, `PROVIDER_TIMEOUT`, `REDDIT_SUBS`, `YOUTUBE_REGION`)
//! overrides the file. Provider secrets are never stored here; providers
//! read them from the environment.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::types::PollerError;

/// Default config file path, overridable with `TREND_POLLER_CONFIG`.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub poller: PollerConfig,
    pub store: StoreConfig,
    pub providers: ProvidersConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PollerConfig {
    pub poll_interval_secs: u64,
    /// Advisory per-cycle limit handed to every provider.
    pub fetch_limit: usize,
    /// Upper bound on a single provider's fetch within a cycle.
    pub provider_timeout_secs: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            fetch_limit: 100,
            provider_timeout_secs: 15,
        }
    }
}

impl PollerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    pub redis_url: String,
    pub ttl_secs: u64,
    pub key_prefix: String,
    pub update_channel: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".into(),
            ttl_secs: 600,
            key_prefix: "trends:external".into(),
            update_channel: "trends:update".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ProvidersConfig {
    pub twitch: TwitchConfig,
    pub reddit: RedditConfig,
    pub youtube: YouTubeConfig,
    pub tiktok: TikTokConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TwitchConfig {
    pub enabled: bool,
}

impl Default for TwitchConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RedditConfig {
    pub enabled: bool,
    /// Subreddits joined by `+`.
    pub subreddits: String,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            subreddits: "gaming+games+livestreamfail".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct YouTubeConfig {
    pub enabled: bool,
    pub region: String,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            region: "US".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TikTokConfig {
    pub enabled: bool,
}

impl Default for TikTokConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file if it exists, then apply
    /// environment overrides and validate.
    pub fn load(path: &str) -> Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Like [`AppConfig::load`], reading overrides from `lookup` instead of
    /// the process environment.
    pub fn load_with<F>(path: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = if Path::new(path).exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {path}"))?;
            Self::from_toml(&contents)
                .with_context(|| format!("Failed to parse config file: {path}"))?
        } else {
            Self::default()
        };

        config.apply_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string (no overrides applied).
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply `POLL_INTERVAL`, `REDIS_URL`, `FETCH_LIMIT`, `PROVIDER_TIMEOUT`,
    /// `REDDIT_SUBS` and `YOUTUBE_REGION` from `lookup`. Empty or
    /// unparseable values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("POLL_INTERVAL") {
            match parse_duration(&v) {
                Some(d) => self.poller.poll_interval_secs = d.as_secs(),
                None => warn!(value = %v, "Ignoring unparseable POLL_INTERVAL"),
            }
        }

        if let Some(v) = non_empty("REDIS_URL") {
            self.store.redis_url = v;
        }

        if let Some(v) = non_empty("FETCH_LIMIT") {
            match v.trim().parse::<usize>() {
                Ok(n) => self.poller.fetch_limit = n,
                Err(_) => warn!(value = %v, "Ignoring unparseable FETCH_LIMIT"),
            }
        }

        if let Some(v) = non_empty("PROVIDER_TIMEOUT") {
            match parse_duration(&v) {
                Some(d) => self.poller.provider_timeout_secs = d.as_secs(),
                None => warn!(value = %v, "Ignoring unparseable PROVIDER_TIMEOUT"),
            }
        }

        if let Some(v) = non_empty("REDDIT_SUBS") {
            self.providers.reddit.subreddits = v.trim().to_string();
        }

        if let Some(v) = non_empty("YOUTUBE_REGION") {
            self.providers.youtube.region = v.trim().to_string();
        }
    }

    /// Reject values that would make the poller spin or publish nothing.
    pub fn validate(&self) -> std::result::Result<(), PollerError> {
        if self.poller.poll_interval_secs == 0 {
            return Err(PollerError::Config("poll interval must be at least 1s".into()));
        }
        if self.poller.provider_timeout_secs == 0 {
            return Err(PollerError::Config("provider timeout must be at least 1s".into()));
        }
        if self.store.ttl_secs == 0 {
            return Err(PollerError::Config("store TTL must be at least 1s".into()));
        }
        if self.store.key_prefix.is_empty() {
            return Err(PollerError::Config("store key prefix must not be empty".into()));
        }
        Ok(())
    }
}

/// Parse a duration: bare seconds (`90`) or one or more `<n><unit>`
/// segments with units `h`, `m`, `s` or `ms` (`90s`, `5m`, `1m30s`, `500ms`).
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let mut total_ms: u64 = 0;
    let mut rest = s;
    while !rest.is_empty() {
        let digits_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits_end == 0 {
            return None;
        }
        let n: u64 = rest[..digits_end].parse().ok()?;
        rest = &rest[digits_end..];

        let unit_end = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let per_unit_ms = match &rest[..unit_end] {
            "h" => 3_600_000,
            "m" => 60_000,
            "s" => 1_000,
            "ms" => 1,
            _ => return None,
        };
        rest = &rest[unit_end..];

        total_ms = total_ms.checked_add(n.checked_mul(per_unit_ms)?)?;
    }
    Some(Duration::from_millis(total_ms))
}
