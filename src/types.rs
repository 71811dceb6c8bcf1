//! Shared types for the trend poller.
//!
//! These types form the data model used across providers, the engine
//! and the store layer. They are kept free of I/O so every module can
//! depend on them without circular references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Trend items
// ---------------------------------------------------------------------------

/// One ranked piece of content observed on one provider.
///
/// `id` is only unique within the provider's namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendItem {
    pub id: String,
    pub title: String,
    pub url: String,
    pub image_url: String,
    /// Normalized popularity, `>= 0` and designed to land near 0–100.
    pub score: f64,
    pub seen_at: DateTime<Utc>,
}

impl TrendItem {
    /// The detail record written next to the ranked set.
    pub fn detail(&self) -> TrendDetail {
        TrendDetail {
            id: self.id.clone(),
            title: self.title.clone(),
            url: self.url.clone(),
            image_url: self.image_url.clone(),
        }
    }
}

impl fmt::Display for TrendItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({:.1})", self.id, self.title, self.score)
    }
}

/// Items returned by one provider for one poll cycle.
pub type ProviderResultSet = Vec<TrendItem>;

/// Per-item JSON record consumed by the frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendDetail {
    pub id: String,
    pub title: String,
    pub url: String,
    pub image_url: String,
}

/// Change notification broadcast after a provider snapshot is replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateEvent {
    pub provider: String,
    pub count: usize,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific failures reported by the poll pipeline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PollerError {
    #[error("Provider error ({provider}): {message}")]
    Provider { provider: String, message: String },

    #[error("Provider {provider} timed out after {after_secs}s")]
    Timeout { provider: String, after_secs: u64 },

    #[error("Store {op} failed for {key}: {message}")]
    Store {
        op: &'static str,
        key: String,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
