//! Trend providers.
//!
//! Defines the `Provider` trait and provides implementations for:
//! - Reddit: hot posts across a set of subreddits (OAuth password grant)
//! - YouTube: the regional most-popular chart (API key)
//! - Twitch: placeholder item until the Helix integration lands
//! - TikTok: placeholder, publishes nothing

pub mod reddit;
pub mod score;
pub mod tiktok;
pub mod twitch;
pub mod youtube;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::ProvidersConfig;
use crate::types::TrendItem;

/// Abstraction over external trend sources.
///
/// `fetch` either returns the whole ranked list for this cycle or fails;
/// it never returns a partial list to hide a failure. Records without an
/// id are dropped before returning. An empty list means "nothing to
/// publish this cycle", not an error.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identifier, used as the store namespace.
    fn name(&self) -> &str;

    /// Fetch up to `limit` ranked items. `limit` is advisory and clamped
    /// into the platform's valid range.
    async fn fetch(&self, limit: usize) -> Result<Vec<TrendItem>>;
}

/// Build every provider enabled in config.
///
/// A provider whose HTTP client cannot be constructed is skipped with a
/// warning so the remaining providers still run.
pub fn build_enabled(cfg: &ProvidersConfig) -> Vec<Arc<dyn Provider>> {
    let mut providers: Vec<Arc<dyn Provider>> = Vec::new();

    if cfg.twitch.enabled {
        providers.push(Arc::new(twitch::TwitchProvider::new()));
    }

    if cfg.reddit.enabled {
        match reddit::RedditProvider::from_env(&cfg.reddit.subreddits) {
            Ok(p) => providers.push(Arc::new(p)),
            Err(e) => warn!(error = %e, "Reddit provider disabled"),
        }
    }

    if cfg.youtube.enabled {
        match youtube::YouTubeProvider::from_env(&cfg.youtube.region) {
            Ok(p) => providers.push(Arc::new(p)),
            Err(e) => warn!(error = %e, "YouTube provider disabled"),
        }
    }

    if cfg.tiktok.enabled {
        providers.push(Arc::new(tiktok::TikTokProvider::new()));
    }

    info!(
        providers = ?providers.iter().map(|p| p.name().to_string()).collect::<Vec<_>>(),
        "Providers initialised"
    );

    providers
}
