//! Twitch placeholder.
//!
//! No Helix integration yet: every fetch returns one fixed item so the
//! frontend has something to render for the platform.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use super::Provider;
use crate::types::TrendItem;

const PROVIDER_NAME: &str = "twitch";

/// Score of the placeholder item.
const PLACEHOLDER_SCORE: f64 = 1.0;

#[derive(Debug, Default)]
pub struct TwitchProvider;

impl TwitchProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Provider for TwitchProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn fetch(&self, _limit: usize) -> Result<Vec<TrendItem>> {
        Ok(vec![TrendItem {
            id: "example_twitch".into(),
            title: "Example Twitch Clip".into(),
            url: "https://twitch.tv".into(),
            image_url: String::new(),
            score: PLACEHOLDER_SCORE,
            seen_at: Utc::now(),
        }])
    }
}
