//! TikTok placeholder. Returns no items, so nothing is published and
//! the store is never touched for this provider.

use anyhow::Result;
use async_trait::async_trait;

use super::Provider;
use crate::types::TrendItem;

#[derive(Debug, Default)]
pub struct TikTokProvider;

impl TikTokProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Provider for TikTokProvider {
    fn name(&self) -> &str {
        "tiktok"
    }

    async fn fetch(&self, _limit: usize) -> Result<Vec<TrendItem>> {
        Ok(Vec::new())
    }
}
