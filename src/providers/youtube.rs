//! YouTube most-popular chart integration.
//!
//! API: `https://www.googleapis.com/youtube/v3/videos?chart=mostPopular`
//! Auth: API key (`YOUTUBE_API_KEY`) as a query parameter.
//! `maxResults` caps at 50. View counts arrive as decimal strings.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::score::{clamp_limit, youtube_score};
use super::Provider;
use crate::types::TrendItem;

const PROVIDER_NAME: &str = "youtube";
const BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// `maxResults` upper bound for the videos endpoint.
const MAX_LIMIT: usize = 50;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<Video>,
}

#[derive(Debug, Deserialize)]
struct Video {
    #[serde(default)]
    id: String,
    #[serde(default)]
    snippet: Snippet,
    #[serde(default)]
    statistics: Statistics,
}

#[derive(Debug, Default, Deserialize)]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    #[serde(default)]
    medium: Thumbnail,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnail {
    #[serde(default)]
    url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    #[serde(default)]
    view_count: String,
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// YouTube trend provider.
pub struct YouTubeProvider {
    http: Client,
    api_key: Option<SecretString>,
    region: String,
    base_url: String,
}

impl YouTubeProvider {
    pub fn new(api_key: Option<SecretString>, region: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client for YouTube")?;

        Ok(Self {
            http,
            api_key,
            region: region.to_string(),
            base_url: BASE_URL.to_string(),
        })
    }

    /// Read the API key from `YOUTUBE_API_KEY`.
    pub fn from_env(region: &str) -> Result<Self> {
        let key = std::env::var("YOUTUBE_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .map(SecretString::new);
        Self::new(key, region)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn to_items(resp: VideoListResponse) -> Vec<TrendItem> {
        let now = Utc::now();
        resp.items
            .into_iter()
            .filter(|v| !v.id.is_empty())
            .map(|v| TrendItem {
                score: youtube_score(parse_view_count(&v.statistics.view_count)),
                url: format!("{WATCH_URL}{}", v.id),
                image_url: v.snippet.thumbnails.medium.url,
                title: v.snippet.title,
                id: v.id,
                seen_at: now,
            })
            .collect()
    }
}

/// Parse the leading decimal digits of a view count string. Anything
/// without leading digits counts as zero views.
fn parse_view_count(s: &str) -> i64 {
    s.bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |n, c| n.saturating_mul(10).saturating_add(i64::from(c - b'0')))
}

#[async_trait]
impl Provider for YouTubeProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<TrendItem>> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow!("YouTube API key not set (YOUTUBE_API_KEY)"))?;
        let limit = clamp_limit(limit, MAX_LIMIT);

        let url = format!(
            "{}/videos?part=snippet,statistics&chart=mostPopular&regionCode={}&maxResults={limit}&key={}",
            self.base_url,
            urlencoding::encode(&self.region),
            urlencoding::encode(api_key.expose_secret()),
        );

        debug!(region = %self.region, limit, "Fetching YouTube most-popular chart");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("YouTube API request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            anyhow::bail!("YouTube API error {status}");
        }

        let body: VideoListResponse = resp
            .json()
            .await
            .context("Failed to parse YouTube videos response")?;

        Ok(Self::to_items(body))
    }
}
