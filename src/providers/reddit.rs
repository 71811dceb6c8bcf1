//! Reddit hot-post integration.
//!
//! Fetches the `hot` listing across a `+`-joined set of subreddits and
//! scores posts by upvotes on a log scale.
//!
//! Auth: OAuth2 password grant (script app). The access token is cached
//! per provider instance and refreshed lazily once it is within 30s of
//! expiry.
//! Listing: `https://oauth.reddit.com/r/{subs}/hot?limit=N`, max 100.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use super::score::{clamp_limit, reddit_score};
use super::Provider;
use crate::types::TrendItem;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const PROVIDER_NAME: &str = "reddit";
const AUTH_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_URL: &str = "https://oauth.reddit.com";
const USER_AGENT_BASE: &str = "trend-poller/0.1";

/// Listing endpoint maximum.
const MAX_LIMIT: usize = 100;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Refresh once the cached token has less than this left.
const REFRESH_MARGIN: Duration = Duration::from_secs(30);

/// Shaved off `expires_in` when storing a fresh token.
const EXPIRY_SAFETY: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    /// Kept as raw JSON so one malformed post doesn't sink the page.
    #[serde(default)]
    children: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    // Reddit sends explicit nulls for some fields; treat them as empty.
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    /// Either an image URL or a marker such as "self", "default", "nsfw".
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    ups: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

// ---------------------------------------------------------------------------
// Credentials and token state
// ---------------------------------------------------------------------------

/// Script-app credentials for the password grant.
#[derive(Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub secret: SecretString,
    pub username: String,
    pub password: SecretString,
}

impl RedditCredentials {
    /// Read `REDDIT_CLIENT_ID`, `REDDIT_SECRET`, `REDDIT_USERNAME` and
    /// `REDDIT_PASSWORD`. Returns `None` unless all four are set.
    pub fn from_env() -> Option<Self> {
        let var = |k: &str| std::env::var(k).ok().filter(|v| !v.is_empty());
        Some(Self {
            client_id: var("REDDIT_CLIENT_ID")?,
            secret: SecretString::new(var("REDDIT_SECRET")?),
            username: var("REDDIT_USERNAME")?,
            password: SecretString::new(var("REDDIT_PASSWORD")?),
        })
    }
}

/// Cached OAuth access token, owned by one provider instance.
#[derive(Debug, Default)]
struct TokenCache {
    token: Option<String>,
    expires_at: Option<Instant>,
}

impl TokenCache {
    /// The cached token, if more than `REFRESH_MARGIN` remains.
    fn current(&self, now: Instant) -> Option<String> {
        match (&self.token, self.expires_at) {
            (Some(token), Some(expires_at))
                if expires_at.saturating_duration_since(now) > REFRESH_MARGIN =>
            {
                Some(token.clone())
            }
            _ => None,
        }
    }

    fn store(&mut self, token: String, expires_in: Duration, now: Instant) {
        self.expires_at = Some(now + expires_in.saturating_sub(EXPIRY_SAFETY));
        self.token = Some(token);
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Reddit trend provider.
pub struct RedditProvider {
    http: Client,
    credentials: Option<RedditCredentials>,
    subreddits: String,
    auth_url: String,
    api_url: String,
    token: Mutex<TokenCache>,
}

impl RedditProvider {
    /// Create a provider. Missing credentials are reported on each fetch
    /// rather than here, so the provider still shows up in cycle logs.
    pub fn new(credentials: Option<RedditCredentials>, subreddits: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client for Reddit")?;

        Ok(Self {
            http,
            credentials,
            subreddits: subreddits.to_string(),
            auth_url: AUTH_URL.to_string(),
            api_url: API_URL.to_string(),
            token: Mutex::new(TokenCache::default()),
        })
    }

    pub fn from_env(subreddits: &str) -> Result<Self> {
        Self::new(RedditCredentials::from_env(), subreddits)
    }

    /// Point the provider at different OAuth and API hosts.
    pub fn with_endpoints(mut self, auth_url: &str, api_url: &str) -> Self {
        self.auth_url = auth_url.trim_end_matches('/').to_string();
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    /// Return a valid access token, refreshing it if needed.
    ///
    /// The lock is not held across the token request; two concurrent
    /// refreshes are harmless and the later one wins.
    async fn access_token(&self, creds: &RedditCredentials) -> Result<String> {
        if let Some(token) = self.token.lock().await.current(Instant::now()) {
            return Ok(token);
        }

        debug!("Refreshing Reddit access token");

        let resp = self
            .http
            .post(&self.auth_url)
            .header(USER_AGENT, USER_AGENT_BASE)
            .basic_auth(&creds.client_id, Some(creds.secret.expose_secret()))
            .form(&[
                ("grant_type", "password"),
                ("username", creds.username.as_str()),
                ("password", creds.password.expose_secret().as_str()),
            ])
            .send()
            .await
            .context("Reddit token request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("Reddit token error: status {}", resp.status());
        }

        let tr: TokenResponse = resp
            .json()
            .await
            .context("Failed to parse Reddit token response")?;

        if tr.access_token.is_empty() {
            anyhow::bail!("Reddit token error: empty access_token");
        }

        let mut cache = self.token.lock().await;
        cache.store(
            tr.access_token.clone(),
            Duration::from_secs(tr.expires_in),
            Instant::now(),
        );
        info!(expires_in = tr.expires_in, "Reddit access token refreshed");

        Ok(tr.access_token)
    }

    /// Convert a listing into trend items, skipping malformed or id-less
    /// posts.
    fn to_items(listing: Listing) -> Vec<TrendItem> {
        let now = Utc::now();
        listing
            .data
            .children
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<Child>(raw) {
                Ok(child) => Some(child.data),
                Err(e) => {
                    debug!(error = %e, "Skipping malformed Reddit post");
                    None
                }
            })
            .filter_map(|post| {
                let id = post.id.filter(|id| !id.is_empty())?;
                Some(TrendItem {
                    score: reddit_score(post.ups),
                    image_url: thumbnail_url(post.thumbnail.unwrap_or_default()),
                    id,
                    title: post.title.unwrap_or_default(),
                    url: post.url.unwrap_or_default(),
                    seen_at: now,
                })
            })
            .collect()
    }
}

/// Keep only real thumbnail URLs.
fn thumbnail_url(thumbnail: String) -> String {
    if thumbnail.starts_with("http://") || thumbnail.starts_with("https://") {
        thumbnail
    } else {
        String::new()
    }
}

#[async_trait]
impl Provider for RedditProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<TrendItem>> {
        let limit = clamp_limit(limit, MAX_LIMIT);
        let creds = self.credentials.as_ref().ok_or_else(|| {
            anyhow!("Reddit credentials not set (REDDIT_CLIENT_ID, REDDIT_SECRET, REDDIT_USERNAME, REDDIT_PASSWORD)")
        })?;

        let token = self.access_token(creds).await?;

        let url = format!("{}/r/{}/hot?limit={limit}", self.api_url, self.subreddits);
        debug!(url = %url, "Fetching Reddit listing");

        let resp = self
            .http
            .get(&url)
            .header(AUTHORIZATION, format!("bearer {token}"))
            .header(
                USER_AGENT,
                format!("{USER_AGENT_BASE} (by u:{})", creds.username),
            )
            .send()
            .await
            .context("Reddit API request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Reddit API error {status}: {body}");
        }

        let listing: Listing = resp
            .json()
            .await
            .context("Failed to parse Reddit listing")?;

        let items = Self::to_items(listing);
        debug!(count = items.len(), "Reddit listing parsed");
        Ok(items)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
