//! Shared trend store.
//!
//! Defines the `TrendStore` trait over the handful of primitives the
//! publisher needs, and the key naming shared with downstream consumers.
//! The store serializes single operations but offers no transaction
//! across them.

pub mod redis_store;

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use crate::config::StoreConfig;

/// Abstraction over the external key/value store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrendStore: Send + Sync {
    /// `DEL key`.
    async fn delete(&self, key: &str) -> Result<()>;

    /// `ZADD key score member [score member ...]` in a single command.
    async fn zadd(&self, key: &str, members: &[(f64, String)]) -> Result<()>;

    /// `EXPIRE key ttl`.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;

    /// `SET key value EX ttl`.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// `PUBLISH channel payload`. Fire-and-forget.
    async fn publish(&self, channel: &str, payload: &str) -> Result<()>;
}

/// Key and channel names for published snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyspace {
    prefix: String,
    channel: String,
}

impl Default for Keyspace {
    fn default() -> Self {
        Self::new("trends:external", "trends:update")
    }
}

impl Keyspace {
    pub fn new(prefix: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            channel: channel.into(),
        }
    }

    pub fn from_config(cfg: &StoreConfig) -> Self {
        Self::new(cfg.key_prefix.clone(), cfg.update_channel.clone())
    }

    /// Ranked set for one provider: `trends:external:<provider>`.
    pub fn ranked_set(&self, provider: &str) -> String {
        format!("{}:{provider}", self.prefix)
    }

    /// Detail record: `trends:external:<provider>:details:<id>`.
    pub fn detail(&self, provider: &str, id: &str) -> String {
        format!("{}:{provider}:details:{id}", self.prefix)
    }

    /// Change-notification channel.
    pub fn channel(&self) -> &str {
        &self.channel
    }
}
