//! Redis-backed `TrendStore`.
//!
//! Uses a multiplexed `ConnectionManager`, which reconnects on its own and
//! is cheap to clone, so every concurrent publish task shares one
//! connection.

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::time::Duration;
use tracing::{debug, info};

use super::TrendStore;

/// Startup health check deadline.
const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Redis store client shared by all publish tasks.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect and verify the server answers `PING`.
    ///
    /// Failing here is fatal for the poller: nothing useful can run
    /// without the store.
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)
            .context("failed to parse REDIS_URL connection string")?;

        let mut conn = tokio::time::timeout(PING_TIMEOUT, ConnectionManager::new(client))
            .await
            .context("timed out connecting to Redis")?
            .context("failed to initialize Redis connection manager")?;

        let pong: String = tokio::time::timeout(
            PING_TIMEOUT,
            redis::cmd("PING").query_async(&mut conn),
        )
        .await
        .context("timed out waiting for Redis PING")?
        .context("Redis PING failed")?;

        info!(reply = %pong, "Redis connection verified");
        Ok(Self { conn })
    }

    fn conn(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

#[async_trait]
impl TrendStore for RedisStore {
    async fn delete(&self, key: &str) -> Result<()> {
        let _: () = self
            .conn()
            .del(key)
            .await
            .with_context(|| format!("DEL {key}"))?;
        Ok(())
    }

    async fn zadd(&self, key: &str, members: &[(f64, String)]) -> Result<()> {
        if members.is_empty() {
            return Ok(());
        }
        let _: () = self
            .conn()
            .zadd_multiple(key, members)
            .await
            .with_context(|| format!("ZADD {key}"))?;
        debug!(key, members = members.len(), "ZADD complete");
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let _: () = self
            .conn()
            .expire(key, ttl.as_secs() as i64)
            .await
            .with_context(|| format!("EXPIRE {key}"))?;
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let _: () = self
            .conn()
            .set_ex(key, value, ttl.as_secs())
            .await
            .with_context(|| format!("SET {key}"))?;
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<()> {
        let receivers: usize = self
            .conn()
            .publish(channel, payload)
            .await
            .with_context(|| format!("PUBLISH {channel}"))?;
        debug!(channel, receivers, "Update published");
        Ok(())
    }
}
