//! Snapshot publisher.
//!
//! Makes one provider's freshly fetched items visible to consumers and
//! announces the change. Steps run strictly in order:
//!
//! 1. `DEL` the provider's ranked set, then `ZADD` every `(score, id)`.
//! 2. `EXPIRE` the ranked set.
//! 3. `SET … EX` one detail record per item.
//! 4. `PUBLISH` an `UpdateEvent` on the update channel.
//!
//! The store offers no transaction across these, so each step is attempted
//! even when an earlier one failed; failures are logged and collected in
//! the returned report. Consumers see an empty set briefly between the
//! `DEL` and the `ZADD`.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::store::{Keyspace, TrendStore};
use crate::types::{PollerError, TrendItem, UpdateEvent};

/// TTL applied to ranked sets and detail records.
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

/// Result of publishing one provider's batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishReport {
    pub provider: String,
    pub count: usize,
    /// Store steps that failed; the rest still ran.
    pub failed_steps: Vec<PollerError>,
}

impl PublishReport {
    pub fn is_clean(&self) -> bool {
        self.failed_steps.is_empty()
    }

    fn record(&mut self, op: &'static str, key: &str, err: anyhow::Error) {
        warn!(provider = %self.provider, op, key, error = %err, "Store write failed");
        self.failed_steps.push(PollerError::Store {
            op,
            key: key.to_string(),
            message: format!("{err:#}"),
        });
    }
}

/// Writes provider snapshots to the shared store.
#[derive(Clone)]
pub struct SnapshotPublisher {
    store: Arc<dyn TrendStore>,
    keys: Keyspace,
    ttl: Duration,
}

impl SnapshotPublisher {
    pub fn new(store: Arc<dyn TrendStore>, keys: Keyspace, ttl: Duration) -> Self {
        Self { store, keys, ttl }
    }

    /// Replace `provider`'s snapshot with `items` and notify subscribers.
    ///
    /// An empty batch is a no-op: the existing snapshot stays until its TTL
    /// runs out or a later non-empty fetch replaces it.
    pub async fn publish(&self, provider: &str, items: &[TrendItem]) -> PublishReport {
        let mut report = PublishReport {
            provider: provider.to_string(),
            count: items.len(),
            failed_steps: Vec::new(),
        };

        if items.is_empty() {
            debug!(provider, "Nothing to publish");
            return report;
        }

        let set_key = self.keys.ranked_set(provider);

        // 1. Replace the ranked set.
        if let Err(e) = self.store.delete(&set_key).await {
            report.record("DEL", &set_key, e);
        }

        let members: Vec<(f64, String)> = items
            .iter()
            .map(|it| (it.score, it.id.clone()))
            .collect();
        if let Err(e) = self.store.zadd(&set_key, &members).await {
            report.record("ZADD", &set_key, e);
        }

        // 2. Expire so a silent provider eventually disappears.
        if let Err(e) = self.store.expire(&set_key, self.ttl).await {
            report.record("EXPIRE", &set_key, e);
        }

        // 3. Detail records.
        for item in items {
            let key = self.keys.detail(provider, &item.id);
            match serde_json::to_string(&item.detail()) {
                Ok(json) => {
                    if let Err(e) = self.store.set_ex(&key, &json, self.ttl).await {
                        report.record("SET", &key, e);
                    }
                }
                Err(e) => report.record("SET", &key, e.into()),
            }
        }

        // 4. Notify.
        let event = UpdateEvent {
            provider: provider.to_string(),
            count: items.len(),
        };
        let channel = self.keys.channel();
        match serde_json::to_string(&event) {
            Ok(payload) => {
                if let Err(e) = self.store.publish(channel, &payload).await {
                    report.record("PUBLISH", channel, e);
                }
            }
            Err(e) => report.record("PUBLISH", channel, e.into()),
        }

        debug!(
            provider,
            count = report.count,
            failed_steps = report.failed_steps.len(),
            "Snapshot published"
        );

        report
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
