//! Fetch orchestrator.
//!
//! Runs every provider concurrently once per cycle. Each provider gets its
//! own task and its own deadline; a failure, timeout or panic in one task
//! is logged and recorded for that provider only and never cancels its
//! siblings. Successful non-empty results go straight to the publisher
//! from inside the provider's task, so a slow provider never delays the
//! others' snapshots.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use futures::FutureExt;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::publisher::SnapshotPublisher;
use crate::providers::Provider;
use crate::types::{PollerError, ProviderResultSet};

/// Default upper bound on one provider's fetch.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(15);

/// What happened to one provider during a cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderOutcome {
    /// Items were handed to the publisher.
    Published {
        count: usize,
        failed_steps: Vec<PollerError>,
    },
    /// The fetch succeeded with no items; the store was not touched.
    Empty,
    /// The fetch failed (or its task panicked).
    Failed(PollerError),
    /// The fetch exceeded the per-provider deadline.
    TimedOut(PollerError),
}

impl fmt::Display for ProviderOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderOutcome::Published {
                count,
                failed_steps,
            } if failed_steps.is_empty() => write!(f, "published {count}"),
            ProviderOutcome::Published {
                count,
                failed_steps,
            } => write!(f, "published {count} ({} store errors)", failed_steps.len()),
            ProviderOutcome::Empty => write!(f, "empty"),
            ProviderOutcome::Failed(e) | ProviderOutcome::TimedOut(e) => write!(f, "{e}"),
        }
    }
}

/// Summary of one poll cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub outcomes: HashMap<String, ProviderOutcome>,
}

impl CycleReport {
    pub fn published(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, ProviderOutcome::Published { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, ProviderOutcome::Failed(_) | ProviderOutcome::TimedOut(_)))
            .count()
    }

    pub fn outcome(&self, provider: &str) -> Option<&ProviderOutcome> {
        self.outcomes.get(provider)
    }
}

/// Fans fetches out across providers and collects per-provider outcomes.
pub struct FetchOrchestrator {
    providers: Vec<Arc<dyn Provider>>,
    publisher: SnapshotPublisher,
    fetch_limit: usize,
    provider_timeout: Duration,
}

impl FetchOrchestrator {
    pub fn new(
        providers: Vec<Arc<dyn Provider>>,
        publisher: SnapshotPublisher,
        fetch_limit: usize,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            providers,
            publisher,
            fetch_limit,
            provider_timeout,
        }
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Run one fetch-and-publish cycle across all providers.
    ///
    /// Waits for every provider task. Dropping the returned future (e.g. on
    /// shutdown) aborts the tasks still in flight; store writes already
    /// issued are not rolled back.
    pub async fn run_cycle(&self, cycle: u64) -> CycleReport {
        let started_at = Utc::now();
        let start = tokio::time::Instant::now();
        info!(cycle, providers = self.providers.len(), "Starting poll cycle");

        let mut tasks = JoinSet::new();

        for provider in &self.providers {
            let provider = Arc::clone(provider);
            let publisher = self.publisher.clone();
            let limit = self.fetch_limit;
            let deadline = self.provider_timeout;

            tasks.spawn(async move {
                let name = provider.name().to_string();
                let outcome = AssertUnwindSafe(run_provider(
                    provider.as_ref(),
                    &publisher,
                    limit,
                    deadline,
                ))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    error!(provider = %name, "Provider task panicked");
                    ProviderOutcome::Failed(PollerError::Provider {
                        provider: name.clone(),
                        message: "provider task panicked".into(),
                    })
                });
                (name, outcome)
            });
        }

        let mut outcomes = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, outcome)) => {
                    outcomes.insert(name, outcome);
                }
                Err(e) => error!(error = %e, "Provider task aborted"),
            }
        }

        let report = CycleReport {
            cycle,
            started_at,
            elapsed: start.elapsed(),
            outcomes,
        };

        info!(
            cycle,
            published = report.published(),
            failed = report.failed(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Poll cycle complete"
        );

        report
    }

    /// Fetch from every provider concurrently without publishing.
    ///
    /// Returns results for every provider that succeeded, including empty
    /// ones. Failed and timed-out providers are logged and omitted.
    pub async fn fetch_all(&self) -> HashMap<String, ProviderResultSet> {
        let fetches = self.providers.iter().map(|p| async move {
            let result = fetch_one(p.as_ref(), self.fetch_limit, self.provider_timeout).await;
            (p.name().to_string(), result)
        });

        join_all(fetches)
            .await
            .into_iter()
            .filter_map(|(name, result)| result.ok().map(|items| (name, items)))
            .collect()
    }
}

/// Fetch from one provider and publish a non-empty result.
async fn run_provider(
    provider: &dyn Provider,
    publisher: &SnapshotPublisher,
    limit: usize,
    deadline: Duration,
) -> ProviderOutcome {
    let name = provider.name();
    match fetch_one(provider, limit, deadline).await {
        Ok(items) if items.is_empty() => {
            debug!(provider = name, "No items this cycle, keeping previous snapshot");
            ProviderOutcome::Empty
        }
        Ok(items) => {
            let report = publisher.publish(name, &items).await;
            ProviderOutcome::Published {
                count: report.count,
                failed_steps: report.failed_steps,
            }
        }
        Err(e @ PollerError::Timeout { .. }) => ProviderOutcome::TimedOut(e),
        Err(e) => ProviderOutcome::Failed(e),
    }
}

/// Fetch from one provider under `deadline`, logging any failure.
async fn fetch_one(
    provider: &dyn Provider,
    limit: usize,
    deadline: Duration,
) -> Result<ProviderResultSet, PollerError> {
    let name = provider.name();

    match tokio::time::timeout(deadline, provider.fetch(limit)).await {
        Ok(Ok(items)) => {
            debug!(provider = name, count = items.len(), "Provider fetch complete");
            Ok(items)
        }
        Ok(Err(e)) => {
            warn!(provider = name, error = %format!("{e:#}"), "Provider fetch failed");
            Err(PollerError::Provider {
                provider: name.to_string(),
                message: format!("{e:#}"),
            })
        }
        Err(_) => {
            let err = PollerError::Timeout {
                provider: name.to_string(),
                after_secs: deadline.as_secs(),
            };
            error!(provider = name, error = %err, "Provider fetch timed out");
            Err(err)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
