//! Mock provider for integration testing.
//!
//! Provides a deterministic `Provider` implementation that returns
//! scripted results, one per fetch, all in-memory with no external
//! dependencies.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use trend_poller::providers::Provider;
use trend_poller::types::TrendItem;

/// One scripted fetch result.
#[derive(Clone)]
pub enum Script {
    Items(Vec<(&'static str, f64)>),
    Fail(&'static str),
}

/// A mock provider for deterministic testing.
///
/// Each fetch pops the next script entry; the last entry repeats once
/// the queue runs dry.
pub struct MockProvider {
    name: String,
    scripts: Mutex<VecDeque<Script>>,
    last: Mutex<Script>,
    delay: Duration,
    fetches: Arc<Mutex<Vec<usize>>>,
}

impl MockProvider {
    pub fn new(name: &str, scripts: Vec<Script>) -> Self {
        let last = scripts.last().cloned().unwrap_or(Script::Items(vec![]));
        Self {
            name: name.to_string(),
            scripts: Mutex::new(scripts.into()),
            last: Mutex::new(last),
            delay: Duration::ZERO,
            fetches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn items(name: &str, items: Vec<(&'static str, f64)>) -> Self {
        Self::new(name, vec![Script::Items(items)])
    }

    pub fn failing(name: &str, msg: &'static str) -> Self {
        Self::new(name, vec![Script::Fail(msg)])
    }

    /// Delay every fetch by `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Limits passed to each fetch so far.
    pub fn fetch_log(&self) -> Arc<Mutex<Vec<usize>>> {
        self.fetches.clone()
    }

    fn next_script(&self) -> Script {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.pop_front() {
            Some(script) => {
                *self.last.lock().unwrap() = script.clone();
                script
            }
            None => self.last.lock().unwrap().clone(),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<TrendItem>> {
        self.fetches.lock().unwrap().push(limit);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.next_script() {
            Script::Fail(msg) => Err(anyhow!("{msg}")),
            Script::Items(items) => Ok(items
                .into_iter()
                .map(|(id, score)| TrendItem {
                    id: id.to_string(),
                    title: format!("Title {id}"),
                    url: format!("https://mock.example.com/{id}"),
                    image_url: format!("https://mock.example.com/{id}.jpg"),
                    score,
                    seen_at: Utc::now(),
                })
                .collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripts_play_in_order_then_repeat() {
        let p = MockProvider::new(
            "mock",
            vec![Script::Items(vec![("a", 1.0)]), Script::Fail("boom")],
        );

        assert_eq!(p.fetch(10).await.unwrap()[0].id, "a");
        assert!(p.fetch(10).await.is_err());
        assert!(p.fetch(10).await.is_err());
        assert_eq!(*p.fetch_log().lock().unwrap(), vec![10, 10, 10]);
    }
}
