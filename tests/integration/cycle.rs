//! Full poll-cycle behaviour against the in-memory store.

use httpmock::Method::{GET, POST};
use httpmock::MockServer;
use secrecy::SecretString;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_test::assert_ok;

use trend_poller::engine::orchestrator::{FetchOrchestrator, ProviderOutcome};
use trend_poller::engine::publisher::{SnapshotPublisher, DEFAULT_TTL};
use trend_poller::engine::scheduler::{Scheduler, SchedulerState};
use trend_poller::providers::reddit::{RedditCredentials, RedditProvider};
use trend_poller::providers::tiktok::TikTokProvider;
use trend_poller::providers::youtube::YouTubeProvider;
use trend_poller::providers::Provider;
use trend_poller::store::Keyspace;
use trend_poller::types::{TrendDetail, UpdateEvent};

use crate::memory_store::MemoryStore;
use crate::mock_provider::{MockProvider, Script};

fn orchestrator(
    providers: Vec<Arc<dyn Provider>>,
    store: Arc<MemoryStore>,
    timeout: Duration,
) -> FetchOrchestrator {
    let publisher = SnapshotPublisher::new(store, Keyspace::default(), DEFAULT_TTL);
    FetchOrchestrator::new(providers, publisher, 100, timeout)
}

fn update_events(store: &MemoryStore) -> Vec<UpdateEvent> {
    store
        .published()
        .into_iter()
        .map(|(channel, payload)| {
            assert_eq!(channel, "trends:update");
            assert_ok!(serde_json::from_str(&payload))
        })
        .collect()
}

fn reddit_provider(server: &MockServer) -> RedditProvider {
    let creds = RedditCredentials {
        client_id: "cid".into(),
        secret: SecretString::new("secret".into()),
        username: "poller".into(),
        password: SecretString::new("pw".into()),
    };
    RedditProvider::new(Some(creds), "gaming")
        .unwrap()
        .with_endpoints(&server.url("/api/v1/access_token"), &server.base_url())
}

#[tokio::test]
async fn reddit_cycle_publishes_scored_snapshot() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/v1/access_token");
        then.status(200)
            .json_body(json!({"access_token": "tok", "expires_in": 3600}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/r/gaming/hot").query_param("limit", "100");
        then.status(200).json_body(json!({
            "data": {"children": [
                {"data": {"id": "a", "title": "Top", "url": "https://reddit.com/a", "thumbnail": "https://t/a.jpg", "ups": 999999}},
                {"data": {"id": "b", "title": "Bottom", "url": "https://reddit.com/b", "thumbnail": "self", "ups": -5}}
            ]}
        }));
    });

    let store = Arc::new(MemoryStore::new());
    let orch = orchestrator(
        vec![Arc::new(reddit_provider(&server))],
        store.clone(),
        Duration::from_secs(15),
    );

    let report = orch.run_cycle(1).await;
    assert!(matches!(
        report.outcome("reddit"),
        Some(ProviderOutcome::Published { count: 2, failed_steps }) if failed_steps.is_empty()
    ));

    let members = store.members("trends:external:reddit");
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].0, "a");
    assert!((members[0].1 - 100.0).abs() < 1e-9);
    assert_eq!(members[1], ("b".to_string(), 0.0));

    assert_eq!(store.ttl("trends:external:reddit"), Some(Duration::from_secs(600)));

    let raw = store.get("trends:external:reddit:details:a").unwrap();
    let detail: TrendDetail = assert_ok!(serde_json::from_str(&raw));
    assert_eq!(detail.title, "Top");
    assert_eq!(detail.image_url, "https://t/a.jpg");
    assert!(store.get("trends:external:reddit:details:b").is_some());
    assert_eq!(
        store.ttl("trends:external:reddit:details:b"),
        Some(Duration::from_secs(600))
    );

    assert_eq!(
        update_events(&store),
        vec![UpdateEvent { provider: "reddit".into(), count: 2 }]
    );

    assert_eq!(
        store.log(),
        vec![
            "DEL trends:external:reddit",
            "ZADD trends:external:reddit",
            "EXPIRE trends:external:reddit",
            "SET trends:external:reddit:details:a",
            "SET trends:external:reddit:details:b",
            "PUBLISH trends:update",
        ]
    );
}

#[tokio::test]
async fn youtube_cycle_scores_billion_views_near_100() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/videos");
        then.status(200).json_body(json!({
            "items": [{"id": "v1", "snippet": {"title": "Hit"}, "statistics": {"viewCount": "1000000000"}}]
        }));
    });

    let youtube = YouTubeProvider::new(Some(SecretString::new("k".into())), "US")
        .unwrap()
        .with_base_url(&server.base_url());

    let store = Arc::new(MemoryStore::new());
    orchestrator(vec![Arc::new(youtube)], store.clone(), Duration::from_secs(15))
        .run_cycle(1)
        .await;

    let members = store.members("trends:external:youtube");
    assert_eq!(members.len(), 1);
    assert!((members[0].1 - 100.0).abs() < 1e-6);

    let detail: TrendDetail =
        assert_ok!(serde_json::from_str(&store.get("trends:external:youtube:details:v1").unwrap()));
    assert_eq!(detail.url, "https://www.youtube.com/watch?v=v1");
}

#[tokio::test]
async fn failing_provider_does_not_block_others() {
    let store = Arc::new(MemoryStore::new());
    let orch = orchestrator(
        vec![
            Arc::new(MockProvider::failing("reddit", "401 Unauthorized")),
            Arc::new(MockProvider::items("twitch", vec![("t1", 1.0)])),
            Arc::new(MockProvider::items("youtube", vec![("v1", 55.0), ("v2", 12.5)])),
        ],
        store.clone(),
        Duration::from_secs(15),
    );

    let report = orch.run_cycle(1).await;

    assert_eq!(report.published(), 2);
    assert_eq!(report.failed(), 1);
    assert!(store.members("trends:external:reddit").is_empty());
    assert_eq!(store.members("trends:external:twitch").len(), 1);
    assert_eq!(store.members("trends:external:youtube").len(), 2);

    let mut providers: Vec<String> = update_events(&store).into_iter().map(|e| e.provider).collect();
    providers.sort();
    assert_eq!(providers, vec!["twitch", "youtube"]);
}

#[tokio::test]
async fn empty_fetch_leaves_previous_snapshot_untouched() {
    let store = Arc::new(MemoryStore::new());
    store.seed_set("trends:external:tiktok", &[("old", 7.0)]);

    let orch = orchestrator(
        vec![Arc::new(TikTokProvider::new())],
        store.clone(),
        Duration::from_secs(15),
    );
    let report = orch.run_cycle(1).await;

    assert_eq!(report.outcome("tiktok"), Some(&ProviderOutcome::Empty));
    assert!(store.log().is_empty(), "no store command for an empty fetch");
    assert_eq!(store.members("trends:external:tiktok"), vec![("old".to_string(), 7.0)]);
    assert!(store.published().is_empty());
}

#[tokio::test]
async fn second_publish_replaces_set_exactly() {
    let store = Arc::new(MemoryStore::new());
    let provider = MockProvider::new(
        "reddit",
        vec![
            Script::Items(vec![("a", 10.0), ("b", 20.0), ("c", 30.0)]),
            Script::Items(vec![("c", 35.0), ("d", 5.0)]),
        ],
    );
    let orch = orchestrator(vec![Arc::new(provider)], store.clone(), Duration::from_secs(15));

    orch.run_cycle(1).await;
    assert_eq!(store.members("trends:external:reddit").len(), 3);

    orch.run_cycle(2).await;
    let mut ids: Vec<String> = store
        .members("trends:external:reddit")
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["c", "d"], "no leftovers from the previous fetch");

    // Old detail records linger only until their own TTL.
    assert!(store.get("trends:external:reddit:details:a").is_some());
    assert_eq!(update_events(&store).len(), 2);
}

#[tokio::test]
async fn store_failure_in_one_step_keeps_the_rest() {
    let store = Arc::new(MemoryStore::new());
    store.fail_op("EXPIRE");

    let orch = orchestrator(
        vec![Arc::new(MockProvider::items("twitch", vec![("t1", 1.0), ("t2", 2.0)]))],
        store.clone(),
        Duration::from_secs(15),
    );
    let report = orch.run_cycle(1).await;

    match report.outcome("twitch") {
        Some(ProviderOutcome::Published { count, failed_steps }) => {
            assert_eq!(*count, 2);
            assert_eq!(failed_steps.len(), 1);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(store.members("trends:external:twitch").len(), 2);
    assert_eq!(store.ttl("trends:external:twitch"), None);
    assert!(store.get("trends:external:twitch:details:t2").is_some());
    assert_eq!(update_events(&store).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn timed_out_provider_is_skipped_and_cycle_completes() {
    let store = Arc::new(MemoryStore::new());
    let orch = orchestrator(
        vec![
            Arc::new(MockProvider::items("youtube", vec![("slow", 1.0)]).with_delay(Duration::from_secs(120))),
            Arc::new(MockProvider::items("reddit", vec![("a", 50.0)])),
        ],
        store.clone(),
        Duration::from_secs(10),
    );

    let report = orch.run_cycle(1).await;

    assert!(matches!(report.outcome("youtube"), Some(ProviderOutcome::TimedOut(_))));
    assert!(report.elapsed <= Duration::from_secs(11));
    assert!(store.members("trends:external:youtube").is_empty());
    assert_eq!(store.members("trends:external:reddit").len(), 1);
    assert_eq!(store.keys(), vec!["trends:external:reddit", "trends:external:reddit:details:a"]);
}

#[tokio::test(start_paused = true)]
async fn scheduler_publishes_every_interval_until_shutdown() {
    let store = Arc::new(MemoryStore::new());
    let provider = MockProvider::items("twitch", vec![("t1", 1.0)]);
    let fetch_log = provider.fetch_log();

    let orch = orchestrator(vec![Arc::new(provider)], store.clone(), Duration::from_secs(15));
    let scheduler = Arc::new(Scheduler::new(Arc::new(orch), Duration::from_secs(60)));
    let (tx, rx) = watch::channel(false);

    let handle = tokio::spawn({
        let scheduler = scheduler.clone();
        async move { scheduler.run(rx).await }
    });

    tokio::time::sleep(Duration::from_secs(130)).await;
    tx.send(true).unwrap();

    assert_eq!(handle.await.unwrap(), 3);
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
    assert_eq!(*fetch_log.lock().unwrap(), vec![100, 100, 100]);
    assert_eq!(update_events(&store).len(), 3);
}
