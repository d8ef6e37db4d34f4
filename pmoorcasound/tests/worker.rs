//! End-to-end tests: worker task, HTTP pointer resource, engine double

mod common;

use common::{RecordingEngine, TestControls};
use pmoorcasound::{
    Error, Feed, OrcasoundConfig, Player, PlayerSnapshot, PlayerStatus, PlayerWorker,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_test::assert_ok;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> OrcasoundConfig {
    OrcasoundConfig::from_yaml_str(&format!(
        "storage_endpoint: {}\nbucket: streaming-orcasound-net\n",
        server.uri()
    ))
    .unwrap()
}

async fn wait_for(
    rx: &mut watch::Receiver<PlayerSnapshot>,
    predicate: impl Fn(&PlayerSnapshot) -> bool,
) -> PlayerSnapshot {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let snapshot = rx.borrow_and_update();
                if predicate(&*snapshot) {
                    return snapshot.clone();
                }
            }
            rx.changed().await.expect("worker dropped the snapshot channel");
        }
    })
    .await
    .expect("player did not reach the expected state")
}

#[tokio::test]
async fn test_worker_plays_latest_stream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/streaming-orcasound-net/orcasound-lab/latest.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("1690000000\n"))
        .mount(&server)
        .await;

    let controls = Arc::new(TestControls::default());
    let (engine, log) = RecordingEngine::auto_start(controls.clone());
    let (player, inbox) = Player::from_config(&config_for(&server), Box::new(engine)).unwrap();
    let (worker, handle) = PlayerWorker::spawn(player, inbox);
    let mut rx = handle.subscribe();

    assert_eq!(handle.snapshot().status, PlayerStatus::Idle);

    handle
        .select_feed(Some(Feed::new("Orcasound Lab", "orcasound-lab")))
        .await
        .unwrap();

    let snapshot = wait_for(&mut rx, |s| s.is_playing && s.debug.is_some()).await;
    assert_eq!(snapshot.status, PlayerStatus::Ready);
    assert_eq!(
        snapshot.manifest.map(|m| m.to_string()),
        Some(format!(
            "{}/streaming-orcasound-net/orcasound-lab/hls/1690000000/live.m3u8",
            server.uri()
        ))
    );
    assert_eq!(snapshot.debug.map(|d| d.latency_history), Some(vec![3.5]));
    assert_eq!(log.lock().loads.len(), 1);

    assert_ok!(handle.play_pause().await);
    assert_ok!(handle.set_volume(0.25).await);
    assert_ok!(handle.shutdown().await);
    worker.wait().await.unwrap();

    assert_eq!(controls.toggles.load(Ordering::SeqCst), 1);
    assert_eq!(*controls.volume.lock(), Some(0.25));
    assert_eq!(handle.snapshot().status, PlayerStatus::Shutdown);
    assert_eq!(log.lock().unloads, 1);

    assert!(matches!(
        handle.select_feed(None).await,
        Err(Error::WorkerClosed)
    ));
}

#[tokio::test]
async fn test_worker_switches_feeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/streaming-orcasound-net/orcasound-lab/latest.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("111")
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/streaming-orcasound-net/bush-point/latest.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("222"))
        .mount(&server)
        .await;

    let (engine, log) = RecordingEngine::new();
    let (player, inbox) = Player::from_config(&config_for(&server), Box::new(engine)).unwrap();
    let (worker, handle) = PlayerWorker::spawn(player, inbox);
    let mut rx = handle.subscribe();

    handle
        .select_feed(Some(Feed::new("Orcasound Lab", "orcasound-lab")))
        .await
        .unwrap();
    wait_for(&mut rx, |s| s.status == PlayerStatus::Polling).await;

    handle
        .select_feed(Some(Feed::new("Bush Point", "bush-point")))
        .await
        .unwrap();
    let snapshot = wait_for(&mut rx, |s| s.status == PlayerStatus::Loaded).await;
    assert_eq!(snapshot.feed_label, "Bush Point - bush-point");

    // The delayed answer for the first feed must never load
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(log.lock().manifests().len(), 1);
    assert!(log.lock().manifests()[0].contains("/bush-point/hls/222/"));

    handle.shutdown().await.unwrap();
    worker.wait().await.unwrap();
}

#[tokio::test]
async fn test_dropping_handles_stops_worker() {
    let server = MockServer::start().await;
    let (engine, _log) = RecordingEngine::new();
    let (player, inbox) = Player::from_config(&config_for(&server), Box::new(engine)).unwrap();
    let (worker, handle) = PlayerWorker::spawn(player, inbox);

    drop(handle);
    tokio::time::timeout(Duration::from_secs(5), worker.wait())
        .await
        .expect("worker did not stop")
        .unwrap();
}
