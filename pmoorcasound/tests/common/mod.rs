//! Test doubles shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use pmoorcasound::{
    Error, Feed, LoadRequest, ManifestResolver, PlaybackControls, PlaybackEngine, PlaybackEvents,
    PlayerInbox, PlayerInput, PointerSource, PointerValue, Result,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub fn lab_feed() -> Feed {
    Feed::new("Orcasound Lab", "orcasound-lab").with_location(-123.1735, 48.5583)
}

pub fn bush_point_feed() -> Feed {
    Feed::new("Bush Point", "bush-point").with_location(-122.6039, 48.0336)
}

/// One scripted answer of [`ScriptedSource`]
#[derive(Debug, Clone)]
pub enum Reply {
    Value(&'static str),
    Delayed(&'static str, Duration),
    Fail,
}

/// Pointer source answering from per-feed scripts
///
/// Replies are consumed in order; the last one repeats forever.
#[derive(Default)]
pub struct ScriptedSource {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, feed: &Feed, replies: Vec<Reply>) {
        let url = ManifestResolver::default().pointer_url(feed);
        self.scripts.lock().insert(url, replies.into());
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    pub fn requests_for(&self, feed: &Feed) -> usize {
        let url = ManifestResolver::default().pointer_url(feed);
        self.requests.lock().iter().filter(|r| **r == url).count()
    }

    fn next_reply(&self, url: &str) -> Option<Reply> {
        let mut scripts = self.scripts.lock();
        let queue = scripts.get_mut(url)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl PointerSource for ScriptedSource {
    async fn fetch_pointer(&self, url: &str) -> Result<PointerValue> {
        self.requests.lock().push(url.to_string());

        match self.next_reply(url) {
            Some(Reply::Value(value)) => Ok(PointerValue::from(value)),
            Some(Reply::Delayed(value, delay)) => {
                tokio::time::sleep(delay).await;
                Ok(PointerValue::from(value))
            }
            Some(Reply::Fail) | None => Err(Error::UnexpectedStatus {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}

/// Controls counting every call
#[derive(Default)]
pub struct TestControls {
    pub plays: AtomicUsize,
    pub pauses: AtomicUsize,
    pub toggles: AtomicUsize,
    pub volume: Mutex<Option<f32>>,
    pub time: Mutex<Option<f64>>,
}

impl PlaybackControls for TestControls {
    fn play(&self) {
        self.plays.fetch_add(1, Ordering::SeqCst);
    }

    fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }

    fn play_pause(&self) {
        self.toggles.fetch_add(1, Ordering::SeqCst);
    }

    fn player_time(&self) -> Option<f64> {
        *self.time.lock()
    }

    fn set_volume(&self, volume: f32) {
        *self.volume.lock() = Some(volume);
    }
}

/// What a [`RecordingEngine`] was asked to do
#[derive(Default)]
pub struct EngineLog {
    pub loads: Vec<(LoadRequest, PlaybackEvents)>,
    pub unloads: usize,
}

impl EngineLog {
    pub fn last_events(&self) -> PlaybackEvents {
        self.loads.last().expect("no load recorded").1.clone()
    }

    pub fn manifests(&self) -> Vec<String> {
        self.loads
            .iter()
            .map(|(request, _)| request.manifest.to_string())
            .collect()
    }
}

/// Engine double; optionally reports ready + playing as soon as it loads
pub struct RecordingEngine {
    log: Arc<Mutex<EngineLog>>,
    auto_start: Option<Arc<TestControls>>,
}

impl RecordingEngine {
    pub fn new() -> (Self, Arc<Mutex<EngineLog>>) {
        let log = Arc::new(Mutex::new(EngineLog::default()));
        (
            Self {
                log: Arc::clone(&log),
                auto_start: None,
            },
            log,
        )
    }

    pub fn auto_start(controls: Arc<TestControls>) -> (Self, Arc<Mutex<EngineLog>>) {
        let (mut engine, log) = Self::new();
        engine.auto_start = Some(controls);
        (engine, log)
    }
}

impl PlaybackEngine for RecordingEngine {
    fn load(&mut self, request: LoadRequest, events: PlaybackEvents) {
        if let Some(controls) = &self.auto_start {
            events.loading();
            events.ready(Arc::clone(controls) as Arc<dyn PlaybackControls>);
            events.playing();
            events.latency_update(3.5, 12.0);
        }
        self.log.lock().loads.push((request, events));
    }

    fn unload(&mut self) {
        self.log.lock().unloads += 1;
    }
}

/// Feed everything queued in the inbox into the player
pub fn pump(player: &mut pmoorcasound::Player, inbox: &mut PlayerInbox) -> usize {
    let mut handled = 0;
    loop {
        if let Ok(change) = inbox.manifests.try_recv() {
            player.handle(PlayerInput::Manifest(change));
        } else if let Ok(event) = inbox.playback.try_recv() {
            player.handle(PlayerInput::Playback(event));
        } else {
            return handled;
        }
        handled += 1;
    }
}
