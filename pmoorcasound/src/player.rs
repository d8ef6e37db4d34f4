//! Player state machine
//!
//! [`Player`] wires the [`TimestampPoller`] to a [`PlaybackEngine`] and keeps
//! the observable state in a single [`PlayerState`]:
//!
//! ```text
//!            select feed                 manifest change           ready
//!   Idle ───────────────▶ Polling ───────────────────▶ Loaded ───────────▶ Ready
//!    ▲                       ▲                                               │
//!    │  no/unaddressable     │ select feed (any state)      manifest change ─┘
//!    └── feed ───────────────┘                              (stays Ready)
//!
//!   shutdown (any state) ─▶ Shutdown
//! ```
//!
//! Play/pause reports are recorded in `Loaded` as well as in `Ready`.
//!
//! All inputs go through [`Player::handle`], which is what the worker loop
//! calls. Inputs that belong to a superseded poll session or engine load are
//! dropped there.

use crate::config::OrcasoundConfig;
use crate::error::Result;
use crate::feed::{feed_label, Feed};
use crate::latency::{DebugInfo, LatencyTracker};
use crate::playback::{
    LoadRequest, NullControls, PlaybackControls, PlaybackEngine, PlaybackEvent, PlaybackEvents,
    PlaybackId, TaggedPlaybackEvent,
};
use crate::pointer::PointerSource;
use crate::poller::{ManifestChange, TimestampPoller};
use crate::resolver::{ManifestResolver, ManifestUrl, PointerValue};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Play/pause sub-state of a ready session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Playing,
    Paused,
}

/// A manifest handed to the engine
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInstance {
    pub feed: Feed,
    pub pointer: PointerValue,
    pub manifest: ManifestUrl,
    pub playback: PlaybackId,
}

/// Where the player is in its lifecycle
#[derive(Clone)]
pub enum PlayerState {
    /// Nothing polled; a selected feed without node name stays on display
    Idle,
    /// Polling a feed, no manifest resolved yet
    Polling { feed: Feed },
    /// Manifest handed to the engine, waiting for readiness
    Loaded {
        stream: StreamInstance,
        transport: Transport,
        loading: bool,
        debug: Option<DebugInfo>,
    },
    /// Controls are available
    Ready {
        stream: StreamInstance,
        controls: Arc<dyn PlaybackControls>,
        transport: Transport,
        loading: bool,
        debug: Option<DebugInfo>,
    },
    /// Torn down for good
    Shutdown,
}

impl PlayerState {
    pub fn status(&self) -> PlayerStatus {
        match self {
            Self::Idle => PlayerStatus::Idle,
            Self::Polling { .. } => PlayerStatus::Polling,
            Self::Loaded { .. } => PlayerStatus::Loaded,
            Self::Ready { .. } => PlayerStatus::Ready,
            Self::Shutdown => PlayerStatus::Shutdown,
        }
    }

    pub fn feed(&self) -> Option<&Feed> {
        match self {
            Self::Polling { feed } => Some(feed),
            Self::Loaded { stream, .. } | Self::Ready { stream, .. } => Some(&stream.feed),
            Self::Idle | Self::Shutdown => None,
        }
    }

    pub fn stream(&self) -> Option<&StreamInstance> {
        match self {
            Self::Loaded { stream, .. } | Self::Ready { stream, .. } => Some(stream),
            _ => None,
        }
    }

    pub fn debug_info(&self) -> Option<&DebugInfo> {
        match self {
            Self::Loaded { debug, .. } | Self::Ready { debug, .. } => debug.as_ref(),
            _ => None,
        }
    }

    /// Last play/pause report of the engine, if a manifest is loaded
    pub fn transport(&self) -> Option<Transport> {
        match self {
            Self::Loaded { transport, .. } | Self::Ready { transport, .. } => Some(*transport),
            _ => None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.transport() == Some(Transport::Playing)
    }

    pub fn is_loading(&self) -> bool {
        match self {
            Self::Loaded { loading, .. } | Self::Ready { loading, .. } => *loading,
            _ => false,
        }
    }

    fn with_loading(mut self, value: bool) -> Self {
        if let Self::Loaded { loading, .. } | Self::Ready { loading, .. } = &mut self {
            *loading = value;
        }
        self
    }

    fn with_transport(mut self, value: Transport) -> Self {
        if let Self::Loaded { transport, .. } | Self::Ready { transport, .. } = &mut self {
            *transport = value;
        }
        self
    }

    fn with_latency(mut self, sample: f64, player_time: f64) -> Self {
        if let Self::Loaded { debug, .. } | Self::Ready { debug, .. } = &mut self {
            *debug = Some(LatencyTracker::record(debug.as_ref(), sample, player_time));
        }
        self
    }
}

impl fmt::Debug for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("Idle"),
            Self::Polling { feed } => f
                .debug_struct("Polling")
                .field("feed", &feed.node_name)
                .finish(),
            Self::Loaded {
                stream,
                transport,
                loading,
                ..
            } => f
                .debug_struct("Loaded")
                .field("manifest", &stream.manifest)
                .field("transport", transport)
                .field("loading", loading)
                .finish(),
            Self::Ready {
                stream,
                transport,
                loading,
                ..
            } => f
                .debug_struct("Ready")
                .field("manifest", &stream.manifest)
                .field("transport", transport)
                .field("loading", loading)
                .finish(),
            Self::Shutdown => f.write_str("Shutdown"),
        }
    }
}

/// State category without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
    Idle,
    Polling,
    Loaded,
    Ready,
    Shutdown,
}

/// User and host requests
#[derive(Debug, Clone)]
pub enum PlayerCommand {
    SelectFeed(Option<Feed>),
    Play,
    Pause,
    PlayPause,
    SetVolume(f32),
    Shutdown,
}

/// Everything the state machine reacts to
#[derive(Debug, Clone)]
pub enum PlayerInput {
    Command(PlayerCommand),
    Manifest(ManifestChange),
    Playback(TaggedPlaybackEvent),
}

/// Context for reporting a detection on the stream being heard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionContext {
    pub feed: Feed,
    /// Stream instance timestamp
    pub pointer: PointerValue,
    /// Playback position within that instance, in seconds
    pub player_time: Option<f64>,
}

/// Rendering-oriented copy of the player state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSnapshot {
    pub status: PlayerStatus,
    pub feed: Option<Feed>,
    /// `"<name> - <nodeName>"` or the no-feed text
    pub feed_label: String,
    pub coordinates: Option<String>,
    pub pointer: Option<PointerValue>,
    pub manifest: Option<ManifestUrl>,
    pub console_url: Option<String>,
    pub is_playing: bool,
    pub is_loading: bool,
    pub debug: Option<DebugInfo>,
}

impl Default for PlayerSnapshot {
    fn default() -> Self {
        Self {
            status: PlayerStatus::Idle,
            feed: None,
            feed_label: feed_label(None),
            coordinates: None,
            pointer: None,
            manifest: None,
            console_url: None,
            is_playing: false,
            is_loading: false,
            debug: None,
        }
    }
}

/// Receivers feeding the player's event loop
pub struct PlayerInbox {
    pub manifests: mpsc::UnboundedReceiver<ManifestChange>,
    pub playback: mpsc::UnboundedReceiver<TaggedPlaybackEvent>,
}

/// Options for [`Player::new`]
#[derive(Debug, Clone)]
pub struct PlayerOptions {
    pub resolver: ManifestResolver,
    pub poll_interval: Duration,
    pub autoplay: bool,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            resolver: ManifestResolver::default(),
            poll_interval: Duration::from_secs(crate::poller::DEFAULT_POLL_INTERVAL_SECS),
            autoplay: true,
        }
    }
}

impl From<&OrcasoundConfig> for PlayerOptions {
    fn from(config: &OrcasoundConfig) -> Self {
        Self {
            resolver: config.resolver(),
            poll_interval: config.polling.interval(),
            autoplay: config.playback.autoplay,
        }
    }
}

/// Live player for one feed at a time
pub struct Player {
    poller: TimestampPoller,
    engine: Box<dyn PlaybackEngine>,
    state: PlayerState,
    /// Feed last chosen by the host, kept for display even when not polled
    selected: Option<Feed>,
    playback_tx: mpsc::UnboundedSender<TaggedPlaybackEvent>,
    next_playback: u64,
    autoplay: bool,
}

impl Player {
    /// Create an idle player and the receivers its event loop must drain
    pub fn new(
        options: PlayerOptions,
        source: Arc<dyn PointerSource>,
        engine: Box<dyn PlaybackEngine>,
    ) -> (Self, PlayerInbox) {
        let (poller, manifests) =
            TimestampPoller::new(options.resolver, source, options.poll_interval);
        let (playback_tx, playback) = mpsc::unbounded_channel();

        let player = Self {
            poller,
            engine,
            state: PlayerState::Idle,
            selected: None,
            playback_tx,
            next_playback: 0,
            autoplay: options.autoplay,
        };

        (
            player,
            PlayerInbox {
                manifests,
                playback,
            },
        )
    }

    /// Create a player polling over HTTP as configured
    pub fn from_config(
        config: &OrcasoundConfig,
        engine: Box<dyn PlaybackEngine>,
    ) -> Result<(Self, PlayerInbox)> {
        config.validate()?;
        let source = Arc::new(config.pointer_client()?);
        Ok(Self::new(PlayerOptions::from(config), source, engine))
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn poller(&self) -> &TimestampPoller {
        &self.poller
    }

    pub fn is_shutdown(&self) -> bool {
        matches!(self.state, PlayerState::Shutdown)
    }

    /// Dispatch one input into the state machine
    pub fn handle(&mut self, input: PlayerInput) {
        match input {
            PlayerInput::Command(command) => self.on_command(command),
            PlayerInput::Manifest(change) => self.on_manifest_change(change),
            PlayerInput::Playback(event) => self.on_playback_event(event),
        }
    }

    fn on_command(&mut self, command: PlayerCommand) {
        match command {
            PlayerCommand::SelectFeed(feed) => self.select_feed(feed),
            PlayerCommand::Play => self.controls().play(),
            PlayerCommand::Pause => self.controls().pause(),
            PlayerCommand::PlayPause => self.controls().play_pause(),
            PlayerCommand::SetVolume(volume) => self.controls().set_volume(volume.clamp(0.0, 1.0)),
            PlayerCommand::Shutdown => self.shutdown(),
        }
    }

    /// Switch to another feed, or to none
    ///
    /// The previous poll session and engine session are released before the
    /// new feed is polled.
    pub fn select_feed(&mut self, feed: Option<Feed>) {
        if self.is_shutdown() {
            warn!("Feed selected on a player that was shut down, ignoring");
            return;
        }

        self.teardown();
        self.selected = feed.clone();

        match (self.poller.start(feed.as_ref()), feed) {
            (Some(session), Some(feed)) => {
                info!(feed = %feed.node_name, session = %session, "Feed selected");
                self.state = PlayerState::Polling { feed };
            }
            (None, Some(feed)) => {
                warn!(feed = %feed.name, "Feed has no node name, not polling");
            }
            (_, None) => {}
        }
    }

    /// Stop everything; the player does not accept feeds afterwards
    pub fn shutdown(&mut self) {
        if self.is_shutdown() {
            return;
        }
        self.teardown();
        self.selected = None;
        self.state = PlayerState::Shutdown;
        info!("Player shut down");
    }

    fn teardown(&mut self) {
        self.poller.stop();
        if self.state.stream().is_some() {
            self.engine.unload();
        }
        self.state = PlayerState::Idle;
    }

    fn on_manifest_change(&mut self, change: ManifestChange) {
        if !self.poller.is_current(change.session) {
            debug!(session = %change.session, "Dropping manifest from a stopped poll session");
            return;
        }

        if self
            .state
            .stream()
            .is_some_and(|stream| stream.manifest == change.manifest)
        {
            return;
        }

        if matches!(self.state, PlayerState::Idle | PlayerState::Shutdown) {
            debug!(session = %change.session, "No feed polled, ignoring manifest");
            return;
        }

        self.next_playback += 1;
        let playback = PlaybackId(self.next_playback);
        let events = PlaybackEvents::new(playback, self.playback_tx.clone());

        info!(
            feed = %change.feed.node_name,
            pointer = %change.pointer,
            playback = %playback,
            manifest = %change.manifest,
            "Loading stream instance"
        );

        self.engine.load(
            LoadRequest {
                manifest: change.manifest.clone(),
                autoplay: self.autoplay,
            },
            events,
        );

        let stream = StreamInstance {
            feed: change.feed,
            pointer: change.pointer,
            manifest: change.manifest,
            playback,
        };

        // A ready engine may switch sources in place without signalling
        // readiness again, so its controls and transport are kept.
        let state = std::mem::replace(&mut self.state, PlayerState::Idle);
        self.state = match state {
            PlayerState::Ready {
                controls,
                transport,
                loading,
                debug,
                ..
            } => PlayerState::Ready {
                stream,
                controls,
                transport,
                loading,
                debug,
            },
            PlayerState::Loaded {
                transport,
                loading,
                debug,
                ..
            } => PlayerState::Loaded {
                stream,
                transport,
                loading,
                debug,
            },
            _ => PlayerState::Loaded {
                stream,
                transport: Transport::Paused,
                loading: false,
                debug: None,
            },
        };
    }

    fn on_playback_event(&mut self, tagged: TaggedPlaybackEvent) {
        let current = self.state.stream().map(|stream| stream.playback);
        if current != Some(tagged.playback) {
            debug!(
                playback = %tagged.playback,
                event = ?tagged.event,
                "Dropping event from a released playback session"
            );
            return;
        }

        let state = std::mem::replace(&mut self.state, PlayerState::Idle);
        self.state = match (state, tagged.event) {
            (
                PlayerState::Loaded {
                    stream,
                    transport,
                    debug,
                    ..
                }
                | PlayerState::Ready {
                    stream,
                    transport,
                    debug,
                    ..
                },
                PlaybackEvent::Ready(controls),
            ) => {
                debug!(playback = %stream.playback, transport = ?transport, "Playback ready");
                PlayerState::Ready {
                    stream,
                    controls,
                    transport,
                    loading: false,
                    debug,
                }
            }
            (state, PlaybackEvent::Loading) => state.with_loading(true),
            (state, PlaybackEvent::Playing) => {
                state.with_transport(Transport::Playing).with_loading(false)
            }
            (state, PlaybackEvent::Paused) => {
                state.with_transport(Transport::Paused).with_loading(false)
            }
            (
                state,
                PlaybackEvent::LatencyUpdate {
                    sample,
                    player_time,
                },
            ) => state.with_latency(sample, player_time),
            (state, PlaybackEvent::Ready(_)) => state,
        };
    }

    /// Controls of the ready session, or no-ops
    pub fn controls(&self) -> Arc<dyn PlaybackControls> {
        match &self.state {
            PlayerState::Ready { controls, .. } => Arc::clone(controls),
            _ => Arc::new(NullControls),
        }
    }

    /// Playback position reported by the engine's controls
    pub fn player_time(&self) -> Option<f64> {
        self.controls().player_time()
    }

    /// What a detection report needs; only available while playing
    pub fn detection_context(&self) -> Option<DetectionContext> {
        if !self.state.is_playing() {
            return None;
        }
        let stream = self.state.stream()?;
        Some(DetectionContext {
            feed: stream.feed.clone(),
            pointer: stream.pointer.clone(),
            player_time: self.player_time(),
        })
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        let feed = self.state.feed().or(self.selected.as_ref()).cloned();
        let stream = self.state.stream();
        let resolver = self.poller.resolver();

        PlayerSnapshot {
            status: self.state.status(),
            feed_label: feed_label(feed.as_ref()),
            coordinates: feed.as_ref().map(Feed::coordinates_label),
            pointer: stream.map(|stream| stream.pointer.clone()),
            manifest: stream.map(|stream| stream.manifest.clone()),
            console_url: stream.map(|stream| {
                resolver.console_url(&stream.pointer, &stream.feed, resolver.bucket())
            }),
            is_playing: self.state.is_playing(),
            is_loading: self.state.is_loading(),
            debug: self.state.debug_info().cloned(),
            feed,
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("state", &self.state)
            .field("poller", &self.poller)
            .field("autoplay", &self.autoplay)
            .finish()
    }
}
