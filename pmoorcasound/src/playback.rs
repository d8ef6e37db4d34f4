//! Contract with the external playback engine
//!
//! The engine decodes and renders an HLS manifest; this crate only tells it
//! which manifest to play and listens to what it reports. Reports flow back
//! as [`PlaybackEvent`]s through a [`PlaybackEvents`] handle that is bound to
//! one load request, so the player can tell a stale engine session apart from
//! the current one.

use crate::resolver::ManifestUrl;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// User-facing controls of a ready playback session
///
/// Implementations must be cheap to call from the player's event loop.
pub trait PlaybackControls: Send + Sync {
    fn play(&self);
    fn pause(&self);
    fn play_pause(&self);
    /// Current playback position in seconds, if the engine knows it
    fn player_time(&self) -> Option<f64>;
    /// Volume in `0.0..=1.0`
    fn set_volume(&self, volume: f32);
}

/// Controls used until the engine reports readiness: every call is a no-op
#[derive(Debug, Clone, Copy, Default)]
pub struct NullControls;

impl PlaybackControls for NullControls {
    fn play(&self) {}
    fn pause(&self) {}
    fn play_pause(&self) {}
    fn player_time(&self) -> Option<f64> {
        None
    }
    fn set_volume(&self, _volume: f32) {}
}

/// Lifecycle and timing reports of a playback session
#[derive(Clone)]
pub enum PlaybackEvent {
    /// The session can be controlled
    Ready(Arc<dyn PlaybackControls>),
    /// The engine is buffering
    Loading,
    Playing,
    Paused,
    /// Latency sample and playback position, both in seconds
    LatencyUpdate { sample: f64, player_time: f64 },
}

impl fmt::Debug for PlaybackEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(_) => f.write_str("Ready"),
            Self::Loading => f.write_str("Loading"),
            Self::Playing => f.write_str("Playing"),
            Self::Paused => f.write_str("Paused"),
            Self::LatencyUpdate {
                sample,
                player_time,
            } => f
                .debug_struct("LatencyUpdate")
                .field("sample", sample)
                .field("player_time", player_time)
                .finish(),
        }
    }
}

/// Identity of one load request handed to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackId(pub(crate) u64);

impl fmt::Display for PlaybackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A [`PlaybackEvent`] with the load request it belongs to
#[derive(Debug, Clone)]
pub struct TaggedPlaybackEvent {
    pub playback: PlaybackId,
    pub event: PlaybackEvent,
}

/// Reporting handle given to the engine with each load request
///
/// Clone it freely; every clone reports for the same load request. Sends
/// after the player is gone are silently dropped.
#[derive(Clone)]
pub struct PlaybackEvents {
    playback: PlaybackId,
    tx: mpsc::UnboundedSender<TaggedPlaybackEvent>,
}

impl PlaybackEvents {
    pub(crate) fn new(playback: PlaybackId, tx: mpsc::UnboundedSender<TaggedPlaybackEvent>) -> Self {
        Self { playback, tx }
    }

    pub fn playback_id(&self) -> PlaybackId {
        self.playback
    }

    pub fn ready(&self, controls: Arc<dyn PlaybackControls>) {
        self.send(PlaybackEvent::Ready(controls));
    }

    pub fn loading(&self) {
        self.send(PlaybackEvent::Loading);
    }

    pub fn playing(&self) {
        self.send(PlaybackEvent::Playing);
    }

    pub fn paused(&self) {
        self.send(PlaybackEvent::Paused);
    }

    pub fn latency_update(&self, sample: f64, player_time: f64) {
        self.send(PlaybackEvent::LatencyUpdate {
            sample,
            player_time,
        });
    }

    /// Returns `false` once the player has gone away
    pub fn send(&self, event: PlaybackEvent) -> bool {
        self.tx
            .send(TaggedPlaybackEvent {
                playback: self.playback,
                event,
            })
            .is_ok()
    }
}

impl fmt::Debug for PlaybackEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackEvents")
            .field("playback", &self.playback)
            .finish()
    }
}

/// What the engine should play
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub manifest: ManifestUrl,
    pub autoplay: bool,
}

/// The media engine driven by the player
///
/// Whether `load` switches the source of an existing session or builds a
/// new one is up to the engine. It must report through the `events` handle
/// of the most recent `load` only.
pub trait PlaybackEngine: Send {
    fn load(&mut self, request: LoadRequest, events: PlaybackEvents);

    /// Stop playing and release the current session, if any
    fn unload(&mut self);
}
