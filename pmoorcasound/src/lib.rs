//! Orcasound live player core for PMOMusic
//!
//! This crate follows the live HLS stream of an Orcasound hydrophone feed.
//! Each node publishes its current stream instance under a timestamped
//! prefix and keeps the newest timestamp in `latest.txt`; the player polls
//! that pointer, and whenever it changes hands the new `live.m3u8` manifest
//! to a playback engine supplied by the host.
//!
//! # Components
//!
//! - [`ManifestResolver`]: pure address builders for pointer and manifest
//! - [`TimestampPoller`]: cancellable 10 s polling of `latest.txt`
//! - [`PlaybackEngine`] / [`PlaybackControls`]: contract with the media engine
//! - [`LatencyTracker`]: latency history for diagnostics
//! - [`Player`]: state machine tying the above together
//! - [`PlayerWorker`]: event loop running a player on a tokio task
//!
//! # Example
//!
//! ```no_run
//! use pmoorcasound::{
//!     Feed, LoadRequest, OrcasoundConfig, PlaybackEngine, PlaybackEvents, Player, PlayerWorker,
//! };
//!
//! struct PrintEngine;
//!
//! impl PlaybackEngine for PrintEngine {
//!     fn load(&mut self, request: LoadRequest, _events: PlaybackEvents) {
//!         println!("now streaming {}", request.manifest);
//!     }
//!
//!     fn unload(&mut self) {}
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = OrcasoundConfig::default();
//!     let (player, inbox) = Player::from_config(&config, Box::new(PrintEngine))?;
//!     let (worker, handle) = PlayerWorker::spawn(player, inbox);
//!
//!     handle
//!         .select_feed(Some(Feed::new("Orcasound Lab", "rpi_orcasound_lab")))
//!         .await?;
//!
//!     tokio::time::sleep(std::time::Duration::from_secs(30)).await;
//!     println!("{:?}", handle.snapshot());
//!
//!     handle.shutdown().await?;
//!     worker.wait().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod feed;
pub mod latency;
pub mod playback;
pub mod player;
pub mod pointer;
pub mod poller;
pub mod resolver;
pub mod worker;

// Re-exports
pub use config::{OrcasoundConfig, PlaybackConfig, PollingConfig};
pub use error::{Error, Result};
pub use feed::{feed_label, Feed, LocationPoint, NO_FEED_LABEL};
pub use latency::{DebugInfo, LatencyTracker};
pub use playback::{
    LoadRequest, NullControls, PlaybackControls, PlaybackEngine, PlaybackEvent, PlaybackEvents,
    PlaybackId, TaggedPlaybackEvent,
};
pub use player::{
    DetectionContext, Player, PlayerCommand, PlayerInbox, PlayerInput, PlayerOptions,
    PlayerSnapshot, PlayerState, PlayerStatus, StreamInstance, Transport,
};
pub use pointer::{PointerClient, PointerClientBuilder, PointerSource};
pub use poller::{ManifestChange, SessionId, TimestampPoller, DEFAULT_POLL_INTERVAL_SECS};
pub use resolver::{ManifestResolver, ManifestUrl, PointerValue, DEFAULT_BUCKET, DEFAULT_STORAGE_ENDPOINT};
pub use worker::{PlayerHandle, PlayerWorker};
