//! Event loop hosting a [`Player`]
//!
//! The worker owns the player on a single tokio task and serialises every
//! input (user commands, poller manifests, engine reports) through one
//! `select!` loop, so transitions never interleave. After each input the
//! current [`PlayerSnapshot`] is published on a watch channel for the host
//! to render.

use crate::error::{Error, Result};
use crate::feed::Feed;
use crate::player::{Player, PlayerCommand, PlayerInbox, PlayerInput, PlayerSnapshot};
use anyhow::anyhow;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Capacity of the command channel
const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// Handle to the spawned player task
pub struct PlayerWorker {
    join_handle: JoinHandle<()>,
}

impl PlayerWorker {
    /// Move `player` onto its own task
    pub fn spawn(player: Player, inbox: PlayerInbox) -> (Self, PlayerHandle) {
        let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (snapshot_tx, snapshot_rx) = watch::channel(player.snapshot());

        let join_handle = tokio::spawn(run(player, inbox, rx, snapshot_tx));

        (
            Self { join_handle },
            PlayerHandle {
                commands: tx,
                snapshot: snapshot_rx,
            },
        )
    }

    /// Wait for the task to finish (after [`PlayerHandle::shutdown`])
    pub async fn wait(self) -> anyhow::Result<()> {
        if let Err(err) = self.join_handle.await {
            if err.is_cancelled() {
                warn!("Player task cancelled: {err}");
                return Ok(());
            }
            return Err(anyhow!("Player join error: {}", err));
        }
        Ok(())
    }
}

async fn run(
    mut player: Player,
    mut inbox: PlayerInbox,
    mut commands: mpsc::Receiver<PlayerCommand>,
    snapshot: watch::Sender<PlayerSnapshot>,
) {
    info!("Player worker started");

    loop {
        let input = tokio::select! {
            biased;
            command = commands.recv() => match command {
                Some(command) => PlayerInput::Command(command),
                None => {
                    debug!("All player handles dropped");
                    break;
                }
            },
            Some(change) = inbox.manifests.recv() => PlayerInput::Manifest(change),
            Some(event) = inbox.playback.recv() => PlayerInput::Playback(event),
        };

        player.handle(input);
        snapshot.send_replace(player.snapshot());

        if player.is_shutdown() {
            break;
        }
    }

    player.shutdown();
    snapshot.send_replace(player.snapshot());
    info!("Player worker stopped");
}

/// Cloneable remote control for a [`PlayerWorker`]
#[derive(Clone)]
pub struct PlayerHandle {
    commands: mpsc::Sender<PlayerCommand>,
    snapshot: watch::Receiver<PlayerSnapshot>,
}

impl PlayerHandle {
    pub async fn send(&self, command: PlayerCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| Error::WorkerClosed)
    }

    /// Select a feed, or clear the selection with `None`
    pub async fn select_feed(&self, feed: Option<Feed>) -> Result<()> {
        self.send(PlayerCommand::SelectFeed(feed)).await
    }

    pub async fn play(&self) -> Result<()> {
        self.send(PlayerCommand::Play).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.send(PlayerCommand::Pause).await
    }

    pub async fn play_pause(&self) -> Result<()> {
        self.send(PlayerCommand::PlayPause).await
    }

    pub async fn set_volume(&self, volume: f32) -> Result<()> {
        self.send(PlayerCommand::SetVolume(volume)).await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(PlayerCommand::Shutdown).await
    }

    /// Latest published state
    pub fn snapshot(&self) -> PlayerSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<PlayerSnapshot> {
        self.snapshot.clone()
    }
}
