//! Example: follow the live stream instances of an Orcasound feed
//!
//! Run with: cargo run -p pmoorcasound --example live_feed
//! Or with a specific node: cargo run -p pmoorcasound --example live_feed -- rpi_bush_point
//!
//! An optional YAML configuration can be passed as second argument.

use pmoorcasound::{
    Feed, LoadRequest, OrcasoundConfig, PlaybackEngine, PlaybackEvents, Player, PlayerWorker,
};
use std::env;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Engine that only reports what it would play
struct LoggingEngine;

impl PlaybackEngine for LoggingEngine {
    fn load(&mut self, request: LoadRequest, events: PlaybackEvents) {
        println!(
            "▶ {} (autoplay: {}, session {})",
            request.manifest,
            request.autoplay,
            events.playback_id()
        );
        events.loading();
    }

    fn unload(&mut self) {
        println!("■ unloaded");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pmoorcasound=debug")),
        )
        .init();

    let node_name = env::args()
        .nth(1)
        .unwrap_or_else(|| "rpi_orcasound_lab".to_string());

    let config = match env::args().nth(2) {
        Some(path) => OrcasoundConfig::load(path)?,
        None => OrcasoundConfig::default(),
    };

    let (player, inbox) = Player::from_config(&config, Box::new(LoggingEngine))?;
    let (worker, handle) = PlayerWorker::spawn(player, inbox);

    handle
        .select_feed(Some(Feed::new(node_name.clone(), node_name)))
        .await?;

    let mut updates = handle.subscribe();
    let deadline = tokio::time::sleep(Duration::from_secs(60));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                println!(
                    "{:?} | {} | pointer: {} | console: {}",
                    snapshot.status,
                    snapshot.feed_label,
                    snapshot.pointer.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string()),
                    snapshot.console_url.unwrap_or_else(|| "-".to_string()),
                );
            }
        }
    }

    handle.shutdown().await?;
    worker.wait().await?;
    Ok(())
}
