//! Latest-timestamp poller
//!
//! The poller owns at most one [`PollSession`] at a time. A session is a
//! spawned task that fetches the feed's pointer resource immediately and
//! then on a fixed cadence, and reports every *change* of pointer value as a
//! [`ManifestChange`] on the poller's event channel.
//!
//! # Cancellation
//!
//! Stopping a session is synchronous:
//!
//! 1. the emit gate is closed under its lock, so once [`TimestampPoller::stop`]
//!    returns the old task can no longer publish anything;
//! 2. the session's stop token is cancelled and its task aborted, which drops
//!    the in-flight request future (and with it the HTTP request).
//!
//! [`TimestampPoller::start`] always stops first, so a session for a new feed
//! never races a dangling response from the previous one. Events already
//! queued on the channel carry their [`SessionId`]; consumers compare it with
//! [`TimestampPoller::current_session`] to drop anything older.

use crate::error::{Error, Result};
use crate::feed::Feed;
use crate::pointer::PointerSource;
use crate::resolver::{ManifestResolver, ManifestUrl, PointerValue};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default polling cadence (10 seconds)
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Identity of one polling session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A new stream instance was observed for the polled feed
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestChange {
    pub session: SessionId,
    pub feed: Feed,
    pub pointer: PointerValue,
    pub manifest: ManifestUrl,
}

/// Channel side of the poller, only lets the current session through
#[derive(Clone)]
struct EmitGate {
    current: Arc<Mutex<Option<SessionId>>>,
    events: mpsc::UnboundedSender<ManifestChange>,
}

impl EmitGate {
    fn open(&self, session: SessionId) {
        *self.current.lock() = Some(session);
    }

    fn close(&self) {
        *self.current.lock() = None;
    }

    /// Send while holding the lock so `close` cannot interleave
    fn emit(&self, change: ManifestChange) -> bool {
        let current = self.current.lock();
        if *current != Some(change.session) {
            return false;
        }
        self.events.send(change).is_ok()
    }
}

/// Resources held for one active feed
///
/// Dropping the session releases everything: the token is cancelled and the
/// task aborted, whatever path the owner takes.
struct PollSession {
    id: SessionId,
    feed: Feed,
    stop_token: CancellationToken,
    task: JoinHandle<()>,
}

impl Drop for PollSession {
    fn drop(&mut self) {
        self.stop_token.cancel();
        self.task.abort();
    }
}

/// Polls `latest.txt` for one feed at a time
pub struct TimestampPoller {
    resolver: ManifestResolver,
    source: Arc<dyn PointerSource>,
    interval: Duration,
    gate: EmitGate,
    active: Option<PollSession>,
    next_session: u64,
}

impl TimestampPoller {
    /// Create an idle poller and the receiver of its manifest changes
    pub fn new(
        resolver: ManifestResolver,
        source: Arc<dyn PointerSource>,
        interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<ManifestChange>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let poller = Self {
            resolver,
            source,
            interval,
            gate: EmitGate {
                current: Arc::new(Mutex::new(None)),
                events: tx,
            },
            active: None,
            next_session: 0,
        };
        (poller, rx)
    }

    pub fn resolver(&self) -> &ManifestResolver {
        &self.resolver
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Session currently allowed to publish, if any
    pub fn current_session(&self) -> Option<SessionId> {
        self.active.as_ref().map(|session| session.id)
    }

    /// Whether `session` is the live one
    pub fn is_current(&self, session: SessionId) -> bool {
        self.current_session() == Some(session)
    }

    /// Whether a request/timer pair is running
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Feed being polled
    pub fn feed(&self) -> Option<&Feed> {
        self.active.as_ref().map(|session| &session.feed)
    }

    /// Start polling `feed`, replacing any running session
    ///
    /// The first fetch is issued immediately, then one per interval. With no
    /// feed, or a feed without a node name, nothing is fetched or scheduled
    /// and `None` is returned. Must be called within a tokio runtime.
    pub fn start(&mut self, feed: Option<&Feed>) -> Option<SessionId> {
        self.stop();

        let feed = match feed {
            Some(feed) if feed.is_addressable() => feed.clone(),
            Some(feed) => {
                debug!(feed = %feed.name, "Feed has no node name, not polling");
                return None;
            }
            None => {
                debug!("No feed selected, not polling");
                return None;
            }
        };

        self.next_session += 1;
        let id = SessionId(self.next_session);
        self.gate.open(id);

        let stop_token = CancellationToken::new();
        let worker = SessionWorker {
            id,
            pointer_url: self.resolver.pointer_url(&feed),
            feed: feed.clone(),
            resolver: self.resolver.clone(),
            source: Arc::clone(&self.source),
            gate: self.gate.clone(),
        };

        info!(
            feed = %feed.node_name,
            session = %id,
            interval_secs = self.interval.as_secs(),
            "Starting timestamp poller"
        );

        let task = tokio::spawn(worker.run(self.interval, stop_token.clone()));

        self.active = Some(PollSession {
            id,
            feed,
            stop_token,
            task,
        });

        Some(id)
    }

    /// Abort the in-flight request and cancel the timer
    ///
    /// No-op when nothing is running.
    pub fn stop(&mut self) {
        self.gate.close();
        if let Some(session) = self.active.take() {
            info!(
                feed = %session.feed.node_name,
                session = %session.id,
                "Stopping timestamp poller"
            );
            drop(session);
        }
    }
}

impl Drop for TimestampPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for TimestampPoller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimestampPoller")
            .field("resolver", &self.resolver)
            .field("interval", &self.interval)
            .field("session", &self.current_session())
            .field("feed", &self.feed().map(|feed| &feed.node_name))
            .finish()
    }
}

type PointerFetch = BoxFuture<'static, Result<PointerValue>>;

/// State moved into the spawned session task
struct SessionWorker {
    id: SessionId,
    feed: Feed,
    pointer_url: String,
    resolver: ManifestResolver,
    source: Arc<dyn PointerSource>,
    gate: EmitGate,
}

impl SessionWorker {
    async fn run(self, interval: Duration, stop_token: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut in_flight: Option<PointerFetch> = None;
        let mut last_observed: Option<PointerValue> = None;

        loop {
            tokio::select! {
                biased;
                _ = stop_token.cancelled() => break,
                Some(outcome) = settle(&mut in_flight) => {
                    in_flight = None;
                    self.on_outcome(outcome, &mut last_observed);
                }
                _ = ticker.tick() => {
                    if in_flight.is_some() {
                        debug!(
                            feed = %self.feed.node_name,
                            session = %self.id,
                            "Pointer request still pending, replacing it"
                        );
                    }
                    in_flight = Some(self.fetch());
                }
            }
        }

        debug!(feed = %self.feed.node_name, session = %self.id, "Poll session ended");
    }

    fn fetch(&self) -> PointerFetch {
        let source = Arc::clone(&self.source);
        let url = self.pointer_url.clone();
        Box::pin(async move { source.fetch_pointer(&url).await })
    }

    fn on_outcome(&self, outcome: Result<PointerValue>, last_observed: &mut Option<PointerValue>) {
        let pointer = match outcome {
            Ok(pointer) => pointer,
            Err(Error::UnexpectedStatus { status, url }) => {
                warn!(
                    feed = %self.feed.node_name,
                    status,
                    url = %url,
                    "Pointer resource unavailable, skipping tick"
                );
                return;
            }
            Err(e) => {
                debug!(
                    feed = %self.feed.node_name,
                    error = %e,
                    "Pointer fetch failed, skipping tick"
                );
                return;
            }
        };

        debug!(feed = %self.feed.node_name, pointer = %pointer, "Latest timestamp");

        if last_observed.as_ref() == Some(&pointer) {
            return;
        }

        let manifest = self
            .resolver
            .manifest_url(&pointer, &self.feed, self.resolver.bucket());
        *last_observed = Some(pointer.clone());

        let change = ManifestChange {
            session: self.id,
            feed: self.feed.clone(),
            pointer,
            manifest,
        };

        let manifest = change.manifest.clone();
        if self.gate.emit(change) {
            info!(
                feed = %self.feed.node_name,
                session = %self.id,
                manifest = %manifest,
                "New stream instance"
            );
        }
    }
}

/// Resolve the in-flight fetch, or `None` right away when there is none
async fn settle(in_flight: &mut Option<PointerFetch>) -> Option<Result<PointerValue>> {
    match in_flight.as_mut() {
        Some(fetch) => Some(fetch.await),
        None => None,
    }
}
