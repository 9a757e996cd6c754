//! Session lifecycle: join, timers, and teardown.
//!
//! A [`SyncSession`] owns the sync engine and two recurring timers (the
//! latency probe and the advisory `time_update` broadcast) plus the pump
//! that drains channel messages through the engine. All three are tied to
//! one `CancellationToken`, so teardown stops them on every exit path -
//! explicit teardown, a received `redirect`, or a locally issued one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::channel::SessionChannel;
use crate::error::{LockstepError, LockstepResult};
use crate::events::SyncObserver;
use crate::protocol::SyncMessage;
use crate::services::control_arbiter::ControlArbiter;
use crate::services::latency_estimator::LatencyEstimator;
use crate::services::sync_engine::{MessageOutcome, PlaybackSyncEngine, PlaybackTarget};
use crate::state::{Config, JoinRetryPolicy};
use crate::surface::PlaybackSurface;

/// One client's membership in a synchronized viewing group.
pub struct SyncSession {
    stream_id: String,
    engine: Arc<PlaybackSyncEngine>,
    latency: Arc<LatencyEstimator>,
    channel: Arc<dyn SessionChannel>,
    cancel: CancellationToken,
    torn_down: AtomicBool,
}

impl std::fmt::Debug for SyncSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSession")
            .field("stream_id", &self.stream_id)
            .field("torn_down", &self.torn_down)
            .finish_non_exhaustive()
    }
}

impl SyncSession {
    /// Joins the channel and starts the session.
    ///
    /// On success both timers and the incoming pump are running. On join
    /// failure the error is surfaced once; retry behavior is governed by
    /// `config.join_retry` (default: none, matching the protocol).
    ///
    /// # Errors
    ///
    /// Returns `Configuration` for invalid config and `Join` when the
    /// channel refuses membership after any configured retries.
    pub async fn start(
        stream_id: &str,
        channel: Arc<dyn SessionChannel>,
        surface: Arc<dyn PlaybackSurface>,
        observer: Arc<dyn SyncObserver>,
        config: Config,
    ) -> LockstepResult<Arc<Self>> {
        config.validate().map_err(LockstepError::Configuration)?;

        // Claim the (single) subscription before joining so a second session
        // on the same channel fails cleanly without ever entering the room.
        let incoming = channel.take_incoming().ok_or_else(|| {
            LockstepError::Internal("channel subscription already taken".to_string())
        })?;

        join_with_policy(channel.as_ref(), config.join_retry).await?;
        log::info!("[Session] Joined {}", channel.topic());

        let latency = Arc::new(LatencyEstimator::new());
        let arbiter = Arc::new(ControlArbiter::new(
            Arc::clone(&channel),
            Arc::clone(&observer),
        ));
        let engine = Arc::new(PlaybackSyncEngine::new(
            surface,
            Arc::clone(&channel),
            Arc::clone(&latency),
            arbiter,
            observer,
        ));

        let session = Arc::new(Self {
            stream_id: stream_id.to_string(),
            engine,
            latency,
            channel,
            cancel: CancellationToken::new(),
            torn_down: AtomicBool::new(false),
        });

        session.spawn_probe_timer(config.probe_interval());
        session.spawn_time_update_timer(config.time_update_interval());
        session.spawn_incoming_pump(incoming);

        Ok(session)
    }

    /// The stream this session is synchronized on.
    #[must_use]
    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    /// The sync engine, for direct access to targets and drift samples.
    #[must_use]
    pub fn engine(&self) -> &Arc<PlaybackSyncEngine> {
        &self.engine
    }

    /// Current one-way latency estimate in seconds.
    #[must_use]
    pub fn latency_seconds(&self) -> f64 {
        self.latency.latency_seconds()
    }

    /// Current playback target.
    #[must_use]
    pub fn target(&self) -> PlaybackTarget {
        self.engine.target()
    }

    /// True once the session has been torn down.
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Control
    // ─────────────────────────────────────────────────────────────────────────

    /// Claims playback control (announces `taken_control`).
    pub fn claim_control(&self) {
        self.engine.arbiter().claim();
    }

    /// Releases playback control locally (announces nothing).
    pub fn release_control(&self) {
        self.engine.arbiter().release();
    }

    /// Toggles playback control.
    pub fn toggle_control(&self) {
        self.engine.arbiter().toggle();
    }

    /// True while this client holds control.
    #[must_use]
    pub fn is_controlling(&self) -> bool {
        self.engine.arbiter().is_controlling()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Local intents
    // ─────────────────────────────────────────────────────────────────────────

    /// Forwards a local play intent to the engine.
    pub fn on_local_play(&self) {
        self.engine.on_local_play();
    }

    /// Forwards a local pause intent to the engine.
    pub fn on_local_pause(&self) {
        self.engine.on_local_pause();
    }

    /// Forwards a local seek intent to the engine.
    pub fn on_local_seek_intent(&self) {
        self.engine.on_local_seek_intent();
    }

    /// Redirects the whole session to a new stream location.
    ///
    /// Any participant may issue this - it is not gated by control. The
    /// local session tears down; peers tear down when the message arrives.
    pub async fn redirect(&self, location: &str) {
        log::info!(
            "[Session] Redirecting {} to {}",
            self.channel.topic(),
            location
        );
        self.channel.send(SyncMessage::Redirect {
            location: location.to_string(),
        });
        self.teardown().await;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Teardown
    // ─────────────────────────────────────────────────────────────────────────

    /// Tears the session down: stops both timers and the pump, resets
    /// control to unclaimed, and leaves the channel. Idempotent.
    pub async fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        log::info!("[Session] Tearing down {}", self.channel.topic());
        self.engine.arbiter().release();
        self.cancel.cancel();
        self.channel.leave().await;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Background tasks
    // ─────────────────────────────────────────────────────────────────────────

    fn spawn_probe_timer(self: &Arc<Self>, period: Duration) {
        let latency = Arc::clone(&self.latency);
        let channel = Arc::clone(&self.channel);
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        channel.send(latency.probe());
                    }
                }
            }
        });
    }

    fn spawn_time_update_timer(self: &Arc<Self>, period: Duration) {
        let engine = Arc::clone(&self.engine);
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        engine.broadcast_time_update();
                    }
                }
            }
        });
    }

    fn spawn_incoming_pump(self: &Arc<Self>, mut incoming: mpsc::UnboundedReceiver<SyncMessage>) {
        let session = Arc::clone(self);
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    msg = incoming.recv() => {
                        let Some(msg) = msg else { break };
                        match session.engine.handle_message(msg) {
                            MessageOutcome::Continue => {}
                            MessageOutcome::Redirect(_) => {
                                session.teardown().await;
                                break;
                            }
                        }
                    }
                }
            }
        });
    }
}

/// Joins the channel, retrying per the configured policy.
async fn join_with_policy(
    channel: &dyn SessionChannel,
    policy: JoinRetryPolicy,
) -> LockstepResult<()> {
    let mut attempt: u32 = 0;
    loop {
        match channel.join().await {
            Ok(()) => return Ok(()),
            Err(err) => match policy {
                JoinRetryPolicy::None => {
                    log::error!("[Session] Join failed on {}: {}", channel.topic(), err);
                    return Err(err.into());
                }
                JoinRetryPolicy::Fixed {
                    attempts,
                    backoff_ms,
                } => {
                    if attempt >= attempts {
                        log::error!(
                            "[Session] Join failed on {} after {} retries: {}",
                            channel.topic(),
                            attempts,
                            err
                        );
                        return Err(err.into());
                    }
                    attempt += 1;
                    log::warn!(
                        "[Session] Join failed on {} (attempt {}/{}): {}, retrying",
                        channel.topic(),
                        attempt,
                        attempts,
                        err
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
            },
        }
    }
}
