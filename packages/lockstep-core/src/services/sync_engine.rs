//! The playback synchronization state machine.
//!
//! Receives local playback intents and remote channel messages, decides
//! what to broadcast, and decides what to push at the playback surface.
//! Dispatch is an explicit match on the typed message enum, so the
//! transition table is testable without any transport.
//!
//! Compensation policy:
//! - outgoing `play` carries `position + latency` (the message spends one
//!   one-way trip in flight);
//! - incoming `play` adds the receiver's own latency again, favoring
//!   "catch up" over lagging behind the controller;
//! - `pause` is never compensated (there is nothing to catch up to);
//! - `time_update` feeds the drift display only and never moves playback.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::channel::SessionChannel;
use crate::events::SyncObserver;
use crate::protocol::SyncMessage;
use crate::services::control_arbiter::ControlArbiter;
use crate::services::latency_estimator::LatencyEstimator;
use crate::surface::PlaybackSurface;

/// The authoritative playback state this client believes in.
///
/// Derived from the most recently accepted remote or local event. Mutated
/// only by the engine; consumed by the playback surface.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlaybackTarget {
    /// Target position in seconds.
    pub position_seconds: f64,
    /// Whether playback should be running.
    pub playing: bool,
}

/// Latest peer position report, for the drift display only.
#[derive(Debug, Clone, Copy)]
pub struct DriftSample {
    /// Receiver-compensated peer position in seconds.
    pub peer_position_seconds: f64,
    /// Local clock reading when the report arrived.
    pub received_at: Instant,
}

/// What the session should do after dispatching a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Keep the session running.
    Continue,
    /// Terminal: the session must navigate to this location and tear down.
    Redirect(String),
}

/// Core state machine for one session.
pub struct PlaybackSyncEngine {
    surface: Arc<dyn PlaybackSurface>,
    channel: Arc<dyn SessionChannel>,
    latency: Arc<LatencyEstimator>,
    arbiter: Arc<ControlArbiter>,
    observer: Arc<dyn SyncObserver>,
    target: Mutex<PlaybackTarget>,
    drift: Mutex<Option<DriftSample>>,
}

impl PlaybackSyncEngine {
    /// Wires the engine to its collaborators.
    pub fn new(
        surface: Arc<dyn PlaybackSurface>,
        channel: Arc<dyn SessionChannel>,
        latency: Arc<LatencyEstimator>,
        arbiter: Arc<ControlArbiter>,
        observer: Arc<dyn SyncObserver>,
    ) -> Self {
        Self {
            surface,
            channel,
            latency,
            arbiter,
            observer,
            target: Mutex::new(PlaybackTarget::default()),
            drift: Mutex::new(None),
        }
    }

    /// The control arbiter backing this engine.
    #[must_use]
    pub fn arbiter(&self) -> &Arc<ControlArbiter> {
        &self.arbiter
    }

    /// Current playback target.
    #[must_use]
    pub fn target(&self) -> PlaybackTarget {
        *self.target.lock()
    }

    /// Latest drift sample, if any peer has reported yet.
    #[must_use]
    pub fn drift_sample(&self) -> Option<DriftSample> {
        *self.drift.lock()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Local intents
    // ─────────────────────────────────────────────────────────────────────────

    /// The user started playback on the local surface.
    ///
    /// Controllers broadcast `play` with the latency-compensated position;
    /// non-controllers keep watching independently and broadcast nothing.
    pub fn on_local_play(&self) {
        let position = self.surface.position_seconds();
        *self.target.lock() = PlaybackTarget {
            position_seconds: position,
            playing: true,
        };
        if !self.arbiter.is_controlling() {
            return;
        }
        let current_time = position + self.latency.latency_seconds();
        log::debug!(
            "[Sync] Broadcasting play at {:.3}s on {}",
            current_time,
            self.channel.topic()
        );
        self.channel.send(SyncMessage::Play { current_time });
    }

    /// The user paused playback on the local surface.
    ///
    /// Pause has no catch-up semantics, so the position goes out exactly.
    pub fn on_local_pause(&self) {
        let position = self.surface.position_seconds();
        *self.target.lock() = PlaybackTarget {
            position_seconds: position,
            playing: false,
        };
        if !self.arbiter.is_controlling() {
            return;
        }
        log::debug!(
            "[Sync] Broadcasting pause at {:.3}s on {}",
            position,
            self.channel.topic()
        );
        self.channel.send(SyncMessage::Pause {
            current_time: position,
        });
    }

    /// The user seeked the local surface.
    ///
    /// The wire protocol has no seek event; a controlling seek re-announces
    /// the current transport state so peers converge on the new position.
    pub fn on_local_seek_intent(&self) {
        let playing = self.target.lock().playing;
        if playing {
            self.on_local_play();
        } else {
            self.on_local_pause();
        }
    }

    /// Broadcasts the advisory position report. Runs on the periodic timer
    /// for every client, controlling or not.
    pub fn broadcast_time_update(&self) {
        let current_time = self.surface.position_seconds() + self.latency.latency_seconds();
        self.channel.send(SyncMessage::TimeUpdate { current_time });
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Remote dispatch
    // ─────────────────────────────────────────────────────────────────────────

    /// Dispatches one message from the channel.
    ///
    /// Remote sync messages are applied regardless of local control state:
    /// a controller that lost the claim race still follows the winner.
    pub fn handle_message(&self, msg: SyncMessage) -> MessageOutcome {
        match msg {
            SyncMessage::Play { current_time } => {
                let position = current_time + self.latency.latency_seconds();
                *self.target.lock() = PlaybackTarget {
                    position_seconds: position,
                    playing: true,
                };
                self.surface.apply_position(position);
                self.surface.apply_playing(true);
            }
            SyncMessage::Pause { current_time } => {
                *self.target.lock() = PlaybackTarget {
                    position_seconds: current_time,
                    playing: false,
                };
                self.surface.apply_position(current_time);
                self.surface.apply_playing(false);
            }
            SyncMessage::TimeUpdate { current_time } => {
                let peer_position = current_time + self.latency.latency_seconds();
                *self.drift.lock() = Some(DriftSample {
                    peer_position_seconds: peer_position,
                    received_at: Instant::now(),
                });
                let drift = peer_position - self.surface.position_seconds();
                self.observer.on_drift_updated(drift);
            }
            SyncMessage::TakenControl {} => {
                self.arbiter.on_peer_claimed();
            }
            SyncMessage::Pong {} => {
                self.latency.on_pong();
            }
            SyncMessage::Ping {} => {
                // Probes are answered by the coordination server, never by
                // a peer. Tolerated and dropped.
                log::trace!("[Sync] Ignoring peer ping on {}", self.channel.topic());
            }
            SyncMessage::Redirect { location } => {
                log::info!(
                    "[Sync] Redirect to {} received on {}",
                    location,
                    self.channel.topic()
                );
                self.observer.on_redirect(&location);
                return MessageOutcome::Redirect(location);
            }
        }
        MessageOutcome::Continue
    }
}
