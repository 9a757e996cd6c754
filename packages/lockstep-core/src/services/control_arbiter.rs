//! Control arbitration for one session.
//!
//! The protocol tracks control as seen from the local client only:
//! `HeldBySelf` or `UnclaimedBySelf` (which remote peer holds control, if
//! any, is not tracked). Claiming announces `taken_control` on the channel;
//! giving control up announces nothing, since "nobody controls" is every
//! peer's default until the next claim arrives.
//!
//! There is no tie-break for simultaneous claims: two clients that claim
//! within network latency of each other each receive the other's
//! `taken_control` and both demote to `UnclaimedBySelf`. That convergence
//! to "neither controls" is a protocol property, kept as-is.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::channel::SessionChannel;
use crate::events::SyncObserver;
use crate::protocol::SyncMessage;

/// Local control state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlState {
    /// This client may broadcast play/pause sync messages.
    HeldBySelf,
    /// This client watches; some peer may or may not be controlling.
    #[default]
    UnclaimedBySelf,
}

/// Per-session control arbiter.
pub struct ControlArbiter {
    state: Mutex<ControlState>,
    channel: Arc<dyn SessionChannel>,
    observer: Arc<dyn SyncObserver>,
}

impl ControlArbiter {
    /// Creates an arbiter in the `UnclaimedBySelf` state.
    pub fn new(channel: Arc<dyn SessionChannel>, observer: Arc<dyn SyncObserver>) -> Self {
        Self {
            state: Mutex::new(ControlState::UnclaimedBySelf),
            channel,
            observer,
        }
    }

    /// Claims control: announces `taken_control` and notifies the observer.
    ///
    /// Idempotent - claiming while already `HeldBySelf` changes nothing and
    /// does not re-announce.
    pub fn claim(&self) {
        {
            let mut state = self.state.lock();
            if *state == ControlState::HeldBySelf {
                return;
            }
            *state = ControlState::HeldBySelf;
        }
        log::info!("[Control] Claimed control on {}", self.channel.topic());
        self.channel.send(SyncMessage::TakenControl {});
        self.observer.on_control_changed(true);
    }

    /// Releases control locally. Nothing is announced.
    pub fn release(&self) {
        {
            let mut state = self.state.lock();
            if *state == ControlState::UnclaimedBySelf {
                return;
            }
            *state = ControlState::UnclaimedBySelf;
        }
        log::info!("[Control] Released control on {}", self.channel.topic());
        self.observer.on_control_changed(false);
    }

    /// Toggles between claimed and released.
    pub fn toggle(&self) {
        if self.is_controlling() {
            self.release();
        } else {
            self.claim();
        }
    }

    /// A peer announced `taken_control`: unconditionally demote.
    ///
    /// Runs regardless of current state - a controller that loses the claim
    /// race still yields to the winning peer.
    pub fn on_peer_claimed(&self) {
        let was_controlling = {
            let mut state = self.state.lock();
            let was = *state == ControlState::HeldBySelf;
            *state = ControlState::UnclaimedBySelf;
            was
        };
        if was_controlling {
            log::info!(
                "[Control] Peer claimed control on {}, yielding",
                self.channel.topic()
            );
            self.observer.on_control_changed(false);
        }
    }

    /// True while this client holds control.
    #[must_use]
    pub fn is_controlling(&self) -> bool {
        *self.state.lock() == ControlState::HeldBySelf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::LocalChannelHub;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingObserver {
        changes: Mutex<Vec<bool>>,
    }

    impl RecordingObserver {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                changes: Mutex::new(Vec::new()),
            })
        }
    }

    impl SyncObserver for RecordingObserver {
        fn on_control_changed(&self, controlling: bool) {
            self.changes.lock().push(controlling);
        }
        fn on_drift_updated(&self, _drift_seconds: f64) {}
        fn on_redirect(&self, _location: &str) {}
    }

    async fn arbiter_with_peer() -> (
        ControlArbiter,
        tokio::sync::mpsc::UnboundedReceiver<SyncMessage>,
        Arc<RecordingObserver>,
    ) {
        let hub = LocalChannelHub::new(32);
        let local = hub.channel_for_stream("movie.mp4");
        let peer = hub.channel_for_stream("movie.mp4");
        local.join().await.unwrap();
        peer.join().await.unwrap();
        let peer_rx = peer.take_incoming().unwrap();

        let observer = RecordingObserver::new();
        let arbiter = ControlArbiter::new(Arc::new(local), observer.clone());
        (arbiter, peer_rx, observer)
    }

    #[tokio::test]
    async fn claim_announces_taken_control() {
        let (arbiter, mut peer_rx, observer) = arbiter_with_peer().await;

        arbiter.claim();

        assert!(arbiter.is_controlling());
        assert_eq!(peer_rx.try_recv().unwrap(), SyncMessage::TakenControl {});
        assert_eq!(*observer.changes.lock(), vec![true]);
    }

    #[tokio::test]
    async fn claim_is_idempotent() {
        let (arbiter, mut peer_rx, observer) = arbiter_with_peer().await;

        arbiter.claim();
        arbiter.claim();

        assert!(arbiter.is_controlling());
        // Exactly one announcement and one observer notification.
        assert!(peer_rx.try_recv().is_ok());
        assert!(peer_rx.try_recv().is_err());
        assert_eq!(*observer.changes.lock(), vec![true]);
    }

    #[tokio::test]
    async fn release_announces_nothing() {
        let (arbiter, mut peer_rx, observer) = arbiter_with_peer().await;

        arbiter.claim();
        let _ = peer_rx.try_recv();

        arbiter.release();

        assert!(!arbiter.is_controlling());
        assert!(peer_rx.try_recv().is_err());
        assert_eq!(*observer.changes.lock(), vec![true, false]);
    }

    #[tokio::test]
    async fn release_when_unclaimed_is_a_no_op() {
        let (arbiter, _peer_rx, observer) = arbiter_with_peer().await;

        arbiter.release();

        assert!(observer.changes.lock().is_empty());
    }

    #[tokio::test]
    async fn toggle_claims_then_releases() {
        let (arbiter, _peer_rx, _observer) = arbiter_with_peer().await;

        arbiter.toggle();
        assert!(arbiter.is_controlling());
        arbiter.toggle();
        assert!(!arbiter.is_controlling());
    }

    #[tokio::test]
    async fn peer_claim_forces_unclaimed_from_held() {
        let (arbiter, _peer_rx, observer) = arbiter_with_peer().await;

        arbiter.claim();
        arbiter.on_peer_claimed();

        assert!(!arbiter.is_controlling());
        assert_eq!(*observer.changes.lock(), vec![true, false]);
    }

    #[tokio::test]
    async fn peer_claim_while_unclaimed_stays_quiet() {
        let (arbiter, _peer_rx, observer) = arbiter_with_peer().await;

        arbiter.on_peer_claimed();

        assert!(!arbiter.is_controlling());
        // Already unclaimed: no spurious observer churn.
        assert!(observer.changes.lock().is_empty());
    }

    #[tokio::test]
    async fn simultaneous_claims_converge_to_neither() {
        // Two clients claim within each other's latency window; each then
        // receives the other's announcement and both end up unclaimed.
        let hub = LocalChannelHub::new(32);
        let x_chan = hub.channel_for_stream("movie.mp4");
        let y_chan = hub.channel_for_stream("movie.mp4");
        x_chan.join().await.unwrap();
        y_chan.join().await.unwrap();
        let mut x_rx = x_chan.take_incoming().unwrap();
        let mut y_rx = y_chan.take_incoming().unwrap();

        let count = Arc::new(AtomicUsize::new(0));
        struct Counting(Arc<AtomicUsize>);
        impl SyncObserver for Counting {
            fn on_control_changed(&self, _c: bool) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
            fn on_drift_updated(&self, _d: f64) {}
            fn on_redirect(&self, _l: &str) {}
        }

        let x = ControlArbiter::new(Arc::new(x_chan), Arc::new(Counting(count.clone())));
        let y = ControlArbiter::new(Arc::new(y_chan), Arc::new(Counting(count.clone())));

        // Both claim before either sees the other's message.
        x.claim();
        y.claim();
        assert!(x.is_controlling() && y.is_controlling());

        // Announcements arrive; both demote.
        assert_eq!(x_rx.try_recv().unwrap(), SyncMessage::TakenControl {});
        x.on_peer_claimed();
        assert_eq!(y_rx.try_recv().unwrap(), SyncMessage::TakenControl {});
        y.on_peer_claimed();

        assert!(!x.is_controlling() && !y.is_controlling());
    }
}
