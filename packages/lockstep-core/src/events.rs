//! Observer abstraction for decoupling the sync core from the UI.
//!
//! The session and its services depend on the [`SyncObserver`] trait rather
//! than any concrete UI, enabling testing and alternative frontends (status
//! label, desktop shell, headless logging).

/// Trait for surfacing session state changes without knowledge of the UI.
///
/// Implementations must be cheap and non-blocking: callbacks run on the
/// session's event path.
pub trait SyncObserver: Send + Sync {
    /// Local control state changed (claimed, released, or lost to a peer).
    fn on_control_changed(&self, controlling: bool);

    /// A fresh peer position report arrived; `drift_seconds` is the
    /// receiver-compensated peer position minus the local position.
    /// Positive means the peer is ahead. Informational only.
    fn on_drift_updated(&self, drift_seconds: f64);

    /// The session was told to navigate to a new stream location.
    /// The session is torn down after this callback returns.
    fn on_redirect(&self, location: &str);
}

/// No-op observer for headless use or testing.
pub struct NoopSyncObserver;

impl SyncObserver for NoopSyncObserver {
    fn on_control_changed(&self, _controlling: bool) {
        // No-op
    }

    fn on_drift_updated(&self, _drift_seconds: f64) {
        // No-op
    }

    fn on_redirect(&self, _location: &str) {
        // No-op
    }
}

/// Logging observer for debugging and development.
///
/// Logs all callbacks at debug level. Useful for watching the sync
/// protocol converge without wiring a frontend.
pub struct LoggingSyncObserver;

impl SyncObserver for LoggingSyncObserver {
    fn on_control_changed(&self, controlling: bool) {
        tracing::debug!(controlling, "control_changed");
    }

    fn on_drift_updated(&self, drift_seconds: f64) {
        tracing::debug!(drift_seconds, "drift_updated");
    }

    fn on_redirect(&self, location: &str) {
        tracing::debug!(location, "redirect");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Test observer that counts callbacks.
    struct CountingSyncObserver {
        control_count: AtomicUsize,
        drift_count: AtomicUsize,
    }

    impl CountingSyncObserver {
        fn new() -> Self {
            Self {
                control_count: AtomicUsize::new(0),
                drift_count: AtomicUsize::new(0),
            }
        }
    }

    impl SyncObserver for CountingSyncObserver {
        fn on_control_changed(&self, _controlling: bool) {
            self.control_count.fetch_add(1, Ordering::SeqCst);
        }

        fn on_drift_updated(&self, _drift_seconds: f64) {
            self.drift_count.fetch_add(1, Ordering::SeqCst);
        }

        fn on_redirect(&self, _location: &str) {}
    }

    #[test]
    fn counting_observer_tracks_callbacks() {
        let observer = Arc::new(CountingSyncObserver::new());

        observer.on_control_changed(true);
        observer.on_control_changed(false);
        observer.on_drift_updated(0.25);

        assert_eq!(observer.control_count.load(Ordering::SeqCst), 2);
        assert_eq!(observer.drift_count.load(Ordering::SeqCst), 1);
    }
}
