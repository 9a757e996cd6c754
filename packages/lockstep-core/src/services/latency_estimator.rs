//! One-way latency estimation from round-trip probes.
//!
//! A probe stamps a single "last probe sent" slot; the matching reply
//! consumes the slot and sets the estimate to half the round trip. Keeping
//! one slot instead of a queue is what discards stale replies: once a newer
//! probe overwrites the slot, an older reply either computes against the
//! newer send time (and the newer reply then finds the slot empty) or
//! arrives after the newer reply consumed it and is dropped. Each completed
//! round trip replaces the estimate exactly; there is no averaging.
//!
//! A missing reply is not an error - the previous estimate simply stays in
//! effect until the next probe completes.

use std::time::Instant;

use parking_lot::Mutex;

use crate::protocol::SyncMessage;

#[derive(Debug)]
struct EstimatorState {
    /// Send time of the most recent probe still awaiting its reply.
    last_probe_sent: Option<Instant>,
    /// Current one-way estimate in seconds. 0.0 until the first reply.
    estimate_seconds: f64,
}

/// Continuously refreshed one-way latency estimate.
///
/// Owned by the session; read-only to every other component.
pub struct LatencyEstimator {
    state: Mutex<EstimatorState>,
}

impl LatencyEstimator {
    /// Creates an estimator with an unknown (zero) latency.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(EstimatorState {
                last_probe_sent: None,
                estimate_seconds: 0.0,
            }),
        }
    }

    /// Stamps the probe slot and yields the `ping` to send.
    pub fn probe(&self) -> SyncMessage {
        self.mark_probe_sent_at(Instant::now());
        SyncMessage::Ping {}
    }

    /// Records a probe send at an explicit instant.
    pub fn mark_probe_sent_at(&self, at: Instant) {
        self.state.lock().last_probe_sent = Some(at);
    }

    /// Handles the probe reply.
    pub fn on_pong(&self) {
        self.on_pong_at(Instant::now());
    }

    /// Handles a probe reply arriving at an explicit instant.
    ///
    /// Consumes the probe slot; a reply with no probe in flight is
    /// discarded (stale reply after a newer round trip completed).
    pub fn on_pong_at(&self, at: Instant) {
        let mut state = self.state.lock();
        let Some(sent) = state.last_probe_sent.take() else {
            log::trace!("[Latency] Discarding stale pong");
            return;
        };
        let round_trip = at.saturating_duration_since(sent);
        state.estimate_seconds = round_trip.as_secs_f64() / 2.0;
    }

    /// Current one-way latency estimate in seconds.
    #[must_use]
    pub fn latency_seconds(&self) -> f64 {
        self.state.lock().estimate_seconds
    }
}

impl Default for LatencyEstimator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn initial_estimate_is_zero() {
        assert_eq!(LatencyEstimator::new().latency_seconds(), 0.0);
    }

    #[test]
    fn reply_sets_half_the_round_trip() {
        let estimator = LatencyEstimator::new();
        let t0 = Instant::now();

        estimator.mark_probe_sent_at(t0);
        estimator.on_pong_at(t0 + Duration::from_millis(800));

        assert!((estimator.latency_seconds() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn each_round_trip_replaces_the_estimate_exactly() {
        // Not an average: after each trip the estimate equals that trip's
        // one-way delay.
        let estimator = LatencyEstimator::new();
        let t0 = Instant::now();

        let one_way_delays_ms = [100u64, 300, 50, 200];
        let mut at = t0;
        for delay in one_way_delays_ms {
            estimator.mark_probe_sent_at(at);
            at += Duration::from_millis(delay * 2);
            estimator.on_pong_at(at);
            assert!((estimator.latency_seconds() - delay as f64 / 1000.0).abs() < 1e-9);
            at += Duration::from_millis(5);
        }
    }

    #[test]
    fn stale_reply_is_discarded() {
        // Probe A, then probe B before A's reply; B's reply lands first.
        // The estimate must reflect B's round trip, and A's late reply must
        // not disturb it.
        let estimator = LatencyEstimator::new();
        let t0 = Instant::now();

        estimator.mark_probe_sent_at(t0); // probe A
        estimator.mark_probe_sent_at(t0 + Duration::from_millis(1000)); // probe B

        // B's reply: 400ms round trip -> 0.2s one-way.
        estimator.on_pong_at(t0 + Duration::from_millis(1400));
        assert!((estimator.latency_seconds() - 0.2).abs() < 1e-9);

        // A's reply arrives late; the slot is empty, so it is ignored.
        estimator.on_pong_at(t0 + Duration::from_millis(2000));
        assert!((estimator.latency_seconds() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn pong_without_probe_is_ignored() {
        let estimator = LatencyEstimator::new();
        estimator.on_pong_at(Instant::now());
        assert_eq!(estimator.latency_seconds(), 0.0);
    }

    #[test]
    fn missing_reply_leaves_previous_estimate() {
        let estimator = LatencyEstimator::new();
        let t0 = Instant::now();

        estimator.mark_probe_sent_at(t0);
        estimator.on_pong_at(t0 + Duration::from_millis(600));
        assert!((estimator.latency_seconds() - 0.3).abs() < 1e-9);

        // Next probe's reply never arrives; the estimate stays put.
        estimator.mark_probe_sent_at(t0 + Duration::from_millis(1000));
        assert!((estimator.latency_seconds() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn probe_yields_a_ping() {
        assert_eq!(LatencyEstimator::new().probe(), SyncMessage::Ping {});
    }
}
