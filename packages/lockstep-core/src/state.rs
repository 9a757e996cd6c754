//! Session configuration.
//!
//! All fields have protocol-faithful defaults; `validate()` rejects values
//! that would break the timers or the hub.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol::{PROBE_INTERVAL_MS, TIME_UPDATE_INTERVAL_MS};

/// Retry policy for a failed channel join.
///
/// The protocol itself specifies no retry; `None` preserves that behavior.
/// Callers that want resilience opt into `Fixed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum JoinRetryPolicy {
    /// Single attempt; a failed join is surfaced to the caller.
    #[default]
    None,
    /// Retry up to `attempts` additional times, waiting `backoff_ms` between.
    Fixed { attempts: u32, backoff_ms: u64 },
}

/// Configuration for a playback session and the local hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Interval between latency probes (milliseconds).
    pub probe_interval_ms: u64,

    /// Interval between advisory `time_update` broadcasts (milliseconds).
    pub time_update_interval_ms: u64,

    /// What to do when the channel join fails.
    pub join_retry: JoinRetryPolicy,

    /// Maximum members per topic before joins are refused.
    pub max_peers_per_topic: usize,
}

impl Config {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.probe_interval_ms == 0 {
            return Err("probe_interval_ms must be >= 1".to_string());
        }
        if self.time_update_interval_ms == 0 {
            return Err("time_update_interval_ms must be >= 1".to_string());
        }
        if self.max_peers_per_topic == 0 {
            return Err("max_peers_per_topic must be >= 1".to_string());
        }
        if let JoinRetryPolicy::Fixed { attempts, .. } = self.join_retry {
            if attempts == 0 {
                return Err("join_retry attempts must be >= 1 (use None instead)".to_string());
            }
        }
        Ok(())
    }

    /// Probe interval as a [`Duration`].
    #[must_use]
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    /// Time-update interval as a [`Duration`].
    #[must_use]
    pub fn time_update_interval(&self) -> Duration {
        Duration::from_millis(self.time_update_interval_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            probe_interval_ms: PROBE_INTERVAL_MS,
            time_update_interval_ms: TIME_UPDATE_INTERVAL_MS,
            join_retry: JoinRetryPolicy::None,
            max_peers_per_topic: 32,
        }
    }
}
