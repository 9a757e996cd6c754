//! Synchronization services.
//!
//! - [`latency_estimator`]: one-way delay from round-trip probes
//! - [`control_arbiter`]: who may broadcast playback control
//! - [`sync_engine`]: the core state machine
//! - [`session`]: lifecycle, timers, and the incoming pump

pub mod control_arbiter;
pub mod latency_estimator;
pub mod session;
pub mod sync_engine;

pub use control_arbiter::{ControlArbiter, ControlState};
pub use latency_estimator::LatencyEstimator;
pub use session::SyncSession;
pub use sync_engine::{DriftSample, MessageOutcome, PlaybackSyncEngine, PlaybackTarget};
