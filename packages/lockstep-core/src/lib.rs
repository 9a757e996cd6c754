//! Lockstep Core - shared playback synchronization.
//!
//! This crate keeps multiple remote viewers of the same video stream in
//! lock-step: one participant at a time controls playback, and control
//! actions (play, pause, seek) propagate to every other participant with
//! compensation for each client's network latency.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`protocol`]: wire message types and topic naming
//! - [`channel`]: the session channel seam and the in-process hub
//! - [`services`]: the sync core (latency estimator, control arbiter,
//!   sync engine, session lifecycle)
//! - [`surface`]: the playback surface collaborator trait
//! - [`events`]: the UI observer collaborator trait
//! - [`api`]: WebSocket relay and monitoring endpoints
//! - [`state`]: session configuration
//! - [`error`]: centralized error types
//!
//! # Abstraction Traits
//!
//! The sync core is decoupled from its environment through three traits:
//!
//! - [`SessionChannel`](channel::SessionChannel): named, ordered,
//!   at-most-once message transport
//! - [`PlaybackSurface`](surface::PlaybackSurface): whatever renders the
//!   video (browser element behind the relay, native player, test double)
//! - [`SyncObserver`](events::SyncObserver): status label / drift display
//!
//! In-process peers attach through [`channel::LocalChannelHub`]; remote
//! peers attach through the WebSocket relay in [`api`].

#![warn(clippy::all)]

pub mod api;
pub mod channel;
pub mod error;
pub mod events;
pub mod protocol;
pub mod services;
pub mod state;
pub mod surface;
pub mod utils;

// Re-export commonly used types at the crate root
pub use channel::{ChannelError, ChannelResult, LocalChannel, LocalChannelHub, SessionChannel};
pub use error::{ErrorCode, LockstepError, LockstepResult};
pub use events::{LoggingSyncObserver, NoopSyncObserver, SyncObserver};
pub use protocol::{stream_id_from_source, topic_for_stream, SyncMessage};
pub use services::{
    ControlArbiter, ControlState, DriftSample, LatencyEstimator, MessageOutcome,
    PlaybackSyncEngine, PlaybackTarget, SyncSession,
};
pub use state::{Config, JoinRetryPolicy};
pub use surface::PlaybackSurface;
pub use utils::now_millis;

// Re-export API types
pub use api::{create_router, start_server, AppState, ServerError};
