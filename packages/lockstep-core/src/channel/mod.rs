//! Session channel abstraction.
//!
//! A [`SessionChannel`] is the transport seam of the sync protocol: a named
//! bidirectional topic with join/leave, fire-and-forget sends, and a single
//! ordered stream of messages from peers. Delivery is at-most-once per
//! message; ordering is preserved per channel. Reliability beyond that is
//! explicitly not promised - the sync protocol re-converges on the next
//! `play`/`pause`/`time_update` after a drop.
//!
//! [`LocalChannelHub`] provides the in-process implementation used by tests
//! and by the WebSocket relay.

mod local;

pub use local::{LocalChannel, LocalChannelHub, RoomSummary};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::protocol::SyncMessage;

/// Errors from channel membership operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The topic already holds the maximum number of members.
    #[error("topic {0} is full")]
    RoomFull(String),

    /// Operation requires a completed join.
    #[error("channel is not joined")]
    NotJoined,

    /// The underlying transport is gone.
    #[error("channel is closed")]
    Closed,
}

/// Convenient Result alias for channel operations.
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Named bidirectional message channel for one session.
///
/// # Invariant
///
/// One subscription per session: [`take_incoming`](Self::take_incoming)
/// yields the receiver exactly once. Messages a client sends are never
/// delivered back to itself.
#[async_trait]
pub trait SessionChannel: Send + Sync {
    /// The topic this channel is bound to (e.g. `video:movie.mp4`).
    fn topic(&self) -> &str;

    /// Joins the topic. Idempotent; must complete before peers see sends.
    ///
    /// # Errors
    ///
    /// Returns an error when the coordination side refuses the join. The
    /// caller decides whether to retry (see `Config::join_retry`).
    async fn join(&self) -> ChannelResult<()>;

    /// Sends one message to the topic, fire-and-forget.
    ///
    /// Sends before a completed join may be silently dropped, per the
    /// channel contract.
    fn send(&self, msg: SyncMessage);

    /// Takes the ordered stream of messages from peers on this topic.
    ///
    /// Returns `None` on every call after the first.
    fn take_incoming(&self) -> Option<mpsc::UnboundedReceiver<SyncMessage>>;

    /// Leaves the topic. Idempotent.
    async fn leave(&self);
}
