//! In-process channel hub.
//!
//! The hub plays the coordination-server role of the channel contract:
//! - topic rooms with per-member ordered delivery (unbounded mpsc),
//! - `ping` answered with `pong` to the probing member only,
//! - every other event fanned out to all *other* members (a sender never
//!   hears its own messages back),
//! - sends before a completed join are dropped,
//! - joins refused once a room is at capacity.
//!
//! Both colocated sessions (tests, headless players) and the WebSocket
//! relay attach through [`LocalChannelHub::channel_for_stream`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{ChannelError, ChannelResult, SessionChannel};
use crate::protocol::{topic_for_stream, SyncMessage};

/// Occupancy snapshot of one topic, for the rooms API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    /// Full topic name (e.g. `video:movie.mp4`).
    pub topic: String,
    /// Number of joined members.
    pub members: usize,
}

/// One topic's membership: member id -> delivery queue.
type Room = DashMap<Uuid, mpsc::UnboundedSender<SyncMessage>>;

/// Topic-keyed message hub.
pub struct LocalChannelHub {
    rooms: DashMap<String, Arc<Room>>,
    max_members: usize,
}

impl LocalChannelHub {
    /// Creates a hub with the given per-topic member cap.
    #[must_use]
    pub fn new(max_members: usize) -> Arc<Self> {
        Arc::new(Self {
            rooms: DashMap::new(),
            max_members,
        })
    }

    /// Creates a channel bound to `video:<stream_id>`.
    ///
    /// The channel is not joined yet; call [`SessionChannel::join`].
    #[must_use]
    pub fn channel_for_stream(self: &Arc<Self>, stream_id: &str) -> LocalChannel {
        self.channel(&topic_for_stream(stream_id))
    }

    /// Creates a channel bound to an explicit topic.
    #[must_use]
    pub fn channel(self: &Arc<Self>, topic: &str) -> LocalChannel {
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        LocalChannel {
            hub: Arc::clone(self),
            topic: topic.to_string(),
            member_id: Uuid::new_v4(),
            incoming_tx,
            incoming_rx: parking_lot::Mutex::new(Some(incoming_rx)),
            joined: AtomicBool::new(false),
        }
    }

    /// Number of joined members on a topic.
    #[must_use]
    pub fn occupancy(&self, topic: &str) -> usize {
        self.rooms.get(topic).map_or(0, |room| room.len())
    }

    /// Snapshot of all active topics.
    #[must_use]
    pub fn room_summaries(&self) -> Vec<RoomSummary> {
        self.rooms
            .iter()
            .map(|entry| RoomSummary {
                topic: entry.key().clone(),
                members: entry.value().len(),
            })
            .collect()
    }

    fn join_member(
        &self,
        topic: &str,
        member_id: Uuid,
        tx: mpsc::UnboundedSender<SyncMessage>,
    ) -> ChannelResult<()> {
        let room = self
            .rooms
            .entry(topic.to_string())
            .or_insert_with(|| Arc::new(Room::new()))
            .clone();

        if !room.contains_key(&member_id) && room.len() >= self.max_members {
            log::warn!(
                "[Hub] Refusing join to {}: {} members (cap {})",
                topic,
                room.len(),
                self.max_members
            );
            return Err(ChannelError::RoomFull(topic.to_string()));
        }

        room.insert(member_id, tx);
        log::debug!("[Hub] Member {} joined {}", member_id, topic);
        Ok(())
    }

    fn leave_member(&self, topic: &str, member_id: Uuid) {
        if let Some(room) = self.rooms.get(topic) {
            room.remove(&member_id);
        }
        // Drop empty rooms so the summaries reflect live topics only.
        self.rooms
            .remove_if(topic, |_, room| room.is_empty());
        log::debug!("[Hub] Member {} left {}", member_id, topic);
    }

    /// Routes one message from `sender` on `topic`.
    ///
    /// `ping` is answered with `pong` to the sender alone; `pong` from a
    /// member is not routable and is dropped; everything else fans out to
    /// all other members in order.
    fn publish(&self, topic: &str, sender: Uuid, msg: SyncMessage) {
        let Some(room) = self.rooms.get(topic).map(|r| Arc::clone(r.value())) else {
            return;
        };

        match msg {
            SyncMessage::Ping {} => {
                if let Some(tx) = room.get(&sender) {
                    let _ = tx.send(SyncMessage::Pong {});
                }
            }
            SyncMessage::Pong {} => {
                // Only the hub originates pongs.
            }
            other => {
                for entry in room.iter() {
                    if *entry.key() == sender {
                        continue;
                    }
                    let _ = entry.value().send(other.clone());
                }
            }
        }
    }
}

/// A member's handle on one hub topic.
pub struct LocalChannel {
    hub: Arc<LocalChannelHub>,
    topic: String,
    member_id: Uuid,
    incoming_tx: mpsc::UnboundedSender<SyncMessage>,
    incoming_rx: parking_lot::Mutex<Option<mpsc::UnboundedReceiver<SyncMessage>>>,
    joined: AtomicBool,
}

#[async_trait]
impl SessionChannel for LocalChannel {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn join(&self) -> ChannelResult<()> {
        if self.joined.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.hub
            .join_member(&self.topic, self.member_id, self.incoming_tx.clone())?;
        self.joined.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn send(&self, msg: SyncMessage) {
        if !self.joined.load(Ordering::SeqCst) {
            log::debug!("[Hub] Dropping pre-join send on {}", self.topic);
            return;
        }
        self.hub.publish(&self.topic, self.member_id, msg);
    }

    fn take_incoming(&self) -> Option<mpsc::UnboundedReceiver<SyncMessage>> {
        self.incoming_rx.lock().take()
    }

    async fn leave(&self) {
        if self.joined.swap(false, Ordering::SeqCst) {
            self.hub.leave_member(&self.topic, self.member_id);
        }
    }
}
