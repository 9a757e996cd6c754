//! Wire protocol for session channels.
//!
//! Every message travels as JSON `{"event": "...", "payload": {...}}` on a
//! topic named `video:<streamId>`. Event names and payload field names are
//! part of the protocol and must not change: browser clients connect to the
//! same topics through the WebSocket relay.
//!
//! `play` and `pause` are sync messages - they move the shared playback
//! target. `time_update` and `ping`/`pong` are advisory: `time_update` feeds
//! the drift display only, `ping`/`pong` feed the latency estimator.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Protocol Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Interval between latency probes (`ping` messages).
pub const PROBE_INTERVAL_MS: u64 = 1000;

/// Interval between advisory `time_update` broadcasts.
pub const TIME_UPDATE_INTERVAL_MS: u64 = 500;

/// Topic prefix for playback sessions.
pub const TOPIC_PREFIX: &str = "video:";

// ─────────────────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────────────────

/// A message on a session channel.
///
/// Payload fields decode defensively: a missing `currentTime` or `location`
/// falls back to its default instead of rejecting the message, so a
/// malformed peer cannot wedge the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum SyncMessage {
    /// Controller started playback at the (sender-compensated) position.
    Play {
        #[serde(rename = "currentTime", default)]
        current_time: f64,
    },
    /// Controller paused playback at the exact position.
    Pause {
        #[serde(rename = "currentTime", default)]
        current_time: f64,
    },
    /// Latency probe. The coordination server answers with `pong`.
    Ping {},
    /// Reply to `ping`, delivered only to the probing client.
    Pong {},
    /// Advisory position report for the drift display. Never forces a seek.
    TimeUpdate {
        #[serde(rename = "currentTime", default)]
        current_time: f64,
    },
    /// A participant claimed control of playback.
    TakenControl {},
    /// The whole session must navigate to a new stream location.
    Redirect {
        #[serde(default)]
        location: String,
    },
}

impl SyncMessage {
    /// Returns true for messages that move the shared playback target.
    #[must_use]
    pub fn is_sync(&self) -> bool {
        matches!(self, Self::Play { .. } | Self::Pause { .. })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Topic Naming
// ─────────────────────────────────────────────────────────────────────────────

/// Builds the channel topic for a stream.
#[must_use]
pub fn topic_for_stream(stream_id: &str) -> String {
    format!("{TOPIC_PREFIX}{stream_id}")
}

/// Derives a stream id from a video source URL or path.
///
/// Uses the final path segment, matching what browser clients derive from
/// the video element's `src`. Falls back to the whole input when there is
/// no path separator.
#[must_use]
pub fn stream_id_from_source(source: &str) -> &str {
    source.rsplit('/').next().unwrap_or(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_serializes_with_camel_case_time() {
        let json = serde_json::to_value(SyncMessage::Play {
            current_time: 100.4,
        })
        .unwrap();
        assert_eq!(json["event"], "play");
        assert_eq!(json["payload"]["currentTime"], 100.4);
    }

    #[test]
    fn pause_round_trips() {
        let msg = SyncMessage::Pause { current_time: 50.0 };
        let json = serde_json::to_string(&msg).unwrap();
        let back: SyncMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn ping_carries_empty_payload() {
        let json = serde_json::to_value(SyncMessage::Ping {}).unwrap();
        assert_eq!(json["event"], "ping");
        assert_eq!(json["payload"], serde_json::json!({}));
    }

    #[test]
    fn time_update_uses_snake_case_event_name() {
        let json = serde_json::to_value(SyncMessage::TimeUpdate { current_time: 3.5 }).unwrap();
        assert_eq!(json["event"], "time_update");
    }

    #[test]
    fn taken_control_parses_from_wire() {
        let msg: SyncMessage =
            serde_json::from_str(r#"{"event":"taken_control","payload":{}}"#).unwrap();
        assert_eq!(msg, SyncMessage::TakenControl {});
    }

    #[test]
    fn redirect_carries_location() {
        let msg: SyncMessage =
            serde_json::from_str(r#"{"event":"redirect","payload":{"location":"movie.mp4"}}"#)
                .unwrap();
        assert_eq!(
            msg,
            SyncMessage::Redirect {
                location: "movie.mp4".to_string()
            }
        );
    }

    #[test]
    fn missing_payload_fields_decode_to_defaults() {
        // Defensive decoding: a peer sending an empty payload must not
        // produce a parse error (spec'd tolerance for malformed payloads).
        let msg: SyncMessage = serde_json::from_str(r#"{"event":"play","payload":{}}"#).unwrap();
        assert_eq!(msg, SyncMessage::Play { current_time: 0.0 });
    }

    #[test]
    fn unknown_event_is_a_parse_error() {
        let parsed = serde_json::from_str::<SyncMessage>(r#"{"event":"explode","payload":{}}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn sync_classification() {
        assert!(SyncMessage::Play { current_time: 0.0 }.is_sync());
        assert!(SyncMessage::Pause { current_time: 0.0 }.is_sync());
        assert!(!SyncMessage::TimeUpdate { current_time: 0.0 }.is_sync());
        assert!(!SyncMessage::Ping {}.is_sync());
    }

    #[test]
    fn topic_is_prefixed_with_video() {
        assert_eq!(topic_for_stream("abc123"), "video:abc123");
    }

    #[test]
    fn stream_id_is_final_path_segment() {
        assert_eq!(
            stream_id_from_source("http://host:4000/video/movie.mp4"),
            "movie.mp4"
        );
        assert_eq!(stream_id_from_source("movie.mp4"), "movie.mp4");
    }
}
