//! Playback surface abstraction.
//!
//! A [`PlaybackSurface`] is whatever actually renders the video: a browser
//! `<video>` element behind the WebSocket relay, a native player, or a test
//! double. The sync engine only reads the current position and pushes
//! position/playing targets at it; user interaction with the surface flows
//! back into the engine through the `on_local_*` intent methods.

/// External playback collaborator.
///
/// Implementations must tolerate redundant calls: the engine may apply the
/// same position or playing state more than once when remote events repeat.
pub trait PlaybackSurface: Send + Sync {
    /// Current playback position in seconds.
    fn position_seconds(&self) -> f64;

    /// Total duration in seconds, if known.
    fn duration_seconds(&self) -> Option<f64>;

    /// Seeks the surface to the given position.
    fn apply_position(&self, seconds: f64);

    /// Starts or stops playback.
    fn apply_playing(&self, playing: bool);
}
