//! Host application surfaces.
//!
//! The crate drives the host's navigation, playback, and UI-property
//! facilities through these traits. Implementations live in the host
//! application; tests use in-memory fakes.

use tokio::sync::mpsc;

use crate::types::{NavigationPayload, WindowTarget};

/// Screen-navigation surface.
///
/// Receives exactly two payload shapes: a play intent for the details
/// view and a browse intent for the details or listing view.
pub trait Navigator: Send + Sync {
    fn open_window(&self, window: WindowTarget, payload: NavigationPayload);
}

/// UI property publish surface.
///
/// Used for the application version string and the delayed now-playing
/// descriptor.
pub trait PropertySink: Send + Sync {
    fn publish(&self, key: &str, value: &str);
}

/// Media kind passed to the local player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Music,
}

/// Lifecycle notification from the host's media player.
///
/// Delivered on the player's own notification thread via the channel
/// handed to [`LocalPlayer::subscribe`].
#[derive(Debug, Clone)]
pub enum PlayerSignal {
    Started {
        kind: MediaKind,
        path: String,
    },
    Stopped {
        kind: MediaKind,
        stop_time_secs: u32,
        path: String,
    },
    Changed {
        kind: MediaKind,
        stop_time_secs: u32,
        path: String,
    },
    Ended {
        kind: MediaKind,
        path: String,
    },
}

/// The host's media player.
///
/// `play` reports immediate success or failure only; actual playback
/// progress arrives later as [`PlayerSignal`]s. `subscribe` registers a
/// signal channel and returns a token for the matching `unsubscribe`
/// call; the two must be exactly paired.
pub trait LocalPlayer: Send + Sync {
    fn play(&self, path: &str, kind: MediaKind) -> bool;
    fn stop(&self);
    fn is_playing(&self) -> bool;
    fn seek_to(&self, position_secs: u32);
    fn show_fullscreen(&self);
    fn subscribe(&self, signals: mpsc::UnboundedSender<PlayerSignal>) -> u64;
    fn unsubscribe(&self, token: u64);
}
