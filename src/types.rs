//! Core data types for theaterlink.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Number of 100-nanosecond ticks in one second.
///
/// Remote play requests carry start offsets in ticks; the local player
/// seeks in whole seconds.
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Convert an optional tick offset to whole seconds.
///
/// Absent or negative offsets map to 0.
pub fn ticks_to_seconds(ticks: Option<i64>) -> u32 {
    match ticks {
        Some(t) if t > 0 => (t / TICKS_PER_SECOND) as u32,
        _ => 0,
    }
}

/// Network address and port identifying the media server.
///
/// Set at most once per discovery cycle; replacing it triggers a full
/// client rebuild in the connection manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerEndpoint {
    pub address: IpAddr,
    pub port: u16,
}

impl ServerEndpoint {
    pub fn new(address: IpAddr, port: u16) -> Self {
        Self { address, port }
    }
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// Server-reported descriptor (name, version, capabilities).
///
/// Owned by the connection manager, refreshed on demand, read-only to
/// consumers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub server_name: String,
    pub version: String,
    #[serde(default)]
    pub operating_system: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// Connection state derived from the manager's endpoint, discovery loop,
/// and socket health. Never stored directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No endpoint known and no discovery loop running.
    Disconnected,
    /// Discovery retry loop is active, no endpoint found yet.
    Discovering,
    /// Endpoint set and the event socket is live.
    Connected,
    /// Endpoint set but the event socket reported a disconnect.
    ///
    /// No endpoint-level retry happens from here; a new `discover()` call
    /// is required.
    SocketDown,
}

/// Inbound command from the media server, delivered over the event socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteCommand {
    /// Informational message, passed through to the log sink.
    Message { text: String },
    /// Play request. Only the first item id is honored; extra ids are
    /// logged and ignored.
    Play {
        item_ids: Vec<String>,
        /// Start offset in 100-nanosecond ticks.
        start_position_ticks: Option<i64>,
    },
    /// Browse request for a library item.
    Browse {
        item_type: String,
        item_id: String,
        item_name: String,
    },
}

/// Navigation payload asking the host to open an item's details view and
/// start playback at the given offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayIntent {
    pub item_id: String,
    pub resume_offset_secs: u32,
}

/// Navigation payload carrying a browse target verbatim, empty fields
/// included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseIntent {
    pub item_id: String,
    pub item_type: String,
    pub item_name: String,
}

/// Host window a navigation request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowTarget {
    /// Single-item details view.
    Details,
    /// Generic listing view.
    Listing,
}

/// The two payload shapes this crate ever sends to the navigation surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationPayload {
    Play(PlayIntent),
    Browse(BrowseIntent),
}
