//! # theaterlink
//!
//! Media server integration for home-theater frontends: discovers the
//! server on the local network, maintains the control connection, routes
//! remote commands (message, play, browse) into local navigation and
//! playback, and tracks the playback state machine for display.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use theaterlink::{ClientIdentity, ConnectionManager, ManagerConfig, PlaybackController};
//!
//! #[tokio::main]
//! async fn main() -> theaterlink::Result<()> {
//!     let identity = ClientIdentity::new("Linux 6.1", "living-room", "1.2.3")?;
//!     let manager = ConnectionManager::new(
//!         locator,    // your network discovery transport
//!         factory,    // your API client construction
//!         navigator,  // your screen-navigation surface
//!         properties, // your UI property surface
//!         ManagerConfig::new(identity),
//!     )?;
//!
//!     manager.on_server_changed(|endpoint| println!("server: {endpoint}"));
//!     manager.discover();
//!
//!     let controller = PlaybackController::new(player, properties);
//!     controller.play("/media/movie.mkv", 0);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod host;
pub mod manager;
pub mod player;
pub mod types;

pub(crate) mod event;

// Re-export main public API
pub use client::{ApiClient, ClientFactory, SocketEvent};
pub use config::{ClientIdentity, ManagerConfig, DEFAULT_RETRY_INTERVAL, OSD_PUBLISH_DELAY};
pub use discovery::ServerLocator;
pub use error::Error;
pub use event::Subscription;
pub use host::{LocalPlayer, MediaKind, Navigator, PlayerSignal, PropertySink};
pub use manager::ConnectionManager;
pub use player::{NowPlayingInfo, PlaybackController, PlaybackState};
pub use types::*;

/// Result type for theaterlink operations.
pub type Result<T> = std::result::Result<T, Error>;
