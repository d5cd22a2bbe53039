//! API client and event-socket abstractions.
//!
//! The wire protocol is owned by the host application; this crate only
//! requires a request/response call for system info and a stream of
//! socket events. The connection manager builds one client per endpoint
//! and takes its socket stream exactly once.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::config::ClientIdentity;
use crate::types::{RemoteCommand, ServerEndpoint, SystemInfo};
use crate::Result;

/// Lifecycle and command events surfaced by the live event socket.
#[derive(Debug, Clone)]
pub enum SocketEvent {
    /// Socket established its connection to the server.
    Connected,
    /// Socket lost its connection.
    ///
    /// This does not trigger endpoint-level rediscovery; reconnecting is
    /// a manual `discover()` call.
    Disconnected,
    /// Server-initiated command.
    Command(RemoteCommand),
}

/// Request/response API to the media server, owner of the live socket.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Fetch the server's system information.
    async fn system_info(&self) -> Result<SystemInfo>;

    /// Take the socket event stream.
    ///
    /// Returns `None` once taken; the stream ends when the socket is
    /// closed.
    fn socket_events(&self) -> Option<mpsc::UnboundedReceiver<SocketEvent>>;

    /// Dispose the event socket. Idempotent.
    fn close_socket(&self);
}

/// Builds an [`ApiClient`] bound to a server endpoint and the local
/// environment identity. Each call produces a fresh client/socket pair.
pub trait ClientFactory: Send + Sync {
    fn create(&self, endpoint: &ServerEndpoint, identity: &ClientIdentity) -> Arc<dyn ApiClient>;
}
