//! Server connection lifecycle management.
//!
//! [`ConnectionManager`] orchestrates discovery, rebuilds the API client
//! when the endpoint changes, routes event-socket traffic into navigation
//! and logging, and tracks server system info for consumers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::client::{ApiClient, ClientFactory, SocketEvent};
use crate::config::{props, ManagerConfig};
use crate::discovery::{DiscoveryTask, ServerLocator};
use crate::event::{EventEmitter, Subscription};
use crate::host::{Navigator, PropertySink};
use crate::types::{
    ticks_to_seconds, BrowseIntent, ConnectionState, NavigationPayload, PlayIntent,
    RemoteCommand, ServerEndpoint, SystemInfo, WindowTarget,
};
use crate::{Error, Result};

/// Manager for the media server connection.
///
/// Exactly one client/socket pair is live at a time. Replacing the
/// endpoint performs a full teardown/rebuild, never an in-place update.
/// All methods return immediately; results arrive through the
/// `ServerChanged` and `SystemInfoChanged` notifications.
///
/// Methods must be called from within a tokio runtime.
pub struct ConnectionManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    locator: Arc<dyn ServerLocator>,
    factory: Arc<dyn ClientFactory>,
    navigator: Arc<dyn Navigator>,
    config: ManagerConfig,
    discovery: DiscoveryTask,
    state: Mutex<ManagerState>,
    server_changed: EventEmitter<ServerEndpoint>,
    system_info_changed: EventEmitter<SystemInfo>,
}

#[derive(Default)]
struct ManagerState {
    endpoint: Option<ServerEndpoint>,
    client: Option<Arc<dyn ApiClient>>,
    router: Option<JoinHandle<()>>,
    socket_connected: bool,
    system_info: Option<SystemInfo>,
    disposed: bool,
}

impl ConnectionManager {
    /// Create a manager and publish the application version to the
    /// property surface.
    pub fn new(
        locator: Arc<dyn ServerLocator>,
        factory: Arc<dyn ClientFactory>,
        navigator: Arc<dyn Navigator>,
        properties: Arc<dyn PropertySink>,
        config: ManagerConfig,
    ) -> Result<Self> {
        if config.identity.app_version.is_empty() {
            return Err(Error::InvalidConfig(
                "application version must not be empty".to_string(),
            ));
        }
        properties.publish(props::VERSION, &config.identity.app_version);
        info!("connection manager initialized");

        Ok(Self {
            inner: Arc::new(ManagerInner {
                locator,
                factory,
                navigator,
                config,
                discovery: DiscoveryTask::new(),
                state: Mutex::new(ManagerState::default()),
                server_changed: EventEmitter::new(),
                system_info_changed: EventEmitter::new(),
            }),
        })
    }

    /// Arm discovery with the configured retry interval.
    pub fn discover(&self) {
        self.discover_with_interval(self.inner.config.retry_interval);
    }

    /// Arm discovery with an explicit retry interval.
    ///
    /// A previously armed retry loop is replaced, not stacked. The found
    /// endpoint flows into [`set_server`](Self::set_server).
    pub fn discover_with_interval(&self, interval: Duration) {
        if self.inner.state.lock().unwrap().disposed {
            return;
        }
        let weak = Arc::downgrade(&self.inner);
        self.inner.discovery.arm(
            Arc::clone(&self.inner.locator),
            interval,
            move |endpoint| {
                if let Some(inner) = weak.upgrade() {
                    ManagerInner::set_server(&inner, endpoint);
                }
            },
        );
    }

    /// Set the server endpoint, tearing down and rebuilding the client.
    ///
    /// Fires exactly one `ServerChanged` notification and then triggers a
    /// system-info refresh. Setting the same endpoint again still rebuilds.
    pub fn set_server(&self, endpoint: ServerEndpoint) {
        ManagerInner::set_server(&self.inner, endpoint);
    }

    /// Refresh system info from the server. No-op without an endpoint.
    ///
    /// Fire-and-forget: success stores the info and fires
    /// `SystemInfoChanged`; failure is logged and the previous value is
    /// retained. No retry is scheduled.
    pub fn update(&self) {
        ManagerInner::update(&self.inner);
    }

    pub fn is_server_located(&self) -> bool {
        self.inner.state.lock().unwrap().endpoint.is_some()
    }

    pub fn server(&self) -> Option<ServerEndpoint> {
        self.inner.state.lock().unwrap().endpoint
    }

    pub fn system_info(&self) -> Option<SystemInfo> {
        self.inner.state.lock().unwrap().system_info.clone()
    }

    /// Derived connection state.
    pub fn connection_state(&self) -> ConnectionState {
        let st = self.inner.state.lock().unwrap();
        match st.endpoint {
            None if self.inner.discovery.is_armed() => ConnectionState::Discovering,
            None => ConnectionState::Disconnected,
            Some(_) if st.socket_connected => ConnectionState::Connected,
            Some(_) => ConnectionState::SocketDown,
        }
    }

    /// Subscribe to endpoint changes.
    pub fn on_server_changed<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ServerEndpoint) + Send + Sync + 'static,
    {
        self.inner.server_changed.subscribe(callback)
    }

    pub fn unsubscribe_server_changed(&self, subscription: Subscription) {
        self.inner.server_changed.unsubscribe(subscription);
    }

    /// Subscribe to system-info refreshes.
    pub fn on_system_info_changed<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SystemInfo) + Send + Sync + 'static,
    {
        self.inner.system_info_changed.subscribe(callback)
    }

    pub fn unsubscribe_system_info_changed(&self, subscription: Subscription) {
        self.inner.system_info_changed.unsubscribe(subscription);
    }

    /// Shut the manager down: cancel discovery, stop event routing, close
    /// the socket. Idempotent; a second call is a no-op.
    pub fn dispose(&self) {
        self.inner.discovery.disarm();
        let (router, client) = {
            let mut st = self.inner.state.lock().unwrap();
            if st.disposed {
                return;
            }
            st.disposed = true;
            st.socket_connected = false;
            (st.router.take(), st.client.take())
        };
        if let Some(router) = router {
            router.abort();
        }
        if let Some(client) = client {
            client.close_socket();
        }
        info!("connection manager shut down");
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl ManagerInner {
    fn set_server(inner: &Arc<ManagerInner>, endpoint: ServerEndpoint) {
        {
            let mut st = inner.state.lock().unwrap();
            if st.disposed {
                debug!(%endpoint, "ignoring endpoint, manager disposed");
                return;
            }

            // Never two live sockets: drop the old pair before the new
            // one starts delivering.
            if let Some(router) = st.router.take() {
                router.abort();
            }
            if let Some(old) = st.client.take() {
                old.close_socket();
            }

            st.endpoint = Some(endpoint);
            st.socket_connected = false;

            debug!(%endpoint, "creating media server client");
            let client = inner.factory.create(&endpoint, &inner.config.identity);
            match client.socket_events() {
                Some(mut events) => {
                    let weak = Arc::downgrade(inner);
                    st.router = Some(tokio::spawn(async move {
                        while let Some(event) = events.recv().await {
                            let Some(inner) = weak.upgrade() else { break };
                            inner.handle_socket_event(event);
                        }
                    }));
                }
                None => {
                    warn!(%endpoint, "event socket stream unavailable, remote commands will not be delivered");
                }
            }
            st.client = Some(client);
        }

        inner.server_changed.emit(&endpoint);
        ManagerInner::update(inner);
    }

    fn update(inner: &Arc<ManagerInner>) {
        let client = {
            let st = inner.state.lock().unwrap();
            if st.disposed {
                return;
            }
            match &st.client {
                Some(client) => Arc::clone(client),
                None => return,
            }
        };

        let weak = Arc::downgrade(inner);
        tokio::spawn(async move {
            match client.system_info().await {
                Ok(info) => {
                    let Some(inner) = weak.upgrade() else { return };
                    {
                        let mut st = inner.state.lock().unwrap();
                        if st.disposed {
                            return;
                        }
                        // Later-wins-by-arrival: a fetch begun before a
                        // server change may land after it (see DESIGN.md).
                        st.system_info = Some(info.clone());
                    }
                    debug!(server = %info.server_name, version = %info.version, "system info updated");
                    inner.system_info_changed.emit(&info);
                }
                Err(e) => error!(error = %e, "system info fetch failed"),
            }
        });
    }

    /// Invoked on the socket router task, concurrent with public callers.
    fn handle_socket_event(&self, event: SocketEvent) {
        match event {
            SocketEvent::Connected => {
                info!("connected to media server");
                self.state.lock().unwrap().socket_connected = true;
            }
            SocketEvent::Disconnected => {
                // A lost socket does not re-arm discovery; reconnecting
                // takes a manual discover() call.
                info!("lost connection with media server");
                self.state.lock().unwrap().socket_connected = false;
            }
            SocketEvent::Command(command) => self.handle_command(command),
        }
    }

    fn handle_command(&self, command: RemoteCommand) {
        match command {
            RemoteCommand::Message { text } => {
                debug!(message = %text, "server message");
            }
            RemoteCommand::Play {
                item_ids,
                start_position_ticks,
            } => {
                let Some(item_id) = item_ids.first().cloned() else {
                    warn!("play command without item ids ignored");
                    return;
                };
                if item_ids.len() > 1 {
                    warn!(
                        ignored = item_ids.len() - 1,
                        "play command carries multiple item ids, only the first is honored"
                    );
                }
                let resume_offset_secs = ticks_to_seconds(start_position_ticks);
                info!(item = %item_id, resume = resume_offset_secs, "remote play request");
                self.navigator.open_window(
                    WindowTarget::Details,
                    NavigationPayload::Play(PlayIntent {
                        item_id,
                        resume_offset_secs,
                    }),
                );
            }
            RemoteCommand::Browse {
                item_type,
                item_id,
                item_name,
            } => {
                info!(item_type = %item_type, id = %item_id, name = %item_name, "remote browse request");
                let window = if item_type == "Movie" {
                    WindowTarget::Details
                } else {
                    WindowTarget::Listing
                };
                self.navigator.open_window(
                    window,
                    NavigationPayload::Browse(BrowseIntent {
                        item_id,
                        item_type,
                        item_name,
                    }),
                );
            }
        }
    }
}
