//! Configuration types for theaterlink.

use std::time::Duration;

use crate::{Error, Result};

/// Default interval between discovery probes.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(60);

/// Delay before the now-playing descriptor is published to the property
/// surface, letting the player settle before overlay text appears.
pub const OSD_PUBLISH_DELAY: Duration = Duration::from_secs(2);

/// Property keys published to the host UI surface.
pub mod props {
    /// Application version string, published once at manager construction.
    pub const VERSION: &str = "#TheaterLink.Version";
    /// Now-playing descriptor, published after the settle delay.
    pub const NOW_PLAYING: &str = "#Play.Current";
}

/// Local environment identifiers bound into every constructed API client.
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    /// Operating system version string.
    pub os_version: String,
    /// Local machine name.
    pub host_name: String,
    /// Application version reported to the server.
    pub app_version: String,
}

impl ClientIdentity {
    /// Create an identity. The application version must be non-empty.
    pub fn new(
        os_version: impl Into<String>,
        host_name: impl Into<String>,
        app_version: impl Into<String>,
    ) -> Result<Self> {
        let app_version = app_version.into();
        if app_version.is_empty() {
            return Err(Error::InvalidConfig(
                "application version must not be empty".to_string(),
            ));
        }
        Ok(Self {
            os_version: os_version.into(),
            host_name: host_name.into(),
            app_version,
        })
    }
}

/// Configuration for a [`ConnectionManager`](crate::ConnectionManager).
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub identity: ClientIdentity,
    /// Interval between discovery probes.
    pub retry_interval: Duration,
}

impl ManagerConfig {
    pub fn new(identity: ClientIdentity) -> Self {
        Self {
            identity,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }
}
