//! Server discovery with periodic retry.
//!
//! [`DiscoveryTask`] drives a [`ServerLocator`] on a fixed interval until
//! a probe finds an endpoint, then reports it exactly once. Re-arming an
//! active task replaces it; the superseded loop can never fire.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::types::ServerEndpoint;

/// Network discovery of a media server endpoint.
///
/// One call issues one non-blocking probe and reports at most one
/// endpoint. Finding nothing is not an error; the retry loop simply
/// probes again on the next tick.
#[async_trait]
pub trait ServerLocator: Send + Sync {
    async fn find_server(&self) -> Option<ServerEndpoint>;
}

/// Periodic discovery retry loop.
pub(crate) struct DiscoveryTask {
    state: Arc<Mutex<DiscoveryState>>,
}

struct DiscoveryState {
    /// Bumped on every arm/disarm and on success commit. A loop may only
    /// act while its generation is current.
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl DiscoveryTask {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(DiscoveryState {
                generation: 0,
                handle: None,
            })),
        }
    }

    /// (Re)start the retry loop.
    ///
    /// Any previously armed loop is cancelled first; restarting is
    /// idempotent, not additive. The first probe fires immediately, then
    /// every `interval`, forever, until one succeeds. On success the loop
    /// disarms itself before invoking `on_found`, so a racing re-arm or a
    /// stale tick can never double-report.
    pub(crate) fn arm<F>(
        &self,
        locator: Arc<dyn ServerLocator>,
        interval: Duration,
        on_found: F,
    ) where
        F: FnOnce(ServerEndpoint) + Send + 'static,
    {
        let my_generation = {
            let mut st = self.state.lock().unwrap();
            st.generation += 1;
            if let Some(previous) = st.handle.take() {
                previous.abort();
            }
            st.generation
        };

        let state = Arc::clone(&self.state);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            let endpoint = loop {
                ticker.tick().await;
                debug!("probing for media server");
                if let Some(endpoint) = locator.find_server().await {
                    break endpoint;
                }
            };

            // Disarm before acting on the result.
            let fire = {
                let mut st = state.lock().unwrap();
                if st.generation == my_generation {
                    st.generation += 1;
                    st.handle = None;
                    true
                } else {
                    false
                }
            };
            if fire {
                info!(%endpoint, "media server found");
                on_found(endpoint);
            }
        });

        let mut st = self.state.lock().unwrap();
        if st.generation == my_generation {
            st.handle = Some(handle);
        } else {
            // Superseded (or already succeeded) while spawning.
            handle.abort();
        }
    }

    /// Stop the retry loop. Safe to call when nothing is armed.
    pub(crate) fn disarm(&self) {
        let mut st = self.state.lock().unwrap();
        st.generation += 1;
        if let Some(handle) = st.handle.take() {
            handle.abort();
        }
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.state.lock().unwrap().handle.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn endpoint() -> ServerEndpoint {
        ServerEndpoint::new("10.0.0.5".parse::<IpAddr>().unwrap(), 8096)
    }

    /// Locator that fails `misses` times before reporting an endpoint.
    struct CountingLocator {
        probes: AtomicU32,
        misses: u32,
    }

    impl CountingLocator {
        fn new(misses: u32) -> Self {
            Self {
                probes: AtomicU32::new(0),
                misses,
            }
        }
    }

    #[async_trait]
    impl ServerLocator for CountingLocator {
        async fn find_server(&self) -> Option<ServerEndpoint> {
            let n = self.probes.fetch_add(1, Ordering::SeqCst);
            (n >= self.misses).then(endpoint)
        }
    }

    async fn flush() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_probe_fires_immediately() {
        let locator = Arc::new(CountingLocator::new(u32::MAX));
        let task = DiscoveryTask::new();
        task.arm(Arc::clone(&locator) as _, Duration::from_secs(60), |_| {});

        flush().await;
        assert_eq!(locator.probes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success_then_stops() {
        let locator = Arc::new(CountingLocator::new(3));
        let task = DiscoveryTask::new();
        let found = Arc::new(AtomicU32::new(0));

        let f = Arc::clone(&found);
        task.arm(Arc::clone(&locator) as _, Duration::from_secs(60), move |ep| {
            assert_eq!(ep, endpoint());
            f.fetch_add(1, Ordering::SeqCst);
        });

        flush().await;
        assert_eq!(found.load(Ordering::SeqCst), 0);

        for _ in 0..3 {
            tokio::time::advance(Duration::from_secs(60)).await;
            flush().await;
        }
        assert_eq!(found.load(Ordering::SeqCst), 1);
        assert_eq!(locator.probes.load(Ordering::SeqCst), 4);
        assert!(!task.is_armed());

        // No further probes once disarmed by success.
        tokio::time::advance(Duration::from_secs(600)).await;
        flush().await;
        assert_eq!(locator.probes.load(Ordering::SeqCst), 4);
        assert_eq!(found.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_supersedes_previous_loop() {
        let first = Arc::new(CountingLocator::new(u32::MAX));
        let second = Arc::new(CountingLocator::new(u32::MAX));
        let task = DiscoveryTask::new();

        task.arm(Arc::clone(&first) as _, Duration::from_secs(60), |_| {});
        flush().await;
        let probes_before = first.probes.load(Ordering::SeqCst);

        task.arm(Arc::clone(&second) as _, Duration::from_secs(60), |_| {});
        for _ in 0..3 {
            tokio::time::advance(Duration::from_secs(60)).await;
            flush().await;
        }

        // Only the most recently armed loop keeps probing.
        assert_eq!(first.probes.load(Ordering::SeqCst), probes_before);
        assert!(second.probes.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn disarm_stops_probing_and_suppresses_callback() {
        let locator = Arc::new(CountingLocator::new(1));
        let task = DiscoveryTask::new();
        let found = Arc::new(AtomicU32::new(0));

        let f = Arc::clone(&found);
        task.arm(Arc::clone(&locator) as _, Duration::from_secs(60), move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        });
        flush().await;
        task.disarm();
        assert!(!task.is_armed());

        tokio::time::advance(Duration::from_secs(600)).await;
        flush().await;
        assert_eq!(locator.probes.load(Ordering::SeqCst), 1);
        assert_eq!(found.load(Ordering::SeqCst), 0);
    }
}
