//! Local playback state machine.
//!
//! [`PlaybackController`] translates "play this path at this offset" into
//! host-player invocations and reconciles the player's lifecycle signals
//! with its own state: `Idle -> Processing -> Playing -> Idle`. It raises
//! a `PlayerStarted` event to subscribers and publishes a now-playing
//! descriptor for the on-screen display after a short settle delay.

use std::path::Path;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::config::{props, OSD_PUBLISH_DELAY};
use crate::event::{EventEmitter, Subscription};
use crate::host::{LocalPlayer, MediaKind, PlayerSignal, PropertySink};

/// State of the local playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// No play request in flight.
    Idle,
    /// A play request was issued; waiting for the player to start.
    Processing,
    /// The player confirmed playback started.
    Playing,
}

/// Now-playing descriptor raised with `PlayerStarted` and published to
/// the property surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlayingInfo {
    /// Path as reported by the player's started signal.
    pub path: String,
}

impl NowPlayingInfo {
    /// File name portion of the path, falling back to the full path.
    pub fn filename(&self) -> &str {
        Path::new(&self.path)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.path)
    }
}

/// Controller for the host media player.
///
/// Owns exactly one playback session at a time. Failures never propagate
/// to callers; they are logged and observable through [`state`](Self::state).
///
/// Construction subscribes to the player's lifecycle signals;
/// [`dispose`](Self::dispose) (or `Drop`) unsubscribes — the two are
/// exactly paired.
pub struct PlaybackController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    player: Arc<dyn LocalPlayer>,
    properties: Arc<dyn PropertySink>,
    state: Mutex<ControllerState>,
    player_started: EventEmitter<NowPlayingInfo>,
}

struct ControllerState {
    playback: PlaybackState,
    resume_offset_secs: u32,
    osd_task: Option<JoinHandle<()>>,
    signal_task: Option<JoinHandle<()>>,
    subscription: Option<u64>,
    disposed: bool,
}

impl PlaybackController {
    pub fn new(player: Arc<dyn LocalPlayer>, properties: Arc<dyn PropertySink>) -> Self {
        let inner = Arc::new(ControllerInner {
            player: Arc::clone(&player),
            properties,
            state: Mutex::new(ControllerState {
                playback: PlaybackState::Idle,
                resume_offset_secs: 0,
                osd_task: None,
                signal_task: None,
                subscription: None,
                disposed: false,
            }),
            player_started: EventEmitter::new(),
        });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let subscription = player.subscribe(tx);

        let weak = Arc::downgrade(&inner);
        let signal_task = tokio::spawn(async move {
            while let Some(signal) = rx.recv().await {
                let Some(inner) = weak.upgrade() else { break };
                inner.handle_signal(signal);
            }
        });

        {
            let mut st = inner.state.lock().unwrap();
            st.subscription = Some(subscription);
            st.signal_task = Some(signal_task);
        }

        Self { inner }
    }

    /// Play the given path, resuming at an offset in seconds.
    ///
    /// Sets state to `Processing` immediately; promotion to `Playing`
    /// happens only on the player's started signal. An immediate player
    /// failure resets to `Idle` and is logged, not returned.
    pub fn play(&self, path: &str, resume_offset_secs: u32) {
        let path = path.trim();
        let mut st = self.inner.state.lock().unwrap();
        if st.disposed {
            warn!(path, "play request on disposed controller ignored");
            return;
        }
        st.playback = PlaybackState::Processing;
        st.resume_offset_secs = resume_offset_secs;
        debug!(path, resume = resume_offset_secs, "play requested");

        if !self.inner.player.play(path, MediaKind::Video) {
            error!(path, "playback failed to start");
            st.playback = PlaybackState::Idle;
        }
    }

    /// Request a player stop if it reports it is playing.
    ///
    /// Local state resets when the player's stop signal arrives, so a
    /// state read immediately after `stop()` may still observe `Playing`.
    pub fn stop(&self) {
        if self.inner.player.is_playing() {
            self.inner.player.stop();
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.inner.state.lock().unwrap().playback
    }

    /// True while a play request is in flight or confirmed.
    pub fn is_playing(&self) -> bool {
        self.state() != PlaybackState::Idle
    }

    /// Subscribe to confirmed playback starts.
    pub fn on_player_started<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&NowPlayingInfo) + Send + Sync + 'static,
    {
        self.inner.player_started.subscribe(callback)
    }

    pub fn unsubscribe_player_started(&self, subscription: Subscription) {
        self.inner.player_started.unsubscribe(subscription);
    }

    /// Tear down: unsubscribe from player signals and cancel the pending
    /// OSD publish. Idempotent.
    pub fn dispose(&self) {
        let (osd_task, signal_task, subscription) = {
            let mut st = self.inner.state.lock().unwrap();
            if st.disposed {
                return;
            }
            st.disposed = true;
            st.playback = PlaybackState::Idle;
            (st.osd_task.take(), st.signal_task.take(), st.subscription.take())
        };
        if let Some(task) = osd_task {
            task.abort();
        }
        if let Some(token) = subscription {
            self.inner.player.unsubscribe(token);
        }
        if let Some(task) = signal_task {
            task.abort();
        }
        debug!("playback controller shut down");
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl ControllerInner {
    /// Invoked on the signal dispatch task, concurrent with public callers.
    fn handle_signal(self: &Arc<Self>, signal: PlayerSignal) {
        match signal {
            PlayerSignal::Started { path, .. } => self.on_started(path),
            PlayerSignal::Stopped { .. }
            | PlayerSignal::Changed { .. }
            | PlayerSignal::Ended { .. } => self.reset(),
        }
    }

    fn on_started(self: &Arc<Self>, path: String) {
        let resume = {
            let mut st = self.state.lock().unwrap();
            // Only act when a play request is in flight; a started signal
            // with no session is someone else's playback.
            if st.disposed || st.playback == PlaybackState::Idle {
                return;
            }
            st.playback = PlaybackState::Playing;
            st.resume_offset_secs
        };

        self.player.show_fullscreen();
        if resume > 0 {
            debug!(resume, "seeking to resume position");
            self.player.seek_to(resume);
        }

        let info = NowPlayingInfo { path };
        self.player_started.emit(&info);
        self.schedule_osd_publish(info);
    }

    /// One-shot deferred publish, letting the player settle before the
    /// overlay text appears. Cancelled on dispose.
    fn schedule_osd_publish(self: &Arc<Self>, info: NowPlayingInfo) {
        let weak = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            tokio::time::sleep(OSD_PUBLISH_DELAY).await;
            let Some(inner) = weak.upgrade() else { return };
            if inner.state.lock().unwrap().disposed {
                return;
            }
            inner.properties.publish(props::NOW_PLAYING, info.filename());
        });

        let mut st = self.state.lock().unwrap();
        if let Some(previous) = st.osd_task.replace(task) {
            previous.abort();
        }
    }

    fn reset(&self) {
        let mut st = self.state.lock().unwrap();
        if st.playback != PlaybackState::Idle {
            debug!("playback finished, resetting state");
            st.playback = PlaybackState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::time::Duration;

    async fn flush() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Play(String),
        Stop,
        Seek(u32),
        Fullscreen,
    }

    struct FakePlayer {
        play_succeeds: AtomicBool,
        playing: AtomicBool,
        calls: Mutex<Vec<Call>>,
        signals: Mutex<Option<mpsc::UnboundedSender<PlayerSignal>>>,
        next_token: AtomicU64,
        unsubscribed: Mutex<Vec<u64>>,
    }

    impl FakePlayer {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                play_succeeds: AtomicBool::new(true),
                playing: AtomicBool::new(false),
                calls: Mutex::new(Vec::new()),
                signals: Mutex::new(None),
                next_token: AtomicU64::new(1),
                unsubscribed: Mutex::new(Vec::new()),
            })
        }

        fn send(&self, signal: PlayerSignal) {
            self.signals
                .lock()
                .unwrap()
                .as_ref()
                .unwrap()
                .send(signal)
                .unwrap();
        }

        fn started(&self, path: &str) {
            self.send(PlayerSignal::Started {
                kind: MediaKind::Video,
                path: path.to_string(),
            });
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl LocalPlayer for FakePlayer {
        fn play(&self, path: &str, _kind: MediaKind) -> bool {
            self.calls.lock().unwrap().push(Call::Play(path.to_string()));
            self.play_succeeds.load(Ordering::SeqCst)
        }

        fn stop(&self) {
            self.calls.lock().unwrap().push(Call::Stop);
        }

        fn is_playing(&self) -> bool {
            self.playing.load(Ordering::SeqCst)
        }

        fn seek_to(&self, position_secs: u32) {
            self.calls.lock().unwrap().push(Call::Seek(position_secs));
        }

        fn show_fullscreen(&self) {
            self.calls.lock().unwrap().push(Call::Fullscreen);
        }

        fn subscribe(&self, signals: mpsc::UnboundedSender<PlayerSignal>) -> u64 {
            *self.signals.lock().unwrap() = Some(signals);
            self.next_token.fetch_add(1, Ordering::SeqCst)
        }

        fn unsubscribe(&self, token: u64) {
            self.unsubscribed.lock().unwrap().push(token);
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        published: Mutex<Vec<(String, String)>>,
    }

    impl PropertySink for RecordingSink {
        fn publish(&self, key: &str, value: &str) {
            self.published
                .lock()
                .unwrap()
                .push((key.to_string(), value.to_string()));
        }
    }

    fn controller() -> (PlaybackController, Arc<FakePlayer>, Arc<RecordingSink>) {
        let player = FakePlayer::new();
        let sink = Arc::new(RecordingSink::default());
        let controller =
            PlaybackController::new(Arc::clone(&player) as _, Arc::clone(&sink) as _);
        (controller, player, sink)
    }

    #[tokio::test(start_paused = true)]
    async fn play_transitions_idle_processing_playing() {
        let (controller, player, _sink) = controller();
        assert_eq!(controller.state(), PlaybackState::Idle);

        let started_paths = Arc::new(Mutex::new(Vec::new()));
        let p = Arc::clone(&started_paths);
        controller.on_player_started(move |info| p.lock().unwrap().push(info.path.clone()));

        controller.play("/a", 0);
        assert_eq!(controller.state(), PlaybackState::Processing);

        player.started("/a");
        flush().await;
        assert_eq!(controller.state(), PlaybackState::Playing);
        assert_eq!(*started_paths.lock().unwrap(), vec!["/a".to_string()]);
        assert!(player.calls().contains(&Call::Fullscreen));
        // No seek without a resume offset.
        assert!(!player.calls().iter().any(|c| matches!(c, Call::Seek(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn resume_offset_seeks_once_after_start_before_publish() {
        let (controller, player, sink) = controller();
        controller.play("/a", 10);
        player.started("/a");
        flush().await;

        assert_eq!(
            player.calls(),
            vec![
                Call::Play("/a".to_string()),
                Call::Fullscreen,
                Call::Seek(10)
            ]
        );
        // The OSD publish only fires after the settle delay.
        assert!(sink.published.lock().unwrap().is_empty());

        tokio::time::advance(Duration::from_secs(2)).await;
        flush().await;
        assert_eq!(
            *sink.published.lock().unwrap(),
            vec![(props::NOW_PLAYING.to_string(), "a".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn osd_publish_waits_full_delay() {
        let (controller, player, sink) = controller();
        controller.play("/media/movie.mkv", 0);
        player.started("/media/movie.mkv");
        flush().await;

        tokio::time::advance(Duration::from_millis(1999)).await;
        flush().await;
        assert!(sink.published.lock().unwrap().is_empty());

        tokio::time::advance(Duration::from_millis(2)).await;
        flush().await;
        assert_eq!(
            *sink.published.lock().unwrap(),
            vec![(props::NOW_PLAYING.to_string(), "movie.mkv".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_play_failure_resets_to_idle() {
        let (controller, player, _sink) = controller();
        player.play_succeeds.store(false, Ordering::SeqCst);

        let started = Arc::new(AtomicBool::new(false));
        let s = Arc::clone(&started);
        controller.on_player_started(move |_| s.store(true, Ordering::SeqCst));

        controller.play("/a", 0);
        assert_eq!(controller.state(), PlaybackState::Idle);

        // A late started signal finds no session and is ignored.
        player.started("/a");
        flush().await;
        assert_eq!(controller.state(), PlaybackState::Idle);
        assert!(!started.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_ended_changed_all_reset_once_playing() {
        let (controller, player, _sink) = controller();

        let makers: [fn(String) -> PlayerSignal; 3] = [
            |path| PlayerSignal::Stopped {
                kind: MediaKind::Video,
                stop_time_secs: 30,
                path,
            },
            |path| PlayerSignal::Changed {
                kind: MediaKind::Video,
                stop_time_secs: 30,
                path,
            },
            |path| PlayerSignal::Ended {
                kind: MediaKind::Video,
                path,
            },
        ];
        for make_signal in makers {
            controller.play("/a", 0);
            player.started("/a");
            flush().await;
            assert_eq!(controller.state(), PlaybackState::Playing);

            player.send(make_signal("/a".to_string()));
            flush().await;
            assert_eq!(controller.state(), PlaybackState::Idle);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn lifecycle_signals_while_idle_are_noops() {
        let (controller, player, _sink) = controller();
        player.send(PlayerSignal::Ended {
            kind: MediaKind::Video,
            path: "/a".to_string(),
        });
        player.send(PlayerSignal::Stopped {
            kind: MediaKind::Video,
            stop_time_secs: 0,
            path: "/a".to_string(),
        });
        flush().await;
        assert_eq!(controller.state(), PlaybackState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_defers_state_reset_to_lifecycle_signal() {
        let (controller, player, _sink) = controller();
        controller.play("/a", 0);
        player.started("/a");
        flush().await;

        player.playing.store(true, Ordering::SeqCst);
        controller.stop();
        assert!(player.calls().contains(&Call::Stop));
        // Accepted race: still Playing until the signal lands.
        assert_eq!(controller.state(), PlaybackState::Playing);

        player.send(PlayerSignal::Stopped {
            kind: MediaKind::Video,
            stop_time_secs: 12,
            path: "/a".to_string(),
        });
        flush().await;
        assert_eq!(controller.state(), PlaybackState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_noop_when_player_not_playing() {
        let (controller, player, _sink) = controller();
        controller.stop();
        assert!(!player.calls().contains(&Call::Stop));
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_cancels_pending_osd_publish() {
        let (controller, player, sink) = controller();
        controller.play("/a", 0);
        player.started("/a");
        flush().await;

        controller.dispose();
        tokio::time::advance(Duration::from_secs(3)).await;
        flush().await;
        assert!(sink.published.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_unsubscribes_exactly_once() {
        let (controller, player, _sink) = controller();
        controller.dispose();
        controller.dispose();
        assert_eq!(*player.unsubscribed.lock().unwrap(), vec![1]);
    }
}
