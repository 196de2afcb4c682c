//! The sync client: keeps one room's snapshot flowing to the render
//! thread over a push channel when possible, a fixed-interval poll when
//! not, and surfaces connectivity so the UI can react.
//!
//! All network work runs on a Tokio runtime (owned by the client if the
//! process has none); results cross to the render thread as plain values
//! over a crossbeam channel, so pool state keeps a single writer.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use futures_util::StreamExt;
use log::{debug, info, warn};
use tokio::runtime::{Handle, Runtime};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use hallwatch_core::{ScanResult, Snapshot};

use crate::backoff::Backoff;
use crate::{ConnectionState, SyncError, SyncEvent, TransportKind};

/// Runtime settings for one sync client.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// e.g. "http://127.0.0.1:5000"
    pub base_url: String,
    /// Subscribe to the push channel; false means poll-only.
    pub prefer_push: bool,
    pub poll_interval: Duration,
    pub backoff_floor: Duration,
    pub backoff_ceiling: Duration,
    /// Consecutive push failures before the parallel poll fallback starts.
    pub push_failure_threshold: u32,
    /// Consecutive poll failures before connectivity is marked lost.
    pub poll_failure_threshold: u32,
}

impl SyncSettings {
    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    fn status_url(&self, room: &str) -> String {
        format!("{}/api/status?room={}", self.base(), room)
    }

    fn scan_url(&self) -> String {
        format!("{}/api/scan", self.base())
    }

    fn override_url(&self) -> String {
        format!("{}/api/override_end", self.base())
    }

    fn stream_url(&self, room: &str) -> String {
        let ws_base = if let Some(rest) = self.base().strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base().strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base().to_string()
        };
        format!("{ws_base}/api/stream?room={room}")
    }
}

/// Everything a sync task needs, cheap to clone into spawned futures.
#[derive(Clone)]
struct TaskContext {
    settings: SyncSettings,
    room: String,
    http: reqwest::Client,
    events: Sender<SyncEvent>,
    shutdown: watch::Receiver<bool>,
    state: Arc<Mutex<ConnectionState>>,
}

impl TaskContext {
    /// Emit a connectivity change exactly once per transition.
    fn emit_state(&self, next: ConnectionState) {
        let mut current = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *current != next {
            info!("connection state: {} -> {}", current.label(), next.label());
            *current = next;
            let _ = self.events.send(SyncEvent::Connection(next));
        }
    }

    fn current_state(&self) -> ConnectionState {
        match self.state.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn install_snapshot(&self, snapshot: Snapshot, rtt: Option<Duration>) {
        let _ = self.events.send(SyncEvent::Snapshot { snapshot, rtt });
    }

    /// One pull-endpoint fetch, with round-trip time measured around it.
    async fn fetch_snapshot(&self) -> Result<(Snapshot, Duration), SyncError> {
        let started = Instant::now();
        let text = self
            .http
            .get(self.settings.status_url(&self.room))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let snapshot: Snapshot = serde_json::from_str(&text)?;
        let rtt = started.elapsed();
        debug!("snapshot fetch rtt {:?} (~{:?} one-way)", rtt, rtt / 2);
        Ok((snapshot, rtt))
    }
}

struct ActiveRoom {
    room: String,
    shutdown: watch::Sender<bool>,
    supervisor: JoinHandle<()>,
}

/// Client-side synchronization for one kiosk display.
pub struct SyncClient {
    settings: SyncSettings,
    events: Sender<SyncEvent>,
    http: reqwest::Client,
    handle: Handle,
    _runtime: Option<Arc<Runtime>>,
    active: Mutex<Option<ActiveRoom>>,
    state: Arc<Mutex<ConnectionState>>,
}

impl SyncClient {
    /// Create a client reporting through `events`. Joins the ambient Tokio
    /// runtime when one exists, otherwise owns one.
    pub fn new(settings: SyncSettings, events: Sender<SyncEvent>) -> Result<Self, SyncError> {
        let (handle, runtime) = match Handle::try_current() {
            Ok(handle) => (handle, None),
            Err(_) => {
                let runtime =
                    Runtime::new().map_err(|e| SyncError::Runtime(e.to_string()))?;
                let handle = runtime.handle().clone();
                (handle, Some(Arc::new(runtime)))
            }
        };
        Ok(SyncClient {
            settings,
            events,
            http: reqwest::Client::new(),
            handle,
            _runtime: runtime,
            active: Mutex::new(None),
            state: Arc::new(Mutex::new(ConnectionState::Reconnecting)),
        })
    }

    /// Begin syncing a room. Calling again for the same room while the
    /// connection is live is a no-op; a different room tears the old
    /// connection down first.
    pub fn connect(&self, room: &str) -> Result<(), SyncError> {
        let mut active = self.lock_active()?;
        if let Some(current) = active.as_ref() {
            if current.room == room && !current.supervisor.is_finished() {
                debug!("already syncing room {room}; connect is a no-op");
                return Ok(());
            }
        }
        Self::teardown(&mut active);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let ctx = TaskContext {
            settings: self.settings.clone(),
            room: room.to_string(),
            http: self.http.clone(),
            events: self.events.clone(),
            shutdown: shutdown_rx,
            state: Arc::clone(&self.state),
        };
        let supervisor = if self.settings.prefer_push {
            self.handle.spawn(run_push(ctx))
        } else {
            self.handle.spawn(run_poll(ctx, None))
        };
        info!("syncing room {room}");
        *active = Some(ActiveRoom {
            room: room.to_string(),
            shutdown: shutdown_tx,
            supervisor,
        });
        Ok(())
    }

    /// Tear down all sync activity. Safe to call repeatedly.
    pub fn shutdown(&self) -> Result<(), SyncError> {
        let mut active = self.lock_active()?;
        Self::teardown(&mut active);
        Ok(())
    }

    pub fn active_room(&self) -> Option<String> {
        self.lock_active()
            .ok()
            .and_then(|active| active.as_ref().map(|a| a.room.clone()))
    }

    pub fn connection_state(&self) -> ConnectionState {
        match self.state.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Relay one scanned code; the outcome arrives as `SyncEvent::Scan`.
    /// A successful non-ban outcome eagerly refreshes the snapshot when
    /// push is not already delivering (ban flashes keep their moment until
    /// the next scheduled sync).
    pub fn submit_scan(&self, code: &str) -> Result<(), SyncError> {
        let ctx = self.relay_context()?;
        let code = code.to_string();
        self.handle.spawn(async move {
            let result = relay_scan(&ctx, &code).await;
            let refresh = result.ok
                && !result.is_ban()
                && ctx.current_state() != ConnectionState::Connected(TransportKind::Push);
            let _ = ctx.events.send(SyncEvent::Scan(result));
            if refresh {
                eager_refresh(&ctx).await;
            }
        });
        Ok(())
    }

    /// Relay the admin early-end action, with the same eager refresh rule
    /// as scans.
    pub fn override_end(&self) -> Result<(), SyncError> {
        let ctx = self.relay_context()?;
        self.handle.spawn(async move {
            let body = serde_json::json!({ "room": ctx.room });
            match ctx.http.post(ctx.settings.override_url()).json(&body).send().await {
                Ok(_) => {
                    info!("override end relayed for room {}", ctx.room);
                    if ctx.current_state() != ConnectionState::Connected(TransportKind::Push) {
                        eager_refresh(&ctx).await;
                    }
                }
                Err(err) => warn!("override end failed: {err}"),
            }
        });
        Ok(())
    }

    fn relay_context(&self) -> Result<TaskContext, SyncError> {
        let active = self.lock_active()?;
        let active = active
            .as_ref()
            .ok_or_else(|| SyncError::Runtime("no room connected".to_string()))?;
        Ok(TaskContext {
            settings: self.settings.clone(),
            room: active.room.clone(),
            http: self.http.clone(),
            events: self.events.clone(),
            shutdown: active.shutdown.subscribe(),
            state: Arc::clone(&self.state),
        })
    }

    fn lock_active(&self) -> Result<std::sync::MutexGuard<'_, Option<ActiveRoom>>, SyncError> {
        self.active
            .lock()
            .map_err(|e| SyncError::Runtime(format!("active-room mutex poisoned: {e}")))
    }

    fn teardown(active: &mut Option<ActiveRoom>) {
        if let Some(previous) = active.take() {
            let _ = previous.shutdown.send(true);
            previous.supervisor.abort();
            info!("sync tasks for room {} stopped", previous.room);
        }
    }
}

impl Drop for SyncClient {
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.lock() {
            Self::teardown(&mut active);
        }
    }
}

/// Resolves when the watch flag flips true or its sender goes away.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Push transport: long-lived subscription with exponential reconnect
/// backoff and a parallel poll fallback after repeated failures.
async fn run_push(ctx: TaskContext) {
    let mut shutdown = ctx.shutdown.clone();
    let mut backoff = Backoff::new(ctx.settings.backoff_floor, ctx.settings.backoff_ceiling);
    let mut consecutive_failures: u32 = 0;
    let mut fallback: Option<FallbackGuard> = None;

    loop {
        let url = ctx.settings.stream_url(&ctx.room);
        let attempt = tokio::select! {
            _ = cancelled(&mut shutdown) => break,
            attempt = connect_async(url.as_str()) => attempt,
        };

        match attempt {
            Ok((mut stream, _)) => {
                info!("push channel open for room {}", ctx.room);
                backoff.reset();
                ctx.emit_state(ConnectionState::Connected(TransportKind::Push));
                loop {
                    let message = tokio::select! {
                        _ = cancelled(&mut shutdown) => return,
                        message = stream.next() => message,
                    };
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<Snapshot>(&text) {
                                Ok(snapshot) => {
                                    consecutive_failures = 0;
                                    if let Some(guard) = fallback.take() {
                                        info!("push recovered; stopping poll fallback");
                                        guard.stop();
                                    }
                                    ctx.emit_state(ConnectionState::Connected(
                                        TransportKind::Push,
                                    ));
                                    ctx.install_snapshot(snapshot, None);
                                }
                                // discard, keep the previous snapshot
                                Err(err) => warn!("discarding malformed push payload: {err}"),
                            }
                        }
                        Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => {} // binary frames are not part of the protocol
                        Some(Err(err)) => {
                            warn!("push channel error for room {}: {err}", ctx.room);
                            break;
                        }
                    }
                }
            }
            Err(err) => warn!("push connect failed for room {}: {err}", ctx.room),
        }

        consecutive_failures = consecutive_failures.saturating_add(1);
        // while the poll fallback is delivering (or already marked lost),
        // its state stands; only a dropped push connection downgrades
        if ctx.current_state() == ConnectionState::Connected(TransportKind::Push) {
            ctx.emit_state(ConnectionState::Reconnecting);
        }
        if consecutive_failures >= ctx.settings.push_failure_threshold && fallback.is_none() {
            info!(
                "push down after {consecutive_failures} consecutive failures; starting poll fallback"
            );
            fallback = Some(spawn_poll_fallback(&ctx));
        }

        let delay = backoff.next_delay();
        debug!("push reconnect for room {} in {:?}", ctx.room, delay);
        tokio::select! {
            _ = cancelled(&mut shutdown) => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    if let Some(guard) = fallback.take() {
        guard.stop();
    }
}

struct FallbackGuard {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl FallbackGuard {
    fn stop(self) {
        let _ = self.stop.send(true);
        self.task.abort();
    }
}

fn spawn_poll_fallback(ctx: &TaskContext) -> FallbackGuard {
    let (stop_tx, stop_rx) = watch::channel(false);
    let task = tokio::spawn(run_poll(ctx.clone(), Some(stop_rx)));
    FallbackGuard { stop: stop_tx, task }
}

/// Poll transport: fixed-interval pull. Primary when push is unavailable,
/// fallback (with a stop signal) while push reconnects.
async fn run_poll(ctx: TaskContext, stop: Option<watch::Receiver<bool>>) {
    let mut shutdown = ctx.shutdown.clone();
    let mut stop = stop;
    let mut interval = tokio::time::interval(ctx.settings.poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut consecutive_failures: u32 = 0;

    loop {
        tokio::select! {
            _ = cancelled(&mut shutdown) => return,
            _ = wait_stop(&mut stop) => return,
            _ = interval.tick() => {}
        }

        match ctx.fetch_snapshot().await {
            Ok((snapshot, rtt)) => {
                consecutive_failures = 0;
                ctx.emit_state(ConnectionState::Connected(TransportKind::Poll));
                ctx.install_snapshot(snapshot, Some(rtt));
            }
            Err(err) => {
                consecutive_failures = consecutive_failures.saturating_add(1);
                warn!(
                    "poll fetch failed for room {} ({consecutive_failures} consecutive): {err}",
                    ctx.room
                );
                if consecutive_failures >= ctx.settings.poll_failure_threshold {
                    // stale-but-displayed: the last good snapshot stays up,
                    // but timers stop once the UI sees this
                    ctx.emit_state(ConnectionState::Lost);
                }
            }
        }
    }
}

/// Resolves when the fallback stop flag flips; pends forever for primary
/// polls that have no stop signal.
async fn wait_stop(stop: &mut Option<watch::Receiver<bool>>) {
    match stop {
        Some(rx) => cancelled(rx).await,
        None => std::future::pending::<()>().await,
    }
}

async fn relay_scan(ctx: &TaskContext, code: &str) -> ScanResult {
    let body = serde_json::json!({ "code": code, "room": ctx.room });
    match ctx.http.post(ctx.settings.scan_url()).json(&body).send().await {
        // denial statuses (404/409) still carry a result body
        Ok(response) => match response.json::<ScanResult>().await {
            Ok(result) => result,
            Err(err) => {
                warn!("unparsable scan reply: {err}");
                ScanResult::failure("Scan failed")
            }
        },
        Err(err) => {
            warn!("scan relay failed: {err}");
            ScanResult::failure("Scan failed")
        }
    }
}

async fn eager_refresh(ctx: &TaskContext) {
    match ctx.fetch_snapshot().await {
        Ok((snapshot, rtt)) => ctx.install_snapshot(snapshot, Some(rtt)),
        Err(err) => debug!("eager refresh failed: {err}"),
    }
}
