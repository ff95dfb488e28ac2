//! # Tracking Controller
//!
//! Owns the tracking session lifecycle and the periodic scheduler.
//!
//! ## States
//!
//! - **Idle**: no session token (`0`)
//! - **Tracking(token)**: a scheduler task bound to `token` is running
//!
//! `start` moves Idle to Tracking with a fresh token, samples immediately and
//! kicks off an upload. `stop` clears the token, cancels the scheduler, and
//! fires one final upload. Both are no-ops (returning `false`) in the wrong
//! state.
//!
//! ## Stale ticks
//!
//! Every tick carries the token of the session that armed it. A tick whose
//! token is not the current token is discarded without touching the buffer
//! or the network, so a scheduler that outlives its session (or a tick that
//! was already in flight when `stop` ran) cannot act on a newer session.
//!
//! Uploads run as tracked background tasks; callers of `start`/`stop` never
//! wait on the network. The `start` and `stop` uploads queue behind any
//! running upload, while a scheduled upload is skipped if one is still in
//! flight, so a hanging collector cannot pile up pending uploads. [`TrackingController::wait_for_pending_syncs`] lets a
//! shutting-down process wait for them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info};

use super::session::{Countdowns, Schedule, SessionToken};
use crate::position::Sampler;
use crate::storage::TrackerPrefs;
use crate::sync::Syncer;

/// What a scheduler tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Tick belonged to a superseded or stopped session and was ignored
    Stale,
    /// Tick was current; reports which components were invoked. `synced`
    /// is false when a due sync was skipped because one was still running.
    Ran { sampled: bool, synced: bool },
}

struct SessionState {
    endpoint: Option<String>,
    scheduler: Option<JoinHandle<()>>,
    countdowns: Countdowns,
}

struct Inner {
    sampler: Arc<Sampler>,
    syncer: Arc<Syncer>,
    prefs: Arc<TrackerPrefs>,
    schedule: Schedule,
    /// Current session token, 0 when idle
    token: AtomicU64,
    /// Last token handed out
    generation: AtomicU64,
    /// Serializes start/stop and guards per-session state
    session: Mutex<SessionState>,
    tasks: TaskTracker,
    /// Serializes `wait_for_pending_syncs` callers around close/reopen
    drain: Mutex<()>,
}

/// Start/stop control for a tracking session.
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct TrackingController {
    inner: Arc<Inner>,
}

impl TrackingController {
    pub fn new(
        sampler: Arc<Sampler>,
        syncer: Arc<Syncer>,
        prefs: Arc<TrackerPrefs>,
        schedule: Schedule,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                sampler,
                syncer,
                prefs,
                schedule,
                token: AtomicU64::new(0),
                generation: AtomicU64::new(0),
                session: Mutex::new(SessionState {
                    endpoint: None,
                    scheduler: None,
                    countdowns: Countdowns::new(&schedule),
                }),
                tasks: TaskTracker::new(),
                drain: Mutex::new(()),
            }),
        }
    }

    /// Begin a tracking session uploading to `endpoint`.
    ///
    /// Returns `false` if a session is already running; the running session's
    /// endpoint is kept.
    pub async fn start(&self, endpoint: impl Into<String>) -> bool {
        let inner = &self.inner;
        let (token, endpoint) = {
            let mut session = inner.session.lock().await;

            let raw = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let Some(token) = SessionToken::new(raw) else {
                return false;
            };
            if inner
                .token
                .compare_exchange(0, token.get(), Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                debug!("Tracking already running, ignoring start");
                return false;
            }

            let endpoint = endpoint.into();
            session.endpoint = Some(endpoint.clone());
            session.countdowns = Countdowns::new(&inner.schedule);

            if let Err(e) = inner.prefs.set_tracking_enabled(true) {
                error!("Failed to persist tracking flag: {}", e);
            }

            session.scheduler = Some(tokio::spawn(run_scheduler(Arc::clone(inner), token)));
            (token, endpoint)
        };

        info!("Tracking started (session {}, endpoint {})", token, endpoint);

        // Immediate sample and upload
        if inner.is_current(token) {
            inner.sampler.sample().await;
        }
        inner.spawn_sync(endpoint);
        true
    }

    /// End the current session and fire a final upload.
    ///
    /// Returns `false` if no session is running.
    pub async fn stop(&self) -> bool {
        let inner = &self.inner;
        let (token, endpoint) = {
            let mut session = inner.session.lock().await;

            let current = inner.token.load(Ordering::SeqCst);
            if current == 0
                || inner
                    .token
                    .compare_exchange(current, 0, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
            {
                debug!("Tracking not running, ignoring stop");
                return false;
            }

            if let Some(scheduler) = session.scheduler.take() {
                scheduler.abort();
            }

            if let Err(e) = inner.prefs.set_tracking_enabled(false) {
                error!("Failed to persist tracking flag: {}", e);
            }

            (current, session.endpoint.take())
        };

        if let Some(endpoint) = endpoint {
            inner.spawn_sync(endpoint);
        }

        info!("Tracking stopped (session #{})", token);
        true
    }

    /// Handle one scheduler tick carrying `token`.
    pub async fn tick(&self, token: SessionToken) -> TickOutcome {
        self.inner.tick(token).await
    }

    /// Token of the running session, if any
    pub fn current_token(&self) -> Option<SessionToken> {
        SessionToken::new(self.inner.token.load(Ordering::SeqCst))
    }

    /// Whether a session is running
    pub fn is_tracking(&self) -> bool {
        self.current_token().is_some()
    }

    /// Endpoint of the running session
    pub async fn endpoint(&self) -> Option<String> {
        self.inner.session.lock().await.endpoint.clone()
    }

    /// The syncer driven by this controller
    pub fn syncer(&self) -> &Arc<Syncer> {
        &self.inner.syncer
    }

    /// Settings store the controller mirrors its state into
    pub fn prefs(&self) -> &Arc<TrackerPrefs> {
        &self.inner.prefs
    }

    /// Wait until every upload started so far has finished.
    ///
    /// Concurrent callers take turns, so one caller reopening the tracker
    /// cannot strand another.
    pub async fn wait_for_pending_syncs(&self) {
        let _drain = self.inner.drain.lock().await;
        let tasks = &self.inner.tasks;
        tasks.close();
        tasks.wait().await;
        tasks.reopen();
    }
}

impl Inner {
    fn is_current(&self, token: SessionToken) -> bool {
        self.token.load(Ordering::SeqCst) == token.get()
    }

    fn spawn_sync(&self, endpoint: String) {
        let syncer = Arc::clone(&self.syncer);
        self.tasks.spawn(async move {
            syncer.sync_with_retry(&endpoint).await;
        });
    }

    /// Periodic upload; skipped while another upload loop is running
    fn spawn_scheduled_sync(&self, endpoint: String) -> bool {
        if self.syncer.is_syncing() {
            debug!("Upload still running, skipping scheduled sync");
            return false;
        }
        let syncer = Arc::clone(&self.syncer);
        self.tasks.spawn(async move {
            syncer.try_sync_with_retry(&endpoint).await;
        });
        true
    }

    async fn tick(&self, token: SessionToken) -> TickOutcome {
        if !self.is_current(token) {
            return TickOutcome::Stale;
        }

        let (due, endpoint) = {
            let mut session = self.session.lock().await;
            // stop() may have won the lock while we waited
            if !self.is_current(token) {
                return TickOutcome::Stale;
            }
            (
                session.countdowns.advance(&self.schedule),
                session.endpoint.clone(),
            )
        };

        let mut sampled = false;
        if due.sample && self.is_current(token) {
            self.sampler.sample().await;
            sampled = true;
        }

        let mut synced = false;
        if due.sync && self.is_current(token) {
            if let Some(endpoint) = endpoint {
                synced = self.spawn_scheduled_sync(endpoint);
            }
        }

        TickOutcome::Ran { sampled, synced }
    }
}

async fn run_scheduler(inner: Arc<Inner>, token: SessionToken) {
    let period = inner.schedule.tick;
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if inner.tick(token).await == TickOutcome::Stale {
            debug!("Scheduler for session {} exiting", token);
            break;
        }
    }
}
