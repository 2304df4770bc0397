//! Debounced auto push.
//!
//! Local mutations call [`AutoPushScheduler::notify_changed`]. Bursts within the
//! debounce window collapse into one push; at most one push runs at a time,
//! and a request arriving while one is in flight is remembered and replayed
//! once it finishes. Clones share one schedule, so every UI surface should
//! hold a clone of the same scheduler.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::SyncResult;
use crate::settings::SyncSettings;
use crate::sync::SyncService;

pub const AUTO_PUSH_DEBOUNCE: Duration = Duration::from_millis(1500);

/// What the scheduler pushes to.
#[async_trait]
pub trait PushTarget: Send + Sync + 'static {
    /// Settings as they are at the moment of the change notification.
    fn auto_push_settings(&self) -> SyncResult<SyncSettings>;

    /// Run one push, returning the new last sync timestamp.
    async fn push(&self) -> SyncResult<String>;
}

#[async_trait]
impl PushTarget for SyncService {
    fn auto_push_settings(&self) -> SyncResult<SyncSettings> {
        self.sync_settings()
    }

    async fn push(&self) -> SyncResult<String> {
        SyncService::push(self).await
    }
}

/// Status line for the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoPushStatus {
    Idle,
    /// Auto push is switched on but `gitUrl` or `token` is missing.
    Incomplete,
    Pushing,
    Pushed { last_sync_at: String },
    Failed(String),
}

#[derive(Default)]
struct SchedulerState {
    timer: Option<JoinHandle<()>>,
    /// Bumped on every (re)schedule and cancel; stale timers compare and bail.
    generation: u64,
    in_flight: bool,
    pending: bool,
}

struct Inner {
    target: Arc<dyn PushTarget>,
    debounce: Duration,
    state: Mutex<SchedulerState>,
    status: watch::Sender<AutoPushStatus>,
}

#[derive(Clone)]
pub struct AutoPushScheduler {
    inner: Arc<Inner>,
}

impl AutoPushScheduler {
    pub fn new(target: Arc<dyn PushTarget>) -> Self {
        Self::with_debounce(target, AUTO_PUSH_DEBOUNCE)
    }

    pub fn with_debounce(target: Arc<dyn PushTarget>, debounce: Duration) -> Self {
        let (status, _) = watch::channel(AutoPushStatus::Idle);
        Self {
            inner: Arc::new(Inner {
                target,
                debounce,
                state: Mutex::new(SchedulerState::default()),
                status,
            }),
        }
    }

    /// Call after every local mutation. Must run inside a Tokio runtime.
    pub fn notify_changed(&self) {
        self.inner.schedule();
    }

    /// Drop a scheduled push and any pending replay. An in-flight push finishes.
    pub fn cancel(&self) {
        self.inner.disarm();
    }

    pub fn is_in_flight(&self) -> bool {
        self.inner.lock().in_flight
    }

    /// Nothing scheduled, running or waiting to be replayed.
    pub fn is_idle(&self) -> bool {
        let state = self.inner.lock();
        state.timer.is_none() && !state.in_flight && !state.pending
    }

    pub fn subscribe(&self) -> watch::Receiver<AutoPushStatus> {
        self.inner.status.subscribe()
    }

    pub fn status(&self) -> AutoPushStatus {
        self.inner.status.borrow().clone()
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn disarm(&self) {
        let mut state = self.lock();
        state.generation += 1;
        state.pending = false;
        if let Some(timer) = state.timer.take() {
            log::debug!("[AutoPush] Scheduled push dropped");
            timer.abort();
        }
    }

    fn schedule(self: &Arc<Self>) {
        let settings = match self.target.auto_push_settings() {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("[AutoPush] Failed to read sync settings: {e}");
                return;
            }
        };
        if !settings.can_auto_push() {
            // 关闭或配置不完整时，已排队的推送也作废
            self.disarm();
            if settings.auto_push {
                log::warn!("[AutoPush] Enabled but sync settings are incomplete (need gitUrl/token)");
                self.status.send_replace(AutoPushStatus::Incomplete);
            }
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log::warn!("[AutoPush] No Tokio runtime, change notification dropped");
            return;
        };

        let mut state = self.lock();
        state.generation += 1;
        let generation = state.generation;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        let inner = Arc::clone(self);
        let debounce = self.debounce;
        state.timer = Some(runtime.spawn(async move {
            tokio::time::sleep(debounce).await;
            inner.fire(generation);
        }));
    }

    /// Debounce window elapsed. Nothing here awaits, so aborting the timer
    /// can never interrupt a push.
    fn fire(self: &Arc<Self>, generation: u64) {
        let mut state = self.lock();
        if state.generation != generation {
            return;
        }
        state.timer = None;
        if state.in_flight {
            log::debug!("[AutoPush] Push in flight, marking pending");
            state.pending = true;
            return;
        }
        state.in_flight = true;
        drop(state);

        let inner = Arc::clone(self);
        tokio::spawn(async move { inner.run_push().await });
    }

    async fn run_push(self: Arc<Self>) {
        self.status.send_replace(AutoPushStatus::Pushing);
        match self.target.push().await {
            Ok(last_sync_at) => {
                log::debug!("[AutoPush] Pushed at {last_sync_at}");
                self.status
                    .send_replace(AutoPushStatus::Pushed { last_sync_at });
            }
            Err(e) => {
                log::warn!("[AutoPush] Push failed: {e}");
                self.status.send_replace(AutoPushStatus::Failed(e.to_string()));
            }
        }

        let replay = {
            let mut state = self.lock();
            state.in_flight = false;
            std::mem::take(&mut state.pending)
        };
        if replay {
            self.schedule();
        }
    }
}
