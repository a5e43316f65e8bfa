//! Site section visibility
//!
//! The visibility record lives in the settings table under
//! [`VISIBILITY_KEY`]. Writers go through [`VisibilityStore::set`], which
//! persists the record and then notifies:
//!
//! - handlers registered in this process with [`VisibilityStore::subscribe`],
//!   called synchronously with the new state;
//! - async consumers of [`VisibilityStore::events`], such as SSE clients.
//!
//! Other processes sharing the database notice the write by polling the
//! stored value ([`VisibilityStore::watch`]); they publish
//! [`VisibilityEvent::Invalidated`] and hand their handlers a fresh read.

use crate::db::repositories::SettingsRepository;
use crate::models::VisibilityState;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

/// Settings key holding the JSON visibility record
pub const VISIBILITY_KEY: &str = "site_visibility";

const EVENT_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibilityEvent {
    /// Written by this process; carries the new state
    Changed(VisibilityState),
    /// The stored value changed elsewhere; re-read it
    Invalidated,
}

#[derive(Debug, thiserror::Error)]
pub enum VisibilityError {
    #[error("Stored visibility is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

type Handler = Arc<dyn Fn(&VisibilityState) + Send + Sync>;

#[derive(Default)]
struct HandlerRegistry {
    next_id: AtomicU64,
    handlers: RwLock<BTreeMap<u64, Handler>>,
}

impl HandlerRegistry {
    fn insert(&self, handler: Handler) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, handler);
        id
    }

    fn remove(&self, id: u64) {
        self.handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
    }

    fn len(&self) -> usize {
        self.handlers.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Call every handler. The lock is released first so handlers may
    /// subscribe or unsubscribe.
    fn notify(&self, state: &VisibilityState) {
        let handlers: Vec<Handler> = self
            .handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        for handler in handlers {
            handler(state);
        }
    }
}

/// Keeps a handler registered. Dropping it unregisters the handler.
#[must_use = "dropping a Subscription unregisters its handler"]
pub struct Subscription {
    id: u64,
    registry: Weak<HandlerRegistry>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

/// Last stored value this process wrote or observed
enum Baseline {
    Unobserved,
    Observed(Option<String>),
}

pub struct VisibilityStore {
    settings: Arc<dyn SettingsRepository>,
    registry: Arc<HandlerRegistry>,
    events: broadcast::Sender<VisibilityEvent>,
    baseline: Mutex<Baseline>,
}

impl VisibilityStore {
    pub fn new(settings: Arc<dyn SettingsRepository>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            settings,
            registry: Arc::new(HandlerRegistry::default()),
            events,
            baseline: Mutex::new(Baseline::Unobserved),
        }
    }

    /// Read the stored state, falling back to all-visible on any failure
    pub async fn load(&self) -> VisibilityState {
        match self.try_load().await {
            Ok(state) => state,
            Err(VisibilityError::Malformed(e)) => {
                tracing::warn!("Malformed visibility settings, using defaults: {}", e);
                VisibilityState::default()
            }
            Err(e) => {
                tracing::error!("Failed to load visibility settings: {}", e);
                VisibilityState::default()
            }
        }
    }

    /// Read the stored state. A missing record is the default; missing keys
    /// are completed as visible.
    pub async fn try_load(&self) -> Result<VisibilityState, VisibilityError> {
        let raw = self.read_raw().await?;
        parse_state(raw.as_deref())
    }

    /// Persist a new state and notify local handlers and event listeners.
    ///
    /// Nothing is notified if the write fails.
    pub async fn set(&self, state: VisibilityState) -> Result<(), VisibilityError> {
        let raw = serde_json::to_string(&state)?;

        {
            let mut baseline = self.baseline.lock().await;
            if let Err(e) = self.settings.set(VISIBILITY_KEY, &raw).await {
                tracing::error!("Failed to persist visibility settings: {}", e);
                return Err(e.into());
            }
            *baseline = Baseline::Observed(Some(raw));
        }

        self.registry.notify(&state);
        self.emit(VisibilityEvent::Changed(state));
        Ok(())
    }

    /// Register a handler called with every new state, from either a local
    /// write or an external change
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&VisibilityState) + Send + Sync + 'static,
    {
        let id = self.registry.insert(Arc::new(handler));
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    pub fn handler_count(&self) -> usize {
        self.registry.len()
    }

    pub fn events(&self) -> broadcast::Receiver<VisibilityEvent> {
        self.events.subscribe()
    }

    /// Compare the stored value with the last one this process saw. On a
    /// difference, publish an invalidation and hand handlers a fresh read.
    ///
    /// The first call only records a baseline. Returns whether an external
    /// change was detected.
    pub async fn check_for_external_change(&self) -> bool {
        let mut baseline = self.baseline.lock().await;
        let raw = match self.read_raw().await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("Failed to poll visibility settings: {}", e);
                return false;
            }
        };

        let changed = match &*baseline {
            Baseline::Unobserved => false,
            Baseline::Observed(previous) => *previous != raw,
        };
        *baseline = Baseline::Observed(raw);
        drop(baseline);

        if changed {
            tracing::debug!("Visibility settings changed externally");
            self.emit(VisibilityEvent::Invalidated);
            let state = self.load().await;
            self.registry.notify(&state);
        }
        changed
    }

    /// Poll for external changes every `interval` until the returned guard
    /// is dropped
    pub fn watch(self: &Arc<Self>, interval: Duration) -> WatchHandle {
        let store = Arc::clone(self);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                store.check_for_external_change().await;
            }
        });
        WatchHandle { task }
    }

    fn emit(&self, event: VisibilityEvent) {
        match self.events.send(event) {
            Ok(count) => tracing::debug!("visibility: notified {} listener(s)", count),
            Err(_) => tracing::debug!("visibility: no listeners"),
        }
    }

    async fn read_raw(&self) -> anyhow::Result<Option<String>> {
        Ok(self.settings.get(VISIBILITY_KEY).await?.map(|s| s.value))
    }
}

fn parse_state(raw: Option<&str>) -> Result<VisibilityState, VisibilityError> {
    match raw {
        None => Ok(VisibilityState::default()),
        Some(raw) => Ok(serde_json::from_str(raw)?),
    }
}

/// Background poller started by [`VisibilityStore::watch`]; aborts on drop
pub struct WatchHandle {
    task: JoinHandle<()>,
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Locally cached visibility that follows the store for as long as the
/// view lives
pub struct VisibilityView {
    state: Arc<RwLock<VisibilityState>>,
    _subscription: Subscription,
}

impl VisibilityView {
    pub async fn attach(store: &VisibilityStore) -> Self {
        let state = Arc::new(RwLock::new(VisibilityState::default()));
        let generation = Arc::new(AtomicU64::new(0));

        let subscription = {
            let state = Arc::clone(&state);
            let generation = Arc::clone(&generation);
            store.subscribe(move |next| {
                *state.write().unwrap_or_else(|e| e.into_inner()) = *next;
                generation.fetch_add(1, Ordering::SeqCst);
            })
        };

        // A notification that lands during the initial read is newer than it
        let before = generation.load(Ordering::SeqCst);
        let loaded = store.load().await;
        if generation.load(Ordering::SeqCst) == before {
            *state.write().unwrap_or_else(|e| e.into_inner()) = loaded;
        }

        Self {
            state,
            _subscription: subscription,
        }
    }

    pub fn current(&self) -> VisibilityState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }
}
