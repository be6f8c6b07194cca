//! Local mirror of the persisted widget state with a safe update helper.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use protocol::{GlobalKey, Host, HostCallable, WidgetState};
use serde_json::Value;
use tracing::{debug, warn};

use crate::store::{GlobalStore, Subscription};
use crate::{Error, Result};

/// Upper bound on the serialized widget state.
///
/// The state is fed to the model along with the conversation, so it has to
/// stay small.
pub const MAX_WIDGET_STATE_BYTES: usize = 4 * 1024;

/// Builds the first state when the host has none. Receives `toolInput`.
pub type Initializer = Box<dyn Fn(Option<&Value>) -> WidgetState + Send + Sync>;

/// Initializer output, computed on first use and shared with the host mirror.
struct Defaults {
    initializer: Initializer,
    value: OnceLock<WidgetState>,
}

impl Defaults {
    fn get<H: Host + 'static>(&self, store: &GlobalStore<H>) -> &WidgetState {
        self.value.get_or_init(|| {
            let input = store.read(GlobalKey::ToolInput);
            (self.initializer)(input.as_ref())
        })
    }
}

/// Owns the widget's view of its persisted state.
///
/// The host's setter replaces the whole blob, so the only write path here is
/// [`PersistedStore::update`], which reads the current value, applies the
/// caller's change and writes the complete result back. Fields the host's
/// copy lacks are filled from the initializer output.
pub struct PersistedStore<H> {
    store: GlobalStore<H>,
    host: Option<Arc<H>>,
    local: Arc<Mutex<Option<WidgetState>>>,
    defaults: Arc<Defaults>,
    /// Held across a whole update, host push included.
    writer: Mutex<()>,
    max_bytes: usize,
    _sync: Subscription,
}

impl<H: Host + 'static> PersistedStore<H> {
    pub fn new(host: Option<Arc<H>>) -> Self {
        Self::with_initializer(host, Box::new(WidgetState::from_tool_input))
    }

    pub fn with_initializer(host: Option<Arc<H>>, initializer: Initializer) -> Self {
        let store = GlobalStore::new(host.clone());
        let local = Arc::new(Mutex::new(None));
        let defaults = Arc::new(Defaults {
            initializer,
            value: OnceLock::new(),
        });

        let sync = {
            let mirror_store = store.clone();
            let local = Arc::clone(&local);
            let defaults = Arc::clone(&defaults);
            store.subscribe(GlobalKey::WidgetState, move || {
                // A null or unreadable host value leaves the mirror alone.
                if let Some(state) = read_host_state(&mirror_store, &defaults) {
                    debug!(?state, "adopting widget state from host");
                    *lock(&local) = Some(state);
                }
            })
        };

        Self {
            store,
            host,
            local,
            defaults,
            writer: Mutex::new(()),
            max_bytes: MAX_WIDGET_STATE_BYTES,
            _sync: sync,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Current persisted state.
    ///
    /// The first read seeds the mirror from the host's `widgetState`, or from
    /// the initializer if the host has none.
    pub fn get(&self) -> WidgetState {
        let mut local = lock(&self.local);
        if let Some(state) = local.as_ref() {
            return state.clone();
        }
        let state = read_host_state(&self.store, &self.defaults)
            .unwrap_or_else(|| self.defaults.get(&self.store).clone());
        *local = Some(state.clone());
        state
    }

    /// Read-modify-write the persisted state and push it to the host.
    ///
    /// Returns the committed state. Updates are serialized, so concurrent
    /// callers each see the previous caller's result. If the result is larger
    /// than the configured bound nothing is written. The local write stands
    /// even when the host has no setter or its setter fails.
    ///
    /// Must not be called from a host notification listener.
    pub fn update(&self, change: impl FnOnce(&mut WidgetState)) -> Result<WidgetState> {
        let _writer = lock(&self.writer);
        let mut next = self.get();
        change(&mut next);

        let value = serde_json::to_value(&next)?;
        let size = value.to_string().len();
        if size > self.max_bytes {
            return Err(Error::StateTooLarge {
                size,
                max: self.max_bytes,
            });
        }

        *lock(&self.local) = Some(next.clone());
        // The mirror lock is released here; the host notifies synchronously
        // and the listener takes it again.
        self.push_to_host(value);
        Ok(next)
    }

    fn push_to_host(&self, value: Value) {
        let Some(host) = &self.host else {
            debug!("no host; widget state kept locally");
            return;
        };
        if !host.exposes(HostCallable::SetWidgetState) {
            debug!("host has no widget state setter; state kept locally");
            return;
        }
        if let Err(e) = host.set_widget_state(value) {
            warn!(error = %e, "host rejected widget state");
        }
    }
}

fn read_host_state<H: Host + 'static>(
    store: &GlobalStore<H>,
    defaults: &Defaults,
) -> Option<WidgetState> {
    let value = store.read(GlobalKey::WidgetState)?;
    let state = WidgetState::overlay(&value, defaults.get(store));
    if state.is_none() {
        debug!(%value, "ignoring widget state that is not an object");
    }
    state
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
