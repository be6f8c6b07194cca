//! The sandbox host.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use protocol::{
    EXPLORE_STAYS_TOOL, GlobalKey, GlobalsListener, Host, HostCallable, HostError, ListenerId,
    SearchArgs, SetGlobalsEvent, ToolContent, ToolResponse, WIDGET_URI,
};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::{Catalog, Result};

/// A tool call as the widget issued it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub name: String,
    pub arguments: Value,
}

struct Registration {
    event: String,
    id: ListenerId,
    listener: GlobalsListener,
}

/// In-memory host.
///
/// Notifications are delivered synchronously, in the order they are emitted,
/// after internal locks are released, so listeners may read back into the
/// host.
pub struct SandboxHost {
    catalog: Catalog,
    globals: Mutex<Map<String, Value>>,
    listeners: Mutex<Vec<Registration>>,
    next_listener: AtomicU64,
    notifications: AtomicBool,
    exposed: Mutex<HashSet<HostCallable>>,
    latency: Duration,
    delays: Mutex<VecDeque<Duration>>,
    fail_next: Mutex<Option<String>>,
    calls: Mutex<Vec<RecordedCall>>,
    widget_state_writes: Mutex<Vec<Value>>,
    follow_ups: Mutex<Vec<String>>,
}

impl SandboxHost {
    /// A host serving `catalog`, with every callable exposed.
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            globals: Mutex::new(Map::new()),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(1),
            notifications: AtomicBool::new(true),
            exposed: Mutex::new(HashSet::from([
                HostCallable::SetWidgetState,
                HostCallable::CallTool,
                HostCallable::SendFollowUpMessage,
            ])),
            latency: Duration::ZERO,
            delays: Mutex::new(VecDeque::new()),
            fail_next: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            widget_state_writes: Mutex::new(Vec::new()),
            follow_ups: Mutex::new(Vec::new()),
        }
    }

    /// A host serving the bundled catalog.
    pub fn builtin() -> Result<Self> {
        Ok(Self::new(Catalog::builtin()?))
    }

    /// A host with no stays at all.
    pub fn empty() -> Self {
        Self::new(Catalog::default())
    }

    /// Set a global before anyone is listening.
    pub fn with_global(self, key: GlobalKey, value: Value) -> Self {
        lock(&self.globals).insert(key.wire_name().to_string(), value);
        self
    }

    /// Hide a callable from the start.
    pub fn without(self, callable: HostCallable) -> Self {
        self.set_exposed(callable, false);
        self
    }

    /// Drop the notification channel entirely.
    pub fn without_notifications(self) -> Self {
        self.notifications.store(false, Ordering::SeqCst);
        self
    }

    /// Delay every tool call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Change one global and notify listeners.
    pub fn set_global(&self, key: GlobalKey, value: Value) {
        self.emit(SetGlobalsEvent::new().with(key, value));
    }

    /// Apply every change in `event`, then deliver it.
    pub fn emit(&self, event: SetGlobalsEvent) {
        {
            let mut globals = lock(&self.globals);
            for (name, value) in &event.globals {
                globals.insert(name.clone(), value.clone());
            }
        }
        self.dispatch(&event);
    }

    fn dispatch(&self, event: &SetGlobalsEvent) {
        if !self.notifications.load(Ordering::SeqCst) {
            return;
        }
        let targets: Vec<GlobalsListener> = lock(&self.listeners)
            .iter()
            .filter(|r| r.event == protocol::SET_GLOBALS_EVENT)
            .map(|r| r.listener.clone())
            .collect();
        debug!(
            changed = ?event.changed_keys().collect::<Vec<_>>(),
            listeners = targets.len(),
            "dispatching set_globals"
        );
        for listener in targets {
            listener(event);
        }
    }

    pub fn set_exposed(&self, callable: HostCallable, exposed: bool) {
        let mut set = lock(&self.exposed);
        if exposed {
            set.insert(callable);
        } else {
            set.remove(&callable);
        }
    }

    /// Queue a delay for the next tool call, replacing the fixed latency.
    ///
    /// Delays are handed out in the order calls arrive.
    pub fn delay_next_call(&self, delay: Duration) {
        lock(&self.delays).push_back(delay);
    }

    /// Make the next tool call reject with `message`.
    pub fn fail_next_call(&self, message: impl Into<String>) {
        *lock(&self.fail_next) = Some(message.into());
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub fn widget_state_writes(&self) -> Vec<Value> {
        lock(&self.widget_state_writes).clone()
    }

    pub fn follow_ups(&self) -> Vec<String> {
        lock(&self.follow_ups).clone()
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }

    fn explore_stays(&self, arguments: &Value) -> std::result::Result<Value, HostError> {
        let args: SearchArgs = serde_json::from_value(arguments.clone())
            .map_err(|e| HostError::InvalidArguments(e.to_string()))?;
        let output = self.catalog.explore(&args);
        let city = output.city.clone().unwrap_or_default();
        let count = output.results.len();
        let meta = json!({
            "openai/outputTemplate": WIDGET_URI,
            "openai/widgetAccessible": true,
        });
        let structured = serde_json::to_value(&output)?;

        self.emit(
            SetGlobalsEvent::new()
                .with(GlobalKey::ToolInput, arguments.clone())
                .with(GlobalKey::ToolOutput, structured.clone())
                .with(GlobalKey::ToolResponseMetadata, meta.clone()),
        );

        let response = ToolResponse {
            content: vec![ToolContent::Text {
                text: format!("Found {count} stays in {city}."),
            }],
            structured_content: Some(structured),
            meta: Some(meta),
            is_error: false,
        };
        Ok(serde_json::to_value(response)?)
    }
}

impl Host for SandboxHost {
    fn global(&self, key: GlobalKey) -> Option<Value> {
        lock(&self.globals).get(key.wire_name()).cloned()
    }

    fn add_listener(&self, event: &str, listener: GlobalsListener) -> Option<ListenerId> {
        if !self.notifications.load(Ordering::SeqCst) {
            return None;
        }
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::SeqCst));
        lock(&self.listeners).push(Registration {
            event: event.to_string(),
            id,
            listener,
        });
        Some(id)
    }

    fn remove_listener(&self, event: &str, id: ListenerId) {
        lock(&self.listeners).retain(|r| !(r.id == id && r.event == event));
    }

    fn exposes(&self, callable: HostCallable) -> bool {
        lock(&self.exposed).contains(&callable)
    }

    fn set_widget_state(&self, state: Value) -> std::result::Result<(), HostError> {
        if !self.exposes(HostCallable::SetWidgetState) {
            return Err(HostError::NotExposed(HostCallable::SetWidgetState));
        }
        lock(&self.widget_state_writes).push(state.clone());
        self.set_global(GlobalKey::WidgetState, state);
        Ok(())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> std::result::Result<Value, HostError> {
        if !self.exposes(HostCallable::CallTool) {
            return Err(HostError::NotExposed(HostCallable::CallTool));
        }
        lock(&self.calls).push(RecordedCall {
            name: name.to_string(),
            arguments: arguments.clone(),
        });
        info!(tool = name, %arguments, "tool call");

        let delay = lock(&self.delays).pop_front().unwrap_or(self.latency);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let failure = lock(&self.fail_next).take();
        if let Some(message) = failure {
            return Err(HostError::Rejected(message));
        }

        match name {
            EXPLORE_STAYS_TOOL => self.explore_stays(&arguments),
            other => Err(HostError::UnknownTool(other.to_string())),
        }
    }

    async fn send_follow_up_message(&self, prompt: &str) -> std::result::Result<(), HostError> {
        if !self.exposes(HostCallable::SendFollowUpMessage) {
            return Err(HostError::NotExposed(HostCallable::SendFollowUpMessage));
        }
        lock(&self.follow_ups).push(prompt.to_string());
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
