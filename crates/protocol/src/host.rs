//! The host capability trait.

use crate::globals::{GlobalKey, SetGlobalsEvent};
use crate::HostError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Callback attached to the host's notification channel.
pub type GlobalsListener = Arc<dyn Fn(&SetGlobalsEvent) + Send + Sync>;

/// Handle returned by [`Host::add_listener`], used to detach the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Optional callables a host may expose.
///
/// Any of them can be missing, and availability can change while the widget
/// is mounted, so callers check [`Host::exposes`] right before each use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HostCallable {
    SetWidgetState,
    CallTool,
    SendFollowUpMessage,
}

impl std::fmt::Display for HostCallable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HostCallable::SetWidgetState => "setWidgetState",
            HostCallable::CallTool => "callTool",
            HostCallable::SendFollowUpMessage => "sendFollowUpMessage",
        };
        f.write_str(name)
    }
}

/// The runtime that embeds the widget.
///
/// The host owns every global and mediates all remote actions. The widget
/// never reaches the backend except through [`Host::call_tool`].
pub trait Host: Send + Sync {
    /// Current value of a global, or `None` if the host has not set it.
    ///
    /// Must be synchronous and free of side effects.
    fn global(&self, key: GlobalKey) -> Option<Value>;

    /// Attach a listener for the named event.
    ///
    /// Returns `None` when the host has no notification channel.
    fn add_listener(&self, event: &str, listener: GlobalsListener) -> Option<ListenerId>;

    /// Detach a listener previously attached with [`Host::add_listener`].
    fn remove_listener(&self, event: &str, id: ListenerId);

    /// Whether the host currently exposes `callable`.
    fn exposes(&self, callable: HostCallable) -> bool;

    /// Replace the persisted widget state with `state`.
    fn set_widget_state(&self, state: Value) -> Result<(), HostError>;

    /// Ask the host to run a backend operation on the widget's behalf.
    fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> impl Future<Output = Result<Value, HostError>> + Send;

    /// Post a follow-up prompt into the conversation.
    fn send_follow_up_message(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<(), HostError>> + Send;
}

/// A host that cannot exist.
///
/// Used as the type parameter when the widget is mounted outside any host,
/// e.g. `Controller::<NoHost>::mount(None)`.
#[derive(Debug, Clone, Copy)]
pub enum NoHost {}

impl Host for NoHost {
    fn global(&self, _key: GlobalKey) -> Option<Value> {
        match *self {}
    }

    fn add_listener(&self, _event: &str, _listener: GlobalsListener) -> Option<ListenerId> {
        match *self {}
    }

    fn remove_listener(&self, _event: &str, _id: ListenerId) {
        match *self {}
    }

    fn exposes(&self, _callable: HostCallable) -> bool {
        match *self {}
    }

    fn set_widget_state(&self, _state: Value) -> Result<(), HostError> {
        match *self {}
    }

    async fn call_tool(&self, _name: &str, _arguments: Value) -> Result<Value, HostError> {
        match *self {}
    }

    async fn send_follow_up_message(&self, _prompt: &str) -> Result<(), HostError> {
        match *self {}
    }
}
