//! Host-owned globals and the change notification that carries them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the event the host dispatches whenever one or more globals change.
pub const SET_GLOBALS_EVENT: &str = "openai:set_globals";

/// The fixed set of values a host exposes to the widget.
///
/// Only [`GlobalKey::WidgetState`] may be written by the widget, and only
/// through the host's setter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GlobalKey {
    /// Arguments the backend operation was last invoked with.
    ToolInput,
    /// Structured result of the last backend operation.
    ToolOutput,
    /// Metadata attached to the last backend response.
    ToolResponseMetadata,
    /// Persisted widget state, visible to the host and the model.
    WidgetState,
    Theme,
    DisplayMode,
}

impl GlobalKey {
    pub const ALL: [GlobalKey; 6] = [
        GlobalKey::ToolInput,
        GlobalKey::ToolOutput,
        GlobalKey::ToolResponseMetadata,
        GlobalKey::WidgetState,
        GlobalKey::Theme,
        GlobalKey::DisplayMode,
    ];

    /// Property name on the host surface and in notification payloads.
    pub fn wire_name(self) -> &'static str {
        match self {
            GlobalKey::ToolInput => "toolInput",
            GlobalKey::ToolOutput => "toolOutput",
            GlobalKey::ToolResponseMetadata => "toolResponseMetadata",
            GlobalKey::WidgetState => "widgetState",
            GlobalKey::Theme => "theme",
            GlobalKey::DisplayMode => "displayMode",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.wire_name() == name)
    }
}

impl std::fmt::Display for GlobalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    Inline,
    Pip,
    Fullscreen,
}

/// Payload of a [`SET_GLOBALS_EVENT`] notification.
///
/// `globals` maps each changed key to its new value. Keys the host does not
/// mention did not change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetGlobalsEvent {
    #[serde(default)]
    pub globals: Map<String, Value>,
}

impl SetGlobalsEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: GlobalKey, value: Value) -> Self {
        self.globals.insert(key.wire_name().to_string(), value);
        self
    }

    /// Whether this notification reports a change to `key`.
    pub fn touches(&self, key: GlobalKey) -> bool {
        self.globals.contains_key(key.wire_name())
    }

    /// Keys this notification reports as changed. Unknown names are skipped.
    pub fn changed_keys(&self) -> impl Iterator<Item = GlobalKey> + '_ {
        self.globals
            .keys()
            .filter_map(|name| GlobalKey::from_wire_name(name))
    }
}

/// A point-in-time copy of every host global.
///
/// Each field is `None` until the host populates it. Theme and display mode
/// values the widget does not recognise also read as `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostGlobals {
    pub tool_input: Option<Value>,
    pub tool_output: Option<Value>,
    pub tool_response_metadata: Option<Value>,
    pub widget_state: Option<Value>,
    pub theme: Option<Theme>,
    pub display_mode: Option<DisplayMode>,
}

impl HostGlobals {
    /// Build a snapshot by reading each key through `read`.
    ///
    /// JSON `null` is treated the same as an absent value.
    pub fn from_reader(mut read: impl FnMut(GlobalKey) -> Option<Value>) -> Self {
        let mut get = |key: GlobalKey| read(key).filter(|value| !value.is_null());
        Self {
            tool_input: get(GlobalKey::ToolInput),
            tool_output: get(GlobalKey::ToolOutput),
            tool_response_metadata: get(GlobalKey::ToolResponseMetadata),
            widget_state: get(GlobalKey::WidgetState),
            theme: get(GlobalKey::Theme).and_then(|v| serde_json::from_value(v).ok()),
            display_mode: get(GlobalKey::DisplayMode).and_then(|v| serde_json::from_value(v).ok()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_names_round_trip() {
        for key in GlobalKey::ALL {
            assert_eq!(GlobalKey::from_wire_name(key.wire_name()), Some(key));
            let serialized = serde_json::to_value(key).unwrap();
            assert_eq!(serialized, json!(key.wire_name()));
        }
        assert_eq!(GlobalKey::from_wire_name("locale"), None);
    }

    #[test]
    fn event_reports_only_changed_keys() {
        let json = r#"{"globals":{"toolOutput":{"city":"Paris"},"locale":"fr-FR"}}"#;
        let event: SetGlobalsEvent = serde_json::from_str(json).unwrap();
        assert!(event.touches(GlobalKey::ToolOutput));
        assert!(!event.touches(GlobalKey::WidgetState));
        assert_eq!(event.changed_keys().collect::<Vec<_>>(), vec![GlobalKey::ToolOutput]);
    }

    #[test]
    fn event_without_globals_is_empty() {
        let event: SetGlobalsEvent = serde_json::from_str("{}").unwrap();
        assert_eq!(event.changed_keys().count(), 0);
    }

    #[test]
    fn snapshot_ignores_unknown_theme_and_nulls() {
        let globals = HostGlobals::from_reader(|key| match key {
            GlobalKey::Theme => Some(json!("sepia")),
            GlobalKey::DisplayMode => Some(json!("pip")),
            GlobalKey::ToolOutput => Some(Value::Null),
            GlobalKey::ToolInput => Some(json!({"city": "Paris"})),
            _ => None,
        });
        assert_eq!(globals.theme, None);
        assert_eq!(globals.display_mode, Some(DisplayMode::Pip));
        assert_eq!(globals.tool_output, None);
        assert_eq!(globals.tool_input, Some(json!({"city": "Paris"})));
    }
}
