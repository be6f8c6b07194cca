//! Response envelope a host returns from `call_tool`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of the stay search operation.
pub const EXPLORE_STAYS_TOOL: &str = "explore_stays";

/// Template URI the host renders the widget from.
pub const WIDGET_URI: &str = "ui://widget/stays.html";

/// Result of a tool call as delivered to the widget.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    #[serde(default)]
    pub content: Vec<ToolContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
    #[serde(default, rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResponse {
    /// Joined text of every text block.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(ToolContent::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A block of the tool's narration.
///
/// The widget only reads text. Blocks of any other type deserialize to
/// [`ToolContent::Other`] rather than failing the whole response.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    Text { text: String },
    #[serde(other)]
    Other,
}

impl ToolContent {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ToolContent::Text { text } => Some(text),
            ToolContent::Other => None,
        }
    }
}
