//! Host contract for the stays widget.
//!
//! This crate describes everything the embedded widget and its host agree on:
//! the fixed set of host-owned globals, the `openai:set_globals` notification,
//! the [`Host`] capability trait, and the JSON shapes exchanged with the
//! `explore_stays` operation.
//!
//! # Example
//!
//! ```
//! use protocol::{GlobalKey, SearchArgs, SetGlobalsEvent, SortOrder};
//!
//! let event: SetGlobalsEvent = serde_json::from_str(
//!     r#"{"globals":{"theme":"dark"}}"#,
//! ).unwrap();
//! assert!(event.touches(GlobalKey::Theme));
//! assert!(!event.touches(GlobalKey::ToolOutput));
//!
//! let args = SearchArgs::new("Lyon").with_sort(SortOrder::Price);
//! let json = serde_json::to_value(&args).unwrap();
//! assert_eq!(json, serde_json::json!({"city": "Lyon", "sort": "price"}));
//! ```

mod error;
mod globals;
mod host;
mod stays;
mod tool;

pub use error::{HostError, Result};
pub use globals::{DisplayMode, GlobalKey, HostGlobals, SET_GLOBALS_EVENT, SetGlobalsEvent, Theme};
pub use host::{GlobalsListener, Host, HostCallable, ListenerId, NoHost};
pub use stays::{AppliedFilters, SearchArgs, SearchOutput, SortOrder, Stay, WidgetState};
pub use tool::{EXPLORE_STAYS_TOOL, ToolContent, ToolResponse, WIDGET_URI};
