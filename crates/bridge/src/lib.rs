//! Reactive bridge between the stays widget and its host.
//!
//! The host owns every piece of authoritative state and mediates all remote
//! actions. This crate turns that surface into something a widget can be
//! built on:
//!
//! - [`GlobalStore`]: host globals as synchronously readable, subscribable
//!   cells.
//! - [`RemoteClient`]: the host's `call_tool` as an awaitable operation with
//!   availability detection.
//! - [`reconcile`]: the effective view, merged field by field from backend
//!   output, persisted state and defaults.
//! - [`resolve_selection`]: maps the persisted selection id onto the current
//!   results.
//! - [`Controller`]: the apply-search and select-item actions.
//!
//! # Example
//!
//! ```ignore
//! use bridge::{Controller, Draft};
//! use protocol::SortOrder;
//! use sandbox::SandboxHost;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let host = Arc::new(SandboxHost::builtin()?);
//! let controller = Controller::mount(Some(host));
//!
//! let draft = Draft { city: "Lyon".into(), min_rating: "4.5".into(), sort: SortOrder::Price };
//! controller.apply_search(&draft).await?;
//!
//! for stay in controller.view().effective.results {
//!     println!("{} ({})", stay.name, stay.rating);
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod controller;
mod draft;
mod error;
mod persisted;
mod reconcile;
mod selection;
mod store;

pub use client::{Invocation, InvocationTicket, RemoteClient};
pub use controller::{Controller, ControllerConfig, Dispatch, WidgetView};
pub use draft::{Draft, parse_min_rating};
pub use error::{Error, Result};
pub use persisted::{Initializer, MAX_WIDGET_STATE_BYTES, PersistedStore};
pub use reconcile::{EffectiveView, backend_output, reconcile};
pub use selection::{Selection, resolve_selection};
pub use store::{GlobalCell, GlobalStore, Subscription};
