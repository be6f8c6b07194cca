//! In-process host for running and testing the stays widget.
//!
//! [`SandboxHost`] plays the part of the embedding runtime: it owns the host
//! globals, delivers `openai:set_globals` notifications, and answers
//! `explore_stays` calls from a local [`Catalog`]. Every callable can be
//! switched off to simulate partial hosts, and every call the widget makes is
//! recorded for inspection.

mod catalog;
mod error;
mod host;

pub use catalog::Catalog;
pub use error::{Error, Result};
pub use host::{RecordedCall, SandboxHost};
