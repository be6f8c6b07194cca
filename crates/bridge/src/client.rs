//! Awaitable wrapper around the host's remote-call capability.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use protocol::{Host, HostCallable};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{Error, Result};

/// Identifies one remote invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationTicket {
    pub id: Uuid,
    /// Issue order within this client, starting at 1.
    pub seq: u64,
    pub started_at: DateTime<Utc>,
}

/// A completed invocation and what the host resolved it with.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub ticket: InvocationTicket,
    pub response: Value,
}

/// Turns the host's `call_tool` and `send_follow_up_message` into awaitable
/// operations.
///
/// No retries and no timeouts: a rejection is returned to the caller as
/// [`Error::InvocationRejected`]. Invocations are neither serialized nor
/// de-duplicated.
pub struct RemoteClient<H> {
    host: Option<Arc<H>>,
    next_seq: AtomicU64,
    in_flight: AtomicUsize,
}

impl<H: Host> RemoteClient<H> {
    pub fn new(host: Option<Arc<H>>) -> Self {
        Self {
            host,
            next_seq: AtomicU64::new(1),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Whether the host exposes a callable invocation entry point right now.
    ///
    /// Re-evaluated on every call; the answer can change while mounted.
    pub fn is_available(&self) -> bool {
        self.exposes(HostCallable::CallTool)
    }

    /// Whether the host can take follow-up messages right now.
    pub fn can_follow_up(&self) -> bool {
        self.exposes(HostCallable::SendFollowUpMessage)
    }

    fn exposes(&self, callable: HostCallable) -> bool {
        self.host
            .as_ref()
            .is_some_and(|host| host.exposes(callable))
    }

    /// Number of invocations issued but not yet settled.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Whether `ticket` belongs to the most recently issued invocation.
    pub fn is_latest(&self, ticket: &InvocationTicket) -> bool {
        ticket.seq + 1 == self.next_seq.load(Ordering::SeqCst)
    }

    /// Invoke `operation` through the host and wait for its result.
    pub async fn invoke<A>(&self, operation: &str, args: &A) -> Result<Invocation>
    where
        A: Serialize + ?Sized,
    {
        let host = match &self.host {
            Some(host) if host.exposes(HostCallable::CallTool) => host,
            _ => return Err(Error::HostUnavailable),
        };
        let arguments = serde_json::to_value(args)?;

        let ticket = InvocationTicket {
            id: Uuid::new_v4(),
            seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
            started_at: Utc::now(),
        };
        info!(operation, seq = ticket.seq, %arguments, "invoking remote operation");

        let _guard = InFlightGuard::enter(&self.in_flight);
        let response = host.call_tool(operation, arguments).await?;

        let elapsed = Utc::now() - ticket.started_at;
        debug!(
            operation,
            seq = ticket.seq,
            elapsed_ms = elapsed.num_milliseconds(),
            "remote operation resolved"
        );
        Ok(Invocation { ticket, response })
    }

    /// Forward a follow-up prompt to the host.
    pub async fn send_follow_up(&self, prompt: &str) -> Result<()> {
        let host = match &self.host {
            Some(host) if host.exposes(HostCallable::SendFollowUpMessage) => host,
            _ => return Err(Error::HostUnavailable),
        };
        host.send_follow_up_message(prompt).await?;
        Ok(())
    }
}

/// Keeps the in-flight count honest even when the caller drops the future.
struct InFlightGuard<'a> {
    count: &'a AtomicUsize,
}

impl<'a> InFlightGuard<'a> {
    fn enter(count: &'a AtomicUsize) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self { count }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::SeqCst);
    }
}
