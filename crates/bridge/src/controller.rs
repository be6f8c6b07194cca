//! Wires user actions into persisted-state writes and remote invocations.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use protocol::{EXPLORE_STAYS_TOOL, GlobalKey, Host, SearchArgs, WidgetState};
use tracing::{info, warn};

use crate::client::{Invocation, RemoteClient};
use crate::draft::Draft;
use crate::persisted::{MAX_WIDGET_STATE_BYTES, PersistedStore};
use crate::reconcile::{EffectiveView, reconcile};
use crate::store::{GlobalStore, Subscription};
use crate::Result;

/// Keys whose changes can alter the widget view.
const VIEW_KEYS: [GlobalKey; 6] = GlobalKey::ALL;

/// Outcome of an action that may need the host.
#[derive(Debug, Clone)]
pub enum Dispatch<T> {
    /// The host accepted the request.
    Sent(T),
    /// The host could not take the request; local effects still happened.
    Skipped,
}

impl<T> Dispatch<T> {
    pub fn is_sent(&self) -> bool {
        matches!(self, Dispatch::Sent(_))
    }

    pub fn sent(self) -> Option<T> {
        match self {
            Dispatch::Sent(value) => Some(value),
            Dispatch::Skipped => None,
        }
    }
}

/// Controller settings.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Operation invoked for searches and selections.
    pub operation: String,
    pub max_state_bytes: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            operation: EXPLORE_STAYS_TOOL.to_string(),
            max_state_bytes: MAX_WIDGET_STATE_BYTES,
        }
    }
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetView {
    pub effective: EffectiveView,
    pub draft: Draft,
    /// A host surface is present.
    pub host_available: bool,
    /// The search action can reach the backend right now.
    pub can_search: bool,
    pub can_follow_up: bool,
    /// Invocations issued and not yet settled.
    pub pending: usize,
}

/// The mounted widget.
///
/// Actions are fire-and-forget from the UI's point of view: results only show
/// up once the host updates `toolOutput`; the result list is never changed
/// optimistically.
pub struct Controller<H> {
    store: GlobalStore<H>,
    persisted: PersistedStore<H>,
    client: RemoteClient<H>,
    draft: Mutex<Option<Draft>>,
    operation: String,
}

impl<H: Host + 'static> Controller<H> {
    /// Mount against `host`, or against nothing when running outside a host.
    pub fn mount(host: Option<Arc<H>>) -> Self {
        Self::with_config(host, ControllerConfig::default())
    }

    pub fn with_config(host: Option<Arc<H>>, config: ControllerConfig) -> Self {
        if host.is_none() {
            warn!("mounted without a host; actions will be local only");
        }
        Self {
            store: GlobalStore::new(host.clone()),
            persisted: PersistedStore::new(host.clone()).with_max_bytes(config.max_state_bytes),
            client: RemoteClient::new(host),
            draft: Mutex::new(None),
            operation: config.operation,
        }
    }

    pub fn store(&self) -> &GlobalStore<H> {
        &self.store
    }

    pub fn client(&self) -> &RemoteClient<H> {
        &self.client
    }

    /// Current persisted state.
    pub fn persisted(&self) -> WidgetState {
        self.persisted.get()
    }

    /// The effective view, recomputed from scratch on every call.
    pub fn effective(&self) -> EffectiveView {
        reconcile(&self.store.snapshot(), &self.persisted.get())
    }

    pub fn view(&self) -> WidgetView {
        WidgetView {
            effective: self.effective(),
            draft: self.draft(),
            host_available: self.store.has_host(),
            can_search: self.client.is_available(),
            can_follow_up: self.client.can_follow_up(),
            pending: self.client.in_flight(),
        }
    }

    /// Current draft, seeded from persisted state on first use.
    pub fn draft(&self) -> Draft {
        let mut draft = lock(&self.draft);
        draft
            .get_or_insert_with(|| Draft::from_committed(&self.persisted.get()))
            .clone()
    }

    /// Edit the draft. Has no effect outside the widget.
    pub fn edit_draft(&self, edit: impl FnOnce(&mut Draft)) {
        let mut draft = lock(&self.draft);
        edit(draft.get_or_insert_with(|| Draft::from_committed(&self.persisted.get())));
    }

    /// Notify `on_change` whenever a global feeding the view changes.
    pub fn watch<F>(&self, on_change: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.store.subscribe_many(&VIEW_KEYS, on_change)
    }

    /// Apply the current draft.
    pub async fn apply_draft(&self) -> Result<Dispatch<Invocation>> {
        let draft = self.draft();
        self.apply_search(&draft).await
    }

    /// Commit a search.
    ///
    /// Persists the normalized filters with the selection cleared, reseeds the
    /// draft from what was committed, then invokes the search. Without a
    /// reachable host the state is still persisted and the invocation is
    /// skipped.
    pub async fn apply_search(&self, draft: &Draft) -> Result<Dispatch<Invocation>> {
        let args = draft.normalize();
        let committed = self.persisted.update(|state| {
            state.city = args.city.clone();
            state.min_rating = args.min_rating;
            if let Some(sort) = args.sort {
                state.sort = sort;
            }
            state.selected_id = None;
        })?;
        *lock(&self.draft) = Some(Draft::from_committed(&committed));
        info!(city = %committed.city, min_rating = ?committed.min_rating, sort = %committed.sort, "search committed");

        self.dispatch(&args).await
    }

    /// Select a stay and ask the backend for selection-specific detail.
    ///
    /// The request reuses the current effective filters.
    pub async fn select_item(&self, id: impl Into<String>) -> Result<Dispatch<Invocation>> {
        let id = id.into();
        self.persisted
            .update(|state| state.selected_id = Some(id.clone()))?;
        info!(%id, "selection committed");

        let effective = self.effective();
        let args = SearchArgs {
            city: effective.city,
            min_rating: effective.min_rating,
            sort: Some(effective.sort),
            selected_id: Some(id),
        };
        self.dispatch(&args).await
    }

    /// Post a follow-up prompt to the conversation.
    ///
    /// Blank prompts and hosts without the callable are skipped.
    pub async fn send_follow_up(&self, prompt: &str) -> Result<Dispatch<()>> {
        let prompt = prompt.trim();
        if prompt.is_empty() || !self.client.can_follow_up() {
            return Ok(Dispatch::Skipped);
        }
        self.client.send_follow_up(prompt).await?;
        Ok(Dispatch::Sent(()))
    }

    async fn dispatch(&self, args: &SearchArgs) -> Result<Dispatch<Invocation>> {
        if !self.client.is_available() {
            warn!(operation = %self.operation, "host cannot invoke operations; skipped");
            return Ok(Dispatch::Skipped);
        }
        let invocation = self.client.invoke(&self.operation, args).await?;
        Ok(Dispatch::Sent(invocation))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use protocol::{HostCallable, NoHost, SortOrder};
    use sandbox::SandboxHost;
    use serde_json::json;

    fn lyon_draft() -> Draft {
        Draft {
            city: " Lyon ".into(),
            min_rating: "4.2".into(),
            sort: SortOrder::Price,
        }
    }

    #[tokio::test]
    async fn apply_search_persists_then_invokes() {
        let host = Arc::new(SandboxHost::builtin().unwrap());
        let controller = Controller::mount(Some(Arc::clone(&host)));

        let outcome = controller.apply_search(&lyon_draft()).await.unwrap();
        assert!(outcome.is_sent());

        assert_eq!(
            serde_json::to_value(controller.persisted()).unwrap(),
            json!({"city": "Lyon", "min_rating": 4.2, "sort": "price", "selected_id": null})
        );
        let calls = host.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "explore_stays");
        assert_eq!(
            calls[0].arguments,
            json!({"city": "Lyon", "min_rating": 4.2, "sort": "price"})
        );
    }

    #[tokio::test]
    async fn apply_search_clears_selection_and_resets_draft() {
        let host = Arc::new(SandboxHost::builtin().unwrap());
        let controller = Controller::mount(Some(Arc::clone(&host)));
        controller.select_item("ly-1").await.unwrap();
        assert_eq!(controller.persisted().selected_id.as_deref(), Some("ly-1"));

        controller.edit_draft(|d| {
            d.city = "  Paris".into();
            d.min_rating = "abc".into();
        });
        controller.apply_draft().await.unwrap();

        assert_eq!(controller.persisted().selected_id, None);
        assert_eq!(controller.persisted().min_rating, None);
        let draft = controller.draft();
        assert_eq!(draft.city, "Paris");
        assert_eq!(draft.min_rating, "");
    }

    #[tokio::test]
    async fn no_host_still_persists() {
        let controller = Controller::<NoHost>::mount(None);
        assert!(!controller.client().is_available());

        let outcome = controller.apply_search(&lyon_draft()).await.unwrap();
        assert!(!outcome.is_sent());
        assert_eq!(controller.persisted().city, "Lyon");
        assert_eq!(controller.persisted().min_rating, Some(4.2));

        let view = controller.view();
        assert!(!view.host_available);
        assert!(!view.can_search);
        assert_eq!(view.effective.city, "Lyon");
    }

    #[tokio::test]
    async fn unavailable_call_tool_skips_invocation() {
        let host = Arc::new(SandboxHost::builtin().unwrap().without(HostCallable::CallTool));
        let controller = Controller::mount(Some(Arc::clone(&host)));

        let outcome = controller.apply_search(&lyon_draft()).await.unwrap();
        assert!(!outcome.is_sent());
        assert!(host.calls().is_empty());
        assert_eq!(host.widget_state_writes().len(), 1);
    }

    #[tokio::test]
    async fn select_item_keeps_filters_and_sends_id() {
        let host = Arc::new(SandboxHost::builtin().unwrap());
        let controller = Controller::mount(Some(Arc::clone(&host)));
        controller.apply_search(&lyon_draft()).await.unwrap();

        controller.select_item("ly-2").await.unwrap();

        let state = controller.persisted();
        assert_eq!(state.city, "Lyon");
        assert_eq!(state.min_rating, Some(4.2));
        assert_eq!(state.sort, SortOrder::Price);
        assert_eq!(state.selected_id.as_deref(), Some("ly-2"));

        let calls = host.calls();
        assert_eq!(
            calls[1].arguments,
            json!({"city": "Lyon", "min_rating": 4.2, "sort": "price", "selected_id": "ly-2"})
        );
    }

    #[tokio::test]
    async fn rejection_surfaces_after_state_is_persisted() {
        let host = Arc::new(SandboxHost::builtin().unwrap());
        host.fail_next_call("quota exceeded");
        let controller = Controller::mount(Some(Arc::clone(&host)));

        let err = controller.apply_search(&lyon_draft()).await.unwrap_err();
        assert!(matches!(err, Error::InvocationRejected(_)));
        assert_eq!(controller.persisted().city, "Lyon");
        assert_eq!(controller.view().pending, 0);
    }

    #[tokio::test]
    async fn follow_up_skips_blank_and_unsupported() {
        let host = Arc::new(SandboxHost::builtin().unwrap());
        let controller = Controller::mount(Some(Arc::clone(&host)));

        assert!(!controller.send_follow_up("   ").await.unwrap().is_sent());
        assert!(controller.send_follow_up(" Book the loft ").await.unwrap().is_sent());
        assert_eq!(host.follow_ups(), vec!["Book the loft".to_string()]);

        host.set_exposed(HostCallable::SendFollowUpMessage, false);
        assert!(!controller.send_follow_up("again").await.unwrap().is_sent());
        assert_eq!(host.follow_ups().len(), 1);
    }

    #[test]
    fn draft_edits_have_no_side_effects() {
        let host = Arc::new(SandboxHost::builtin().unwrap());
        let controller = Controller::mount(Some(Arc::clone(&host)));
        controller.edit_draft(|d| d.city = "Lisbon".into());

        assert_eq!(controller.draft().city, "Lisbon");
        assert_eq!(controller.persisted().city, "");
        assert!(host.widget_state_writes().is_empty());
        assert!(host.calls().is_empty());
    }
}
