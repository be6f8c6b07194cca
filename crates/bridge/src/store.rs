//! Host globals exposed as subscribable, synchronously readable cells.

use std::marker::PhantomData;
use std::sync::Arc;

use protocol::{GlobalKey, GlobalsListener, Host, HostGlobals, SET_GLOBALS_EVENT};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// Read/subscribe access to the host's globals.
///
/// Reads always go to the host, so a read made after a change notification
/// has been delivered observes the new value. When there is no host every
/// read is `None` and subscriptions never fire.
pub struct GlobalStore<H> {
    host: Option<Arc<H>>,
}

impl<H> Clone for GlobalStore<H> {
    fn clone(&self) -> Self {
        Self {
            host: self.host.clone(),
        }
    }
}

impl<H: Host + 'static> GlobalStore<H> {
    pub fn new(host: Option<Arc<H>>) -> Self {
        Self { host }
    }

    /// Whether a host surface is present at all.
    pub fn has_host(&self) -> bool {
        self.host.is_some()
    }

    /// Current value of `key`. JSON `null` reads as absent.
    pub fn read(&self, key: GlobalKey) -> Option<Value> {
        self.host
            .as_ref()
            .and_then(|host| host.global(key))
            .filter(|value| !value.is_null())
    }

    /// Read every global at once.
    pub fn snapshot(&self) -> HostGlobals {
        HostGlobals::from_reader(|key| self.read(key))
    }

    /// A typed view of a single key.
    pub fn cell<T: DeserializeOwned>(&self, key: GlobalKey) -> GlobalCell<H, T> {
        GlobalCell {
            store: self.clone(),
            key,
            _marker: PhantomData,
        }
    }

    /// Call `on_change` for every notification that reports `key` as changed.
    pub fn subscribe<F>(&self, key: GlobalKey, on_change: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribe_many(&[key], on_change)
    }

    /// Call `on_change` once for every notification that reports any of
    /// `keys` as changed.
    pub fn subscribe_many<F>(&self, keys: &[GlobalKey], on_change: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let Some(host) = &self.host else {
            return Subscription::detached();
        };

        let keys = keys.to_vec();
        let listener: GlobalsListener = Arc::new(move |event| {
            if keys.iter().any(|key| event.touches(*key)) {
                on_change();
            }
        });

        let Some(id) = host.add_listener(SET_GLOBALS_EVENT, listener) else {
            debug!("host has no notification channel; subscription is inert");
            return Subscription::detached();
        };

        let host = Arc::clone(host);
        Subscription {
            detach: Some(Box::new(move || host.remove_listener(SET_GLOBALS_EVENT, id))),
        }
    }
}

/// Typed reader for one global.
pub struct GlobalCell<H, T> {
    store: GlobalStore<H>,
    key: GlobalKey,
    _marker: PhantomData<fn() -> T>,
}

impl<H: Host + 'static, T: DeserializeOwned> GlobalCell<H, T> {
    pub fn key(&self) -> GlobalKey {
        self.key
    }

    /// Current value, or `None` if it is absent or does not have the shape of `T`.
    pub fn get(&self) -> Option<T> {
        let value = self.store.read(self.key)?;
        match serde_json::from_value(value) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(key = %self.key, error = %e, "global has unexpected shape");
                None
            }
        }
    }

    pub fn subscribe<F>(&self, on_change: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.store.subscribe(self.key, on_change)
    }
}

/// A live listener on the host's notification channel.
///
/// The listener is detached by [`Subscription::unsubscribe`] or on drop,
/// whichever comes first.
#[must_use = "dropping a Subscription detaches the listener"]
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    fn detached() -> Self {
        Self { detach: None }
    }

    /// Whether this subscription is attached to a host listener.
    pub fn is_active(&self) -> bool {
        self.detach.is_some()
    }

    pub fn unsubscribe(mut self) {
        self.detach_now();
    }

    fn detach_now(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{NoHost, SetGlobalsEvent, Theme};
    use sandbox::SandboxHost;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Arc::clone(&count);
        (count, move || {
            handle.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn read_without_subscribe_returns_initial_value() {
        let host = Arc::new(SandboxHost::empty().with_global(GlobalKey::Theme, json!("dark")));
        let store = GlobalStore::new(Some(host));
        assert_eq!(store.read(GlobalKey::Theme), Some(json!("dark")));
        assert_eq!(store.read(GlobalKey::ToolOutput), None);
        assert_eq!(store.snapshot().theme, Some(Theme::Dark));
    }

    #[test]
    fn subscriber_fires_for_its_key_only() {
        let host = Arc::new(SandboxHost::empty());
        let store = GlobalStore::new(Some(Arc::clone(&host)));
        let (count, on_change) = counter();
        let _sub = store.subscribe(GlobalKey::ToolOutput, on_change);

        host.set_global(GlobalKey::Theme, json!("light"));
        assert_eq!(count.load(Ordering::SeqCst), 0);

        host.set_global(GlobalKey::ToolOutput, json!({"city": "Paris"}));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(store.read(GlobalKey::ToolOutput), Some(json!({"city": "Paris"})));
    }

    #[test]
    fn every_notification_is_passed_through() {
        let host = Arc::new(SandboxHost::empty());
        let store = GlobalStore::new(Some(Arc::clone(&host)));
        let (count, on_change) = counter();
        let _sub = store.subscribe(GlobalKey::Theme, on_change);

        // Same value twice still counts as two notifications.
        host.set_global(GlobalKey::Theme, json!("dark"));
        host.set_global(GlobalKey::Theme, json!("dark"));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn subscribe_many_fires_once_per_event() {
        let host = Arc::new(SandboxHost::empty());
        let store = GlobalStore::new(Some(Arc::clone(&host)));
        let (count, on_change) = counter();
        let _sub = store.subscribe_many(&[GlobalKey::ToolInput, GlobalKey::ToolOutput], on_change);

        host.emit(
            SetGlobalsEvent::new()
                .with(GlobalKey::ToolInput, json!({"city": "Lyon"}))
                .with(GlobalKey::ToolOutput, json!({"city": "Lyon"})),
        );
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_detaches_listener() {
        let host = Arc::new(SandboxHost::empty());
        let store = GlobalStore::new(Some(Arc::clone(&host)));
        let (count, on_change) = counter();
        let sub = store.subscribe(GlobalKey::Theme, on_change);
        assert_eq!(host.listener_count(), 1);

        sub.unsubscribe();
        assert_eq!(host.listener_count(), 0);
        host.set_global(GlobalKey::Theme, json!("dark"));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn drop_detaches_listener() {
        let host = Arc::new(SandboxHost::empty());
        let store = GlobalStore::new(Some(Arc::clone(&host)));
        {
            let (_count, on_change) = counter();
            let _sub = store.subscribe(GlobalKey::Theme, on_change);
            assert_eq!(host.listener_count(), 1);
        }
        assert_eq!(host.listener_count(), 0);
    }

    #[test]
    fn missing_host_reads_nothing_and_never_fires() {
        let store = GlobalStore::<NoHost>::new(None);
        assert!(!store.has_host());
        for key in GlobalKey::ALL {
            assert_eq!(store.read(key), None);
        }
        let sub = store.subscribe(GlobalKey::Theme, || unreachable!());
        assert!(!sub.is_active());
        assert_eq!(store.snapshot(), HostGlobals::default());
    }

    #[test]
    fn missing_notification_channel_is_inert() {
        let host = Arc::new(SandboxHost::empty().without_notifications());
        let store = GlobalStore::new(Some(Arc::clone(&host)));
        let (count, on_change) = counter();
        let sub = store.subscribe(GlobalKey::Theme, on_change);
        assert!(!sub.is_active());

        host.set_global(GlobalKey::Theme, json!("dark"));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(store.read(GlobalKey::Theme), Some(json!("dark")));
    }

    #[test]
    fn typed_cell_rejects_wrong_shape() {
        let host = Arc::new(SandboxHost::empty().with_global(GlobalKey::Theme, json!(42)));
        let store = GlobalStore::new(Some(Arc::clone(&host)));
        let theme = store.cell::<Theme>(GlobalKey::Theme);
        assert_eq!(theme.get(), None);

        host.set_global(GlobalKey::Theme, json!("light"));
        assert_eq!(theme.get(), Some(Theme::Light));
    }
}
