#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use quantboard_core::{Document, Listing};
use serde_json::{Map, Value};
use tokio::sync::{oneshot, watch};

use crate::{ApiError, ApiResult, ChangeCallback, CollectionApi, CollectionPath, ListenerState, SubscriptionHandle};

struct MockListener {
    path: CollectionPath,
    on_change: ChangeCallback,
    stop: oneshot::Receiver<()>,
    state: Arc<watch::Sender<ListenerState>>,
}

impl MockListener {
    fn is_active(&mut self) -> bool {
        matches!(self.stop.try_recv(), Err(oneshot::error::TryRecvError::Empty))
            && *self.state.borrow() == ListenerState::Running
    }
}

#[derive(Default)]
struct MockState {
    collections: BTreeMap<CollectionPath, BTreeMap<String, Map<String, Value>>>,
    listeners: Vec<MockListener>,
    fail_next: Option<ApiError>,
}

impl MockState {
    fn listing(&self, path: &CollectionPath) -> Listing {
        self.collections
            .get(path)
            .map(|docs| docs.iter().map(|(id, fields)| Document::new(id.clone(), fields.clone())).collect())
            .unwrap_or_default()
    }

    /// Deliver the current listing of `path` to every live listener on it.
    fn notify(&mut self, path: &CollectionPath) {
        self.listeners.retain_mut(|l| l.is_active());
        let listing = self.listing(path);
        for l in self.listeners.iter_mut().filter(|l| &l.path == path) {
            (l.on_change)(listing.clone());
        }
    }
}

/// In-memory collection store. Every write notifies subscribers
/// synchronously on the writer's thread.
#[derive(Default)]
pub struct MockApi {
    inner: Mutex<MockState>,
}

impl MockApi {
    pub fn new() -> Self { Self::default() }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // a panicking test callback must not wedge the other tests
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Insert or replace a document and notify.
    pub fn put(&self, path: &CollectionPath, id: &str, fields: Value) {
        let fields = match fields {
            Value::Object(m) => m,
            _ => Map::new(),
        };
        let mut st = self.lock();
        st.collections.entry(path.clone()).or_default().insert(id.to_string(), fields);
        st.notify(path);
    }

    /// Remove a document and notify. Returns false if it did not exist.
    pub fn remove(&self, path: &CollectionPath, id: &str) -> bool {
        let mut st = self.lock();
        let existed = st.collections.get_mut(path).map(|c| c.remove(id).is_some()).unwrap_or(false);
        if existed {
            st.notify(path);
        }
        existed
    }

    /// Make the next `subscribe` call fail with `err`.
    pub fn fail_next_subscribe(&self, err: ApiError) {
        self.lock().fail_next = Some(err);
    }

    /// Fail every active listener, as if the store went away after setup.
    /// Failed listeners receive no further changes. Returns how many failed.
    pub fn fail_listeners(&self, err: ApiError) -> usize {
        let mut st = self.lock();
        st.listeners.retain_mut(|l| l.is_active());
        let msg = err.to_string();
        for l in &st.listeners {
            l.state.send_replace(ListenerState::Failed(msg.clone()));
        }
        std::mem::take(&mut st.listeners).len()
    }

    /// Listeners that have not been unsubscribed.
    pub fn listener_count(&self) -> usize {
        let mut st = self.lock();
        st.listeners.retain_mut(|l| l.is_active());
        st.listeners.len()
    }
}

#[async_trait::async_trait]
impl CollectionApi for MockApi {
    async fn subscribe(&self, path: &CollectionPath, mut on_change: ChangeCallback) -> ApiResult<SubscriptionHandle> {
        let mut st = self.lock();
        if let Some(err) = st.fail_next.take() {
            return Err(err);
        }
        on_change(st.listing(path));
        let state = Arc::new(watch::Sender::new(ListenerState::Running));
        let (stop_tx, stop_rx) = oneshot::channel();
        st.listeners.push(MockListener { path: path.clone(), on_change, stop: stop_rx, state: Arc::clone(&state) });
        Ok(SubscriptionHandle::new(path.clone(), stop_tx, None, state))
    }
}
