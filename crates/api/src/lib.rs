//! Quantboard API façade.
//!
//! Frontends depend on the `CollectionApi` trait only: subscribe to a
//! collection, receive full listings on every change. `FirestoreApi` talks to
//! the managed store, `MockApi` keeps documents in memory for tests.

#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub use quantboard_core::Listing;
pub use quantboard_firestore::{ClientConfig, CollectionPath, Credentials, PathError};
use quantboard_firestore::{FirestoreClient, FirestoreError};
use quantboard_store::{bridge_listener, conduit, SnapshotDrain};

mod mock;
pub use mock::MockApi;

/// API errors surfaced to the frontend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum ApiError {
    #[error("credentials: {0}")]
    Credentials(String),
    #[error("not_found: {0}")]
    NotFound(String),
    #[error("unreachable: {0}")]
    Unreachable(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("internal: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<FirestoreError> for ApiError {
    fn from(e: FirestoreError) -> Self {
        match e {
            FirestoreError::Unauthorized { .. } => ApiError::Credentials(e.to_string()),
            FirestoreError::NotFound(p) => ApiError::NotFound(p),
            FirestoreError::Unreachable(m) => ApiError::Unreachable(m),
            FirestoreError::Config(m) => ApiError::Validation(m),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<PathError> for ApiError {
    fn from(e: PathError) -> Self { ApiError::Validation(e.to_string()) }
}

/// Change callback: receives the full current listing on every change.
pub type ChangeCallback = Box<dyn FnMut(Listing) + Send + 'static>;

/// Lifecycle of a background listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListenerState {
    Running,
    Stopped,
    /// The listener hit an error after setup and will not resume.
    Failed(String),
}

/// Keeps a subscription alive. Dropping it stops the listener.
pub struct SubscriptionHandle {
    path: CollectionPath,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
    state: Arc<watch::Sender<ListenerState>>,
}

impl SubscriptionHandle {
    pub(crate) fn new(
        path: CollectionPath,
        stop: oneshot::Sender<()>,
        task: Option<JoinHandle<()>>,
        state: Arc<watch::Sender<ListenerState>>,
    ) -> Self {
        Self { path, stop: Some(stop), task, state }
    }

    pub fn path(&self) -> &CollectionPath { &self.path }

    pub fn state(&self) -> ListenerState { self.state.borrow().clone() }

    pub fn subscribe_state(&self) -> watch::Receiver<ListenerState> { self.state.subscribe() }

    /// Stop the listener. No further callbacks are delivered afterwards.
    pub fn unsubscribe(mut self) { self.shutdown(); }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            info!(path = %self.path, "subscription: stopping");
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
        // A failure that already happened stays visible.
        mark_stopped(&self.state);
    }
}

/// Running -> Stopped; any other state is kept.
pub(crate) fn mark_stopped(state: &watch::Sender<ListenerState>) {
    state.send_if_modified(|s| {
        if *s == ListenerState::Running {
            *s = ListenerState::Stopped;
            true
        } else {
            false
        }
    });
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) { self.shutdown(); }
}

/// Read/subscribe contract over a remote collection.
#[async_trait::async_trait]
pub trait CollectionApi: Send + Sync {
    /// Register `on_change` for `path`. Setup errors (credentials, unknown
    /// project, unreachable host) are returned here and no listener is left
    /// running. The current listing is delivered once before this returns.
    async fn subscribe(&self, path: &CollectionPath, on_change: ChangeCallback) -> ApiResult<SubscriptionHandle>;
}

/// Live dataset view: a subscription feeding a snapshot conduit.
pub struct LiveView {
    pub drain: SnapshotDrain,
    pub subscription: SubscriptionHandle,
}

/// Subscribe to `path` and wire every notification into a fresh conduit.
pub async fn open_live_view(api: &dyn CollectionApi, path: &CollectionPath) -> ApiResult<LiveView> {
    let t0 = Instant::now();
    let (publisher, drain) = conduit();
    let subscription = api.subscribe(path, Box::new(bridge_listener(publisher))).await?;
    info!(path = %path, took_ms = %t0.elapsed().as_millis(), "api: live view open");
    Ok(LiveView { drain, subscription })
}

// ----------------- Firestore implementation -----------------

/// Subscribes through the Firestore REST client.
pub struct FirestoreApi {
    client: FirestoreClient,
    poll_interval: Duration,
}

impl FirestoreApi {
    pub fn new(cfg: ClientConfig, poll_interval: Duration) -> ApiResult<Self> {
        let client = FirestoreClient::new(cfg)?;
        Ok(Self { client, poll_interval })
    }
}

#[async_trait::async_trait]
impl CollectionApi for FirestoreApi {
    async fn subscribe(&self, path: &CollectionPath, mut on_change: ChangeCallback) -> ApiResult<SubscriptionHandle> {
        let t0 = Instant::now();
        info!(path = %path, project = %self.client.config().project_id, "api: subscribe start");
        let mut watcher = self.client.watcher(path.clone(), self.poll_interval);
        let first = match watcher.poll().await {
            Ok(listing) => listing.unwrap_or_default(),
            Err(e) => {
                warn!(path = %path, error = %e, took_ms = %t0.elapsed().as_millis(), "api: subscribe failed");
                return Err(e.into());
            }
        };
        info!(path = %path, docs = first.len(), took_ms = %t0.elapsed().as_millis(), "api: initial listing");
        on_change(first);

        let state = Arc::new(watch::Sender::new(ListenerState::Running));
        let task_state = Arc::clone(&state);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let task_path = path.clone();
        let task = tokio::spawn(async move {
            let res = tokio::select! {
                _ = &mut stop_rx => Ok(()),
                r = watcher.run(&mut *on_change) => r,
            };
            match res {
                Ok(()) => {
                    info!(path = %task_path, "api: listener stopped");
                    mark_stopped(&task_state);
                }
                Err(e) => {
                    warn!(path = %task_path, error = %e, "api: listener failed");
                    task_state.send_replace(ListenerState::Failed(e.to_string()));
                }
            }
        });
        Ok(SubscriptionHandle::new(path.clone(), stop_tx, Some(task), state))
    }
}
