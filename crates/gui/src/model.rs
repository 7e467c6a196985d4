#![forbid(unsafe_code)]

use std::sync::mpsc;
use std::time::Instant;

use quantboard_api::{ApiResult, LiveView, SubscriptionHandle};
use tokio::task::JoinHandle;

/// Where the app is in its connection lifecycle.
pub(crate) enum ConnectionState {
    /// `open_live_view` is in flight; the result arrives on `rx`.
    Connecting { rx: mpsc::Receiver<ApiResult<LiveView>>, started: Instant },
    /// Listener registered. `waker` turns epoch bumps into repaints.
    Live { subscription: SubscriptionHandle, waker: RepaintWaker },
    /// Blocking error; the dashboard is not shown.
    Failed(String),
}

impl ConnectionState {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            ConnectionState::Connecting { .. } => "connecting",
            ConnectionState::Live { .. } => "live",
            ConnectionState::Failed(_) => "failed",
        }
    }
}

/// Background task requesting repaints; aborted when dropped.
pub(crate) struct RepaintWaker(pub(crate) JoinHandle<()>);

impl Drop for RepaintWaker {
    fn drop(&mut self) { self.0.abort(); }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastKind { Info, Warn }

#[derive(Clone, Debug)]
pub struct Toast {
    pub text: String,
    pub kind: ToastKind,
    pub created: Instant,
    pub duration_ms: u64,
}

/// Render knobs read from the environment.
#[derive(Clone, Debug)]
pub struct UiSettings {
    /// Upper bound between repaints while idle, in ms.
    pub idle_repaint_ms: u64,
    /// Window title.
    pub title: String,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self { idle_repaint_ms: 500, title: "Quantboard".to_string() }
    }
}

impl UiSettings {
    pub fn from_env() -> Self {
        let d = Self::default();
        let idle_repaint_ms = std::env::var("QB_IDLE_REPAINT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(|v| v.max(16))
            .unwrap_or(d.idle_repaint_ms);
        Self { idle_repaint_ms, ..d }
    }
}
