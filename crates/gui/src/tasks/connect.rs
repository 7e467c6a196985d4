#![forbid(unsafe_code)]

use std::sync::{mpsc, Arc};
use std::time::Instant;

use eframe::egui;
use quantboard_api::{open_live_view, CollectionApi, CollectionPath, ListenerState};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::model::{ConnectionState, RepaintWaker};
use crate::QuantBoardApp;

/// Register the collection listener off the UI thread. The result is picked
/// up by `process_connect` on a later frame.
pub(crate) fn start_connect(
    api: Arc<dyn CollectionApi>,
    path: CollectionPath,
    ctx: egui::Context,
) -> ConnectionState {
    let (tx, rx) = mpsc::channel();
    info!(path = %path, "ui: connecting");
    tokio::spawn(async move {
        let res = open_live_view(api.as_ref(), &path).await;
        let _ = tx.send(res);
        ctx.request_repaint();
    });
    ConnectionState::Connecting { rx, started: Instant::now() }
}

pub(crate) fn process_connect(app: &mut QuantBoardApp, ctx: &egui::Context) {
    use std::sync::mpsc::TryRecvError;
    let ConnectionState::Connecting { rx, started } = &app.conn else { return; };
    let took_ms = started.elapsed().as_millis();
    match rx.try_recv() {
        Ok(Ok(view)) => {
            info!(path = %view.subscription.path(), took_ms = %took_ms, "ui: listener registered");
            let waker = spawn_waker(
                ctx.clone(),
                view.drain.subscribe_epoch(),
                view.subscription.subscribe_state(),
            );
            app.session.attach(view.drain);
            app.conn = ConnectionState::Live { subscription: view.subscription, waker };
        }
        Ok(Err(err)) => {
            warn!(error = %err, took_ms = %took_ms, "ui: listener setup failed");
            app.conn = ConnectionState::Failed(format!("Could not start listening: {err}"));
        }
        Err(TryRecvError::Disconnected) => {
            app.conn = ConnectionState::Failed("Connection task ended unexpectedly".to_string());
        }
        Err(TryRecvError::Empty) => {}
    }
}

/// Move to the blocking error screen once the background listener fails.
pub(crate) fn check_listener(app: &mut QuantBoardApp) {
    let ConnectionState::Live { subscription, .. } = &app.conn else { return; };
    if let ListenerState::Failed(msg) = subscription.state() {
        warn!(path = %subscription.path(), error = %msg, "ui: listener failed");
        app.conn = ConnectionState::Failed(format!("Listener stopped: {msg}"));
    }
}

/// Repaint whenever a snapshot is published or the listener changes state.
fn spawn_waker(
    ctx: egui::Context,
    mut epoch_rx: watch::Receiver<u64>,
    mut state_rx: watch::Receiver<ListenerState>,
) -> RepaintWaker {
    RepaintWaker(tokio::spawn(async move {
        loop {
            let alive = tokio::select! {
                r = epoch_rx.changed() => r.is_ok(),
                r = state_rx.changed() => r.is_ok(),
            };
            ctx.request_repaint();
            if !alive {
                break;
            }
        }
    }))
}
