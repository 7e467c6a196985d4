//! Quantboard desktop dashboard (eframe/egui).
//!
//! Every egui frame is one foreground cycle: drain at most one pending
//! snapshot, filter, render. Repaints are requested when a snapshot is
//! published, when a filter changes, and on an idle cadence.

#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Duration;

use eframe::egui;
use quantboard_api::{CollectionApi, CollectionPath};
use tracing::info;

mod model;
pub mod session;
mod tasks;
mod ui;

use model::{ConnectionState, Toast, ToastKind};
pub use model::UiSettings;
pub use session::{RenderSignal, Session};

pub const NEW_DATA_TOAST: &str = "New data arrived";

/// Launch the dashboard for one collection. Blocks until the window closes.
pub fn run_native(
    api: Arc<dyn CollectionApi>,
    path: CollectionPath,
    settings: UiSettings,
) -> eframe::Result<()> {
    let options = native_options(&settings);
    eframe::run_native(
        "Quantboard",
        options,
        Box::new(move |cc| Ok(Box::new(QuantBoardApp::new(cc.egui_ctx.clone(), api, path, settings)))),
    )
}

/// Launch straight into the blocking error screen, for setup failures that
/// happen before a listener can be registered.
pub fn run_native_error(message: String, settings: UiSettings) -> eframe::Result<()> {
    let options = native_options(&settings);
    eframe::run_native(
        "Quantboard",
        options,
        Box::new(move |_cc| Ok(Box::new(ErrorApp { message }))),
    )
}

fn native_options(settings: &UiSettings) -> eframe::NativeOptions {
    eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(settings.title.clone())
            .with_inner_size([960.0, 720.0]),
        ..Default::default()
    }
}

pub struct QuantBoardApp {
    path: CollectionPath,
    settings: UiSettings,
    session: Session,
    conn: ConnectionState,
    toasts: Vec<Toast>,
}

impl QuantBoardApp {
    pub fn new(
        ctx: egui::Context,
        api: Arc<dyn CollectionApi>,
        path: CollectionPath,
        settings: UiSettings,
    ) -> Self {
        let conn = tasks::connect::start_connect(api, path.clone(), ctx);
        Self { path, settings, session: Session::new(), conn, toasts: Vec::new() }
    }

    /// Take the next pending snapshot, if any, and announce replacements.
    fn begin_cycle(&mut self) {
        let had_data = self.session.last_update().is_some();
        if !self.session.begin_cycle() {
            return;
        }
        if had_data {
            self.toast(NEW_DATA_TOAST, ToastKind::Info);
        }
        let malformed = self.session.outcome().excluded_malformed;
        if malformed > 0 {
            self.toast(format!("{malformed} strategies hidden: missing or non-numeric metrics"), ToastKind::Warn);
        }
    }
}

impl eframe::App for QuantBoardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        tasks::connect::process_connect(self, ctx);
        tasks::connect::check_listener(self);

        if let ConnectionState::Failed(msg) = &self.conn {
            ui::blocking::ui_blocking_error(ctx, msg);
            return;
        }

        self.begin_cycle();
        // Bound wake-up latency if a repaint request is ever lost.
        ctx.request_repaint_after(Duration::from_millis(self.settings.idle_repaint_ms));

        ui::topbar::ui_topbar(self, ctx);
        ui::statusbar::ui_statusbar(self, ctx);
        egui::CentralPanel::default().show(ctx, |ui| {
            ui::filters::ui_filters(self, ui);
            ui.separator();
            self.ui_list(ui);
        });
        ui::toasts::draw_toasts(self, ctx);
    }
}

impl Drop for QuantBoardApp {
    fn drop(&mut self) {
        info!(path = %self.path, state = self.conn.label(), "ui: exiting");
    }
}

struct ErrorApp {
    message: String,
}

impl eframe::App for ErrorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ui::blocking::ui_blocking_error(ctx, &self.message);
    }
}
