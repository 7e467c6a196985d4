#![forbid(unsafe_code)]

use eframe::egui;
use std::time::{Duration, Instant};

use crate::model::{Toast, ToastKind};
use crate::QuantBoardApp;

const MAX_TOASTS: usize = 4;

impl QuantBoardApp {
    /// Queue a toast. Repeating the newest toast's text restarts its timer
    /// instead of stacking a duplicate.
    pub(crate) fn toast(&mut self, text: impl Into<String>, kind: ToastKind) {
        let text = text.into();
        let duration_ms = match kind { ToastKind::Warn => 4000, ToastKind::Info => 2500 };
        if let Some(last) = self.toasts.last_mut() {
            if last.text == text && last.kind == kind {
                last.created = Instant::now();
                return;
            }
        }
        self.toasts.push(Toast { text, kind, created: Instant::now(), duration_ms });
        if self.toasts.len() > MAX_TOASTS {
            self.toasts.remove(0);
        }
    }
}

pub(crate) fn draw_toasts(app: &mut QuantBoardApp, ctx: &egui::Context) {
    let now = Instant::now();
    app.toasts.retain(|t| now.duration_since(t.created) < Duration::from_millis(t.duration_ms));
    if app.toasts.is_empty() { return; }
    egui::Area::new(egui::Id::new("toasts_area"))
        .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-16.0, -40.0))
        .show(ctx, |ui| {
            ui.spacing_mut().item_spacing.y = 6.0;
            for t in app.toasts.iter() {
                let (bg, fg) = match t.kind {
                    ToastKind::Info => (ui.visuals().widgets.inactive.bg_fill, ui.visuals().strong_text_color()),
                    ToastKind::Warn => (egui::Color32::from_rgb(202, 138, 4), egui::Color32::BLACK),
                };
                egui::Frame::new()
                    .fill(bg)
                    .corner_radius(6)
                    .inner_margin(egui::Margin::symmetric(10, 6))
                    .show(ui, |ui| {
                        ui.label(egui::RichText::new(&t.text).color(fg));
                    });
            }
        });
    // Wake up again to expire the oldest toast.
    let next = app
        .toasts
        .iter()
        .map(|t| Duration::from_millis(t.duration_ms).saturating_sub(now.duration_since(t.created)))
        .min()
        .unwrap_or_default();
    ctx.request_repaint_after(next);
}
