#![forbid(unsafe_code)]

use eframe::egui;

use crate::QuantBoardApp;

pub(crate) fn ui_statusbar(app: &mut QuantBoardApp, ctx: &egui::Context) {
    egui::TopBottomPanel::bottom("bottom_bar")
        .default_height(24.0)
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                let total = app.session.dataset().len();
                let epoch = app.session.dataset().epoch;
                let last_update = app.session.last_update();
                let (visible, malformed) = {
                    let out = app.session.outcome();
                    (out.len(), out.excluded_malformed)
                };
                ui.label(format!("records: {}", total));
                ui.separator();
                ui.label(format!("visible: {}", visible));
                if malformed > 0 {
                    ui.separator();
                    ui.colored_label(ui.visuals().warn_fg_color, format!("malformed: {}", malformed))
                        .on_hover_text("Excluded because a performance metric is missing or not numeric");
                }
                ui.separator();
                ui.label(format!("epoch: {}", epoch));
                if let Some(t) = last_update {
                    ui.separator();
                    ui.label(format!("updated: {}", t.format("%H:%M:%S")));
                }
                ui.separator();
                ui.label(egui::RichText::new(app.conn.label()).weak());
            });
        });
}
