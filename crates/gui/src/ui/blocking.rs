#![forbid(unsafe_code)]

use eframe::egui;

use crate::ui::topbar::TITLE;

/// Full-window error; nothing else is drawn while this is up.
pub(crate) fn ui_blocking_error(ctx: &egui::Context, message: &str) {
    egui::CentralPanel::default().show(ctx, |ui| {
        ui.heading(TITLE);
        ui.add_space(12.0);
        egui::Frame::new()
            .fill(ui.visuals().extreme_bg_color)
            .stroke(egui::Stroke::new(1.0, ui.visuals().error_fg_color))
            .corner_radius(6)
            .inner_margin(egui::Margin::symmetric(12, 10))
            .show(ui, |ui| {
                ui.colored_label(ui.visuals().error_fg_color, egui::RichText::new("Error").strong());
                ui.label(message);
            });
    });
}
