#![forbid(unsafe_code)]

use eframe::egui;

use crate::model::ConnectionState;
use crate::QuantBoardApp;

pub(crate) const TITLE: &str = "Pre-validated Quant Strategies";

pub(crate) fn ui_topbar(app: &mut QuantBoardApp, ctx: &egui::Context) {
    egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
        ui.add_space(4.0);
        ui.heading(TITLE);
        ui.horizontal(|ui| match &app.conn {
            ConnectionState::Connecting { .. } => {
                ui.add(egui::Spinner::new());
                ui.label(format!("Connecting to collection: {}", app.path));
            }
            ConnectionState::Live { .. } => {
                ui.label(
                    egui::RichText::new(format!(
                        "Listening for updates on collection: {}",
                        app.path.collection_id()
                    ))
                    .weak(),
                )
                .on_hover_text(app.path.to_string());
            }
            ConnectionState::Failed(_) => {
                ui.colored_label(ui.visuals().error_fg_color, "Disconnected");
            }
        });
        ui.add_space(2.0);
    });
}
