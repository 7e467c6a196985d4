#![forbid(unsafe_code)]

use eframe::egui;
use quantboard_core::display::{entry_title, format_value, metric_lines};
use quantboard_core::StrategyRecord;

use crate::model::ConnectionState;
use crate::QuantBoardApp;

pub(crate) const EMPTY_TEXT: &str = "No strategies found for the selected filters or type.";
pub(crate) const NO_METRICS_TEXT: &str = "No performance metrics available.";

impl QuantBoardApp {
    /// One collapsible entry per visible record, in display order.
    pub(crate) fn ui_list(&mut self, ui: &mut egui::Ui) {
        let connecting = matches!(self.conn, ConnectionState::Connecting { .. });
        let rows = self.session.visible_records();
        if rows.is_empty() {
            if connecting {
                ui.add(egui::Spinner::new());
            } else {
                ui.label(egui::RichText::new(EMPTY_TEXT).italics().weak());
            }
            return;
        }
        egui::ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
            for rec in rows {
                egui::CollapsingHeader::new(entry_title(rec))
                    .id_salt(("strategy", rec.id.as_str()))
                    .default_open(false)
                    .show(ui, |ui| entry_body(ui, rec));
            }
        });
    }
}

fn entry_body(ui: &mut egui::Ui, rec: &StrategyRecord) {
    ui.label(format!("Description: {}", format_value(rec.description())));
    ui.add_space(4.0);
    ui.strong("Performance Metrics:");
    match metric_lines(rec) {
        Some(lines) => {
            for line in lines {
                ui.label(format!("  {line}"));
            }
        }
        None => {
            ui.label(egui::RichText::new(NO_METRICS_TEXT).weak());
        }
    }
    ui.add_space(4.0);
    ui.label(format!("Risk Level: {}", format_value(rec.risk_level())));
    ui.label(format!("Recommended Capital: {}", format_value(rec.recommended_capital())));
    ui.label(format!("Last Updated: {}", format_value(rec.last_updated())));
    ui.label(egui::RichText::new(format!("Document ID: {}", rec.id)).small().weak());
}
