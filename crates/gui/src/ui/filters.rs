#![forbid(unsafe_code)]

use eframe::egui;
use quantboard_core::filter::{Category, MetricKey};

use crate::QuantBoardApp;

fn metric_label(key: MetricKey) -> &'static str {
    match key {
        MetricKey::Sharpe => "Min Sharpe Ratio",
        MetricKey::ProfitFactor => "Min Profit Factor",
        MetricKey::Sortino => "Min Sortino Ratio",
        MetricKey::TotalReturn => "Min Total Return (%)",
    }
}

/// Category selector plus the four threshold inputs.
pub(crate) fn ui_filters(app: &mut QuantBoardApp, ui: &mut egui::Ui) {
    let mut rerender = false;
    ui.horizontal_wrapped(|ui| {
        let options = app.session.category_options();
        let mut selected = app.session.filter().category.label().to_string();
        egui::ComboBox::from_label("Strategy Type")
            .selected_text(selected.clone())
            .show_ui(ui, |ui| {
                for opt in &options {
                    ui.selectable_value(&mut selected, opt.clone(), opt.as_str());
                }
            });
        rerender |= app.session.set_category(Category::from(selected.as_str())).needs_render();
        ui.separator();
        for key in MetricKey::ALL {
            let mut v = app.session.threshold(key);
            ui.label(metric_label(key));
            let resp = ui.add(egui::DragValue::new(&mut v).speed(0.1).min_decimals(1));
            if resp.changed() {
                rerender |= app.session.set_threshold(key, v).needs_render();
            }
        }
    });
    if rerender {
        ui.ctx().request_repaint();
    }
}
