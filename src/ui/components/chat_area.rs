use chrono::{DateTime, Local, Utc};
use eframe::egui;

use super::prefix;
use crate::ui::state::AppState;

pub fn render(ui: &mut egui::Ui, state: &AppState) {
    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .stick_to_bottom(true)
        .max_height((ui.available_height() - 90.0).max(120.0))
        .show(ui, |ui| {
            if state.records.is_empty() {
                ui.label(egui::RichText::new("No messages yet").weak());
            }
            for record in &state.records {
                let time = DateTime::<Utc>::from_timestamp_millis(record.timestamp)
                    .map(|at| at.with_timezone(&Local).format("%H:%M:%S").to_string())
                    .unwrap_or_default();
                let receiver = record.receiver.as_deref().unwrap_or("?");
                let (who, color) = if state.is_mine(record) {
                    (format!("me → {}", prefix(receiver, 8)), egui::Color32::LIGHT_BLUE)
                } else {
                    (prefix(&record.sender, 8).to_string(), egui::Color32::LIGHT_GREEN)
                };
                ui.horizontal_wrapped(|ui| {
                    ui.label(egui::RichText::new(format!("[{time}]")).weak());
                    ui.colored_label(color, who);
                    ui.label(record.body());
                });
            }
        });
}
