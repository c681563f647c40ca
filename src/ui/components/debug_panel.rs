use chrono::Local;
use eframe::egui;

use super::prefix;
use crate::ui::state::AppState;

pub fn render(ui: &mut egui::Ui, state: &AppState) {
    ui.heading("Activity");
    ui.separator();

    let disconnected: Vec<_> = state
        .peer_last_seen
        .iter()
        .filter(|(peer_id, _)| !state.peers.contains(*peer_id))
        .collect();
    if !disconnected.is_empty() {
        ui.label("Disconnected peers:");
        let now = chrono::Utc::now();
        for (peer_id, last_seen) in disconnected {
            let elapsed = now.signed_duration_since(*last_seen);
            ui.horizontal(|ui| {
                ui.colored_label(egui::Color32::RED, "✗");
                ui.label(prefix(peer_id, 8));
                ui.label(
                    egui::RichText::new(format!("offline {}s", elapsed.num_seconds())).weak(),
                );
            });
        }
        ui.separator();
    }

    egui::ScrollArea::vertical()
        .id_salt("notices")
        .max_height(200.0)
        .show(ui, |ui| {
            for notice in state.notices.iter().rev() {
                ui.horizontal_wrapped(|ui| {
                    let time = notice.at.with_timezone(&Local).format("%H:%M:%S");
                    ui.label(egui::RichText::new(format!("[{time}]")).weak());
                    ui.label(&notice.text);
                });
            }
        });
}
