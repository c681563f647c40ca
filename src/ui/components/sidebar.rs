use eframe::egui;

use crate::solana::explorer_url;
use super::prefix;
use crate::ui::state::AppState;

pub fn render(ui: &mut egui::Ui, state: &AppState) {
    ui.heading("Wallet");
    ui.separator();
    match &state.identity {
        Some(address) => {
            ui.label(egui::RichText::new(address).monospace().small());
            ui.hyperlink_to("View on Solscan", explorer_url(address));
        }
        None => {
            ui.colored_label(egui::Color32::YELLOW, "No wallet connected");
        }
    }

    ui.add_space(8.0);
    ui.heading("Peers");
    ui.separator();

    if state.peers.is_empty() {
        ui.label("No peers discovered yet");
        return;
    }

    for peer_id in &state.peers {
        ui.horizontal(|ui| {
            ui.colored_label(egui::Color32::GREEN, "●");
            ui.label(prefix(peer_id, 16));
        });
    }
}
