use eframe::egui;

use crate::chat::{SendFailure, SendState};
use crate::ui::state::AppState;

#[derive(Default)]
pub struct InputActions {
    pub draft_changed: bool,
    pub send: bool,
}

pub fn render(ui: &mut egui::Ui, state: &mut AppState) -> InputActions {
    let mut actions = InputActions::default();
    let sending = state.send_state == SendState::Sending;

    ui.horizontal(|ui| {
        ui.label("To:");
        let response = ui.add(
            egui::TextEdit::singleline(&mut state.receiver_input)
                .hint_text("receiver wallet address")
                .desired_width(f32::INFINITY),
        );
        actions.draft_changed |= response.changed();
    });

    ui.horizontal(|ui| {
        let response = ui.add_enabled(
            !sending,
            egui::TextEdit::singleline(&mut state.message_input).hint_text("message"),
        );
        actions.draft_changed |= response.changed();
        if ui.add_enabled(!sending, egui::Button::new("Send")).clicked() {
            actions.send = true;
        }
        if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
            actions.send = true;
        }
    });

    match &state.send_state {
        SendState::Sending => {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Backing up and sending...");
            });
        }
        SendState::Sent { locator } => {
            ui.horizontal(|ui| {
                ui.label("Backed up:");
                ui.hyperlink_to(locator.hash.as_str(), &locator.url);
            });
        }
        SendState::SendFailed(failure) => {
            let text = match failure {
                SendFailure::WalletNotConnected => "Wallet is not connected".to_string(),
                SendFailure::Backup(reason) => format!("Backup failed, not sent: {reason}"),
                SendFailure::Relay(reason) => format!("Relay rejected the message: {reason}"),
            };
            ui.colored_label(egui::Color32::RED, text);
        }
        SendState::Idle | SendState::Composing => {}
    }

    if state.message_input.trim().is_empty() || state.receiver_input.trim().is_empty() {
        actions.send = false;
    }
    actions
}
