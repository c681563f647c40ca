use eframe::egui;
use tokio::sync::mpsc;

use crate::common::{AppEvent, ChatCommand, WalletCommand};

use super::components::{chat_area, debug_panel, input_bar, sidebar, wallet_panel};
use super::state::AppState;

pub struct ChatApp {
    state: AppState,
    chat_commands: mpsc::Sender<ChatCommand>,
    wallet_commands: mpsc::Sender<WalletCommand>,
    event_receiver: mpsc::Receiver<AppEvent>,
}

impl ChatApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        identity: Option<String>,
        chat_commands: mpsc::Sender<ChatCommand>,
        wallet_commands: mpsc::Sender<WalletCommand>,
        event_receiver: mpsc::Receiver<AppEvent>,
    ) -> Self {
        Self {
            state: AppState::new(identity),
            chat_commands,
            wallet_commands,
            event_receiver,
        }
    }

    fn handle_events(&mut self) {
        while let Ok(event) = self.event_receiver.try_recv() {
            self.state.apply(event);
        }
    }

    fn send_chat(&mut self, command: ChatCommand) {
        if let Err(err) = self.chat_commands.try_send(command) {
            log::warn!("Failed to send command to chat service: {err}");
        }
    }

    fn send_wallet(&mut self, command: WalletCommand) {
        if let Err(err) = self.wallet_commands.try_send(command) {
            log::warn!("Failed to send command to wallet service: {err}");
        }
    }

    fn apply_input(&mut self, actions: input_bar::InputActions) {
        if actions.draft_changed || actions.send {
            self.send_chat(ChatCommand::Draft {
                receiver: self.state.receiver_input.trim().to_string(),
                message: self.state.message_input.clone(),
            });
        }
        if actions.send {
            self.send_chat(ChatCommand::Send);
        }
    }

    fn apply_wallet(&mut self, actions: wallet_panel::WalletActions) {
        if actions.refresh {
            self.send_wallet(WalletCommand::RefreshPortfolio);
        }
        if let Some(sol) = actions.airdrop_sol {
            self.send_wallet(WalletCommand::RequestAirdrop { sol });
        }
        if let Some(address) = actions.add_watch {
            self.send_wallet(WalletCommand::AddWatch { address });
        }
        if let Some(address) = actions.remove_watch {
            self.send_wallet(WalletCommand::RemoveWatch { address });
        }
        if let Some(address) = actions.fetch_balance {
            self.send_wallet(WalletCommand::FetchBalance { address });
        }
        if let Some(symbol) = actions.track_floor {
            self.send_wallet(WalletCommand::TrackFloor { symbol });
        }
        if let Some(transfer) = actions.transfer {
            let command = match transfer.mint {
                None => WalletCommand::SendSol {
                    to: transfer.to,
                    sol: transfer.amount,
                },
                Some(mint) => WalletCommand::SendToken {
                    mint,
                    to: transfer.to,
                    amount: transfer.amount,
                },
            };
            self.send_wallet(command);
        }
        if let Some((decimals, supply)) = actions.create_token {
            self.send_wallet(WalletCommand::CreateToken { decimals, supply });
        }
        if actions.load_nfts {
            self.send_wallet(WalletCommand::LoadNfts);
        }
        if let Some(text) = actions.invalid_input {
            self.state.push_notice(text);
        }
    }
}

impl eframe::App for ChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_events();

        egui::SidePanel::left("peer_sidebar").show(ctx, |ui| {
            sidebar::render(ui, &self.state);
            ui.add_space(8.0);
            debug_panel::render(ui, &self.state);
        });

        let wallet_actions = egui::SidePanel::right("wallet_panel")
            .show(ctx, |ui| wallet_panel::render(ui, &mut self.state))
            .inner;
        self.apply_wallet(wallet_actions);

        let input_actions = egui::CentralPanel::default()
            .show(ctx, |ui| {
                ui.heading("Solana Chat");
                ui.separator();
                chat_area::render(ui, &self.state);
                ui.separator();
                input_bar::render(ui, &mut self.state)
            })
            .inner;
        self.apply_input(input_actions);

        ctx.request_repaint_after(std::time::Duration::from_millis(100));
    }
}
