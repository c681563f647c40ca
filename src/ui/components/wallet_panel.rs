use eframe::egui;

use crate::solana::{explorer_url, format_usd};
use super::prefix;
use crate::ui::state::AppState;

/// What the user asked for this frame.
#[derive(Default)]
pub struct WalletActions {
    pub refresh: bool,
    pub airdrop_sol: Option<f64>,
    pub add_watch: Option<String>,
    pub remove_watch: Option<String>,
    pub fetch_balance: Option<String>,
    pub track_floor: Option<String>,
    pub transfer: Option<Transfer>,
    pub create_token: Option<(u8, f64)>,
    pub load_nfts: bool,
    pub invalid_input: Option<String>,
}

pub struct Transfer {
    pub to: String,
    pub amount: f64,
    /// `None` sends SOL.
    pub mint: Option<String>,
}

pub fn render(ui: &mut egui::Ui, state: &mut AppState) -> WalletActions {
    let mut actions = WalletActions::default();

    ui.horizontal(|ui| {
        ui.heading("Portfolio");
        if ui.small_button("⟳").clicked() {
            actions.refresh = true;
        }
    });
    ui.separator();
    match &state.portfolio {
        Some(portfolio) => {
            ui.label(format!(
                "{:.4} SOL ({})",
                portfolio.sol,
                format_usd(portfolio.sol_value_usd())
            ));
            ui.label(format!("SOL price: {}", format_usd(portfolio.sol_usd)));
            for token in &portfolio.tokens {
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new(prefix(&token.mint, 6)).monospace());
                    ui.label(format!("{}", token.amount));
                    ui.label(format_usd(token.usd_value));
                });
            }
            ui.label(format!("Total: {}", format_usd(portfolio.total_usd())));
        }
        None => {
            ui.label(egui::RichText::new("Loading...").weak());
        }
    }

    ui.horizontal(|ui| {
        ui.add(egui::TextEdit::singleline(&mut state.airdrop_input).desired_width(40.0));
        if ui.button("Airdrop SOL").clicked() {
            match state.airdrop_input.trim().parse::<f64>() {
                Ok(sol) => actions.airdrop_sol = Some(sol),
                Err(_) => actions.invalid_input = Some("Airdrop amount must be a number".into()),
            }
        }
    });

    ui.add_space(8.0);
    ui.heading("Transfer");
    ui.separator();
    ui.add(
        egui::TextEdit::singleline(&mut state.transfer_to)
            .hint_text("recipient address")
            .desired_width(200.0),
    );
    ui.add(
        egui::TextEdit::singleline(&mut state.transfer_mint)
            .hint_text("token mint (empty for SOL)")
            .desired_width(200.0),
    );
    ui.horizontal(|ui| {
        ui.add(
            egui::TextEdit::singleline(&mut state.transfer_amount)
                .hint_text("amount")
                .desired_width(80.0),
        );
        if ui.button("Send").clicked() {
            match state.transfer_amount.trim().parse::<f64>() {
                Ok(amount) => {
                    let mint = state.transfer_mint.trim();
                    actions.transfer = Some(Transfer {
                        to: state.transfer_to.trim().to_string(),
                        amount,
                        mint: (!mint.is_empty()).then(|| mint.to_string()),
                    });
                }
                Err(_) => actions.invalid_input = Some("Transfer amount must be a number".into()),
            }
        }
    });

    ui.add_space(8.0);
    ui.heading("Create token");
    ui.separator();
    ui.horizontal(|ui| {
        ui.label("decimals");
        ui.add(egui::TextEdit::singleline(&mut state.mint_decimals).desired_width(30.0));
        ui.label("supply");
        ui.add(egui::TextEdit::singleline(&mut state.mint_supply).desired_width(80.0));
    });
    if ui.button("Create").clicked() {
        match (
            state.mint_decimals.trim().parse::<u8>(),
            state.mint_supply.trim().parse::<f64>(),
        ) {
            (Ok(decimals), Ok(supply)) => actions.create_token = Some((decimals, supply)),
            _ => {
                actions.invalid_input = Some("Decimals and supply must be numbers".into());
            }
        }
    }

    ui.add_space(8.0);
    ui.horizontal(|ui| {
        ui.heading("NFTs");
        if ui.small_button("⟳").clicked() {
            actions.load_nfts = true;
        }
    });
    ui.separator();
    match &state.nfts {
        Some(nfts) if nfts.is_empty() => {
            ui.label(egui::RichText::new("No NFTs found").weak());
        }
        Some(nfts) => {
            for nft in nfts {
                ui.horizontal(|ui| {
                    ui.hyperlink_to(prefix(&nft.name, 24), &nft.uri);
                    ui.label(egui::RichText::new(prefix(&nft.mint, 6)).monospace());
                });
            }
        }
        None => {
            ui.label(egui::RichText::new("Not loaded").weak());
        }
    }

    ui.add_space(8.0);
    ui.heading("Watchlist");
    ui.separator();
    ui.horizontal(|ui| {
        ui.add(
            egui::TextEdit::singleline(&mut state.watch_input)
                .hint_text("wallet address")
                .desired_width(160.0),
        );
        if ui.button("Add").clicked() {
            actions.add_watch = Some(std::mem::take(&mut state.watch_input));
        }
    });
    for address in &state.watchlist {
        ui.horizontal(|ui| {
            ui.hyperlink_to(prefix(address, 8), explorer_url(address));
            match state.balances.get(address) {
                Some(sol) => ui.label(format!("{sol:.4} SOL")),
                None => ui.label(egui::RichText::new("-").weak()),
            };
            if ui.small_button("Fetch Info").clicked() {
                actions.fetch_balance = Some(address.clone());
            }
            if ui.small_button("✗").clicked() {
                actions.remove_watch = Some(address.clone());
            }
        });
    }

    ui.add_space(8.0);
    ui.heading("Floor price");
    ui.separator();
    ui.horizontal(|ui| {
        ui.add(
            egui::TextEdit::singleline(&mut state.floor_input)
                .hint_text("collection symbol")
                .desired_width(120.0),
        );
        if ui.button("Track").clicked() {
            actions.track_floor = Some(state.floor_input.trim().to_string());
        }
    });
    if let Some((symbol, sol)) = &state.floor {
        ui.label(format!("{symbol}: {sol:.3} SOL"));
    }

    actions
}
