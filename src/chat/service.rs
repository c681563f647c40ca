use tokio::sync::mpsc;

use crate::chat::view_model::{ChatViewModel, SendState};
use crate::common::{AppEvent, ChatCommand};

/// Runs one mounted [`ChatViewModel`] between the relay and the UI.
pub struct ChatService {
    view_model: ChatViewModel,
    command_receiver: mpsc::Receiver<ChatCommand>,
    event_sender: mpsc::Sender<AppEvent>,
}

impl ChatService {
    pub fn new(
        view_model: ChatViewModel,
        command_receiver: mpsc::Receiver<ChatCommand>,
        event_sender: mpsc::Sender<AppEvent>,
    ) -> Self {
        Self {
            view_model,
            command_receiver,
            event_sender,
        }
    }

    /// Returns the view-model when the UI hangs up, already unmounted.
    pub async fn run(mut self) -> ChatViewModel {
        if let Err(err) = self.view_model.mount() {
            log::warn!("Chat not subscribed: {err}");
            self.emit(AppEvent::Notice(err.user_message())).await;
        }

        loop {
            tokio::select! {
                record = self.view_model.next_record() => {
                    match record {
                        Some(record) => self.emit(AppEvent::RecordAccepted(record)).await,
                        None => {
                            log::warn!("Relay closed the chat subscription");
                            self.view_model.unmount();
                            self.emit(AppEvent::Notice("Relay disconnected".to_string())).await;
                        }
                    }
                }
                command = self.command_receiver.recv() => {
                    match command {
                        Some(command) => self.handle_command(command).await,
                        None => break,
                    }
                }
            }
        }

        self.view_model.unmount();
        self.view_model
    }

    async fn handle_command(&mut self, command: ChatCommand) {
        match command {
            ChatCommand::Draft { receiver, message } => {
                let before = self.view_model.state().clone();
                self.view_model.set_receiver(receiver);
                self.view_model.set_message(message);
                if *self.view_model.state() != before {
                    self.emit_state().await;
                }
            }
            ChatCommand::Send => {
                let record = match self.view_model.prepare_send() {
                    Ok(record) => record,
                    Err(err) => {
                        self.emit_state().await;
                        self.emit(AppEvent::Notice(err.user_message())).await;
                        return;
                    }
                };
                self.emit(AppEvent::SendStateChanged(SendState::Sending))
                    .await;
                let result = self.view_model.deliver(record).await;
                self.emit_state().await;
                if let Err(err) = result {
                    self.emit(AppEvent::Notice(err.user_message())).await;
                }
            }
        }
    }

    async fn emit_state(&mut self) {
        let state = self.view_model.state().clone();
        self.emit(AppEvent::SendStateChanged(state)).await;
    }

    async fn emit(&mut self, event: AppEvent) {
        if let Err(err) = self.event_sender.send(event).await {
            log::debug!("UI gone, chat event dropped: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::chat::{BackupLocator, BackupUploader};
    use crate::common::ChatRecord;
    use crate::error::Result;
    use crate::identity::WalletIdentity;
    use crate::network::MemoryRelay;

    struct InstantPin;

    #[async_trait]
    impl BackupUploader for InstantPin {
        async fn upload(&self, _history: &[ChatRecord]) -> Result<BackupLocator> {
            Ok(BackupLocator {
                hash: "QmX".into(),
                url: "https://gw/ipfs/QmX".into(),
            })
        }
    }

    #[tokio::test]
    async fn send_command_emits_states_then_record() {
        let relay = Arc::new(MemoryRelay::new());
        let me = WalletIdentity::generate();
        let vm = ChatViewModel::new(Some(me.clone()), relay.clone(), Arc::new(InstantPin));
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let (event_tx, mut event_rx) = mpsc::channel(8);
        let task = tokio::spawn(ChatService::new(vm, cmd_rx, event_tx).run());

        cmd_tx
            .send(ChatCommand::Draft {
                receiver: "bob".into(),
                message: "gm".into(),
            })
            .await
            .unwrap();
        cmd_tx.send(ChatCommand::Send).await.unwrap();

        let mut saw_sending = false;
        let mut saw_sent = false;
        loop {
            match event_rx.recv().await.unwrap() {
                AppEvent::SendStateChanged(SendState::Sending) => saw_sending = true,
                AppEvent::SendStateChanged(SendState::Sent { .. }) => saw_sent = true,
                AppEvent::RecordAccepted(record) => {
                    assert_eq!(record.sender, me.address());
                    break;
                }
                _ => {}
            }
        }
        assert!(saw_sending && saw_sent);

        drop(cmd_tx);
        let vm = task.await.unwrap();
        assert!(!vm.is_mounted());
        assert_eq!(vm.history().len(), 1);
    }

    #[tokio::test]
    async fn disconnected_wallet_gets_a_notice() {
        let relay = Arc::new(MemoryRelay::new());
        let vm = ChatViewModel::new(None, relay, Arc::new(InstantPin));
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let (event_tx, mut event_rx) = mpsc::channel(8);
        let task = tokio::spawn(ChatService::new(vm, cmd_rx, event_tx).run());

        match event_rx.recv().await.unwrap() {
            AppEvent::Notice(text) => assert_eq!(text, "Wallet is not connected"),
            other => panic!("unexpected event {other:?}"),
        }
        drop(cmd_tx);
        task.await.unwrap();
    }
}
