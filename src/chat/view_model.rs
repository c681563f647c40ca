//! Chat screen state: visible history, compose box and the send pipeline.

use std::sync::Arc;

use crate::chat::backup::{BackupLocator, BackupUploader};
use crate::chat::filter::{RecordFilter, SignaturePolicy, Verdict};
use crate::clock::{Clock, SystemClock};
use crate::common::ChatRecord;
use crate::error::{Error, Result};
use crate::identity::WalletIdentity;
use crate::network::{Relay, Subscription};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendState {
    Idle,
    Composing,
    Sending,
    Sent { locator: BackupLocator },
    SendFailed(SendFailure),
}

/// Why the last send did not go out. Backup and relay failures stay distinct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendFailure {
    WalletNotConnected,
    Backup(String),
    Relay(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub receiver: String,
    pub message: String,
}

struct Mount {
    filter: RecordFilter,
    subscription: Subscription,
}

pub struct ChatViewModel {
    identity: Option<WalletIdentity>,
    relay: Arc<dyn Relay>,
    uploader: Arc<dyn BackupUploader>,
    clock: Arc<dyn Clock>,
    policy: SignaturePolicy,
    history: Vec<ChatRecord>,
    draft: Draft,
    state: SendState,
    mount: Option<Mount>,
}

impl ChatViewModel {
    pub fn new(
        identity: Option<WalletIdentity>,
        relay: Arc<dyn Relay>,
        uploader: Arc<dyn BackupUploader>,
    ) -> Self {
        Self {
            identity,
            relay,
            uploader,
            clock: Arc::new(SystemClock),
            policy: SignaturePolicy::Required,
            history: Vec::new(),
            draft: Draft::default(),
            state: SendState::Idle,
            mount: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_policy(mut self, policy: SignaturePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn identity(&self) -> Option<&WalletIdentity> {
        self.identity.as_ref()
    }

    pub fn history(&self) -> &[ChatRecord] {
        &self.history
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn state(&self) -> &SendState {
        &self.state
    }

    pub fn is_mounted(&self) -> bool {
        self.mount.is_some()
    }

    /// Subscribe to the relay. The seen-set created here lives until [`unmount`](Self::unmount);
    /// mounting again while mounted keeps the existing one.
    pub fn mount(&mut self) -> Result<()> {
        if self.mount.is_some() {
            return Ok(());
        }
        let identity = self.identity.as_ref().ok_or(Error::WalletNotConnected)?;
        let filter = RecordFilter::seeded(identity.address(), self.policy, &self.history);
        self.mount = Some(Mount {
            filter,
            subscription: self.relay.subscribe(),
        });
        log::info!("Chat mounted for {}", identity.address());
        Ok(())
    }

    pub fn unmount(&mut self) {
        if self.mount.take().is_some() {
            log::info!("Chat unmounted");
        }
    }

    /// Run one record through the filter and append it if accepted.
    /// `None` when not mounted.
    pub fn receive(&mut self, record: ChatRecord) -> Option<Verdict> {
        let mount = self.mount.as_mut()?;
        let verdict = mount.filter.offer(&record);
        if verdict == Verdict::Accepted {
            self.history.push(record);
        } else {
            log::debug!("Relay record {} not displayed: {verdict:?}", record.id);
        }
        Some(verdict)
    }

    /// Wait for the next accepted record. Pends forever while unmounted;
    /// `None` once the relay closes the subscription.
    pub async fn next_record(&mut self) -> Option<ChatRecord> {
        loop {
            let Some(mount) = self.mount.as_mut() else {
                futures::future::pending::<()>().await;
                return None;
            };
            let record = mount.subscription.recv().await?;
            if self.receive(record) == Some(Verdict::Accepted) {
                return self.history.last().cloned();
            }
        }
    }

    /// Take every record that is already waiting; returns the accepted ones.
    pub fn drain(&mut self) -> Vec<ChatRecord> {
        let mut accepted = Vec::new();
        loop {
            let Some(mount) = self.mount.as_mut() else {
                break;
            };
            let Some(record) = mount.subscription.try_recv() else {
                break;
            };
            if self.receive(record) == Some(Verdict::Accepted) {
                accepted.extend(self.history.last().cloned());
            }
        }
        accepted
    }

    pub fn set_receiver(&mut self, receiver: impl Into<String>) {
        self.draft.receiver = receiver.into();
        self.refresh_compose_state();
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.draft.message = message.into();
        self.refresh_compose_state();
    }

    fn refresh_compose_state(&mut self) {
        if self.state == SendState::Sending {
            return;
        }
        self.state = if self.draft.message.is_empty() {
            SendState::Idle
        } else {
            SendState::Composing
        };
    }

    /// Validate the draft and build the signed record to send.
    pub fn prepare_send(&mut self) -> Result<ChatRecord> {
        let Some(identity) = self.identity.as_ref() else {
            self.state = SendState::SendFailed(SendFailure::WalletNotConnected);
            return Err(Error::WalletNotConnected);
        };
        let receiver = self.draft.receiver.trim();
        if self.draft.message.trim().is_empty() {
            return Err(Error::InvalidInput("message is empty".to_string()));
        }
        if receiver.is_empty() {
            return Err(Error::InvalidInput("recipient is empty".to_string()));
        }

        let mut record = ChatRecord::compose(
            identity.address(),
            receiver,
            &self.draft.message,
            self.clock.now_millis(),
        );
        let key = record.key();
        if self.history.iter().any(|existing| existing.key() == key) {
            log::warn!("Duplicate message detected, ignoring.");
            return Err(Error::InvalidInput(
                "a message with this timestamp was already sent".to_string(),
            ));
        }
        identity.sign(&mut record);
        Ok(record)
    }

    /// Back up `history + record`, then publish. Publishing only happens after
    /// the backup succeeded.
    pub async fn deliver(&mut self, record: ChatRecord) -> Result<BackupLocator> {
        self.state = SendState::Sending;

        let mut snapshot = self.history.clone();
        snapshot.push(record.clone());

        let locator = match self.uploader.upload(&snapshot).await {
            Ok(locator) => locator,
            Err(err) => {
                log::error!("Failed to upload chat: {err}");
                self.state = SendState::SendFailed(SendFailure::Backup(err.to_string()));
                return Err(err);
            }
        };

        if let Err(err) = self.relay.publish(record) {
            log::error!("Failed to publish record: {err}");
            self.state = SendState::SendFailed(SendFailure::Relay(err.to_string()));
            return Err(err);
        }

        self.draft.message.clear();
        self.state = SendState::Sent {
            locator: locator.clone(),
        };
        Ok(locator)
    }

    pub async fn send(&mut self) -> Result<BackupLocator> {
        let record = self.prepare_send()?;
        self.deliver(record).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::clock::ManualClock;
    use crate::network::MemoryRelay;

    #[derive(Default)]
    struct FakeUploader {
        fail: bool,
        uploads: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl BackupUploader for FakeUploader {
        async fn upload(&self, history: &[ChatRecord]) -> Result<BackupLocator> {
            self.uploads.lock().unwrap().push(history.len());
            if self.fail {
                return Err(Error::backup("gateway timeout"));
            }
            Ok(BackupLocator {
                hash: format!("Qm{}", history.len()),
                url: format!("https://gw/ipfs/Qm{}", history.len()),
            })
        }
    }

    fn view_model(
        identity: Option<WalletIdentity>,
        relay: &Arc<MemoryRelay>,
        uploader: &Arc<FakeUploader>,
        clock: &Arc<ManualClock>,
    ) -> ChatViewModel {
        ChatViewModel::new(identity, relay.clone(), uploader.clone()).with_clock(clock.clone())
    }

    #[tokio::test]
    async fn send_round_trips_through_relay() {
        let relay = Arc::new(MemoryRelay::new());
        let uploader = Arc::new(FakeUploader::default());
        let clock = Arc::new(ManualClock::new(1000));
        let me = WalletIdentity::generate();
        let mut vm = view_model(Some(me.clone()), &relay, &uploader, &clock);
        vm.mount().unwrap();

        vm.set_receiver("bob");
        vm.set_message("hi");
        assert_eq!(vm.state(), &SendState::Composing);

        let locator = vm.send().await.unwrap();
        assert_eq!(locator.hash, "Qm1");
        assert!(matches!(vm.state(), SendState::Sent { .. }));
        assert_eq!(vm.draft().message, "");
        assert_eq!(vm.draft().receiver, "bob");

        // No local echo: the record only shows up once the relay delivers it.
        assert!(vm.history().is_empty());
        let echoed = vm.next_record().await.unwrap();
        assert_eq!(echoed.sender, me.address());
        assert_eq!(vm.history().len(), 1);
    }

    #[tokio::test]
    async fn failed_backup_blocks_publish() {
        let relay = Arc::new(MemoryRelay::new());
        let uploader = Arc::new(FakeUploader {
            fail: true,
            ..FakeUploader::default()
        });
        let clock = Arc::new(ManualClock::new(1000));
        let mut vm = view_model(Some(WalletIdentity::generate()), &relay, &uploader, &clock);
        vm.mount().unwrap();
        vm.set_receiver("bob");
        vm.set_message("hi");

        assert!(matches!(vm.send().await, Err(Error::Backup { .. })));
        assert!(relay.published().is_empty());
        assert!(matches!(
            vm.state(),
            SendState::SendFailed(SendFailure::Backup(_))
        ));
        assert_eq!(vm.draft().message, "hi");
    }

    #[tokio::test]
    async fn relay_failure_is_reported_separately() {
        let relay = Arc::new(MemoryRelay::new());
        relay.set_offline(true);
        let uploader = Arc::new(FakeUploader::default());
        let clock = Arc::new(ManualClock::new(1000));
        let mut vm = view_model(Some(WalletIdentity::generate()), &relay, &uploader, &clock);
        vm.set_receiver("bob");
        vm.set_message("hi");

        assert!(matches!(vm.send().await, Err(Error::Relay(_))));
        assert_eq!(uploader.uploads.lock().unwrap().len(), 1);
        assert!(matches!(
            vm.state(),
            SendState::SendFailed(SendFailure::Relay(_))
        ));
    }

    #[tokio::test]
    async fn disconnected_wallet_cannot_send_or_mount() {
        let relay = Arc::new(MemoryRelay::new());
        let uploader = Arc::new(FakeUploader::default());
        let clock = Arc::new(ManualClock::new(1000));
        let mut vm = view_model(None, &relay, &uploader, &clock);
        assert!(matches!(vm.mount(), Err(Error::WalletNotConnected)));

        vm.set_receiver("bob");
        vm.set_message("hi");
        assert!(matches!(vm.send().await, Err(Error::WalletNotConnected)));
        assert_eq!(
            vm.state(),
            &SendState::SendFailed(SendFailure::WalletNotConnected)
        );
        assert!(uploader.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_draft_is_rejected_without_state_change() {
        let relay = Arc::new(MemoryRelay::new());
        let uploader = Arc::new(FakeUploader::default());
        let clock = Arc::new(ManualClock::new(1000));
        let mut vm = view_model(Some(WalletIdentity::generate()), &relay, &uploader, &clock);

        vm.set_message("   ");
        vm.set_receiver("bob");
        assert!(matches!(vm.send().await, Err(Error::InvalidInput(_))));

        vm.set_message("hi");
        vm.set_receiver(" ");
        assert!(matches!(vm.send().await, Err(Error::InvalidInput(_))));
        assert_eq!(vm.state(), &SendState::Composing);
        assert!(relay.published().is_empty());
    }

    #[tokio::test]
    async fn backup_covers_full_history() {
        let relay = Arc::new(MemoryRelay::new());
        let uploader = Arc::new(FakeUploader::default());
        let clock = Arc::new(ManualClock::new(1000));
        let mut vm = view_model(Some(WalletIdentity::generate()), &relay, &uploader, &clock);
        vm.mount().unwrap();
        vm.set_receiver("bob");

        for body in ["one", "two", "three"] {
            vm.set_message(body);
            vm.send().await.unwrap();
            vm.drain();
            clock.advance(1);
        }
        assert_eq!(*uploader.uploads.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn same_millisecond_resend_is_refused() {
        let relay = Arc::new(MemoryRelay::new());
        let uploader = Arc::new(FakeUploader::default());
        let clock = Arc::new(ManualClock::new(1000));
        let mut vm = view_model(Some(WalletIdentity::generate()), &relay, &uploader, &clock);
        vm.mount().unwrap();
        vm.set_receiver("bob");
        vm.set_message("first");
        vm.send().await.unwrap();
        assert_eq!(vm.drain().len(), 1);

        vm.set_message("second");
        assert!(matches!(vm.send().await, Err(Error::InvalidInput(_))));
        assert_eq!(relay.published().len(), 1);
    }

    #[tokio::test]
    async fn remount_keeps_seen_set() {
        let relay = Arc::new(MemoryRelay::new());
        let uploader = Arc::new(FakeUploader::default());
        let clock = Arc::new(ManualClock::new(1000));
        let me = WalletIdentity::generate();
        let mut vm = view_model(Some(me.clone()), &relay, &uploader, &clock);
        vm.mount().unwrap();

        let peer = WalletIdentity::generate();
        let mut record = ChatRecord::compose(peer.address(), me.address(), "hey", 5);
        peer.sign(&mut record);
        relay.inject(record.clone());
        assert_eq!(vm.drain().len(), 1);

        // Mounting again while mounted is a no-op.
        vm.mount().unwrap();
        relay.inject(record.clone());
        assert!(vm.drain().is_empty());

        // A fresh mount replays the relay backlog; history seeds the new filter.
        vm.unmount();
        vm.mount().unwrap();
        assert!(vm.drain().is_empty());
        assert_eq!(vm.history().len(), 1);
    }
}
