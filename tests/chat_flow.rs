use std::sync::Arc;

use async_trait::async_trait;

use solchat::Result;
use solchat::chat::{BackupLocator, BackupUploader, ChatViewModel, SendState};
use solchat::clock::ManualClock;
use solchat::common::ChatRecord;
use solchat::identity::WalletIdentity;
use solchat::network::{MemoryRelay, Relay};

struct AlwaysPins;

#[async_trait]
impl BackupUploader for AlwaysPins {
    async fn upload(&self, history: &[ChatRecord]) -> Result<BackupLocator> {
        Ok(BackupLocator {
            hash: format!("Qm{}", history.len()),
            url: format!("https://gw/ipfs/Qm{}", history.len()),
        })
    }
}

fn participant(relay: &Arc<MemoryRelay>, identity: &WalletIdentity, now: i64) -> ChatViewModel {
    let relay: Arc<dyn Relay> = relay.clone();
    let mut vm = ChatViewModel::new(Some(identity.clone()), relay, Arc::new(AlwaysPins))
        .with_clock(Arc::new(ManualClock::new(now)));
    vm.mount().unwrap();
    vm
}

#[tokio::test]
async fn only_sender_and_receiver_see_a_message() {
    let relay = Arc::new(MemoryRelay::new());
    let (a, b, c) = (
        WalletIdentity::generate(),
        WalletIdentity::generate(),
        WalletIdentity::generate(),
    );
    let mut alice = participant(&relay, &a, 1_000);
    let mut bob = participant(&relay, &b, 2_000);
    let mut carol = participant(&relay, &c, 3_000);

    alice.set_receiver(b.address());
    alice.set_message("hi bob");
    alice.send().await.unwrap();

    assert_eq!(alice.drain().len(), 1);
    let seen_by_bob = bob.drain();
    assert_eq!(seen_by_bob.len(), 1);
    assert_eq!(seen_by_bob[0].body(), "hi bob");
    assert_eq!(seen_by_bob[0].sender, a.address());
    assert!(carol.drain().is_empty());
    assert!(carol.history().is_empty());
}

#[tokio::test]
async fn late_joiner_gets_backlog_once() {
    let relay = Arc::new(MemoryRelay::new());
    let (a, b) = (WalletIdentity::generate(), WalletIdentity::generate());
    let mut alice = participant(&relay, &a, 10);
    alice.set_receiver(b.address());
    alice.set_message("first");
    alice.send().await.unwrap();

    // Replayed on the relay as well.
    let replay = relay.published()[0].clone();
    relay.inject(replay);

    let mut bob = participant(&relay, &b, 20);
    assert_eq!(bob.drain().len(), 1);
    assert_eq!(bob.history().len(), 1);
}

#[tokio::test]
async fn same_millisecond_twice_from_one_sender_is_refused() {
    let relay = Arc::new(MemoryRelay::new());
    let a = WalletIdentity::generate();
    let mut alice = participant(&relay, &a, 77);

    alice.set_receiver("bob");
    alice.set_message("one");
    alice.send().await.unwrap();
    alice.drain();

    alice.set_message("two");
    assert!(alice.send().await.is_err());
    assert_eq!(relay.published().len(), 1);
    assert_eq!(alice.state(), &SendState::Composing);
}

#[tokio::test]
async fn offline_relay_reports_relay_failure_after_backup() {
    let relay = Arc::new(MemoryRelay::new());
    let a = WalletIdentity::generate();
    let mut alice = participant(&relay, &a, 5);
    relay.set_offline(true);

    alice.set_receiver("bob");
    alice.set_message("hello?");
    assert!(alice.send().await.is_err());
    assert!(matches!(
        alice.state(),
        SendState::SendFailed(solchat::chat::SendFailure::Relay(_))
    ));
    assert_eq!(alice.draft().message, "hello?");
}
