//! The relay contract: fire-and-forget publish and a replaying subscription.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use crate::common::ChatRecord;
use crate::error::Result;

const LIVE_CAPACITY: usize = 1024;

pub trait Relay: Send + Sync {
    /// Hand a record to the relay client. `Ok` only means it was accepted
    /// locally; nothing is known about delivery to other peers.
    fn publish(&self, record: ChatRecord) -> Result<()>;

    /// Every record seen on the topic so far, then live ones. At-least-once.
    fn subscribe(&self) -> Subscription;
}

/// One subscriber's view of the topic: replayed backlog first, then live records.
pub struct Subscription {
    backlog: VecDeque<ChatRecord>,
    live: broadcast::Receiver<ChatRecord>,
}

impl Subscription {
    /// Next record, or `None` once the relay is gone. Cancel safe.
    pub async fn recv(&mut self) -> Option<ChatRecord> {
        if let Some(record) = self.backlog.pop_front() {
            return Some(record);
        }
        loop {
            match self.live.recv().await {
                Ok(record) => return Some(record),
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Subscriber fell behind; {skipped} relay records skipped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next record if one is ready.
    pub fn try_recv(&mut self) -> Option<ChatRecord> {
        if let Some(record) = self.backlog.pop_front() {
            return Some(record);
        }
        loop {
            match self.live.try_recv() {
                Ok(record) => return Some(record),
                Err(TryRecvError::Lagged(skipped)) => {
                    log::warn!("Subscriber fell behind; {skipped} relay records skipped");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}

/// Local fan-out shared by relay implementations.
#[derive(Clone)]
pub struct RecordBus {
    inner: Arc<BusInner>,
}

struct BusInner {
    history: Mutex<Vec<ChatRecord>>,
    live: broadcast::Sender<ChatRecord>,
}

impl RecordBus {
    pub fn new() -> Self {
        Self::with_history(Vec::new())
    }

    pub fn with_history(history: Vec<ChatRecord>) -> Self {
        let (live, _) = broadcast::channel(LIVE_CAPACITY);
        Self {
            inner: Arc::new(BusInner {
                history: Mutex::new(history),
                live,
            }),
        }
    }

    fn history(&self) -> MutexGuard<'_, Vec<ChatRecord>> {
        self.inner
            .history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record and fan out to every current subscriber.
    pub fn deliver(&self, record: ChatRecord) {
        let mut history = self.history();
        history.push(record.clone());
        // No receivers is fine; late subscribers read the history.
        let _ = self.inner.live.send(record);
    }

    pub fn subscribe(&self) -> Subscription {
        // Subscribe while holding the lock so no record lands in neither half.
        let history = self.history();
        let live = self.inner.live.subscribe();
        Subscription {
            backlog: history.iter().cloned().collect(),
            live,
        }
    }

    pub fn len(&self) -> usize {
        self.history().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RecordBus {
    fn default() -> Self {
        Self::new()
    }
}
