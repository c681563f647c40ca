use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use super::relay::{RecordBus, Relay, Subscription};
use crate::common::ChatRecord;
use crate::error::{Error, Result};

/// In-process relay. Every publish is echoed to all subscribers, history included.
#[derive(Default)]
pub struct MemoryRelay {
    bus: RecordBus,
    offline: AtomicBool,
    published: Mutex<Vec<ChatRecord>>,
}

impl MemoryRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent publishes fail as if the relay client were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Deliver a record as if another peer had published it.
    pub fn inject(&self, record: ChatRecord) {
        self.bus.deliver(record);
    }

    /// Records published through this client.
    pub fn published(&self) -> Vec<ChatRecord> {
        self.published
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Relay for MemoryRelay {
    fn publish(&self, record: ChatRecord) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Relay("relay client is offline".to_string()));
        }
        self.published
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record.clone());
        self.bus.deliver(record);
        Ok(())
    }

    fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }
}
