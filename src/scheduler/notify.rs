//! Fan-out of run events to in-process listeners.
//!
//! Each subscriber owns a bounded channel. A subscriber whose buffer is full
//! when an event is published is dropped; its receiver drains what was
//! already queued and then reports disconnection.

use chrono::NaiveDate;
use crossbeam_channel::{bounded, Receiver, RecvError, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const DEFAULT_BUFFER_SIZE: usize = 64;

/// Lifecycle of one scheduled run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    Started {
        date: NaiveDate,
    },
    /// An attempt failed and another one follows after `retry_in_secs`.
    AttemptFailed {
        date: NaiveDate,
        attempt: u32,
        error: String,
        retry_in_secs: u64,
    },
    Succeeded {
        date: NaiveDate,
        attempt: u32,
        zero_stock: usize,
        significant_changes: usize,
        deactivations: usize,
    },
    /// Terminal for the run; no further attempts are made.
    Failed {
        date: NaiveDate,
        attempts: u32,
        error: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub u64);

/// Receiving end of a subscription.
pub struct RunSubscription {
    pub id: SubscriberId,
    receiver: Receiver<RunEvent>,
}

impl RunSubscription {
    pub fn recv(&self) -> Result<RunEvent, RecvError> {
        self.receiver.recv()
    }

    pub fn try_recv(&self) -> Result<RunEvent, TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<RunEvent, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Everything queued right now, without blocking.
    pub fn drain(&self) -> Vec<RunEvent> {
        self.receiver.try_iter().collect()
    }
}

pub struct NotificationHub {
    subscribers: RwLock<HashMap<SubscriberId, Sender<RunEvent>>>,
    next_id: AtomicU64,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn subscribe(&self) -> RunSubscription {
        self.subscribe_with_buffer(DEFAULT_BUFFER_SIZE)
    }

    /// Subscribe with room for `buffer_size` unread events.
    pub fn subscribe_with_buffer(&self, buffer_size: usize) -> RunSubscription {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(buffer_size);
        self.subscribers.write().insert(id, sender);
        RunSubscription { id, receiver }
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.write().remove(&id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Send `event` to every subscriber, dropping those that cannot take it.
    pub fn publish(&self, event: &RunEvent) {
        let mut to_remove = Vec::new();

        {
            let subscribers = self.subscribers.read();
            for (id, sender) in subscribers.iter() {
                match sender.try_send(event.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                        to_remove.push(*id);
                    }
                }
            }
        }

        if !to_remove.is_empty() {
            let mut subscribers = self.subscribers.write();
            for id in to_remove {
                tracing::warn!(subscriber = id.0, "dropping slow run subscriber");
                subscribers.remove(&id);
            }
        }
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}
