//! Thread boundary between the pipeline tree and a UI thread.
//!
//! The tree notifies observers synchronously on whatever thread mutates it.
//! `ChannelObserver` turns those calls into messages on a bounded crossbeam
//! channel, and `StatusBridge` is the receiving half the UI drains once per
//! frame.

use crate::pipeline::id::NodeId;
use crate::pipeline::observer::Observer;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Channel capacity for status messages (tree → UI).
const STATUS_CHANNEL_CAPACITY: usize = 1024;

/// Messages sent from the tree's observers to the UI thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusMessage {
    /// A node's status changed; views showing it should refresh.
    StatusChanged(NodeId),
}

/// Observer that forwards every update into a channel.
pub struct ChannelObserver {
    tx: Sender<StatusMessage>,
    dropped: AtomicU64,
}

impl ChannelObserver {
    pub fn new(tx: Sender<StatusMessage>) -> Self {
        Self {
            tx,
            dropped: AtomicU64::new(0),
        }
    }

    /// Messages lost because the channel was full or closed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Observer for ChannelObserver {
    fn update(&self, node: NodeId) {
        match self.tx.try_send(StatusMessage::StatusChanged(node)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// UI-side handle receiving status messages.
pub struct StatusBridge {
    observer: Arc<ChannelObserver>,
    rx: Receiver<StatusMessage>,
}

impl StatusBridge {
    pub fn new() -> Self {
        Self::with_capacity(STATUS_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self {
            observer: Arc::new(ChannelObserver::new(tx)),
            rx,
        }
    }

    /// The observer to register on the nodes this bridge should watch.
    pub fn observer(&self) -> Arc<dyn Observer> {
        self.observer.clone()
    }

    pub fn dropped(&self) -> u64 {
        self.observer.dropped()
    }

    /// Drain all pending messages.
    pub fn drain(&self) -> Vec<StatusMessage> {
        let mut msgs = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            msgs.push(msg);
        }
        msgs
    }

    /// Try to receive a single message without blocking.
    pub fn try_recv(&self) -> Option<StatusMessage> {
        self.rx.try_recv().ok()
    }
}

impl Default for StatusBridge {
    fn default() -> Self {
        Self::new()
    }
}
