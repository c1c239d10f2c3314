//! Device-loss notification
//!
//! wgpu reports device loss through a callback on an arbitrary thread. The
//! callback forwards into a channel that the frame loop polls; each armed
//! episode can deliver at most one event, and notifiers from an earlier
//! device are ignored once a new episode is armed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

const DISARMED: u64 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLossEvent {
    pub episode: u64,
    pub reason: String,
    pub message: String,
}

pub struct DeviceLossSignal {
    tx: Sender<DeviceLossEvent>,
    rx: Receiver<DeviceLossEvent>,
    armed: Arc<AtomicU64>,
    next_episode: u64,
}

/// Handed to the device callback; fires at most once.
#[derive(Clone)]
pub struct DeviceLossNotifier {
    tx: Sender<DeviceLossEvent>,
    armed: Arc<AtomicU64>,
    episode: u64,
}

impl DeviceLossSignal {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx,
            armed: Arc::new(AtomicU64::new(DISARMED)),
            next_episode: 1,
        }
    }

    /// Start a new episode, invalidating every earlier notifier.
    pub fn arm(&mut self) -> DeviceLossNotifier {
        let episode = self.next_episode;
        self.next_episode += 1;
        self.armed.store(episode, Ordering::SeqCst);
        DeviceLossNotifier {
            tx: self.tx.clone(),
            armed: Arc::clone(&self.armed),
            episode,
        }
    }

    /// Intentional teardown is not a loss.
    pub fn disarm(&self) {
        self.armed.store(DISARMED, Ordering::SeqCst);
    }

    /// Non-blocking.
    pub fn poll(&self) -> Option<DeviceLossEvent> {
        self.rx.try_recv().ok()
    }
}

impl Default for DeviceLossSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceLossNotifier {
    /// Returns whether the event was delivered.
    pub fn notify(&self, reason: impl Into<String>, message: impl Into<String>) -> bool {
        let claimed = self
            .armed
            .compare_exchange(self.episode, DISARMED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if !claimed {
            return false;
        }
        self.tx
            .send(DeviceLossEvent {
                episode: self.episode,
                reason: reason.into(),
                message: message.into(),
            })
            .is_ok()
    }
}
