// src/capture/latest.rs
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use super::frame::Frame;

/// Single-slot mailbox between the feed and the analyzer.
/// A new frame replaces any frame nobody has taken yet.
pub struct LatestFrame {
    slot: Mutex<Option<Frame>>,
    ready: Condvar,
}

impl LatestFrame {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    /// Store `frame`, returning true if an unread frame was dropped.
    pub fn publish(&self, frame: Frame) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        let dropped = slot.replace(frame).is_some();
        self.ready.notify_one();
        dropped
    }

    /// Wait up to `timeout` for a frame and take it out of the slot.
    pub fn take(&self, timeout: Duration) -> Option<Frame> {
        let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        let (mut slot, _) = self
            .ready
            .wait_timeout_while(slot, timeout, |slot| slot.is_none())
            .unwrap_or_else(|e| e.into_inner());
        slot.take()
    }
}

impl Default for LatestFrame {
    fn default() -> Self {
        Self::new()
    }
}
