use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;

/// One-shot completion signal. Once set it stays set.
#[derive(Debug)]
pub struct DoneLatch {
    tx: watch::Sender<bool>,
}

impl Default for DoneLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl DoneLatch {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn set(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_set(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the latch is set; immediately if it already is
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait
        let _ = rx.wait_for(|done| *done).await;
    }
}

/// Per-run accumulators shared between a driver and its renderer
#[derive(Debug, Default)]
pub struct RenderState {
    buffer: Mutex<Vec<String>>,
    error: Mutex<Option<String>>,
    done: DoneLatch,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl RenderState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_delta(&self, delta: &str) {
        lock(&self.buffer).push(delta.to_string());
    }

    /// Join and clear the buffered fragments under one lock
    pub fn take_message(&self) -> String {
        let mut buffer = lock(&self.buffer);
        let message = buffer.concat();
        buffer.clear();
        message
    }

    /// Capture an error and set done. Returns false if an error was already held
    /// or the session had already finished, in which case nothing is stored.
    pub fn record_error(&self, text: impl Into<String>) -> bool {
        let first = {
            let mut slot = lock(&self.error);
            if slot.is_some() || self.done.is_set() {
                false
            } else {
                *slot = Some(text.into());
                true
            }
        };
        self.done.set();
        first
    }

    pub fn error(&self) -> Option<String> {
        lock(&self.error).clone()
    }

    pub fn mark_done(&self) {
        self.done.set();
    }

    pub fn is_done(&self) -> bool {
        self.done.is_set()
    }

    pub async fn wait_done(&self) {
        self.done.wait().await
    }
}
