//! One-shot completion latch

use tokio::sync::watch;

/// A one-shot signal that can be fired once and awaited by any number
/// of tasks.
///
/// Firing is idempotent; [`Latch::fire`] reports whether this call was
/// the one that actually fired the latch, which lets callers attach
/// exactly-once side effects to the transition.
pub struct Latch {
    tx: watch::Sender<bool>,
}

impl Latch {
    /// Create an unfired latch.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Fire the latch, waking all waiters. Returns `true` if this call
    /// transitioned the latch from unfired to fired.
    pub fn fire(&self) -> bool {
        !self.tx.send_replace(true)
    }

    /// Whether the latch has fired.
    pub fn is_fired(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until the latch fires. Returns immediately if it already
    /// has.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in self, so wait_for cannot fail before the
        // latch fires.
        let _ = rx.wait_for(|fired| *fired).await;
    }
}

impl Default for Latch {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Latch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Latch")
            .field("fired", &self.is_fired())
            .finish()
    }
}
