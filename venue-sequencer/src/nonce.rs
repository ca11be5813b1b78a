//! Sender nonce tracking
//!
//! The counter is read once from the node at start and then advanced locally
//! after every accepted submission. A resync only happens when the node
//! rejects a nonce, and it never moves the counter backwards.

use tracing::warn;

/// Local view of the sender's next nonce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonceCounter {
    initial: u64,
    next: u64,
    submitted: u64,
    resyncs: u32,
}

impl NonceCounter {
    /// Start from the node's reported nonce
    pub fn new(initial: u64) -> Self {
        Self {
            initial,
            next: initial,
            submitted: 0,
            resyncs: 0,
        }
    }

    /// Nonce for the next submission
    pub fn current(&self) -> u64 {
        self.next
    }

    /// Record an accepted submission
    pub fn advance(&mut self) -> u64 {
        let used = self.next;
        self.next += 1;
        self.submitted += 1;
        used
    }

    /// Adopt the node's view after a rejection. Returns whether it moved.
    pub fn resync(&mut self, reported: u64) -> bool {
        self.resyncs += 1;
        if reported > self.next {
            warn!("Nonce resync: {} -> {}", self.next, reported);
            self.next = reported;
            true
        } else {
            if reported < self.next {
                warn!(
                    "Node reported nonce {} below local {}, keeping local",
                    reported, self.next
                );
            }
            false
        }
    }

    /// Nonce read at start
    pub fn initial(&self) -> u64 {
        self.initial
    }

    /// Accepted submissions so far
    pub fn submitted(&self) -> u64 {
        self.submitted
    }

    /// Resyncs so far
    pub fn resyncs(&self) -> u32 {
        self.resyncs
    }
}
