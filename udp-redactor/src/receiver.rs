//! Inbound reassembly of one announced message.
//!
//! A [`Reassembly`] is opened when a control frame arrives and is pinned to
//! that frame's origin.  It is responsible for:
//! - Accepting exactly the announced number of fragments, in arrival order.
//! - Refusing fragments from any other peer.
//! - Producing the joined message once complete.
//!
//! The [`Reassembly`] does **not** read the socket; it only manages state for
//! [`crate::message`], which drives the receive loop.

use crate::fragment::reassemble;
use crate::session::PeerIdentity;

/// Receive-side state for one message in transit.
#[derive(Debug)]
pub struct Reassembly {
    origin: PeerIdentity,
    expected: usize,
    fragments: Vec<Vec<u8>>,
}

impl Reassembly {
    /// Open a reassembly for `expected` fragments from `origin`.
    pub fn new(origin: PeerIdentity, expected: usize) -> Self {
        Self {
            origin,
            expected,
            fragments: Vec::with_capacity(expected),
        }
    }

    /// Peer this message is pinned to.
    pub fn origin(&self) -> PeerIdentity {
        self.origin
    }

    /// Fragments still to come.
    pub fn remaining(&self) -> usize {
        self.expected - self.fragments.len()
    }

    pub fn is_complete(&self) -> bool {
        self.fragments.len() == self.expected
    }

    /// Append a fragment.
    ///
    /// Returns `false` (and stores nothing) if `from` is not the pinned
    /// origin or the message is already complete.
    pub fn on_fragment(&mut self, from: PeerIdentity, payload: Vec<u8>) -> bool {
        if from != self.origin || self.is_complete() {
            return false;
        }
        self.fragments.push(payload);
        true
    }

    /// Join the collected fragments.  Call only when [`is_complete`](Self::is_complete).
    pub fn finish(self) -> Vec<u8> {
        debug_assert!(self.is_complete(), "finish called with fragments missing");
        reassemble(self.fragments)
    }
}
