//! Outbound attempt tracking for stop-and-wait reliability.
//!
//! [`ReliableSend`] holds the bookkeeping for one payload on its way to one
//! peer: the current [`SendState`], how many transmissions have been made,
//! and when the latest one went out.  It does **not** touch the socket;
//! [`crate::channel::ReliableChannel`] calls these methods and owns the
//! actual send/receive loop.
//!
//! # Stop-and-Wait contract
//! - At most **one** payload is in flight at any moment.
//! - On ACK: move to `Acked`; the send is done.
//! - On timeout or a non-ACK reply: move to `TimedOut`, then either resend
//!   the same payload unchanged or, once the budget is spent, `Failed`.

use std::time::{Duration, Instant};

use crate::state::SendState;

/// Default number of transmissions allowed for one payload.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Stop-and-wait send-side state for one payload.
#[derive(Debug)]
pub struct ReliableSend {
    state: SendState,
    /// How many times the payload has been transmitted (1 = first send).
    tx_count: u32,
    max_attempts: u32,
    /// Wall-clock time of the most recent transmission.
    sent_at: Option<Instant>,
}

impl ReliableSend {
    /// Start tracking a send allowed `max_attempts` transmissions.
    ///
    /// A budget of `0` is treated as `1`: every payload goes out at least once.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            state: SendState::Idle,
            tx_count: 0,
            max_attempts: max_attempts.max(1),
            sent_at: None,
        }
    }

    pub fn state(&self) -> SendState {
        self.state
    }

    /// Number of transmissions made so far.
    pub fn attempts(&self) -> u32 {
        self.tx_count
    }

    /// Record a (re)transmission.  Moves `Idle`/`TimedOut` → `Sending`.
    pub fn on_transmit(&mut self) {
        self.transition(SendState::Sending);
        self.tx_count += 1;
        self.sent_at = Some(Instant::now());
    }

    /// The datagram left the socket; start waiting.
    pub fn on_sent(&mut self) {
        self.transition(SendState::AwaitingAck);
    }

    /// The peer acknowledged.  Returns the round-trip time of the last attempt.
    pub fn on_ack(&mut self) -> Option<Duration> {
        self.transition(SendState::Acked);
        self.sent_at.map(|t| t.elapsed())
    }

    /// The attempt ended without an ACK.
    ///
    /// Returns `true` if another attempt is allowed; otherwise the send is
    /// now [`SendState::Failed`].
    pub fn on_timeout(&mut self) -> bool {
        self.transition(SendState::TimedOut);
        if self.tx_count >= self.max_attempts {
            self.transition(SendState::Failed);
            false
        } else {
            true
        }
    }

    fn transition(&mut self, next: SendState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal send transition {} -> {}",
            self.state,
            next
        );
        self.state = next;
    }
}
