//! Finite-state-machine types.
//!
//! Two independent machines exist:
//! - [`SendState`] — the lifecycle of one reliable send on the channel.
//! - [`SessionState`] — where one peer stands in the two-message exchange
//!   with the server.
//!
//! Transitions are driven by [`crate::sender::ReliableSend`] and
//! [`crate::server::Server`] respectively; this module only names the states
//! and checks which moves are legal.

/// State of a single reliable send.
///
/// ```text
///  Idle ──▶ Sending ──▶ AwaitingAck ──ACK──▶ Acked
///              ▲             │
///              │          timeout / non-ACK
///              │             ▼
///              └──budget── TimedOut ──budget spent──▶ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SendState {
    /// Nothing transmitted yet.
    #[default]
    Idle,
    /// Payload is being written to the socket.
    Sending,
    /// Waiting for the peer's acknowledgement.
    AwaitingAck,
    /// Acknowledged; terminal.
    Acked,
    /// The last attempt got no acknowledgement.
    TimedOut,
    /// Retry budget exhausted; terminal.
    Failed,
}

impl SendState {
    /// `true` for [`SendState::Acked`] and [`SendState::Failed`].
    pub fn is_terminal(self) -> bool {
        matches!(self, SendState::Acked | SendState::Failed)
    }

    /// Whether the machine may move from `self` to `next`.
    pub fn can_transition_to(self, next: SendState) -> bool {
        use SendState::*;
        matches!(
            (self, next),
            (Idle, Sending)
                | (Sending, AwaitingAck)
                | (AwaitingAck, Acked)
                | (AwaitingAck, TimedOut)
                | (TimedOut, Sending)
                | (TimedOut, Failed)
        )
    }
}

impl std::fmt::Display for SendState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Where a peer stands in the store-then-keyword exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No message stored for this peer.
    #[default]
    AwaitingFirstMessage,
    /// A phrase is stored; the next message is the keyword.
    AwaitingKeyword,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}
