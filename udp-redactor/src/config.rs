//! Tunable protocol parameters.
//!
//! Defaults reproduce the fixed constants of the wire protocol (1 s ACK
//! timeout, 3 attempts, 20-byte fragments, text frames).  The CLI overrides
//! individual fields.

use std::time::Duration;

use crate::fragment::DEFAULT_FRAGMENT_SIZE;
use crate::frame::FrameCodec;
use crate::sender::DEFAULT_MAX_ATTEMPTS;

/// Default time to wait for an ACK before retransmitting.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_millis(1000);

/// Default wait for the next datagram of an exchange in progress.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest fragment count a control frame may announce.
pub const DEFAULT_MAX_FRAGMENTS: u32 = 4096;

/// Datagrams from other peers held while the channel is busy with one.
pub const DEFAULT_MAX_BACKLOG: usize = 64;

/// Reliable channel parameters, shared by both peers.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// How long one attempt waits for an acknowledgement.
    pub ack_timeout: Duration,
    /// Longest wait for the next datagram of an exchange already under way.
    pub receive_timeout: Duration,
    /// Transmissions per reliable send before giving up.
    pub max_attempts: u32,
    /// Upper bound on a data fragment's length in bytes.
    pub max_fragment_size: usize,
    /// Control frames announcing more fragments than this are malformed.
    pub max_fragments: u32,
    /// Datagrams from other peers kept while busy; beyond this they go
    /// unacknowledged.
    pub max_backlog: usize,
    /// Wire encoding of frames; both peers must agree.
    pub codec: FrameCodec,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_fragment_size: DEFAULT_FRAGMENT_SIZE,
            max_fragments: DEFAULT_MAX_FRAGMENTS,
            max_backlog: DEFAULT_MAX_BACKLOG,
            codec: FrameCodec::Text,
        }
    }
}

/// Server session store parameters.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Age after which an unanswered first message is forgotten (`None` = never).
    pub ttl: Option<Duration>,
    /// Maximum number of peers with a pending first message.
    pub capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: Some(Duration::from_secs(300)),
            capacity: 1024,
        }
    }
}
