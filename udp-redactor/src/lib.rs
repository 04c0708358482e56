//! `udp-redactor` — stop-and-wait reliable messaging over UDP, and a keyword
//! redaction service built on it.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────┐  phrase, keyword   ┌──────────┐
//!  │  client  │───────────────────▶│  server  │── SessionStore (per peer)
//!  └────┬─────┘◀───────────────────└────┬─────┘── redact()
//!       │     redacted, count, echoes   │
//!  ┌────▼───────────────────────────────▼─────┐
//!  │        message  (fragment + announce)    │
//!  └────┬─────────────────────────────────────┘
//!  ┌────▼─────────────────────────────────────┐
//!  │   ReliableChannel (stop-and-wait, ACK)   │
//!  └────┬─────────────────────────────────────┘
//!       │ raw UDP datagrams
//!  ┌────▼──────┐
//!  │  Socket   │  (thin async wrapper around tokio UdpSocket)
//!  └───────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`frame`]      — wire format (text or tagged frames)
//! - [`fragment`]   — split / join message bytes
//! - [`socket`]     — async UDP socket abstraction
//! - [`simulator`]  — optional seeded packet loss for testing
//! - [`state`]      — finite-state-machine types
//! - [`sender`]     — retry budget for one reliable send
//! - [`receiver`]   — origin-pinned reassembly of one message
//! - [`config`]     — protocol and session parameters
//! - [`channel`]    — reliable send / receive of single datagrams
//! - [`message`]    — reliable send / receive of whole messages
//! - [`session`]    — peer identity and per-peer session store
//! - [`redact`]     — keyword redaction
//! - [`server`]     — server orchestration
//! - [`client`]     — client orchestration and input validation

pub mod channel;
pub mod client;
pub mod config;
pub mod fragment;
pub mod frame;
pub mod message;
pub mod receiver;
pub mod redact;
pub mod sender;
pub mod server;
pub mod session;
pub mod simulator;
pub mod socket;
pub mod state;

pub use channel::{ChannelError, ReliableChannel};
pub use config::{ChannelConfig, SessionConfig};
pub use frame::{Frame, FrameCodec};
pub use message::MessageError;
pub use session::PeerIdentity;
