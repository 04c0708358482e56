//! Redaction server: the store-then-keyword exchange.
//!
//! The server reads one complete message at a time from any peer:
//!
//! ```text
//!  peer state              message            action
//!  ─────────────────────   ────────────────   ───────────────────────────────
//!  AwaitingFirstMessage    phrase             store phrase → AwaitingKeyword
//!  AwaitingKeyword         keyword            redact, reply, drop session
//! ```
//!
//! The reply is the redacted phrase, then the match count in decimal, then
//! [`ECHO_PAYLOAD`] once per match, each delivered as a separate message.
//! Processing is strictly sequential; peers interleave only through the
//! per-peer [`SessionStore`].

use std::net::SocketAddr;

use crate::channel::ReliableChannel;
use crate::config::{ChannelConfig, SessionConfig};
use crate::message::MessageError;
use crate::redact::redact;
use crate::session::{PeerIdentity, SessionStore};
use crate::socket::{Socket, SocketError};
use crate::state::SessionState;

/// Sent back once per redacted word.
pub const ECHO_PAYLOAD: &str = "Socket Programming";

/// Fatal server errors.  Only startup can fail; anything that goes wrong
/// once serving is logged and reported as [`Outcome::Aborted`].
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("could not bind server socket: {0}")]
    Bind(#[from] SocketError),
}

/// What one call to [`Server::serve_one`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// First message from `peer` stored.
    Stored { peer: PeerIdentity },
    /// Keyword from `peer` processed and the full reply delivered.
    Replied { peer: PeerIdentity, matches: usize },
    /// The exchange failed; any session for `peer` was dropped.
    Aborted {
        peer: Option<PeerIdentity>,
        reason: String,
    },
}

/// Single-socket redaction server.
#[derive(Debug)]
pub struct Server {
    channel: ReliableChannel,
    sessions: SessionStore,
}

impl Server {
    pub fn new(channel: ReliableChannel, sessions: SessionStore) -> Self {
        Self { channel, sessions }
    }

    /// Bind on `addr`.
    pub async fn bind(
        addr: SocketAddr,
        channel: ChannelConfig,
        sessions: SessionConfig,
    ) -> Result<Self, ServerError> {
        let socket = Socket::bind(addr).await?;
        Ok(Self::new(
            ReliableChannel::new(socket, channel),
            SessionStore::new(sessions),
        ))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.channel.local_addr()
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Serve forever.
    pub async fn run(&mut self) {
        log::info!("[server] listening on {}", self.local_addr());
        loop {
            self.serve_one().await;
        }
    }

    /// Receive one message and act on it.
    pub async fn serve_one(&mut self) -> Outcome {
        let (message, peer) = match self.channel.receive_message().await {
            Ok(received) => received,
            Err(e) => return self.abort(None, e),
        };

        match self.sessions.state(peer) {
            SessionState::AwaitingFirstMessage => {
                log::info!("[server] {peer}: stored {} byte phrase", message.len());
                self.sessions.store(peer, message);
                Outcome::Stored { peer }
            }
            SessionState::AwaitingKeyword => {
                let phrase = self.sessions.take(peer).unwrap_or_default();
                let (redacted, matches) = redact(&phrase, &message);
                log::info!("[server] {peer}: keyword {message:?} matched {matches} time(s)");

                match self.reply(peer, &redacted, matches).await {
                    Ok(()) => Outcome::Replied { peer, matches },
                    Err(e) => self.abort(Some(peer), e),
                }
            }
        }
    }

    async fn reply(
        &mut self,
        peer: PeerIdentity,
        redacted: &str,
        matches: usize,
    ) -> Result<(), MessageError> {
        self.channel.send_message(redacted, peer).await?;
        self.channel.send_message(&matches.to_string(), peer).await?;
        for _ in 0..matches {
            self.channel.send_message(ECHO_PAYLOAD, peer).await?;
        }
        Ok(())
    }

    /// Drop the failed exchange and its session.  `peer` is the peer being
    /// served, if known; errors that name a peer take precedence.
    fn abort(&mut self, peer: Option<PeerIdentity>, error: MessageError) -> Outcome {
        let peer = error.peer().or(peer);
        if let Some(peer) = peer {
            self.sessions.remove(peer);
        }
        match peer {
            Some(peer) => log::warn!("[server] exchange with {peer} aborted: {error}"),
            None => log::warn!("[server] exchange aborted: {error}"),
        }
        Outcome::Aborted {
            peer,
            reason: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelError;

    async fn loopback() -> Server {
        Server::bind(
            "127.0.0.1:0".parse().unwrap(),
            ChannelConfig::default(),
            SessionConfig::default(),
        )
        .await
        .expect("bind")
    }

    fn socket_failure() -> MessageError {
        MessageError::Channel(ChannelError::Socket(SocketError::Io(std::io::Error::other(
            "no buffer space available",
        ))))
    }

    #[tokio::test]
    async fn socket_failure_mid_reply_aborts_only_that_peer() {
        let mut server = loopback().await;
        let a = PeerIdentity::from(SocketAddr::from(([127, 0, 0, 1], 4001)));
        let b = PeerIdentity::from(SocketAddr::from(([127, 0, 0, 1], 4002)));
        server.sessions.store(a, "alpha".into());
        server.sessions.store(b, "beta".into());

        let outcome = server.abort(Some(a), socket_failure());

        assert!(matches!(outcome, Outcome::Aborted { peer: Some(p), .. } if p == a));
        assert_eq!(server.sessions().len(), 1);
        assert_eq!(server.sessions.take(b).as_deref(), Some("beta"));
    }

    #[tokio::test]
    async fn socket_failure_on_receive_keeps_sessions() {
        let mut server = loopback().await;
        let a = PeerIdentity::from(SocketAddr::from(([127, 0, 0, 1], 4001)));
        server.sessions.store(a, "alpha".into());

        let outcome = server.abort(None, socket_failure());

        match outcome {
            Outcome::Aborted { peer, reason } => {
                assert_eq!(peer, None);
                assert!(reason.contains("no buffer space"), "{reason}");
            }
            other => panic!("expected Aborted, got {other:?}"),
        }
        assert_eq!(server.sessions().len(), 1);
    }

    #[tokio::test]
    async fn delivery_failure_names_its_peer() {
        let mut server = loopback().await;
        let a = PeerIdentity::from(SocketAddr::from(([127, 0, 0, 1], 4001)));
        server.sessions.store(a, "alpha".into());

        let error = MessageError::Channel(ChannelError::DeliveryFailed {
            peer: a,
            attempts: 3,
        });
        let outcome = server.abort(None, error);

        assert!(matches!(outcome, Outcome::Aborted { peer: Some(p), .. } if p == a));
        assert!(server.sessions().is_empty());
    }
}
