//! Redaction client: input validation and the client half of the exchange.
//!
//! The client sends two messages (the phrase, then the keyword) and then
//! reads back the redacted phrase, the match count, and one echo per match,
//! accepting messages only from the server it addressed.

use std::net::SocketAddr;

use crate::channel::ReliableChannel;
use crate::config::ChannelConfig;
use crate::message::MessageError;
use crate::session::PeerIdentity;

/// Lowest accepted server port (first registered port).
pub const MIN_PORT: u16 = 1024;
/// Highest accepted server port (last registered port).
pub const MAX_PORT: u16 = 49151;

/// Rejected user input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("Invalid input format: {0} must not be empty")]
    Empty(&'static str),
    #[error("Invalid port number: {0:?}")]
    BadPort(String),
    #[error("Invalid port number: {0} is outside 1024..=49151")]
    PortOutOfRange(u32),
}

/// Errors from a client exchange.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Message(#[from] MessageError),
    #[error("could not resolve {host}:{port}: {reason}")]
    Resolve {
        host: String,
        port: u16,
        reason: String,
    },
    #[error("server sent a non-numeric match count: {0:?}")]
    BadCount(String),
}

/// Validated client input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInput {
    pub host: String,
    pub port: u16,
    pub phrase: String,
    pub keyword: String,
}

impl ClientInput {
    /// Check the four raw values.  Nothing may be empty and the port must be
    /// a registered port.
    pub fn validate(host: &str, port: &str, phrase: &str, keyword: &str) -> Result<Self, InputError> {
        for (name, value) in [
            ("hostname", host),
            ("port", port),
            ("phrase", phrase),
            ("keyword", keyword),
        ] {
            if value.is_empty() {
                return Err(InputError::Empty(name));
            }
        }

        let wide: u32 = port
            .trim()
            .parse()
            .map_err(|_| InputError::BadPort(port.to_owned()))?;
        let port = u16::try_from(wide)
            .ok()
            .filter(|p| (MIN_PORT..=MAX_PORT).contains(p))
            .ok_or(InputError::PortOutOfRange(wide))?;

        Ok(Self {
            host: host.to_owned(),
            port,
            phrase: phrase.to_owned(),
            keyword: keyword.to_owned(),
        })
    }
}

/// What the server sent back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub redacted: String,
    pub count: usize,
    pub echoes: Vec<String>,
}

/// Resolve `host:port`, preferring an IPv4 address.
pub async fn resolve(host: &str, port: u16) -> Result<PeerIdentity, ClientError> {
    let resolve_err = |reason: String| ClientError::Resolve {
        host: host.to_owned(),
        port,
        reason,
    };
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| resolve_err(e.to_string()))?
        .collect();
    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .map(|a| PeerIdentity::from(*a))
        .ok_or_else(|| resolve_err("no addresses".into()))
}

/// Bind an ephemeral socket of the same address family as `server`.
pub async fn connect_channel(
    server: PeerIdentity,
    config: ChannelConfig,
) -> Result<ReliableChannel, ClientError> {
    let local: SocketAddr = if server.addr().is_ipv4() {
        SocketAddr::from(([0, 0, 0, 0], 0))
    } else {
        SocketAddr::from(([0u16; 8], 0))
    };
    let channel = ReliableChannel::bind(local, config)
        .await
        .map_err(MessageError::from)?;
    Ok(channel)
}

/// Run the full client exchange against `server`.
pub async fn run_exchange(
    channel: &mut ReliableChannel,
    server: PeerIdentity,
    phrase: &str,
    keyword: &str,
) -> Result<Reply, ClientError> {
    channel.send_message(phrase, server).await?;
    log::debug!("[client] phrase delivered to {server}");
    channel.send_message(keyword, server).await?;
    log::debug!("[client] keyword delivered to {server}");

    let redacted = channel.receive_message_from(server).await?;
    let count_text = channel.receive_message_from(server).await?;
    let count: usize = count_text
        .trim()
        .parse()
        .map_err(|_| ClientError::BadCount(count_text.clone()))?;

    let mut echoes = Vec::new();
    for _ in 0..count {
        echoes.push(channel.receive_message_from(server).await?);
    }

    Ok(Reply {
        redacted,
        count,
        echoes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_input() {
        let input = ClientInput::validate("localhost", "5000", "the cat", "the").unwrap();
        assert_eq!(input.port, 5000);
        assert_eq!(input.phrase, "the cat");
    }

    #[test]
    fn rejects_empty_fields_in_order() {
        assert_eq!(
            ClientInput::validate("", "5000", "p", "k"),
            Err(InputError::Empty("hostname"))
        );
        assert_eq!(
            ClientInput::validate("h", "", "p", "k"),
            Err(InputError::Empty("port"))
        );
        assert_eq!(
            ClientInput::validate("h", "5000", "", "k"),
            Err(InputError::Empty("phrase"))
        );
        assert_eq!(
            ClientInput::validate("h", "5000", "p", ""),
            Err(InputError::Empty("keyword"))
        );
    }

    #[test]
    fn port_bounds_are_inclusive() {
        assert!(ClientInput::validate("h", "1024", "p", "k").is_ok());
        assert!(ClientInput::validate("h", "49151", "p", "k").is_ok());
        assert_eq!(
            ClientInput::validate("h", "1023", "p", "k"),
            Err(InputError::PortOutOfRange(1023))
        );
        assert_eq!(
            ClientInput::validate("h", "49152", "p", "k"),
            Err(InputError::PortOutOfRange(49152))
        );
        assert_eq!(
            ClientInput::validate("h", "70000", "p", "k"),
            Err(InputError::PortOutOfRange(70000))
        );
    }

    #[test]
    fn rejects_non_numeric_port() {
        assert_eq!(
            ClientInput::validate("h", "http", "p", "k"),
            Err(InputError::BadPort("http".into()))
        );
        assert!(matches!(
            ClientInput::validate("h", "-1", "p", "k"),
            Err(InputError::BadPort(_))
        ));
    }

    #[tokio::test]
    async fn resolves_loopback_literal() {
        let peer = resolve("127.0.0.1", 4000).await.unwrap();
        assert_eq!(peer.addr(), "127.0.0.1:4000".parse::<SocketAddr>().unwrap());
    }
}
