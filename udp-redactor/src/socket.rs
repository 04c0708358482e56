//! Async UDP socket abstraction.
//!
//! [`Socket`] is a thin wrapper around `tokio::net::UdpSocket` that moves raw
//! datagram payloads.  Frame encoding and all protocol logic live elsewhere;
//! this module owns only byte I/O.

use std::net::SocketAddr;

use tokio::net::UdpSocket;

/// Receive buffer size.  Frames are tiny; anything longer is truncated by
/// the OS, which the codec then rejects or treats as data.
const MAX_DATAGRAM: usize = 2048;

/// Errors that can arise from socket operations.
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    /// Underlying I/O error from the OS.
    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An async, datagram-oriented UDP socket.
///
/// Dropping the socket releases the OS handle, on success and error paths
/// alike.
#[derive(Debug)]
pub struct Socket {
    /// Address this socket is bound to (filled in after OS assigns ephemeral port).
    pub local_addr: SocketAddr,
    inner: UdpSocket,
}

impl Socket {
    /// Bind a new socket to `local_addr`.
    ///
    /// Passing `0.0.0.0:0` lets the OS choose an ephemeral port.
    pub async fn bind(local_addr: SocketAddr) -> Result<Self, SocketError> {
        let inner = UdpSocket::bind(local_addr).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self { local_addr, inner })
    }

    /// Send `payload` as a single UDP datagram to `dest`.
    pub async fn send_to(&self, payload: &[u8], dest: SocketAddr) -> Result<(), SocketError> {
        self.inner.send_to(payload, dest).await?;
        Ok(())
    }

    /// Receive the next datagram.
    ///
    /// Returns `(payload, sender_address)`.
    pub async fn recv_from(&self) -> Result<(Vec<u8>, SocketAddr), SocketError> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let (n, addr) = self.inner.recv_from(&mut buf).await?;
        buf.truncate(n);
        Ok((buf, addr))
    }
}
