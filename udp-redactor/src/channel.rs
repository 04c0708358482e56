//! Reliable datagram channel: stop-and-wait with a bounded retry budget.
//!
//! # Architecture
//!
//! ```text
//!   send_reliable(payload, dest)            receive_reliable()
//!        │                                        │
//!        ▼                                        ▼
//!   ┌──────────┐  payload   ┌──────────┐   ┌──────────┐
//!   │ transmit │───────────▶│   peer   │   │ backlog  │◀─ datagrams from other
//!   └────┬─────┘            └────┬─────┘   └────┬─────┘   peers, already ACKed
//!        │        ACK            │              │
//!        │◀──────────────────────┘              ▼
//!   await_ack (≤ ack_timeout)             socket.recv_from → reply ACK
//! ```
//!
//! Both peers use the same channel.  A sender transmits one payload and waits
//! for the literal acknowledgement from the destination; silence or any other
//! reply from the destination ends the attempt, and after
//! [`ChannelConfig::max_attempts`] attempts the send fails.  A receiver
//! replies with an acknowledgement to every datagram it accepts; that reply
//! is never itself acknowledged.
//!
//! While the channel is busy with one peer, datagrams from other peers are
//! acknowledged and parked in a FIFO backlog so that they are neither lost
//! nor interleaved into the current exchange.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::time::{timeout_at, Instant};

use crate::config::ChannelConfig;
use crate::frame::{Frame, FrameCodec};
use crate::sender::ReliableSend;
use crate::session::PeerIdentity;
use crate::simulator::Simulator;
use crate::socket::{Socket, SocketError};

/// Errors surfaced by the channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The underlying socket failed.
    #[error(transparent)]
    Socket(#[from] SocketError),
    /// The retry budget ran out without an acknowledgement.
    #[error("no acknowledgement from {peer} after {attempts} attempt(s)")]
    DeliveryFailed { peer: PeerIdentity, attempts: u32 },
    /// A peer went quiet in the middle of an exchange.
    #[error("no datagram from {peer} within {after:?}")]
    Timeout { peer: PeerIdentity, after: Duration },
}

/// Result of waiting for one acknowledgement.
enum AckWait {
    Acked,
    /// The destination replied with something other than an ACK.
    Rejected(usize),
    TimedOut,
}

/// One UDP socket speaking the stop-and-wait protocol.
#[derive(Debug)]
pub struct ReliableChannel {
    socket: Socket,
    config: ChannelConfig,
    backlog: VecDeque<(Vec<u8>, PeerIdentity)>,
    simulator: Option<Simulator>,
}

impl ReliableChannel {
    /// Wrap an already-bound socket.
    pub fn new(socket: Socket, config: ChannelConfig) -> Self {
        Self {
            socket,
            config,
            backlog: VecDeque::new(),
            simulator: None,
        }
    }

    /// Bind a socket on `local_addr` and wrap it.
    pub async fn bind(local_addr: SocketAddr, config: ChannelConfig) -> Result<Self, ChannelError> {
        let socket = Socket::bind(local_addr).await?;
        Ok(Self::new(socket, config))
    }

    /// Route every outbound datagram through `simulator`.
    pub fn with_simulator(mut self, simulator: Simulator) -> Self {
        self.simulator = Some(simulator);
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.socket.local_addr
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn simulator(&self) -> Option<&Simulator> {
        self.simulator.as_ref()
    }

    /// Datagrams received from other peers and not yet handed out.
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// Send `payload` to `dest` and block until it is acknowledged.
    ///
    /// Returns [`ChannelError::DeliveryFailed`] once the retry budget is
    /// spent; never waits longer than `max_attempts × ack_timeout` plus the
    /// time spent acknowledging other peers.
    pub async fn send_reliable(
        &mut self,
        payload: &[u8],
        dest: PeerIdentity,
    ) -> Result<(), ChannelError> {
        let mut send = ReliableSend::new(self.config.max_attempts);

        loop {
            send.on_transmit();
            self.transmit(payload, dest).await?;
            send.on_sent();
            log::debug!(
                "[chan] → {} byte(s) to {dest} (attempt {}/{})",
                payload.len(),
                send.attempts(),
                self.config.max_attempts
            );

            match self.await_ack(dest).await? {
                AckWait::Acked => {
                    let rtt = send.on_ack();
                    log::debug!("[chan] ← ACK from {dest} rtt={rtt:?}");
                    return Ok(());
                }
                AckWait::Rejected(len) => {
                    log::debug!("[chan] discarded {len} non-ACK byte(s) from {dest}");
                }
                AckWait::TimedOut => {
                    log::debug!(
                        "[chan] no ACK from {dest} within {:?}",
                        self.config.ack_timeout
                    );
                }
            }

            if !send.on_timeout() {
                log::warn!(
                    "[chan] giving up on {dest} after {} attempt(s)",
                    send.attempts()
                );
                return Err(ChannelError::DeliveryFailed {
                    peer: dest,
                    attempts: send.attempts(),
                });
            }
        }
    }

    /// Block until a datagram arrives from any peer, acknowledge it, and
    /// return it.  Backlogged datagrams are returned first, oldest first.
    pub async fn receive_reliable(&mut self) -> Result<(Vec<u8>, PeerIdentity), ChannelError> {
        if let Some(entry) = self.backlog.pop_front() {
            log::debug!("[chan] ← {} byte(s) from {} (backlog)", entry.0.len(), entry.1);
            return Ok(entry);
        }

        loop {
            let (bytes, from) = self.socket.recv_from().await?;
            if let Some(accepted) = self.accept(bytes, from.into()).await? {
                return Ok(accepted);
            }
        }
    }

    /// Like [`receive_reliable`](Self::receive_reliable), but only returns a
    /// datagram sent by `origin`.
    ///
    /// Datagrams from other peers are acknowledged and backlogged.  Fails with
    /// [`ChannelError::Timeout`] if nothing from `origin` arrives within
    /// [`ChannelConfig::receive_timeout`] of the call, however busy other
    /// peers are.
    pub async fn receive_reliable_from(
        &mut self,
        origin: PeerIdentity,
    ) -> Result<(Vec<u8>, PeerIdentity), ChannelError> {
        if let Some(pos) = self.backlog.iter().position(|(_, p)| *p == origin) {
            if let Some(entry) = self.backlog.remove(pos) {
                log::debug!("[chan] ← {} byte(s) from {origin} (backlog)", entry.0.len());
                return Ok(entry);
            }
        }

        let patience = self.config.receive_timeout;
        let deadline = Instant::now() + patience;
        loop {
            let (bytes, from) = match timeout_at(deadline, self.socket.recv_from()).await {
                Ok(received) => received?,
                Err(_elapsed) => {
                    return Err(ChannelError::Timeout {
                        peer: origin,
                        after: patience,
                    })
                }
            };
            let from = PeerIdentity::from(from);
            if from != origin {
                self.park(bytes, from, origin).await?;
                continue;
            }
            if let Some(accepted) = self.accept(bytes, from).await? {
                return Ok(accepted);
            }
        }
    }

    /// Keep a datagram from a peer other than the one being served.
    ///
    /// Once the backlog holds [`ChannelConfig::max_backlog`] entries further
    /// datagrams are dropped unacknowledged, so their senders retransmit.
    async fn park(
        &mut self,
        bytes: Vec<u8>,
        from: PeerIdentity,
        busy_with: PeerIdentity,
    ) -> Result<(), ChannelError> {
        if self.backlog.len() >= self.config.max_backlog {
            log::warn!(
                "[chan] backlog full ({}); dropped {} byte(s) from {from} unacknowledged",
                self.config.max_backlog,
                bytes.len()
            );
            return Ok(());
        }
        if let Some(accepted) = self.accept(bytes, from).await? {
            log::debug!(
                "[chan] parked {} byte(s) from {from} while busy with {busy_with}",
                accepted.0.len()
            );
            self.backlog.push_back(accepted);
        }
        Ok(())
    }

    /// Acknowledge a freshly received datagram and hand it on.
    ///
    /// Only the tagged encoding can tell a stray ACK from data; those are
    /// skipped without a reply.  In text mode every datagram is data here.
    async fn accept(
        &mut self,
        bytes: Vec<u8>,
        from: PeerIdentity,
    ) -> Result<Option<(Vec<u8>, PeerIdentity)>, ChannelError> {
        if self.config.codec == FrameCodec::Tagged && self.config.codec.is_ack(&bytes) {
            log::debug!("[chan] ignored stray ACK from {from}");
            return Ok(None);
        }
        self.acknowledge(from).await?;
        log::debug!("[chan] ← {} byte(s) from {from}; → ACK", bytes.len());
        Ok(Some((bytes, from)))
    }

    /// Wait up to `ack_timeout` for `dest` to acknowledge.
    async fn await_ack(&mut self, dest: PeerIdentity) -> Result<AckWait, ChannelError> {
        let deadline = Instant::now() + self.config.ack_timeout;

        loop {
            let (bytes, from) = match timeout_at(deadline, self.socket.recv_from()).await {
                Ok(received) => received?,
                Err(_elapsed) => return Ok(AckWait::TimedOut),
            };
            let from = PeerIdentity::from(from);
            let is_ack = self.config.codec.is_ack(&bytes);

            if from == dest {
                return Ok(if is_ack {
                    AckWait::Acked
                } else {
                    AckWait::Rejected(bytes.len())
                });
            }

            // Another peer is talking; keep its datagram for later and keep
            // waiting on the same deadline.
            self.park(bytes, from, dest).await?;
        }
    }

    async fn acknowledge(&mut self, to: PeerIdentity) -> Result<(), ChannelError> {
        let ack = self.config.codec.encode(&Frame::Ack);
        self.transmit(&ack, to).await
    }

    /// Put `payload` on the wire, subject to the simulator if one is attached.
    async fn transmit(&mut self, payload: &[u8], to: PeerIdentity) -> Result<(), ChannelError> {
        let copies = self.simulator.as_mut().map_or(1, Simulator::copies);
        if copies == 0 {
            log::debug!("[chan] simulator dropped {} byte(s) to {to}", payload.len());
        }
        for _ in 0..copies {
            self.socket.send_to(payload, to.addr()).await?;
        }
        Ok(())
    }
}
