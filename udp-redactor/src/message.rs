//! Whole-message transfer over the reliable channel.
//!
//! A message travels as one control frame announcing the fragment count
//! followed by that many data frames, each sent with
//! [`ReliableChannel::send_reliable`]:
//!
//! ```text
//!  sender                               receiver
//!    │ ── Packets:2 ──────────────────▶   │  open Reassembly pinned to sender
//!    │ ◀─────────────────────── ACK ───   │
//!    │ ── "the cat sat on the m" ─────▶   │
//!    │ ◀─────────────────────── ACK ───   │
//!    │ ── "at." ──────────────────────▶   │  complete → String
//!    │ ◀─────────────────────── ACK ───   │
//! ```

use crate::channel::{ChannelError, ReliableChannel};
use crate::fragment::fragment;
use crate::frame::{Frame, FrameError};
use crate::receiver::Reassembly;
use crate::session::PeerIdentity;

/// Errors from sending or receiving a whole message.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// The channel failed (delivery budget spent, timeout, or socket error).
    #[error(transparent)]
    Channel(#[from] ChannelError),
    /// A frame did not parse as the kind expected at that point.
    #[error("malformed frame from {peer}: {source}")]
    MalformedFrame {
        peer: PeerIdentity,
        #[source]
        source: FrameError,
    },
    /// The reassembled bytes are not UTF-8 text.
    #[error("message from {peer} is not valid UTF-8")]
    InvalidUtf8 { peer: PeerIdentity },
    /// The outbound message needs more fragments than a receiver accepts.
    #[error("message needs {fragments} fragments, limit is {limit}")]
    TooLarge { fragments: usize, limit: u32 },
}

impl MessageError {
    /// Peer the failed exchange was with, when known.
    pub fn peer(&self) -> Option<PeerIdentity> {
        match self {
            MessageError::Channel(ChannelError::DeliveryFailed { peer, .. })
            | MessageError::Channel(ChannelError::Timeout { peer, .. })
            | MessageError::MalformedFrame { peer, .. }
            | MessageError::InvalidUtf8 { peer } => Some(*peer),
            MessageError::Channel(ChannelError::Socket(_)) | MessageError::TooLarge { .. } => None,
        }
    }

    /// `true` if the retry budget ran out on some frame.
    pub fn is_delivery_failure(&self) -> bool {
        matches!(
            self,
            MessageError::Channel(ChannelError::DeliveryFailed { .. })
        )
    }
}

impl ReliableChannel {
    /// Fragment `message` and deliver it to `dest`.
    ///
    /// Stops at the first frame that cannot be delivered.
    pub async fn send_message(
        &mut self,
        message: &str,
        dest: PeerIdentity,
    ) -> Result<(), MessageError> {
        let codec = self.config().codec;
        let limit = self.config().max_fragments;
        let fragments = fragment(message.as_bytes(), self.config().max_fragment_size);

        let count = u32::try_from(fragments.len())
            .ok()
            .filter(|n| *n <= limit)
            .ok_or(MessageError::TooLarge {
                fragments: fragments.len(),
                limit,
            })?;

        log::debug!("[msg] → {dest}: {} byte(s) in {count} fragment(s)", message.len());
        self.send_reliable(&codec.encode(&Frame::Control { fragments: count }), dest)
            .await?;
        for chunk in fragments {
            self.send_reliable(&codec.encode(&Frame::Data(chunk.to_vec())), dest)
                .await?;
        }
        Ok(())
    }

    /// Receive the next complete message from any peer.
    ///
    /// The first frame must be a control frame; its sender becomes the only
    /// peer whose fragments are accepted until the message is complete.
    pub async fn receive_message(&mut self) -> Result<(String, PeerIdentity), MessageError> {
        let (control, origin) = self.receive_reliable().await?;
        self.collect_message(&control, origin).await
    }

    /// Receive the next complete message sent by `origin`.
    pub async fn receive_message_from(
        &mut self,
        origin: PeerIdentity,
    ) -> Result<String, MessageError> {
        let (control, origin) = self.receive_reliable_from(origin).await?;
        let (message, _) = self.collect_message(&control, origin).await?;
        Ok(message)
    }

    async fn collect_message(
        &mut self,
        control: &[u8],
        origin: PeerIdentity,
    ) -> Result<(String, PeerIdentity), MessageError> {
        let codec = self.config().codec;
        let limit = self.config().max_fragments;
        let malformed = |source: FrameError| MessageError::MalformedFrame {
            peer: origin,
            source,
        };

        let announced = codec.decode_control(control).map_err(malformed)?;
        if announced > limit {
            return Err(malformed(FrameError::FragmentLimit { announced, limit }));
        }

        let mut reassembly = Reassembly::new(origin, announced as usize);
        while !reassembly.is_complete() {
            let (bytes, from) = self.receive_reliable_from(reassembly.origin()).await?;
            let payload = codec.decode_fragment(&bytes).map_err(malformed)?;
            reassembly.on_fragment(from, payload);
        }

        let message = String::from_utf8(reassembly.finish())
            .map_err(|_| MessageError::InvalidUtf8 { peer: origin })?;
        log::debug!("[msg] ← {origin}: {} byte(s) in {announced} fragment(s)", message.len());
        Ok((message, origin))
    }
}
