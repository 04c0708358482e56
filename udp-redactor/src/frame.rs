//! Wire-format definitions for protocol frames.
//!
//! Every datagram exchanged between peers carries exactly one [`Frame`].  This
//! module is responsible for:
//! - Defining the three frame kinds (control announcement, data fragment,
//!   acknowledgement) as an explicit tagged type.
//! - Serialising a [`Frame`] into a datagram payload.
//! - Deserialising a datagram payload back into a [`Frame`].
//!
//! No I/O happens here.
//!
//! # Encodings
//!
//! Two encodings are supported, selected by [`FrameCodec`]:
//!
//! ```text
//!  Text (default, plain ASCII)        Tagged (1 tag byte + body)
//!  ------------------------------     ------------------------------
//!  Control   "Packets:<N>"            'C' <N as decimal ASCII>
//!  Data      <raw fragment bytes>     'D' <raw fragment bytes>
//!  Ack       "ACK"                    'A'
//! ```
//!
//! The text encoding has no type tag: a data fragment whose bytes are exactly
//! `ACK` or look like `Packets:<N>` cannot be told apart from a control frame.
//! Callers that know a fragment is expected use [`FrameCodec::decode_fragment`],
//! which never reinterprets payload bytes.  The tagged encoding is unambiguous.

/// Literal acknowledgement token of the text encoding.
pub const ACK_TOKEN: &[u8] = b"ACK";

/// Prefix of a text-encoded control frame.
pub const CONTROL_PREFIX: &[u8] = b"Packets:";

mod tag {
    pub const CONTROL: u8 = b'C';
    pub const DATA: u8 = b'D';
    pub const ACK: u8 = b'A';
}

/// One protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Announces how many data fragments follow.
    Control { fragments: u32 },
    /// One fragment of a message.
    Data(Vec<u8>),
    /// Acknowledgement of the previously received datagram.
    Ack,
}

impl Frame {
    /// Short name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Control { .. } => "CONTROL",
            Frame::Data(_) => "DATA",
            Frame::Ack => "ACK",
        }
    }
}

/// Errors that can arise when parsing a datagram payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// Zero-length datagram where the encoding requires a tag.
    #[error("empty datagram")]
    Empty,
    /// Leading tag byte is not one of the known frame kinds.
    #[error("unknown frame tag 0x{0:02x}")]
    UnknownTag(u8),
    /// Control frame whose count is not a non-negative decimal integer.
    #[error("malformed control frame: {0:?}")]
    BadControl(String),
    /// Control frame announcing more fragments than the receiver accepts.
    #[error("control frame announces {announced} fragments, limit is {limit}")]
    FragmentLimit { announced: u32, limit: u32 },
    /// Frame parsed, but it is not the kind the protocol expects here.
    #[error("expected {expected} frame, got {actual}")]
    Unexpected {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Selects how [`Frame`]s map onto datagram payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameCodec {
    /// Plain-text conventions: `Packets:<N>`, `ACK`, raw fragments.
    #[default]
    Text,
    /// One tag byte before every body.
    Tagged,
}

impl FrameCodec {
    /// Serialise `frame` into a datagram payload.
    pub fn encode(&self, frame: &Frame) -> Vec<u8> {
        match (self, frame) {
            (FrameCodec::Text, Frame::Control { fragments }) => {
                let mut buf = CONTROL_PREFIX.to_vec();
                buf.extend_from_slice(fragments.to_string().as_bytes());
                buf
            }
            (FrameCodec::Text, Frame::Data(bytes)) => bytes.clone(),
            (FrameCodec::Text, Frame::Ack) => ACK_TOKEN.to_vec(),
            (FrameCodec::Tagged, Frame::Control { fragments }) => {
                let mut buf = vec![tag::CONTROL];
                buf.extend_from_slice(fragments.to_string().as_bytes());
                buf
            }
            (FrameCodec::Tagged, Frame::Data(bytes)) => {
                let mut buf = Vec::with_capacity(1 + bytes.len());
                buf.push(tag::DATA);
                buf.extend_from_slice(bytes);
                buf
            }
            (FrameCodec::Tagged, Frame::Ack) => vec![tag::ACK],
        }
    }

    /// Parse a datagram payload with no knowledge of what the peer meant to send.
    ///
    /// In text mode anything that is neither the ACK token nor a well-formed
    /// control frame is returned as [`Frame::Data`].
    pub fn decode(&self, buf: &[u8]) -> Result<Frame, FrameError> {
        match self {
            FrameCodec::Text => {
                if buf == ACK_TOKEN {
                    return Ok(Frame::Ack);
                }
                if let Some(body) = buf.strip_prefix(CONTROL_PREFIX) {
                    if let Ok(fragments) = parse_count(body) {
                        return Ok(Frame::Control { fragments });
                    }
                }
                Ok(Frame::Data(buf.to_vec()))
            }
            FrameCodec::Tagged => {
                let (&t, body) = buf.split_first().ok_or(FrameError::Empty)?;
                match t {
                    tag::CONTROL => Ok(Frame::Control {
                        fragments: parse_count(body)?,
                    }),
                    tag::DATA => Ok(Frame::Data(body.to_vec())),
                    tag::ACK if body.is_empty() => Ok(Frame::Ack),
                    other => Err(FrameError::UnknownTag(other)),
                }
            }
        }
    }

    /// Parse a payload that must be a control frame.
    pub fn decode_control(&self, buf: &[u8]) -> Result<u32, FrameError> {
        match self {
            FrameCodec::Text => match buf.strip_prefix(CONTROL_PREFIX) {
                Some(body) => parse_count(body),
                None => Err(FrameError::BadControl(
                    String::from_utf8_lossy(buf).into_owned(),
                )),
            },
            FrameCodec::Tagged => match self.decode(buf)? {
                Frame::Control { fragments } => Ok(fragments),
                other => Err(FrameError::Unexpected {
                    expected: "CONTROL",
                    actual: other.kind(),
                }),
            },
        }
    }

    /// Parse a payload that must be a data fragment.
    ///
    /// Text mode takes the bytes verbatim: a fragment that happens to read
    /// `ACK` or `Packets:7` is still data here.
    pub fn decode_fragment(&self, buf: &[u8]) -> Result<Vec<u8>, FrameError> {
        match self {
            FrameCodec::Text => Ok(buf.to_vec()),
            FrameCodec::Tagged => match self.decode(buf)? {
                Frame::Data(bytes) => Ok(bytes),
                other => Err(FrameError::Unexpected {
                    expected: "DATA",
                    actual: other.kind(),
                }),
            },
        }
    }

    /// `true` when `buf` is exactly an acknowledgement under this encoding.
    pub fn is_ack(&self, buf: &[u8]) -> bool {
        match self {
            FrameCodec::Text => buf == ACK_TOKEN,
            FrameCodec::Tagged => buf == [tag::ACK],
        }
    }
}

fn parse_count(body: &[u8]) -> Result<u32, FrameError> {
    let bad = || FrameError::BadControl(String::from_utf8_lossy(body).into_owned());
    // `u32::from_str` accepts a leading '+'; the wire format does not.
    if body.is_empty() || !body.iter().all(u8::is_ascii_digit) {
        return Err(bad());
    }
    std::str::from_utf8(body)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(bad)
}
