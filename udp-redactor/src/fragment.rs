//! Split outbound messages into bounded fragments and join them back.
//!
//! Fragments carry no sequence numbers: ordering and completeness come from
//! the stop-and-wait channel underneath, which delivers one fragment at a
//! time and never reorders.

/// Default upper bound on a fragment's length in bytes.
pub const DEFAULT_FRAGMENT_SIZE: usize = 20;

/// Number of fragments `fragment` produces for a message of `len` bytes.
///
/// Always at least one, so an empty message still gets announced and sent.
pub fn fragment_count(len: usize, max_fragment_size: usize) -> usize {
    let size = max_fragment_size.max(1);
    len.div_ceil(size).max(1)
}

/// Split `message` into ordered chunks of at most `max_fragment_size` bytes.
///
/// An empty message yields a single empty chunk.  A size of `0` is treated
/// as `1`.
pub fn fragment(message: &[u8], max_fragment_size: usize) -> Vec<&[u8]> {
    if message.is_empty() {
        return vec![message];
    }
    message.chunks(max_fragment_size.max(1)).collect()
}

/// Concatenate fragments in the order given.
pub fn reassemble<I, B>(fragments: I) -> Vec<u8>
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    fragments.into_iter().fold(Vec::new(), |mut out, f| {
        out.extend_from_slice(f.as_ref());
        out
    })
}
