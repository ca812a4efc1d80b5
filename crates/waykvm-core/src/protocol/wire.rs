//! Binary codec for the Wayland wire format.
//!
//! Wire format:
//! ```text
//! [object_id:4][opcode:2][size:2][arguments...]
//! ```
//! All integers are little-endian.  `size` counts the complete message
//! including the 8-byte header, so a message with no arguments has
//! `size == 8`.  String arguments carry a 4-byte length that includes a
//! mandatory terminating NUL, and the string bytes are zero-padded up to
//! the next multiple of 4.

use thiserror::Error;

/// Size of the fixed message header in bytes.
pub const HEADER_SIZE: usize = 8;

/// The well-known object ID of the display singleton.  It exists from the
/// moment the connection is opened and is never allocated.
pub const DISPLAY_OBJECT_ID: u32 = 1;

/// Errors that can occur while decoding wire data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    /// Fewer than [`HEADER_SIZE`] bytes were available for a header.
    #[error("truncated header: need {HEADER_SIZE} bytes, got {0}")]
    TruncatedHeader(usize),

    /// A declared size or length would read past the available buffer, or
    /// a field value is structurally invalid.
    #[error("malformed message: {0}")]
    MalformedMessage(String),
}

// ── Header ────────────────────────────────────────────────────────────────────

/// The fixed 8-byte header carried by every message in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// The protocol object this message targets (events) or is sent on
    /// behalf of (requests).
    pub object_id: u32,
    /// Request/event selector, scoped to the object's interface.
    pub opcode: u16,
    /// Total message size including this header.  `size >= 8` for every
    /// real message; `0` is the end-of-buffer sentinel.
    pub size: u16,
}

impl MessageHeader {
    /// Decodes a header from the first 8 bytes of `bytes`.
    ///
    /// Never copies the payload; callers slice the remainder themselves.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::TruncatedHeader`] when fewer than 8 bytes are
    /// available.
    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        if bytes.len() < HEADER_SIZE {
            return Err(WireError::TruncatedHeader(bytes.len()));
        }
        Ok(Self {
            object_id: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            opcode: u16::from_le_bytes([bytes[4], bytes[5]]),
            size: u16::from_le_bytes([bytes[6], bytes[7]]),
        })
    }

    /// Encodes the header into its 8-byte wire image.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(&self.object_id.to_le_bytes());
        out[4..6].copy_from_slice(&self.opcode.to_le_bytes());
        out[6..8].copy_from_slice(&self.size.to_le_bytes());
        out
    }
}

/// Rounds `n` up to the next multiple of 4, the alignment unit for all
/// variable-length wire arguments.
pub fn round_up_to_4(n: u32) -> u32 {
    let rem = n % 4;
    if rem == 0 {
        n
    } else {
        n + (4 - rem)
    }
}

// ── Message building ──────────────────────────────────────────────────────────

/// Incrementally builds one outbound message.
///
/// The header is written first with a zero size field; [`finish`] patches
/// in the real size, so the size field can never disagree with the bytes
/// actually written.
///
/// [`finish`]: MessageBuilder::finish
pub struct MessageBuilder {
    buf: Vec<u8>,
}

impl MessageBuilder {
    /// Starts a message targeting `object_id` with the given request opcode.
    pub fn new(object_id: u32, opcode: u16) -> Self {
        let header = MessageHeader {
            object_id,
            opcode,
            size: 0,
        };
        Self {
            buf: header.encode().to_vec(),
        }
    }

    /// Appends a 4-byte little-endian unsigned argument.
    pub fn put_u32(mut self, value: u32) -> Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Appends a 4-byte little-endian signed argument.
    pub fn put_i32(mut self, value: i32) -> Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Appends a string argument: 4-byte length including the terminating
    /// NUL, the bytes, the NUL, then zero padding to a 4-byte boundary.
    pub fn put_string(mut self, value: &str) -> Self {
        let len_with_nul = value.len() as u32 + 1;
        let padded = round_up_to_4(len_with_nul);
        self.buf.extend_from_slice(&len_with_nul.to_le_bytes());
        self.buf.extend_from_slice(value.as_bytes());
        for _ in 0..(padded - len_with_nul + 1) {
            self.buf.push(0);
        }
        self
    }

    /// Patches the size field and returns the finished message bytes.
    pub fn finish(mut self) -> Vec<u8> {
        debug_assert!(self.buf.len() <= u16::MAX as usize);
        let size = self.buf.len() as u16;
        self.buf[6..8].copy_from_slice(&size.to_le_bytes());
        self.buf
    }
}

// ── Stream framing ────────────────────────────────────────────────────────────

/// One complete message drained out of a [`MessageStream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMessage {
    pub header: MessageHeader,
    /// Argument bytes after the header.  `payload.len() == size - 8`.
    pub payload: Vec<u8>,
}

/// Splits a raw byte stream into discrete messages.
///
/// A single socket read may contain zero, one, or many concatenated
/// messages, and a message may be split across two reads.  The stream
/// keeps any incomplete trailing bytes and completes them with the next
/// chunk rather than discarding them.
///
/// A header with `size == 0` is the end-of-buffer sentinel: it terminates
/// the current scan and drops the remainder of the pending bytes.
#[derive(Debug, Default)]
pub struct MessageStream {
    pending: Vec<u8>,
}

impl MessageStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one socket read's worth of bytes.
    pub fn push_chunk(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
    }

    /// Number of buffered bytes not yet consumed by a complete message.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drains and returns the next complete message, if one is buffered.
    ///
    /// `Ok(None)` means "no complete message yet": either fewer than 8
    /// bytes are pending, a trailing message is still incomplete, or the
    /// `size == 0` sentinel ended the scan.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::MalformedMessage`] for a nonzero size smaller
    /// than the header.  The pending buffer is cleared, since a corrupt
    /// size leaves no way to resynchronise with the stream.
    pub fn next_message(&mut self) -> Result<Option<StreamMessage>, WireError> {
        if self.pending.len() < HEADER_SIZE {
            return Ok(None);
        }
        let header = MessageHeader::decode(&self.pending)?;
        if header.size == 0 {
            self.pending.clear();
            return Ok(None);
        }
        let size = header.size as usize;
        if size < HEADER_SIZE {
            self.pending.clear();
            return Err(WireError::MalformedMessage(format!(
                "declared size {size} is smaller than the header"
            )));
        }
        if size > self.pending.len() {
            // Incomplete trailing message: wait for the next chunk.
            return Ok(None);
        }
        let payload = self.pending[HEADER_SIZE..size].to_vec();
        self.pending.drain(..size);
        Ok(Some(StreamMessage { header, payload }))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_round_trip() {
        let header = MessageHeader {
            object_id: 42,
            opcode: 7,
            size: 20,
        };

        let decoded = MessageHeader::decode(&header.encode()).expect("decode failed");

        assert_eq!(decoded, header);
    }

    #[test]
    fn test_header_decode_is_little_endian() {
        let bytes = [0x01, 0x00, 0x00, 0x00, 0x03, 0x00, 0x0C, 0x00];

        let header = MessageHeader::decode(&bytes).unwrap();

        assert_eq!(header.object_id, 1);
        assert_eq!(header.opcode, 3);
        assert_eq!(header.size, 12);
    }

    #[test]
    fn test_header_decode_short_buffer_is_truncated_error() {
        let result = MessageHeader::decode(&[0x01, 0x02]);
        assert_eq!(result, Err(WireError::TruncatedHeader(2)));
    }

    #[test]
    fn test_round_up_to_4_property_holds_over_range() {
        for n in 0u32..=10_000 {
            let rounded = round_up_to_4(n);
            if n % 4 == 0 {
                assert_eq!(rounded, n);
            } else {
                assert_eq!(rounded, (n / 4 + 1) * 4, "next multiple of 4 above {n}");
            }
            assert_eq!(rounded % 4, 0);
            assert!(rounded >= n);
            assert!(rounded - n < 4);
        }
    }

    #[test]
    fn test_builder_size_field_matches_bytes_written() {
        let msg = MessageBuilder::new(3, 0).put_u32(9).put_u32(10).finish();

        let header = MessageHeader::decode(&msg).unwrap();
        assert_eq!(header.size as usize, msg.len());
        assert_eq!(msg.len(), HEADER_SIZE + 8);
    }

    #[test]
    fn test_builder_string_is_nul_terminated_and_padded() {
        // "wl_shm" is 6 bytes, 7 with the NUL, padded to 8.
        let msg = MessageBuilder::new(2, 0).put_string("wl_shm").finish();

        assert_eq!(msg.len(), HEADER_SIZE + 4 + 8);
        let len = u32::from_le_bytes(msg[8..12].try_into().unwrap());
        assert_eq!(len, 7, "length includes the terminating NUL");
        assert_eq!(&msg[12..18], b"wl_shm");
        assert_eq!(&msg[18..20], &[0, 0], "NUL plus one padding byte");
    }

    #[test]
    fn test_builder_string_at_exact_boundary_gets_no_extra_padding() {
        // "abc" is 3 bytes, 4 with the NUL: already aligned.
        let msg = MessageBuilder::new(2, 0).put_string("abc").finish();
        assert_eq!(msg.len(), HEADER_SIZE + 4 + 4);
    }

    #[test]
    fn test_stream_yields_two_concatenated_messages_in_order_with_no_residue() {
        let first = MessageBuilder::new(10, 1).put_u32(0xAA).finish();
        let second = MessageBuilder::new(11, 2).put_u32(0xBB).finish();
        let mut chunk = first.clone();
        chunk.extend_from_slice(&second);

        let mut stream = MessageStream::new();
        stream.push_chunk(&chunk);

        let a = stream.next_message().unwrap().expect("first message");
        let b = stream.next_message().unwrap().expect("second message");
        assert_eq!(a.header.object_id, 10);
        assert_eq!(b.header.object_id, 11);
        assert!(stream.next_message().unwrap().is_none());
        assert_eq!(stream.pending_len(), 0, "no residue may remain");
    }

    #[test]
    fn test_stream_buffers_message_split_across_two_chunks() {
        let msg = MessageBuilder::new(7, 3).put_u32(1).put_u32(2).finish();
        let (head, tail) = msg.split_at(10);

        let mut stream = MessageStream::new();
        stream.push_chunk(head);
        assert!(
            stream.next_message().unwrap().is_none(),
            "incomplete tail must be retained, not discarded"
        );

        stream.push_chunk(tail);
        let complete = stream.next_message().unwrap().expect("reassembled message");
        assert_eq!(complete.header.object_id, 7);
        assert_eq!(complete.payload.len(), 8);
        assert_eq!(stream.pending_len(), 0);
    }

    #[test]
    fn test_stream_size_zero_sentinel_ends_scan() {
        let msg = MessageBuilder::new(5, 0).finish();
        let mut chunk = msg;
        // A zeroed header follows: size == 0 terminates the scan.
        chunk.extend_from_slice(&[0u8; HEADER_SIZE]);
        chunk.extend_from_slice(&[0xFF; 3]);

        let mut stream = MessageStream::new();
        stream.push_chunk(&chunk);

        assert!(stream.next_message().unwrap().is_some());
        assert!(stream.next_message().unwrap().is_none());
        assert_eq!(stream.pending_len(), 0, "sentinel drops the remainder");
    }

    #[test]
    fn test_stream_nonzero_size_below_header_is_malformed() {
        let mut bytes = MessageHeader {
            object_id: 1,
            opcode: 0,
            size: 4,
        }
        .encode()
        .to_vec();
        bytes.extend_from_slice(&[0u8; 4]);

        let mut stream = MessageStream::new();
        stream.push_chunk(&bytes);

        assert!(matches!(
            stream.next_message(),
            Err(WireError::MalformedMessage(_))
        ));
        assert_eq!(stream.pending_len(), 0);
    }
}
