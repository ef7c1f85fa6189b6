//! Link frame encoding/decoding.
//!
//! Every transmission between host and NCP is one link frame:
//!
//! ```text
//! +------+------+--------+--------+------+-------+------+-------------------+
//! | 0xDE | 0xAD | len_lo | len_hi | kind | flags | crc8 | body[0..len]      |
//! +------+------+--------+--------+------+-------+------+-------------------+
//! ```
//!
//! Flags: bit0 ACK, bit1 retransmit, bits2-3 send seq, bits4-5 ack seq,
//! bit6 first fragment, bit7 last fragment. The CRC-8 covers the six
//! header bytes before it and is checked separately from parsing so that
//! a mismatch can be reported without discarding the frame.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::constants::*;
use crate::crc::header_crc8;
use crate::{FrameError, SeqNum};

/// Decoded flags byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameFlags {
    /// Pure link acknowledgement; carries nothing to reassemble.
    pub ack: bool,
    /// Retransmission of an earlier frame.
    pub retransmit: bool,
    /// Sender's sequence number.
    pub send_seq: SeqNum,
    /// Sequence number being acknowledged.
    pub ack_seq: SeqNum,
    /// Body starts a logical message.
    pub first_fragment: bool,
    /// Body ends a logical message.
    pub last_fragment: bool,
}

impl FrameFlags {
    /// Flags of a data frame carrying a whole message in one body.
    pub fn single(send_seq: SeqNum) -> Self {
        FrameFlags {
            send_seq,
            first_fragment: true,
            last_fragment: true,
            ..Default::default()
        }
    }

    /// Flags of a pure acknowledgement.
    pub fn ack(ack_seq: SeqNum) -> Self {
        FrameFlags {
            ack: true,
            ack_seq,
            ..Default::default()
        }
    }

    /// Parse from the wire byte.
    pub fn from_byte(byte: u8) -> Self {
        FrameFlags {
            ack: byte & FLAG_ACK != 0,
            retransmit: byte & FLAG_RETRANSMIT != 0,
            send_seq: SeqNum::new((byte & FLAG_SEND_SEQ_MASK) >> FLAG_SEND_SEQ_SHIFT),
            ack_seq: SeqNum::new((byte & FLAG_ACK_SEQ_MASK) >> FLAG_ACK_SEQ_SHIFT),
            first_fragment: byte & FLAG_FIRST_FRAGMENT != 0,
            last_fragment: byte & FLAG_LAST_FRAGMENT != 0,
        }
    }

    /// Encode to the wire byte.
    pub fn to_byte(&self) -> u8 {
        let mut byte = 0u8;
        if self.ack {
            byte |= FLAG_ACK;
        }
        if self.retransmit {
            byte |= FLAG_RETRANSMIT;
        }
        byte |= self.send_seq.value() << FLAG_SEND_SEQ_SHIFT;
        byte |= self.ack_seq.value() << FLAG_ACK_SEQ_SHIFT;
        if self.first_fragment {
            byte |= FLAG_FIRST_FRAGMENT;
        }
        if self.last_fragment {
            byte |= FLAG_LAST_FRAGMENT;
        }
        byte
    }
}

/// The fixed seven-byte frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Declared length of the body following the header.
    pub body_len: u16,
    /// Advisory packet class tag.
    pub kind: u8,
    /// Flag bits.
    pub flags: FrameFlags,
    /// CRC-8 carried on the wire.
    pub crc: u8,
}

impl FrameHeader {
    /// Build a header with a freshly computed CRC.
    pub fn new(body_len: u16, kind: u8, flags: FrameFlags) -> Self {
        let mut header = FrameHeader {
            body_len,
            kind,
            flags,
            crc: 0,
        };
        header.crc = header.compute_crc();
        header
    }

    /// Parse the fixed header. The CRC is read, not verified.
    pub fn decode(data: &[u8]) -> Result<Self, FrameError> {
        // Signature before length, so a short foreign buffer is still rejected as foreign.
        let sig_len = data.len().min(SIGNATURE.len());
        if data[..sig_len] != SIGNATURE[..sig_len] {
            return Err(FrameError::NotThisProtocol);
        }
        if data.len() < FRAME_HEADER_LEN {
            return Err(FrameError::Truncated {
                expected: FRAME_HEADER_LEN,
                actual: data.len(),
            });
        }

        let mut buf = &data[BODY_LEN_OFFSET..FRAME_HEADER_LEN];
        let body_len = buf.get_u16_le();
        let kind = buf.get_u8();
        let flags = FrameFlags::from_byte(buf.get_u8());
        let crc = buf.get_u8();

        Ok(FrameHeader {
            body_len,
            kind,
            flags,
            crc,
        })
    }

    /// Encode the header bytes, writing the stored CRC as-is.
    pub fn encode(&self) -> [u8; FRAME_HEADER_LEN] {
        let mut bytes = self.encode_without_crc();
        bytes[HEADER_CRC_OFFSET] = self.crc;
        bytes
    }

    fn encode_without_crc(&self) -> [u8; FRAME_HEADER_LEN] {
        let mut bytes = [0u8; FRAME_HEADER_LEN];
        bytes[..2].copy_from_slice(&SIGNATURE);
        bytes[BODY_LEN_OFFSET..KIND_OFFSET].copy_from_slice(&self.body_len.to_le_bytes());
        bytes[KIND_OFFSET] = self.kind;
        bytes[FLAGS_OFFSET] = self.flags.to_byte();
        bytes
    }

    /// CRC-8 the header fields should carry.
    pub fn compute_crc(&self) -> u8 {
        header_crc8(&self.encode_without_crc()[..HEADER_CRC_OFFSET])
    }

    /// Whether the carried CRC matches the header fields.
    pub fn verify_crc(&self) -> bool {
        self.crc == self.compute_crc()
    }

    /// Total wire length of a complete frame with this header.
    pub fn frame_len(&self) -> usize {
        FRAME_HEADER_LEN + self.body_len as usize
    }
}

/// One link frame: header plus the body bytes that were captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Parsed header.
    pub header: FrameHeader,
    /// Body bytes. Shorter than `header.body_len` when the capture was cut.
    pub body: Bytes,
}

impl Frame {
    /// Build a data frame around `body` with a correct header CRC.
    ///
    /// Fails if the body is longer than the length field can declare.
    pub fn data(kind: u8, flags: FrameFlags, body: impl Into<Bytes>) -> Result<Self, FrameError> {
        let body = body.into();
        let body_len = u16::try_from(body.len()).map_err(|_| FrameError::BodyTooLong {
            len: body.len(),
            max: MAX_FRAME_BODY_LEN,
        })?;
        Ok(Frame {
            header: FrameHeader::new(body_len, kind, flags),
            body,
        })
    }

    /// Build a pure acknowledgement of `ack_seq`.
    pub fn ack(kind: u8, ack_seq: SeqNum) -> Self {
        Frame {
            header: FrameHeader::new(0, kind, FrameFlags::ack(ack_seq)),
            body: Bytes::new(),
        }
    }

    /// Flags shortcut.
    pub fn flags(&self) -> &FrameFlags {
        &self.header.flags
    }

    /// Whether the header CRC verifies.
    pub fn verify_header_crc(&self) -> bool {
        self.header.verify_crc()
    }

    /// Whether fewer body bytes were captured than declared.
    pub fn is_body_truncated(&self) -> bool {
        self.body.len() < self.header.body_len as usize
    }

    /// Encode header and body for transmission.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(FRAME_HEADER_LEN + self.body.len());
        buf.put_slice(&self.header.encode());
        buf.put_slice(&self.body);
        buf.freeze()
    }
}

/// Decode one frame from the start of `data`.
///
/// Returns the frame and the offset of its first body byte. The body holds
/// at most `body_len` bytes and fewer if `data` ends early. The header CRC
/// is not verified here; see [`Frame::verify_header_crc`].
pub fn decode_frame(data: &[u8]) -> Result<(Frame, usize), FrameError> {
    let header = FrameHeader::decode(data)?;
    let end = header.frame_len().min(data.len());
    let body = Bytes::copy_from_slice(&data[FRAME_HEADER_LEN..end]);
    Ok((Frame { header, body }, FRAME_HEADER_LEN))
}

/// An item produced by [`FrameStream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamItem {
    /// A complete frame.
    Frame(Frame),
    /// Bytes skipped while searching for a signature.
    Skipped(Bytes),
    /// A header declaring an implausible body; its signature was skipped.
    Oversized {
        /// The rejected header.
        header: FrameHeader,
        /// The skipped signature bytes.
        skipped: Bytes,
    },
}

/// Accumulates a byte stream and splits it into frames.
///
/// Bytes that do not start with the signature are surfaced as
/// [`StreamItem::Skipped`] so the caller can hand them to another decoder.
#[derive(Debug)]
pub struct FrameStream {
    /// Buffer for accumulating incoming data.
    buffer: BytesMut,
    /// Largest body accepted before a header is treated as a false match.
    max_body: usize,
}

impl Default for FrameStream {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_BODY)
    }
}

impl FrameStream {
    /// Create a stream buffer accepting bodies up to `max_body` bytes.
    pub fn new(max_body: usize) -> Self {
        FrameStream {
            buffer: BytesMut::with_capacity(FRAME_HEADER_LEN + max_body),
            max_body,
        }
    }

    /// Add received data to the buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to take the next item from the buffer.
    ///
    /// Returns `None` when more data is needed.
    pub fn next_item(&mut self) -> Option<StreamItem> {
        if self.buffer.is_empty() {
            return None;
        }

        match find_signature(&self.buffer) {
            Some(0) => {}
            Some(pos) => return Some(StreamItem::Skipped(self.buffer.split_to(pos).freeze())),
            None => {
                // A lone trailing 0xDE may be the start of the next signature.
                let keep = usize::from(self.buffer.last() == Some(&SIGNATURE_FIRST_BYTE));
                let skip = self.buffer.len() - keep;
                if skip == 0 {
                    return None;
                }
                return Some(StreamItem::Skipped(self.buffer.split_to(skip).freeze()));
            }
        }

        if self.buffer.len() < FRAME_HEADER_LEN {
            return None;
        }
        let header = FrameHeader::decode(&self.buffer).ok()?;

        if header.body_len as usize > self.max_body {
            let skipped = self.buffer.split_to(SIGNATURE.len()).freeze();
            return Some(StreamItem::Oversized { header, skipped });
        }

        if self.buffer.len() < header.frame_len() {
            return None;
        }

        let mut frame_bytes = self.buffer.split_to(header.frame_len());
        frame_bytes.advance(FRAME_HEADER_LEN);
        Some(StreamItem::Frame(Frame {
            header,
            body: frame_bytes.freeze(),
        }))
    }

    /// Take whatever is left in the buffer (an incomplete frame or noise).
    pub fn take_remaining(&mut self) -> Bytes {
        self.buffer.split().freeze()
    }

    /// Get the number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

fn find_signature(data: &[u8]) -> Option<usize> {
    data.windows(SIGNATURE.len()).position(|w| w == SIGNATURE)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HEADER: [u8; 7] = [0xDE, 0xAD, 0x06, 0x00, 0x01, 0x40, 0x7A];

    #[test]
    fn test_decode_sample_header() {
        let (frame, body_offset) = decode_frame(&SAMPLE_HEADER).unwrap();
        assert_eq!(body_offset, FRAME_HEADER_LEN);
        assert_eq!(frame.header.body_len, 6);
        assert_eq!(frame.header.kind, 1);
        assert!(frame.flags().first_fragment);
        assert!(!frame.flags().last_fragment);
        assert!(!frame.flags().ack);
        assert_eq!(frame.header.crc, 0x7A);
        assert!(frame.verify_header_crc());
        assert!(frame.is_body_truncated());
    }

    #[test]
    fn test_flags_bits() {
        let flags = FrameFlags::from_byte(0b1011_1110);
        assert!(!flags.ack);
        assert!(flags.retransmit);
        assert_eq!(flags.send_seq, SeqNum::new(3));
        assert_eq!(flags.ack_seq, SeqNum::new(3));
        assert!(!flags.first_fragment);
        assert!(flags.last_fragment);
        assert_eq!(flags.to_byte(), 0b1011_1110);

        let ack = FrameFlags::ack(SeqNum::new(2));
        assert_eq!(ack.to_byte(), 0x21);
    }

    #[test]
    fn test_signature_mismatch() {
        assert_eq!(
            decode_frame(&[0x00, 0xAD, 0x06, 0x00, 0x01, 0x40, 0x7A]),
            Err(FrameError::NotThisProtocol)
        );
        assert_eq!(decode_frame(&[0x12]), Err(FrameError::NotThisProtocol));
    }

    #[test]
    fn test_truncated_header() {
        assert_eq!(
            decode_frame(&[0xDE, 0xAD, 0x06]),
            Err(FrameError::Truncated {
                expected: 7,
                actual: 3
            })
        );
        assert_eq!(
            decode_frame(&[]),
            Err(FrameError::Truncated {
                expected: 7,
                actual: 0
            })
        );
    }

    #[test]
    fn test_corrupted_crc_still_parses() {
        let mut bytes = SAMPLE_HEADER;
        bytes[HEADER_CRC_OFFSET] ^= 0xFF;
        let (frame, _) = decode_frame(&bytes).unwrap();
        assert!(!frame.verify_header_crc());
        assert_eq!(frame.header.body_len, 6);
        assert!(frame.flags().first_fragment);
    }

    #[test]
    fn test_encode_decode() {
        let frame = Frame::data(0x06, FrameFlags::single(SeqNum::new(1)), vec![1, 2, 3]).unwrap();
        let encoded = frame.encode();
        assert_eq!(encoded.len(), FRAME_HEADER_LEN + 3);

        let (decoded, offset) = decode_frame(&encoded).unwrap();
        assert_eq!(decoded, frame);
        assert_eq!(&encoded[offset..], &[1, 2, 3]);
        assert!(decoded.verify_header_crc());
    }

    #[test]
    fn test_body_must_fit_length_field() {
        let largest = Frame::data(1, FrameFlags::default(), vec![0; MAX_FRAME_BODY_LEN]).unwrap();
        assert_eq!(largest.header.body_len, u16::MAX);

        assert_eq!(
            Frame::data(1, FrameFlags::default(), vec![0; 70_000]),
            Err(FrameError::BodyTooLong {
                len: 70_000,
                max: MAX_FRAME_BODY_LEN
            })
        );
    }

    #[test]
    fn test_stream_partial() {
        let frame = Frame::data(1, FrameFlags::single(SeqNum::new(0)), vec![9; 10]).unwrap();
        let encoded = frame.encode();
        let mut stream = FrameStream::default();

        stream.push(&encoded[..5]);
        assert!(stream.next_item().is_none());
        stream.push(&encoded[5..12]);
        assert!(stream.next_item().is_none());
        stream.push(&encoded[12..]);
        assert_eq!(stream.next_item(), Some(StreamItem::Frame(frame)));
        assert!(stream.next_item().is_none());
        assert_eq!(stream.buffered_len(), 0);
    }

    #[test]
    fn test_stream_skips_garbage() {
        let frame = Frame::ack(1, SeqNum::new(3));
        let mut stream = FrameStream::default();
        stream.push(&[0x00, 0x11, 0xDE]);
        stream.push(&frame.encode());

        assert_eq!(
            stream.next_item(),
            Some(StreamItem::Skipped(Bytes::from_static(&[0x00, 0x11, 0xDE])))
        );
        assert_eq!(stream.next_item(), Some(StreamItem::Frame(frame)));
    }

    #[test]
    fn test_stream_keeps_partial_signature() {
        let mut stream = FrameStream::default();
        stream.push(&[0x42, 0xDE]);
        assert_eq!(
            stream.next_item(),
            Some(StreamItem::Skipped(Bytes::from_static(&[0x42])))
        );
        assert!(stream.next_item().is_none());
        assert_eq!(stream.buffered_len(), 1);
    }

    #[test]
    fn test_stream_oversized_header() {
        let mut stream = FrameStream::new(16);
        let header = FrameHeader::new(500, 1, FrameFlags::single(SeqNum::new(0)));
        stream.push(&header.encode());

        match stream.next_item() {
            Some(StreamItem::Oversized { header: rejected, skipped }) => {
                assert_eq!(rejected.body_len, 500);
                assert_eq!(&skipped[..], &SIGNATURE);
            }
            other => panic!("Expected Oversized, got {:?}", other),
        }
        // The rest of the bogus header is noise now.
        assert!(matches!(stream.next_item(), Some(StreamItem::Skipped(_))));
    }

    #[test]
    fn test_stream_multiple() {
        let first = Frame::data(1, FrameFlags::single(SeqNum::new(0)), vec![1]).unwrap();
        let second = Frame::data(1, FrameFlags::single(SeqNum::new(1)), vec![2, 2]).unwrap();
        let mut stream = FrameStream::default();
        stream.push(&first.encode());
        stream.push(&second.encode());

        assert_eq!(stream.next_item(), Some(StreamItem::Frame(first)));
        assert_eq!(stream.next_item(), Some(StreamItem::Frame(second)));
        assert!(stream.next_item().is_none());
    }
}
