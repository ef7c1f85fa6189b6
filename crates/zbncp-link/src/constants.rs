//! Protocol constants
//!
//! Byte offsets, flag masks and well-known values of the ZBNCP link frame
//! and the high-level envelope carried inside reassembled messages.

// ============================================================================
// Link Frame Header
// ============================================================================

/// First byte of the frame signature.
pub const SIGNATURE_FIRST_BYTE: u8 = 0xDE;
/// Second byte of the frame signature.
pub const SIGNATURE_SECOND_BYTE: u8 = 0xAD;
/// Fixed two-byte marker that starts every link frame.
pub const SIGNATURE: [u8; 2] = [SIGNATURE_FIRST_BYTE, SIGNATURE_SECOND_BYTE];

/// Size of the fixed frame header: signature(2) + length(2) + kind(1) + flags(1) + crc8(1).
pub const FRAME_HEADER_LEN: usize = 7;
/// Offset of the little-endian body length.
pub const BODY_LEN_OFFSET: usize = 2;
/// Offset of the advisory kind byte.
pub const KIND_OFFSET: usize = 4;
/// Offset of the flags byte.
pub const FLAGS_OFFSET: usize = 5;
/// Offset of the header CRC-8. The CRC covers every byte before it.
pub const HEADER_CRC_OFFSET: usize = 6;

/// Largest body the 16-bit length field can declare.
pub const MAX_FRAME_BODY_LEN: usize = u16::MAX as usize;

/// Default upper bound on a declared frame body when resynchronising a byte stream.
pub const DEFAULT_MAX_FRAME_BODY: usize = 1024;

// ============================================================================
// Frame Flags
// ============================================================================

/// Frame is a pure link-level acknowledgement.
pub const FLAG_ACK: u8 = 0x01;
/// Frame is a retransmission of an earlier frame.
pub const FLAG_RETRANSMIT: u8 = 0x02;
/// Two-bit send sequence number.
pub const FLAG_SEND_SEQ_MASK: u8 = 0x0C;
/// Shift of the send sequence number.
pub const FLAG_SEND_SEQ_SHIFT: u8 = 2;
/// Two-bit acknowledged sequence number.
pub const FLAG_ACK_SEQ_MASK: u8 = 0x30;
/// Shift of the acknowledged sequence number.
pub const FLAG_ACK_SEQ_SHIFT: u8 = 4;
/// Frame body starts a logical message.
pub const FLAG_FIRST_FRAGMENT: u8 = 0x40;
/// Frame body ends a logical message.
pub const FLAG_LAST_FRAGMENT: u8 = 0x80;

/// Sequence numbers are carried in two bits.
pub const SEQ_MODULUS: u8 = 4;

// ============================================================================
// High-Level Envelope
// ============================================================================

/// Size of the body CRC-16 that opens every reassembled message.
pub const BODY_CRC_LEN: usize = 2;
/// Offset of the envelope version byte.
pub const VERSION_OFFSET: usize = 2;
/// Offset of the packet kind byte.
pub const PACKET_KIND_OFFSET: usize = 3;
/// Offset of the little-endian call identifier.
pub const CALL_ID_OFFSET: usize = 4;
/// Size of the envelope part present for every packet kind: crc16(2) + version(1) + kind(1) + call_id(2).
pub const ENVELOPE_FIXED_LEN: usize = 6;

/// The only envelope version this crate understands fully.
pub const HL_PROTOCOL_VERSION: u8 = 0;

/// Packet kind value of a request (host → NCP).
pub const PACKET_KIND_REQUEST: u8 = 0;
/// Packet kind value of a response (NCP → host).
pub const PACKET_KIND_RESPONSE: u8 = 1;
/// Packet kind value of an unsolicited indication (NCP → host).
pub const PACKET_KIND_INDICATION: u8 = 2;

// ============================================================================
// Response Status Categories
// ============================================================================

/// Generic return codes.
pub const STATUS_CAT_GENERIC: u8 = 0;
/// Operating-system style error numbers.
pub const STATUS_CAT_SYSTEM: u8 = 1;
/// IEEE 802.15.4 MAC status codes.
pub const STATUS_CAT_MAC: u8 = 2;
/// Network layer status codes.
pub const STATUS_CAT_NWK: u8 = 3;
/// Application support sub-layer status codes.
pub const STATUS_CAT_APS: u8 = 4;
/// Device object (coordination) status codes.
pub const STATUS_CAT_ZDO: u8 = 5;
/// Certificate-based key exchange status codes.
pub const STATUS_CAT_CBKE: u8 = 6;
