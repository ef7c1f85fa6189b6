//! Protocol error types.
//!
//! [`FrameError`] and [`EnvelopeError`] are returned by the single-call
//! decoders. [`Anomaly`] is the reported, non-fatal taxonomy attached to
//! decoded frames and messages; nothing in this crate aborts a stream.

use bytes::Bytes;
use thiserror::Error;

use crate::SeqNum;

/// Errors returned by [`decode_frame`](crate::decode_frame).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The leading bytes are not the ZBNCP signature. No input was consumed.
    #[error("not a ZBNCP frame: signature mismatch")]
    NotThisProtocol,

    /// Fewer bytes than the fixed frame header.
    #[error("frame truncated: expected at least {expected} bytes, got {actual}")]
    Truncated {
        /// Minimum length required.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },

    /// Body does not fit the 16-bit length field.
    #[error("frame body of {len} bytes exceeds the {max}-byte length field")]
    BodyTooLong {
        /// Body length offered.
        len: usize,
        /// Largest encodable body.
        max: usize,
    },
}

/// Errors returned by [`decode_envelope`](crate::decode_envelope).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// Message is too short for the fields its packet kind requires.
    #[error("envelope truncated: expected at least {expected} bytes, got {actual}")]
    Truncated {
        /// Minimum length required.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },

    /// Packet kind is not REQUEST, RESPONSE or INDICATION.
    #[error("unknown packet kind: {value}")]
    UnknownPacketKind {
        /// Raw packet kind byte.
        value: u8,
        /// Whether the body CRC verified before the kind was rejected.
        crc_valid: bool,
        /// The whole message, for display as opaque data.
        raw: Bytes,
    },

    /// Body CRC did not verify. Only returned by the strict decoder.
    #[error("body CRC mismatch: carried 0x{expected:04X}, computed 0x{actual:04X}")]
    CrcMismatch {
        /// CRC carried in the message.
        expected: u16,
        /// CRC computed over the message.
        actual: u16,
    },
}

/// Non-fatal protocol anomalies reported alongside decoded data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    /// Header CRC-8 did not verify.
    #[error("header CRC mismatch: carried 0x{expected:02X}, computed 0x{actual:02X}")]
    HeaderCrcMismatch {
        /// CRC carried in the header.
        expected: u8,
        /// CRC computed over the header.
        actual: u8,
    },

    /// Body CRC-16 did not verify.
    #[error("body CRC mismatch: carried 0x{expected:04X}, computed 0x{actual:04X}")]
    BodyCrcMismatch {
        /// CRC carried in the message.
        expected: u16,
        /// CRC computed over the message.
        actual: u16,
    },

    /// Envelope packet kind outside the known set.
    #[error("unknown packet kind {0}")]
    UnknownPacketKind(u8),

    /// Envelope version other than the supported one.
    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(u8),

    /// Continuation fragment with no message in progress.
    #[error("orphan fragment ({len} bytes) without a first fragment")]
    OrphanFragment {
        /// Body length of the orphan.
        len: usize,
    },

    /// A first fragment arrived while another message was still open.
    #[error("reassembly reset: discarded {discarded} bytes of an unterminated message")]
    ReassemblyReset {
        /// Bytes dropped from the stale buffer.
        discarded: usize,
    },

    /// Same sequence number as the previous frame in this direction.
    #[error("possible duplicate of frame seq {0}")]
    PossibleDuplicate(SeqNum),

    /// Sequence number skipped ahead.
    #[error("sequence gap: {missing} frame(s) missing before seq {seq}")]
    SequenceGap {
        /// Frames presumed lost.
        missing: u8,
        /// Sequence number that was received.
        seq: SeqNum,
    },

    /// Fewer body bytes were captured than the header declares.
    #[error("body truncated: declared {declared} bytes, captured {captured}")]
    BodyTruncated {
        /// Declared body length.
        declared: usize,
        /// Captured body length.
        captured: usize,
    },

    /// Declared body exceeds the configured maximum; the header was skipped.
    #[error("frame too long: declared {declared} bytes, maximum {max}")]
    FrameTooLong {
        /// Declared body length.
        declared: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Reassembled message too short for its envelope.
    #[error("envelope truncated: expected at least {expected} bytes, got {actual}")]
    EnvelopeTruncated {
        /// Minimum length required.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },
}

impl Anomaly {
    /// Stable label for metrics and machine-readable output.
    pub fn label(&self) -> &'static str {
        match self {
            Anomaly::HeaderCrcMismatch { .. } => "header_crc_mismatch",
            Anomaly::BodyCrcMismatch { .. } => "body_crc_mismatch",
            Anomaly::UnknownPacketKind(_) => "unknown_packet_kind",
            Anomaly::UnsupportedVersion(_) => "unsupported_version",
            Anomaly::OrphanFragment { .. } => "orphan_fragment",
            Anomaly::ReassemblyReset { .. } => "reassembly_reset",
            Anomaly::PossibleDuplicate(_) => "possible_duplicate",
            Anomaly::SequenceGap { .. } => "sequence_gap",
            Anomaly::BodyTruncated { .. } => "body_truncated",
            Anomaly::FrameTooLong { .. } => "frame_too_long",
            Anomaly::EnvelopeTruncated { .. } => "envelope_truncated",
        }
    }

    /// Whether the anomaly makes the frame or message malformed, as opposed
    /// to an advisory link observation.
    pub fn is_malformed(&self) -> bool {
        !matches!(
            self,
            Anomaly::PossibleDuplicate(_) | Anomaly::SequenceGap { .. }
        )
    }
}

impl From<&EnvelopeError> for Anomaly {
    fn from(err: &EnvelopeError) -> Self {
        match err {
            EnvelopeError::Truncated { expected, actual } => Anomaly::EnvelopeTruncated {
                expected: *expected,
                actual: *actual,
            },
            EnvelopeError::UnknownPacketKind { value, .. } => Anomaly::UnknownPacketKind(*value),
            EnvelopeError::CrcMismatch { expected, actual } => Anomaly::BodyCrcMismatch {
                expected: *expected,
                actual: *actual,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FrameError::Truncated {
            expected: 7,
            actual: 3,
        };
        assert!(err.to_string().contains("at least 7"));

        let anomaly = Anomaly::HeaderCrcMismatch {
            expected: 0x7A,
            actual: 0x10,
        };
        assert_eq!(
            anomaly.to_string(),
            "header CRC mismatch: carried 0x7A, computed 0x10"
        );
    }

    #[test]
    fn test_advisory_anomalies_are_not_malformed() {
        assert!(!Anomaly::PossibleDuplicate(SeqNum::new(1)).is_malformed());
        assert!(Anomaly::OrphanFragment { len: 4 }.is_malformed());
    }

    #[test]
    fn test_envelope_error_to_anomaly() {
        let err = EnvelopeError::UnknownPacketKind {
            value: 9,
            crc_valid: true,
            raw: Bytes::from_static(&[0, 0, 0, 9, 0, 0]),
        };
        let anomaly = Anomaly::from(&err);
        assert_eq!(anomaly, Anomaly::UnknownPacketKind(9));
        assert_eq!(anomaly.label(), "unknown_packet_kind");
    }
}
