//! Common types used in the protocol.

use std::fmt;

use crate::constants::*;

/// A two-bit link sequence number (modulo 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SeqNum(u8);

impl SeqNum {
    /// Create a sequence number, wrapping into `0..4`.
    pub const fn new(value: u8) -> Self {
        SeqNum(value % SEQ_MODULUS)
    }

    /// Get the raw value.
    pub const fn value(self) -> u8 {
        self.0
    }

    /// The sequence number that follows this one.
    pub const fn next(self) -> Self {
        SeqNum::new(self.0 + 1)
    }

    /// Forward distance from `earlier` to `self`, modulo 4.
    pub const fn distance_from(self, earlier: SeqNum) -> u8 {
        (self.0 + SEQ_MODULUS - earlier.0) % SEQ_MODULUS
    }
}

impl fmt::Display for SeqNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SeqNum> for u8 {
    fn from(seq: SeqNum) -> Self {
        seq.0
    }
}

/// High-level packet class carried in the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PacketKind {
    /// Host → NCP call.
    Request,
    /// NCP → host reply to a request.
    Response,
    /// Unsolicited NCP → host notification.
    Indication,
}

impl PacketKind {
    /// Lowercase label for logs and metrics.
    pub const fn as_label(&self) -> &'static str {
        match self {
            PacketKind::Request => "request",
            PacketKind::Response => "response",
            PacketKind::Indication => "indication",
        }
    }

    /// Whether the envelope carries a transaction number.
    pub const fn has_transaction(&self) -> bool {
        matches!(self, PacketKind::Request | PacketKind::Response)
    }

    /// Whether the envelope carries a status.
    pub const fn has_status(&self) -> bool {
        matches!(self, PacketKind::Response)
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketKind::Request => write!(f, "REQUEST"),
            PacketKind::Response => write!(f, "RESPONSE"),
            PacketKind::Indication => write!(f, "INDICATION"),
        }
    }
}

impl TryFrom<u8> for PacketKind {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            PACKET_KIND_REQUEST => Ok(PacketKind::Request),
            PACKET_KIND_RESPONSE => Ok(PacketKind::Response),
            PACKET_KIND_INDICATION => Ok(PacketKind::Indication),
            other => Err(other),
        }
    }
}

impl From<PacketKind> for u8 {
    fn from(kind: PacketKind) -> Self {
        match kind {
            PacketKind::Request => PACKET_KIND_REQUEST,
            PacketKind::Response => PACKET_KIND_RESPONSE,
            PacketKind::Indication => PACKET_KIND_INDICATION,
        }
    }
}

/// Provisional identity of a message being reassembled.
///
/// Taken from the first fragment when it holds the envelope's fixed header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallLabel {
    /// Raw packet kind byte (may be outside the known set).
    pub packet_kind: u8,
    /// Command identifier.
    pub call_id: u16,
}

impl fmt::Display for CallLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match PacketKind::try_from(self.packet_kind) {
            Ok(kind) => write!(f, "{} 0x{:04X}", kind, self.call_id),
            Err(raw) => write!(f, "kind {} 0x{:04X}", raw, self.call_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_wraps() {
        assert_eq!(SeqNum::new(5).value(), 1);
        assert_eq!(SeqNum::new(3).next(), SeqNum::new(0));
    }

    #[test]
    fn test_seq_distance() {
        assert_eq!(SeqNum::new(1).distance_from(SeqNum::new(0)), 1);
        assert_eq!(SeqNum::new(0).distance_from(SeqNum::new(3)), 1);
        assert_eq!(SeqNum::new(2).distance_from(SeqNum::new(2)), 0);
        assert_eq!(SeqNum::new(1).distance_from(SeqNum::new(2)), 3);
    }

    #[test]
    fn test_packet_kind_conversion() {
        assert_eq!(PacketKind::try_from(1), Ok(PacketKind::Response));
        assert_eq!(PacketKind::try_from(7), Err(7));
        assert_eq!(u8::from(PacketKind::Indication), 2);
        assert!(PacketKind::Request.has_transaction());
        assert!(!PacketKind::Indication.has_transaction());
        assert!(PacketKind::Response.has_status());
    }

    #[test]
    fn test_call_label_display() {
        let label = CallLabel {
            packet_kind: PACKET_KIND_REQUEST,
            call_id: 0x0401,
        };
        assert_eq!(label.to_string(), "REQUEST 0x0401");
    }
}
