//! High-level envelope decoding.
//!
//! A reassembled message opens with a common header:
//!
//! | Field       | Size | Notes                                   |
//! |-------------|------|-----------------------------------------|
//! | crc16       | 2    | CRC-16 over every byte after this field |
//! | version     | 1    | envelope format version                 |
//! | packet_kind | 1    | REQUEST=0, RESPONSE=1, INDICATION=2     |
//! | call_id     | 2    | command identifier                      |
//! | tsn         | 1    | REQUEST and RESPONSE only               |
//! | status      | 2    | category + code, RESPONSE only          |
//!
//! The remaining bytes are the command body, left for a
//! [`CommandSchema`](crate::CommandSchema) to interpret.
//!
//! A CRC mismatch or an unsupported version is reported on the decoded
//! [`Envelope`], not raised: the fields are still parsed best-effort.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::constants::*;
use crate::crc::body_crc16;
use crate::{Anomaly, CallLabel, EnvelopeError, PacketKind, Status};

/// A decoded high-level message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// CRC carried in the message.
    pub body_crc: u16,
    /// CRC computed over the message.
    pub computed_crc: u16,
    /// Envelope format version.
    pub version: u8,
    /// Packet class.
    pub packet_kind: PacketKind,
    /// Command identifier.
    pub call_id: u16,
    /// Transaction sequence number (REQUEST and RESPONSE).
    pub transaction: Option<u8>,
    /// Result of the call (RESPONSE).
    pub status: Option<Status>,
    /// Unparsed command body.
    pub body: Bytes,
}

impl Envelope {
    /// Build a REQUEST.
    pub fn request(call_id: u16, transaction: u8, body: impl Into<Bytes>) -> Self {
        Envelope::new(PacketKind::Request, call_id, Some(transaction), None, body.into())
    }

    /// Build a RESPONSE.
    pub fn response(call_id: u16, transaction: u8, status: Status, body: impl Into<Bytes>) -> Self {
        Envelope::new(
            PacketKind::Response,
            call_id,
            Some(transaction),
            Some(status),
            body.into(),
        )
    }

    /// Build an INDICATION.
    pub fn indication(call_id: u16, body: impl Into<Bytes>) -> Self {
        Envelope::new(PacketKind::Indication, call_id, None, None, body.into())
    }

    fn new(
        packet_kind: PacketKind,
        call_id: u16,
        transaction: Option<u8>,
        status: Option<Status>,
        body: Bytes,
    ) -> Self {
        let mut envelope = Envelope {
            body_crc: 0,
            computed_crc: 0,
            version: HL_PROTOCOL_VERSION,
            packet_kind,
            call_id,
            transaction,
            status,
            body,
        };
        let crc = body_crc16(&envelope.encode_fields());
        envelope.body_crc = crc;
        envelope.computed_crc = crc;
        envelope
    }

    /// Encode as a message, CRC first. The CRC is computed, not copied.
    pub fn encode(&self) -> Bytes {
        let fields = self.encode_fields();
        let mut buf = BytesMut::with_capacity(BODY_CRC_LEN + fields.len());
        buf.put_u16_le(body_crc16(&fields));
        buf.put_slice(&fields);
        buf.freeze()
    }

    fn encode_fields(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(ENVELOPE_FIXED_LEN + 3 + self.body.len());
        buf.put_u8(self.version);
        buf.put_u8(self.packet_kind.into());
        buf.put_u16_le(self.call_id);
        if self.packet_kind.has_transaction() {
            buf.put_u8(self.transaction.unwrap_or_default());
        }
        if self.packet_kind.has_status() {
            buf.put_slice(&self.status.unwrap_or(Status::OK).to_bytes());
        }
        buf.put_slice(&self.body);
        buf
    }

    /// Whether the carried CRC matches the message.
    pub fn crc_valid(&self) -> bool {
        self.body_crc == self.computed_crc
    }

    /// Whether the version is the one this crate fully understands.
    pub fn version_supported(&self) -> bool {
        self.version == HL_PROTOCOL_VERSION
    }

    /// Identity of the message.
    pub fn call_label(&self) -> CallLabel {
        CallLabel {
            packet_kind: self.packet_kind.into(),
            call_id: self.call_id,
        }
    }

    /// Integrity and version problems found while decoding.
    pub fn anomalies(&self) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();
        if !self.crc_valid() {
            anomalies.push(Anomaly::BodyCrcMismatch {
                expected: self.body_crc,
                actual: self.computed_crc,
            });
        }
        if !self.version_supported() {
            anomalies.push(Anomaly::UnsupportedVersion(self.version));
        }
        anomalies
    }
}

/// Carried and computed body CRC of a message, if it is long enough to
/// hold the CRC field.
///
/// Works on messages the envelope decoder rejects, so a CRC verdict can
/// still be reported for them.
pub fn body_crc_check(message: &[u8]) -> Option<(u16, u16)> {
    if message.len() < BODY_CRC_LEN {
        return None;
    }
    let carried = u16::from_le_bytes([message[0], message[1]]);
    Some((carried, body_crc16(&message[BODY_CRC_LEN..])))
}

/// Decode a complete message.
///
/// A body CRC mismatch is recorded on the result, not returned as an error.
pub fn decode_envelope(message: &[u8]) -> Result<Envelope, EnvelopeError> {
    if message.len() < ENVELOPE_FIXED_LEN {
        return Err(EnvelopeError::Truncated {
            expected: ENVELOPE_FIXED_LEN,
            actual: message.len(),
        });
    }

    let mut buf = message;
    let body_crc = buf.get_u16_le();
    let computed_crc = body_crc16(buf);

    let version = buf.get_u8();
    let raw_kind = buf.get_u8();
    let call_id = buf.get_u16_le();

    let packet_kind = PacketKind::try_from(raw_kind).map_err(|value| {
        EnvelopeError::UnknownPacketKind {
            value,
            crc_valid: body_crc == computed_crc,
            raw: Bytes::copy_from_slice(message),
        }
    })?;

    let optional_len = usize::from(packet_kind.has_transaction()) + 2 * usize::from(packet_kind.has_status());
    if buf.remaining() < optional_len {
        return Err(EnvelopeError::Truncated {
            expected: ENVELOPE_FIXED_LEN + optional_len,
            actual: message.len(),
        });
    }

    let transaction = packet_kind.has_transaction().then(|| buf.get_u8());
    let status = if packet_kind.has_status() {
        let category = buf.get_u8();
        let code = buf.get_u8();
        Some(Status::from_bytes(category, code))
    } else {
        None
    };

    if body_crc != computed_crc {
        log::debug!(
            "body CRC mismatch on {} 0x{:04X}: carried 0x{:04X}, computed 0x{:04X}",
            packet_kind,
            call_id,
            body_crc,
            computed_crc
        );
    }

    Ok(Envelope {
        body_crc,
        computed_crc,
        version,
        packet_kind,
        call_id,
        transaction,
        status,
        body: Bytes::copy_from_slice(buf),
    })
}

/// Decode a complete message, rejecting it if the body CRC does not verify.
pub fn decode_envelope_strict(message: &[u8]) -> Result<Envelope, EnvelopeError> {
    let envelope = decode_envelope(message)?;
    if !envelope.crc_valid() {
        return Err(EnvelopeError::CrcMismatch {
            expected: envelope.body_crc,
            actual: envelope.computed_crc,
        });
    }
    Ok(envelope)
}

/// Read the packet kind and call id from the start of a message, if present.
pub fn peek_call_label(message: &[u8]) -> Option<CallLabel> {
    if message.len() < ENVELOPE_FIXED_LEN {
        return None;
    }
    Some(CallLabel {
        packet_kind: message[PACKET_KIND_OFFSET],
        call_id: u16::from_le_bytes([message[CALL_ID_OFFSET], message[CALL_ID_OFFSET + 1]]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GenericStatus, StatusCode};

    #[test]
    fn test_request_roundtrip() {
        let envelope = Envelope::request(0x0401, 7, vec![0xAA, 0xBB]);
        let encoded = envelope.encode();
        assert_eq!(encoded.len(), ENVELOPE_FIXED_LEN + 1 + 2);

        let decoded = decode_envelope(&encoded).unwrap();
        assert_eq!(decoded, envelope);
        assert!(decoded.crc_valid());
        assert!(decoded.anomalies().is_empty());
        assert_eq!(decoded.transaction, Some(7));
        assert_eq!(decoded.status, None);
        assert_eq!(&decoded.body[..], &[0xAA, 0xBB]);
    }

    #[test]
    fn test_response_layout() {
        let envelope = Envelope::response(0x0001, 3, Status::from_bytes(0, 4), vec![0x10]);
        let encoded = envelope.encode();
        // crc(2) version kind call_id(2) tsn category code body
        assert_eq!(&encoded[2..], &[0x00, 0x01, 0x01, 0x00, 0x03, 0x00, 0x04, 0x10]);

        let decoded = decode_envelope(&encoded).unwrap();
        let status = decoded.status.unwrap();
        assert_eq!(status.decode(), StatusCode::Generic(GenericStatus::Busy));
    }

    #[test]
    fn test_indication_has_no_optional_fields() {
        let envelope = Envelope::indication(0x0203, Bytes::new());
        let encoded = envelope.encode();
        assert_eq!(encoded.len(), ENVELOPE_FIXED_LEN);

        let decoded = decode_envelope(&encoded).unwrap();
        assert_eq!(decoded.packet_kind, PacketKind::Indication);
        assert_eq!(decoded.transaction, None);
        assert!(decoded.body.is_empty());
    }

    #[test]
    fn test_crc_mismatch_is_reported() {
        let mut encoded = Envelope::request(0x0005, 1, vec![1, 2, 3]).encode().to_vec();
        encoded[0] ^= 0x55;

        let decoded = decode_envelope(&encoded).unwrap();
        assert!(!decoded.crc_valid());
        assert_eq!(decoded.call_id, 0x0005);
        assert_eq!(decoded.anomalies().len(), 1);
        assert_eq!(decoded.anomalies()[0].label(), "body_crc_mismatch");

        assert!(matches!(
            decode_envelope_strict(&encoded),
            Err(EnvelopeError::CrcMismatch { .. })
        ));
    }

    #[test]
    fn test_unknown_packet_kind() {
        let mut fields = vec![0x00, 0x05, 0x01, 0x00, 0xEE];
        let mut message = body_crc16(&fields).to_le_bytes().to_vec();
        message.append(&mut fields);

        match decode_envelope(&message) {
            Err(EnvelopeError::UnknownPacketKind {
                value,
                crc_valid,
                raw,
            }) => {
                assert_eq!(value, 5);
                assert!(crc_valid);
                assert_eq!(&raw[..], &message[..]);
            }
            other => panic!("Expected UnknownPacketKind, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_version_is_reported() {
        let mut envelope = Envelope::indication(0x0102, vec![9]);
        envelope.version = 3;
        let decoded = decode_envelope(&envelope.encode()).unwrap();
        assert_eq!(decoded.version, 3);
        assert!(decoded.crc_valid());
        assert_eq!(decoded.anomalies(), vec![Anomaly::UnsupportedVersion(3)]);
    }

    #[test]
    fn test_truncated_envelope() {
        assert_eq!(
            decode_envelope(&[0x00, 0x00, 0x00]),
            Err(EnvelopeError::Truncated {
                expected: 6,
                actual: 3
            })
        );

        // RESPONSE without room for tsn and status.
        let mut fields = vec![0x00, 0x01, 0x01, 0x00, 0x02];
        let mut message = body_crc16(&fields).to_le_bytes().to_vec();
        message.append(&mut fields);
        assert_eq!(
            decode_envelope(&message),
            Err(EnvelopeError::Truncated {
                expected: 9,
                actual: 7
            })
        );
    }

    #[test]
    fn test_body_crc_check() {
        let encoded = Envelope::request(0x0302, 1, Bytes::new()).encode();
        let (carried, computed) = body_crc_check(&encoded).unwrap();
        assert_eq!(carried, computed);

        assert_eq!(body_crc_check(&[0x00, 0x00, 0x00, 0x05]), Some((0, body_crc16(&[0x00, 0x05]))));
        assert_eq!(body_crc_check(&[0x12]), None);
    }

    #[test]
    fn test_peek_call_label() {
        let encoded = Envelope::request(0x0302, 1, Bytes::new()).encode();
        let label = peek_call_label(&encoded).unwrap();
        assert_eq!(label.call_id, 0x0302);
        assert_eq!(label.packet_kind, PACKET_KIND_REQUEST);
        assert!(peek_call_label(&encoded[..4]).is_none());
    }
}
