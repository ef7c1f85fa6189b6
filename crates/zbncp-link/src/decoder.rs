//! Push-model decoder driving the whole link pipeline.
//!
//! Raw bytes go in per conversation direction; [`LinkEvent`]s come out.
//! Each frame passes through header verification, ARQ classification,
//! reassembly and, once a message closes, envelope decoding. Nothing here
//! aborts: every problem is attached to the event it concerns.

use std::collections::HashMap;

use bytes::Bytes;

use crate::constants::DEFAULT_MAX_FRAME_BODY;
use crate::telemetry;
use crate::{
    body_crc_check, decode_envelope, decode_envelope_strict, decode_frame, Anomaly, ArqStatus, ConversationKey,
    ConversationStore, Envelope, EnvelopeError, Frame, FrameError, FrameHeader, FrameStream,
    PartialMessage, ReassemblyOutcome, StreamItem,
};

/// Decoder settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DecoderConfig {
    /// Recompute header CRCs and report mismatches.
    pub verify_header_crc: bool,
    /// Surface messages whose body CRC fails as undecodable instead of
    /// decoding them best-effort.
    pub strict_body_crc: bool,
    /// Largest declared body accepted in stream mode.
    pub max_frame_body: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            verify_header_crc: true,
            strict_body_crc: false,
            max_frame_body: DEFAULT_MAX_FRAME_BODY,
        }
    }
}

/// What a frame did to its conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Pure acknowledgement.
    Ack,
    /// Fragment appended; the message is still open.
    Buffered {
        /// Bytes accumulated so far.
        buffered: usize,
    },
    /// A message closed and its envelope decoded.
    Message {
        envelope: Envelope,
        /// Frames that carried it.
        fragments: usize,
    },
    /// A message closed but its envelope could not be decoded.
    Undecodable {
        /// The reassembled bytes, for display as opaque data.
        raw: Bytes,
        error: EnvelopeError,
    },
    /// Continuation frame without an open message.
    Orphan {
        body: Bytes,
    },
}

/// One decoded frame and everything it caused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameEvent {
    pub key: ConversationKey,
    pub header: FrameHeader,
    /// False only when verification is enabled and the CRC failed.
    pub header_crc_ok: bool,
    pub arq: ArqStatus,
    pub outcome: FrameOutcome,
    /// Stale message discarded because this frame started a new one.
    pub reset: Option<PartialMessage>,
    pub anomalies: Vec<Anomaly>,
}

impl FrameEvent {
    /// Whether any anomaly makes the frame malformed.
    pub fn is_malformed(&self) -> bool {
        self.anomalies.iter().any(Anomaly::is_malformed)
    }
}

/// Output of [`LinkDecoder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// A frame was decoded.
    Frame(FrameEvent),
    /// Stream bytes skipped while searching for a signature.
    Skipped { key: ConversationKey, bytes: Bytes },
    /// A datagram (or its tail) that does not start with the signature.
    /// The bytes are left for another decoder.
    NotThisProtocol { key: ConversationKey, bytes: Bytes },
    /// Bytes too short for a frame header: a cut datagram or the stream
    /// remainder at teardown.
    Truncated { key: ConversationKey, bytes: Bytes },
    /// A header rejected as implausible; its signature bytes were skipped.
    Rejected {
        key: ConversationKey,
        anomaly: Anomaly,
        bytes: Bytes,
    },
    /// A message still open at teardown.
    Unterminated {
        key: ConversationKey,
        partial: PartialMessage,
    },
}

impl LinkEvent {
    /// Conversation direction the event belongs to.
    pub fn key(&self) -> &ConversationKey {
        match self {
            LinkEvent::Frame(event) => &event.key,
            LinkEvent::Skipped { key, .. }
            | LinkEvent::NotThisProtocol { key, .. }
            | LinkEvent::Truncated { key, .. }
            | LinkEvent::Rejected { key, .. }
            | LinkEvent::Unterminated { key, .. } => key,
        }
    }
}

/// Stateful link decoder for a whole capture or session.
#[derive(Debug, Default)]
pub struct LinkDecoder {
    config: DecoderConfig,
    conversations: ConversationStore,
    streams: HashMap<ConversationKey, FrameStream>,
}

impl LinkDecoder {
    /// Create a decoder.
    pub fn new(config: DecoderConfig) -> Self {
        LinkDecoder {
            config,
            conversations: ConversationStore::new(),
            streams: HashMap::new(),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Get the conversation table.
    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    /// Feed stream bytes travelling in `key`'s direction.
    ///
    /// Bytes may be split anywhere; an incomplete frame is buffered until
    /// the rest arrives.
    pub fn feed(&mut self, key: &ConversationKey, bytes: &[u8]) -> Vec<LinkEvent> {
        let max_body = self.config.max_frame_body;
        let stream = self
            .streams
            .entry(key.clone())
            .or_insert_with(|| FrameStream::new(max_body));
        stream.push(bytes);
        let items: Vec<StreamItem> = std::iter::from_fn(|| stream.next_item()).collect();

        items
            .into_iter()
            .map(|item| match item {
                StreamItem::Frame(frame) => LinkEvent::Frame(self.process_frame(key, frame)),
                StreamItem::Skipped(bytes) => {
                    log::debug!("{}: skipped {} bytes while resynchronising", key, bytes.len());
                    telemetry::record_skipped(bytes.len());
                    LinkEvent::Skipped {
                        key: key.clone(),
                        bytes,
                    }
                }
                StreamItem::Oversized { header, skipped } => {
                    let anomaly = Anomaly::FrameTooLong {
                        declared: header.body_len as usize,
                        max: max_body,
                    };
                    log::debug!("{}: {}", key, anomaly);
                    telemetry::record_skipped(skipped.len());
                    telemetry::record_anomalies(std::slice::from_ref(&anomaly));
                    LinkEvent::Rejected {
                        key: key.clone(),
                        anomaly,
                        bytes: skipped,
                    }
                }
            })
            .collect()
    }

    /// Decode one capture record holding zero or more back-to-back frames.
    ///
    /// A body shorter than declared is processed with
    /// [`Anomaly::BodyTruncated`].
    pub fn decode_datagram(&mut self, key: &ConversationKey, bytes: &[u8]) -> Vec<LinkEvent> {
        let mut events = Vec::new();
        let mut rest = bytes;

        while !rest.is_empty() {
            match decode_frame(rest) {
                Ok((frame, body_offset)) => {
                    let consumed = body_offset + frame.body.len();
                    events.push(LinkEvent::Frame(self.process_frame(key, frame)));
                    rest = &rest[consumed..];
                }
                Err(FrameError::NotThisProtocol) => {
                    events.push(LinkEvent::NotThisProtocol {
                        key: key.clone(),
                        bytes: Bytes::copy_from_slice(rest),
                    });
                    break;
                }
                // Decoding never yields BodyTooLong; only encoding does.
                Err(FrameError::Truncated { .. } | FrameError::BodyTooLong { .. }) => {
                    events.push(LinkEvent::Truncated {
                        key: key.clone(),
                        bytes: Bytes::copy_from_slice(rest),
                    });
                    break;
                }
            }
        }

        events
    }

    /// End the session: report leftover stream bytes and every message
    /// still being reassembled. The decoder is empty afterwards.
    pub fn finish(&mut self) -> Vec<LinkEvent> {
        let mut leftovers: Vec<(ConversationKey, Bytes)> = self
            .streams
            .drain()
            .map(|(key, mut stream)| (key, stream.take_remaining()))
            .filter(|(_, bytes)| !bytes.is_empty())
            .collect();
        leftovers.sort_by_key(|(key, _)| key.to_string());

        let mut events: Vec<LinkEvent> = leftovers
            .into_iter()
            .map(|(key, bytes)| LinkEvent::Truncated { key, bytes })
            .collect();

        for (key, partial) in self.conversations.finish() {
            log::debug!(
                "{}: unterminated message of {} bytes at teardown",
                key,
                partial.bytes.len()
            );
            events.push(LinkEvent::Unterminated { key, partial });
        }
        events
    }

    fn process_frame(&mut self, key: &ConversationKey, frame: Frame) -> FrameEvent {
        let mut anomalies = Vec::new();

        let header_crc_ok = !self.config.verify_header_crc || frame.verify_header_crc();
        if !header_crc_ok {
            anomalies.push(Anomaly::HeaderCrcMismatch {
                expected: frame.header.crc,
                actual: frame.header.compute_crc(),
            });
        }
        if frame.is_body_truncated() {
            anomalies.push(Anomaly::BodyTruncated {
                declared: frame.header.body_len as usize,
                captured: frame.body.len(),
            });
        }

        let arq = self.conversations.observe(key, &frame);
        anomalies.extend(arq.anomalies());
        telemetry::record_frame(arq.is_ack);

        log::trace!(
            "{}: frame len={} kind={} flags=0x{:02X} crc_ok={}",
            key,
            frame.header.body_len,
            frame.header.kind,
            frame.header.flags.to_byte(),
            header_crc_ok
        );

        let (outcome, reset) = match self.conversations.on_frame(key, &frame) {
            ReassemblyOutcome::AckIgnored => (FrameOutcome::Ack, None),
            ReassemblyOutcome::FragmentBuffered { buffered, reset } => {
                (FrameOutcome::Buffered { buffered }, reset)
            }
            ReassemblyOutcome::MessageComplete {
                message,
                fragments,
                reset,
            } => (self.decode_message(message, fragments, &mut anomalies), reset),
            ReassemblyOutcome::OrphanFragment { body } => {
                anomalies.push(Anomaly::OrphanFragment { len: body.len() });
                (FrameOutcome::Orphan { body }, None)
            }
        };
        if let Some(stale) = &reset {
            // Reported ahead of anything the new message produced.
            anomalies.insert(
                0,
                Anomaly::ReassemblyReset {
                    discarded: stale.bytes.len(),
                },
            );
        }

        telemetry::record_anomalies(&anomalies);

        FrameEvent {
            key: key.clone(),
            header: frame.header,
            header_crc_ok,
            arq,
            outcome,
            reset,
            anomalies,
        }
    }

    fn decode_message(
        &self,
        message: Bytes,
        fragments: usize,
        anomalies: &mut Vec<Anomaly>,
    ) -> FrameOutcome {
        let decoded = if self.config.strict_body_crc {
            decode_envelope_strict(&message)
        } else {
            decode_envelope(&message)
        };

        match decoded {
            Ok(envelope) => {
                anomalies.extend(envelope.anomalies());
                telemetry::record_message(envelope.packet_kind);
                FrameOutcome::Message {
                    envelope,
                    fragments,
                }
            }
            Err(error) => {
                log::debug!("undecodable message of {} bytes: {}", message.len(), error);
                // The strict decoder's CrcMismatch already is the CRC verdict.
                if !matches!(error, EnvelopeError::CrcMismatch { .. }) {
                    if let Some((carried, computed)) = body_crc_check(&message) {
                        if carried != computed {
                            anomalies.push(Anomaly::BodyCrcMismatch {
                                expected: carried,
                                actual: computed,
                            });
                        }
                    }
                }
                anomalies.push(Anomaly::from(&error));
                FrameOutcome::Undecodable {
                    raw: message,
                    error,
                }
            }
        }
    }
}
