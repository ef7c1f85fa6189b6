//! Fragment reassembly.
//!
//! Each conversation direction runs a two-state machine:
//!
//! ```text
//!            first            last
//!   Idle ──────────▶ Accumulating ──────────▶ Idle  (MessageComplete)
//!     │                 │    ▲
//!     │ continuation    │    │ continuation / first (reset)
//!     ▼                 └────┘
//!   Idle  (OrphanFragment)
//! ```
//!
//! A first fragment always opens an empty buffer, every non-ACK frame is
//! appended, and a last fragment closes the buffer. A frame that is both
//! first and last is therefore a zero-length accumulation followed by an
//! immediate close. A first fragment arriving while a buffer is open
//! discards the stale buffer and reports it; two messages are never merged.

use bytes::{Bytes, BytesMut};

use crate::constants::MAX_FRAME_BODY_LEN;
use crate::envelope::peek_call_label;
use crate::{CallLabel, Frame, FrameFlags, FrameHeader, SeqNum};

/// A message that was started but never closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialMessage {
    /// Bytes accumulated so far.
    pub bytes: Bytes,
    /// Frames that contributed to it.
    pub fragments: usize,
    /// Provisional identity taken from the first fragment.
    pub expected_call: Option<CallLabel>,
}

/// Result of feeding one frame to the reassembler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReassemblyOutcome {
    /// ACK frame; no body processing occurred.
    AckIgnored,
    /// Body appended to an open message that is not yet complete.
    FragmentBuffered {
        /// Bytes accumulated so far.
        buffered: usize,
        /// Stale message discarded because this frame started a new one.
        reset: Option<PartialMessage>,
    },
    /// Body appended and the message closed.
    MessageComplete {
        /// The full message, including this frame's body.
        message: Bytes,
        /// Frames that contributed to it.
        fragments: usize,
        /// Stale message discarded because this frame started a new one.
        reset: Option<PartialMessage>,
    },
    /// Continuation frame with no open message.
    OrphanFragment {
        /// The frame's body, surfaced un-reassembled.
        body: Bytes,
    },
}

impl ReassemblyOutcome {
    /// The stale message discarded by this frame, if any.
    pub fn reset(&self) -> Option<&PartialMessage> {
        match self {
            ReassemblyOutcome::FragmentBuffered { reset, .. }
            | ReassemblyOutcome::MessageComplete { reset, .. } => reset.as_ref(),
            _ => None,
        }
    }
}

/// An open reassembly buffer.
#[derive(Debug, Clone, Default)]
pub struct ReassemblyBuffer {
    bytes: BytesMut,
    fragments: usize,
    expected_call: Option<CallLabel>,
}

impl ReassemblyBuffer {
    fn append(&mut self, body: &[u8]) {
        if self.fragments == 0 {
            self.expected_call = peek_call_label(body);
        }
        self.bytes.extend_from_slice(body);
        self.fragments += 1;
    }

    /// Bytes accumulated so far.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether nothing has been accumulated.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Provisional identity of the message.
    pub fn expected_call(&self) -> Option<CallLabel> {
        self.expected_call
    }

    fn into_partial(self) -> PartialMessage {
        PartialMessage {
            bytes: self.bytes.freeze(),
            fragments: self.fragments,
            expected_call: self.expected_call,
        }
    }
}

/// Reassembly state of one conversation direction.
#[derive(Debug, Clone, Default)]
pub enum Reassembly {
    /// No message open.
    #[default]
    Idle,
    /// A message is being accumulated.
    Accumulating(ReassemblyBuffer),
}

impl Reassembly {
    /// Feed one frame.
    pub fn on_frame(&mut self, frame: &Frame) -> ReassemblyOutcome {
        let flags = frame.flags();
        if flags.ack {
            return ReassemblyOutcome::AckIgnored;
        }

        let mut reset = None;
        let mut buffer = match std::mem::take(self) {
            Reassembly::Accumulating(stale) if flags.first_fragment => {
                let stale = stale.into_partial();
                log::debug!(
                    "reassembly reset: discarding {} bytes from {} fragment(s) of {}",
                    stale.bytes.len(),
                    stale.fragments,
                    stale
                        .expected_call
                        .map_or_else(|| "unknown call".to_string(), |label| label.to_string())
                );
                reset = Some(stale);
                ReassemblyBuffer::default()
            }
            Reassembly::Accumulating(open) => open,
            Reassembly::Idle if flags.first_fragment => ReassemblyBuffer::default(),
            Reassembly::Idle => {
                log::debug!("orphan fragment of {} bytes", frame.body.len());
                return ReassemblyOutcome::OrphanFragment {
                    body: frame.body.clone(),
                };
            }
        };
        buffer.append(&frame.body);

        if flags.last_fragment {
            ReassemblyOutcome::MessageComplete {
                fragments: buffer.fragments,
                message: buffer.bytes.freeze(),
                reset,
            }
        } else {
            let buffered = buffer.len();
            *self = Reassembly::Accumulating(buffer);
            ReassemblyOutcome::FragmentBuffered { buffered, reset }
        }
    }

    /// Whether a message is open.
    pub fn is_accumulating(&self) -> bool {
        matches!(self, Reassembly::Accumulating(_))
    }

    /// The open buffer, if any.
    pub fn buffer(&self) -> Option<&ReassemblyBuffer> {
        match self {
            Reassembly::Accumulating(buffer) => Some(buffer),
            Reassembly::Idle => None,
        }
    }

    /// Close the state, returning any unterminated message.
    pub fn finish(&mut self) -> Option<PartialMessage> {
        match std::mem::take(self) {
            Reassembly::Accumulating(buffer) => Some(buffer.into_partial()),
            Reassembly::Idle => None,
        }
    }
}

/// Split `message` into data frames of at most `max_body` bytes each.
///
/// `max_body` is clamped to what the length field can declare. Send
/// sequence numbers start at `first_seq` and advance per frame. An empty
/// message becomes a single frame with both fragment flags set.
pub fn fragment_message(message: &[u8], max_body: usize, kind: u8, first_seq: SeqNum) -> Vec<Frame> {
    let max_body = max_body.clamp(1, MAX_FRAME_BODY_LEN);
    let chunks: Vec<&[u8]> = if message.is_empty() {
        vec![message]
    } else {
        message.chunks(max_body).collect()
    };

    let last = chunks.len() - 1;
    let mut seq = first_seq;
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            let flags = FrameFlags {
                send_seq: seq,
                first_fragment: i == 0,
                last_fragment: i == last,
                ..Default::default()
            };
            seq = seq.next();
            // Chunks never exceed MAX_FRAME_BODY_LEN.
            Frame {
                header: FrameHeader::new(chunk.len() as u16, kind, flags),
                body: Bytes::copy_from_slice(chunk),
            }
        })
        .collect()
}
