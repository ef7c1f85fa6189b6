//! Conversation-scoped link state.
//!
//! A conversation is the unordered pair of communicating endpoints. Each of
//! its two directions owns an [`ArqTracker`] and a [`Reassembly`] state
//! machine. Conversations are created on first observation and live until
//! [`ConversationStore::finish`] tears the session down.

use std::collections::HashMap;
use std::fmt;

use crate::{ArqStatus, ArqTracker, Frame, PartialMessage, Reassembly, ReassemblyOutcome};

/// Transport identity of one side of a link (a serial port, a socket address, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Endpoint(String);

impl Endpoint {
    /// Create an endpoint from any name.
    pub fn new(name: impl Into<String>) -> Self {
        Endpoint(name.into())
    }

    /// Get the endpoint name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Endpoint {
    fn from(name: &str) -> Self {
        Endpoint::new(name)
    }
}

impl From<String> for Endpoint {
    fn from(name: String) -> Self {
        Endpoint(name)
    }
}

/// Direction of travel within an endpoint pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// From the lower-ordered endpoint to the higher.
    Forward,
    /// From the higher-ordered endpoint to the lower.
    Reverse,
}

impl Direction {
    fn index(self) -> usize {
        match self {
            Direction::Forward => 0,
            Direction::Reverse => 1,
        }
    }
}

/// Unordered pair of endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointPair {
    low: Endpoint,
    high: Endpoint,
}

/// Reassembly scope: an endpoint pair plus a direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    pair: EndpointPair,
    direction: Direction,
}

impl ConversationKey {
    /// Key for frames travelling from `src` to `dst`.
    pub fn new(src: impl Into<Endpoint>, dst: impl Into<Endpoint>) -> Self {
        let src = src.into();
        let dst = dst.into();
        if src <= dst {
            ConversationKey {
                pair: EndpointPair { low: src, high: dst },
                direction: Direction::Forward,
            }
        } else {
            ConversationKey {
                pair: EndpointPair { low: dst, high: src },
                direction: Direction::Reverse,
            }
        }
    }

    /// Key for the opposite direction of the same conversation.
    pub fn reversed(&self) -> Self {
        ConversationKey {
            pair: self.pair.clone(),
            direction: match self.direction {
                Direction::Forward => Direction::Reverse,
                Direction::Reverse => Direction::Forward,
            },
        }
    }

    /// The endpoint pair.
    pub fn pair(&self) -> &EndpointPair {
        &self.pair
    }

    /// The direction within the pair.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Sending endpoint.
    pub fn src(&self) -> &Endpoint {
        match self.direction {
            Direction::Forward => &self.pair.low,
            Direction::Reverse => &self.pair.high,
        }
    }

    /// Receiving endpoint.
    pub fn dst(&self) -> &Endpoint {
        match self.direction {
            Direction::Forward => &self.pair.high,
            Direction::Reverse => &self.pair.low,
        }
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.src(), self.dst())
    }
}

/// Link state of one direction.
#[derive(Debug, Clone, Default)]
pub struct DirectionState {
    /// Sequence classification.
    pub arq: ArqTracker,
    /// Fragment reassembly.
    pub reassembly: Reassembly,
}

/// Both directions of one endpoint pair.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    directions: [DirectionState; 2],
}

impl Conversation {
    /// State of one direction.
    pub fn direction(&self, direction: Direction) -> &DirectionState {
        &self.directions[direction.index()]
    }

    /// Mutable state of one direction.
    pub fn direction_mut(&mut self, direction: Direction) -> &mut DirectionState {
        &mut self.directions[direction.index()]
    }
}

/// Process-wide conversation table.
///
/// Each key maps to exactly one state per direction, mutated only through
/// this store by a single sequential driver.
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: HashMap<EndpointPair, Conversation>,
}

impl ConversationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// State of `key`'s direction, created on first use.
    pub fn state_mut(&mut self, key: &ConversationKey) -> &mut DirectionState {
        self.conversations
            .entry(key.pair.clone())
            .or_default()
            .direction_mut(key.direction)
    }

    /// State of `key`'s direction, if the conversation has been seen.
    pub fn state(&self, key: &ConversationKey) -> Option<&DirectionState> {
        self.conversations
            .get(&key.pair)
            .map(|conversation| conversation.direction(key.direction))
    }

    /// Classify `frame`'s link bits for `key`.
    pub fn observe(&mut self, key: &ConversationKey, frame: &Frame) -> ArqStatus {
        self.state_mut(key).arq.observe(&frame.header)
    }

    /// Feed `frame` to `key`'s reassembler.
    pub fn on_frame(&mut self, key: &ConversationKey, frame: &Frame) -> ReassemblyOutcome {
        self.state_mut(key).reassembly.on_frame(frame)
    }

    /// Number of conversations seen.
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    /// Whether no conversation has been seen.
    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Tear the session down, returning every unterminated message.
    pub fn finish(&mut self) -> Vec<(ConversationKey, PartialMessage)> {
        let mut open = Vec::new();
        for (pair, mut conversation) in self.conversations.drain() {
            for direction in [Direction::Forward, Direction::Reverse] {
                if let Some(partial) = conversation.direction_mut(direction).reassembly.finish() {
                    let key = ConversationKey {
                        pair: pair.clone(),
                        direction,
                    };
                    open.push((key, partial));
                }
            }
        }
        open.sort_by(|(a, _), (b, _)| a.to_string().cmp(&b.to_string()));
        open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FrameFlags, SeqNum};

    fn first_fragment(body: &[u8]) -> Frame {
        let flags = FrameFlags {
            first_fragment: true,
            ..Default::default()
        };
        Frame::data(1, flags, body.to_vec()).unwrap()
    }

    #[test]
    fn test_key_is_unordered_pair_plus_direction() {
        let host_to_ncp = ConversationKey::new("host", "ncp");
        let ncp_to_host = ConversationKey::new("ncp", "host");

        assert_eq!(host_to_ncp.pair(), ncp_to_host.pair());
        assert_ne!(host_to_ncp, ncp_to_host);
        assert_eq!(host_to_ncp.reversed(), ncp_to_host);
        assert_eq!(ncp_to_host.src().as_str(), "ncp");
        assert_eq!(ncp_to_host.dst().as_str(), "host");
        assert_eq!(ncp_to_host.to_string(), "ncp -> host");
    }

    #[test]
    fn test_directions_are_isolated() {
        let mut store = ConversationStore::new();
        let forward = ConversationKey::new("host", "ncp");
        let reverse = forward.reversed();

        store.on_frame(&forward, &first_fragment(&[1]));
        assert!(store.state(&forward).unwrap().reassembly.is_accumulating());
        assert!(!store.state(&reverse).unwrap().reassembly.is_accumulating());
        assert_eq!(store.len(), 1);

        let mut last = FrameFlags::single(SeqNum::new(0));
        last.first_fragment = false;
        let orphan = store.on_frame(&reverse, &Frame::data(1, last, vec![2]).unwrap());
        assert!(matches!(orphan, ReassemblyOutcome::OrphanFragment { .. }));
        assert!(store.state(&forward).unwrap().reassembly.is_accumulating());
    }

    #[test]
    fn test_conversations_created_lazily() {
        let mut store = ConversationStore::new();
        let key = ConversationKey::new("a", "b");
        assert!(store.state(&key).is_none());
        assert!(store.is_empty());

        store.observe(&key, &Frame::ack(1, SeqNum::new(0)));
        assert!(store.state(&key).is_some());
    }

    #[test]
    fn test_finish_drains_open_buffers() {
        let mut store = ConversationStore::new();
        let a = ConversationKey::new("host", "ncp");
        let b = ConversationKey::new("host2", "ncp");
        store.on_frame(&a, &first_fragment(&[1, 2]));
        store.on_frame(&b, &first_fragment(&[3]));

        let open = store.finish();
        assert_eq!(open.len(), 2);
        assert_eq!(open[0].0, a);
        assert_eq!(&open[0].1.bytes[..], &[1, 2]);
        assert!(store.is_empty());
        assert!(store.finish().is_empty());
    }
}
