//! ARQ classification for one direction of a link.
//!
//! The tracker reads the ACK/retransmit bits and the two-bit sequence
//! counters of successive frames and reports what they imply. It never
//! drops or retransmits anything: duplicate detection is advisory, and
//! retry timing belongs to the active endpoint.

use crate::{Anomaly, FrameHeader, SeqNum};

/// What the link bits of one frame say.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArqStatus {
    /// Pure acknowledgement; nothing to reassemble.
    pub is_ack: bool,
    /// Sender flagged this frame as a retransmission.
    pub is_retransmission: bool,
    /// Sender's sequence number.
    pub send_seq: SeqNum,
    /// Acknowledged sequence number.
    pub ack_seq: SeqNum,
    /// Same sequence as the previous frame of the same class.
    pub possible_duplicate: bool,
    /// Frames presumed missing between the previous data frame and this one.
    pub missing: u8,
}

impl ArqStatus {
    /// Advisory anomalies implied by this status.
    pub fn anomalies(&self) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();
        if self.possible_duplicate {
            let seq = if self.is_ack {
                self.ack_seq
            } else {
                self.send_seq
            };
            anomalies.push(Anomaly::PossibleDuplicate(seq));
        }
        if self.missing > 0 {
            anomalies.push(Anomaly::SequenceGap {
                missing: self.missing,
                seq: self.send_seq,
            });
        }
        anomalies
    }
}

/// Modulo-4 sequence state for one link direction.
#[derive(Debug, Clone, Default)]
pub struct ArqTracker {
    /// Sequence number of the last data frame.
    last_send_seq: Option<SeqNum>,
    /// Sequence number carried by the last pure acknowledgement.
    last_ack_seq: Option<SeqNum>,
    /// Latest `ack_seq` seen on any frame, including those piggybacked on
    /// data frames.
    acknowledged: Option<SeqNum>,
    /// Data frames observed.
    data_frames: u64,
    /// Acknowledgements observed.
    ack_frames: u64,
    /// Frames flagged as possible duplicates.
    duplicates: u64,
}

impl ArqTracker {
    /// Create a tracker with no history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `header` and advance the counters.
    pub fn observe(&mut self, header: &FrameHeader) -> ArqStatus {
        let flags = header.flags;
        let mut status = ArqStatus {
            is_ack: flags.ack,
            is_retransmission: flags.retransmit,
            send_seq: flags.send_seq,
            ack_seq: flags.ack_seq,
            possible_duplicate: false,
            missing: 0,
        };

        if flags.ack {
            self.ack_frames += 1;
            status.possible_duplicate = self.last_ack_seq == Some(flags.ack_seq);
            self.last_ack_seq = Some(flags.ack_seq);
        } else {
            self.data_frames += 1;
            if let Some(previous) = self.last_send_seq {
                match flags.send_seq.distance_from(previous) {
                    0 => status.possible_duplicate = true,
                    1 => {}
                    // A retransmission of an older frame is not a gap.
                    _ if flags.retransmit => status.possible_duplicate = true,
                    distance => status.missing = distance - 1,
                }
            }
            self.last_send_seq = Some(flags.send_seq);
        }
        self.acknowledged = Some(flags.ack_seq);

        if status.possible_duplicate {
            self.duplicates += 1;
            log::trace!(
                "possible duplicate frame (ack={}, seq={}, retransmit={})",
                flags.ack,
                flags.send_seq,
                flags.retransmit
            );
        }

        status
    }

    /// Sequence number a sender should use for its next data frame.
    pub fn next_send_seq(&self) -> SeqNum {
        self.last_send_seq.map_or(SeqNum::new(0), SeqNum::next)
    }

    /// Whether the most recent acknowledgement covers `seq`, whether it came
    /// as a pure ACK or piggybacked on a data frame.
    pub fn is_acknowledged(&self, seq: SeqNum) -> bool {
        self.acknowledged == Some(seq)
    }

    /// Sequence number of the last data frame seen.
    pub fn last_send_seq(&self) -> Option<SeqNum> {
        self.last_send_seq
    }

    /// Sequence number of the last pure acknowledgement seen.
    pub fn last_ack_seq(&self) -> Option<SeqNum> {
        self.last_ack_seq
    }

    /// Data frames observed so far.
    pub fn data_frames(&self) -> u64 {
        self.data_frames
    }

    /// Acknowledgements observed so far.
    pub fn ack_frames(&self) -> u64 {
        self.ack_frames
    }

    /// Frames flagged as possible duplicates so far.
    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FrameFlags;

    fn data(seq: u8, retransmit: bool) -> FrameHeader {
        let mut flags = FrameFlags::single(SeqNum::new(seq));
        flags.retransmit = retransmit;
        FrameHeader::new(4, 1, flags)
    }

    fn ack(seq: u8) -> FrameHeader {
        FrameHeader::new(0, 1, FrameFlags::ack(SeqNum::new(seq)))
    }

    #[test]
    fn test_in_order_frames() {
        let mut tracker = ArqTracker::new();
        for seq in [0, 1, 2, 3, 0, 1] {
            let status = tracker.observe(&data(seq, false));
            assert!(!status.possible_duplicate);
            assert_eq!(status.missing, 0);
            assert!(status.anomalies().is_empty());
        }
        assert_eq!(tracker.data_frames(), 6);
        assert_eq!(tracker.next_send_seq(), SeqNum::new(2));
    }

    #[test]
    fn test_retransmission_flags_duplicate() {
        let mut tracker = ArqTracker::new();
        tracker.observe(&data(1, false));
        let status = tracker.observe(&data(1, true));
        assert!(status.is_retransmission);
        assert!(status.possible_duplicate);
        assert_eq!(
            status.anomalies(),
            vec![Anomaly::PossibleDuplicate(SeqNum::new(1))]
        );
        assert_eq!(tracker.duplicates(), 1);
    }

    #[test]
    fn test_sequence_gap() {
        let mut tracker = ArqTracker::new();
        tracker.observe(&data(0, false));
        let status = tracker.observe(&data(3, false));
        assert_eq!(status.missing, 2);
        assert!(!status.possible_duplicate);
    }

    #[test]
    fn test_retransmission_of_older_frame_is_not_gap() {
        let mut tracker = ArqTracker::new();
        tracker.observe(&data(1, false));
        tracker.observe(&data(2, false));
        let status = tracker.observe(&data(1, true));
        assert!(status.possible_duplicate);
        assert_eq!(status.missing, 0);
    }

    #[test]
    fn test_ack_tracking() {
        let mut tracker = ArqTracker::new();
        assert!(!tracker.is_acknowledged(SeqNum::new(0)));

        let status = tracker.observe(&ack(0));
        assert!(status.is_ack);
        assert!(!status.possible_duplicate);
        assert!(tracker.is_acknowledged(SeqNum::new(0)));

        let repeat = tracker.observe(&ack(0));
        assert!(repeat.possible_duplicate);
        assert_eq!(tracker.ack_frames(), 2);
        // Acks do not move the data sequence.
        assert_eq!(tracker.last_send_seq(), None);
    }

    #[test]
    fn test_piggybacked_ack() {
        let mut tracker = ArqTracker::new();
        let mut flags = FrameFlags::single(SeqNum::new(0));
        flags.ack_seq = SeqNum::new(2);
        let status = tracker.observe(&FrameHeader::new(4, 1, flags));

        assert!(!status.is_ack);
        assert_eq!(status.ack_seq, SeqNum::new(2));
        assert!(tracker.is_acknowledged(SeqNum::new(2)));
        assert_eq!(tracker.last_ack_seq(), None);

        // A later pure ACK still takes over.
        tracker.observe(&ack(3));
        assert!(tracker.is_acknowledged(SeqNum::new(3)));
        assert!(!tracker.is_acknowledged(SeqNum::new(2)));
    }
}
