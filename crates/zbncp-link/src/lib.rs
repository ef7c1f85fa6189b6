//! ZBNCP host/NCP link layer
//!
//! This crate decodes the link protocol spoken between a host and a radio
//! coprocessor (NCP): CRC-protected frames, the ACK/retransmit/sequence
//! bits that make the link reliable, fragments reassembled into logical
//! messages, and the common envelope (version, packet kind, call id,
//! transaction number, status) at the start of every message.
//!
//! # Protocol Overview
//!
//! - **Frames** start with the `DE AD` signature and a seven-byte header
//!   protected by a CRC-8 ([`decode_frame`], [`Frame::verify_header_crc`]).
//! - **ARQ**: each direction carries two-bit send and ack sequence numbers;
//!   [`ArqTracker`] classifies them without ever dropping a frame.
//! - **Fragments** between a first-fragment and a last-fragment flag are
//!   concatenated per conversation direction ([`ConversationStore`],
//!   [`Reassembly`]).
//! - **Envelopes** open every reassembled message, behind a CRC-16
//!   ([`decode_envelope`]). The remaining bytes are command specific
//!   ([`CommandSchema`]).
//!
//! Malformed input is reported, never fatal: [`LinkDecoder`] attaches an
//! [`Anomaly`] list to each event and keeps going.
//!
//! # Example
//!
//! ```rust,ignore
//! use zbncp_link::{ConversationKey, DecoderConfig, LinkDecoder, LinkEvent};
//!
//! let mut decoder = LinkDecoder::new(DecoderConfig::default());
//! let key = ConversationKey::new("host", "ncp");
//!
//! for event in decoder.feed(&key, &received_data) {
//!     if let LinkEvent::Frame(frame) = event {
//!         println!("{:?}", frame.outcome);
//!     }
//! }
//! for event in decoder.finish() {
//!     println!("{:?}", event);
//! }
//! ```

mod arq;
mod constants;
mod conversation;
pub mod crc;
mod decoder;
mod envelope;
mod error;
mod frame;
mod reassembly;
mod schema;
mod status;
pub mod telemetry;
mod types;

pub use arq::*;
pub use constants::*;
pub use conversation::*;
pub use decoder::*;
pub use envelope::*;
pub use error::*;
pub use frame::*;
pub use reassembly::*;
pub use schema::*;
pub use status::*;
pub use types::*;
