//! ZBNCP capture decoder.
//!
//! Reads a capture of host/NCP traffic, drives a
//! [`LinkDecoder`](zbncp_link::LinkDecoder) over it and writes one line per
//! decoded event. The `zbncp-dump` binary is a thin wrapper around [`run`].

pub mod capture;
pub mod config;
pub mod error;
pub mod render;

use std::fmt;
use std::io::Write;

use tracing::{debug, info};
use zbncp_link::{FrameOutcome, LinkDecoder, LinkEvent};

pub use capture::{parse_hex_capture, raw_capture, CaptureRecord};
pub use config::{CaptureMode, DumpConfig, InputFormat, OutputFormat};
pub use error::{DumpError, Result};
pub use render::Renderer;

/// Counts gathered over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DumpSummary {
    pub records: usize,
    pub frames: usize,
    pub messages: usize,
    /// Frames or byte runs reported as malformed.
    pub malformed: usize,
    pub unterminated: usize,
}

impl DumpSummary {
    fn count(&mut self, event: &LinkEvent) {
        match event {
            LinkEvent::Frame(frame) => {
                self.frames += 1;
                if matches!(frame.outcome, FrameOutcome::Message { .. }) {
                    self.messages += 1;
                }
                if frame.is_malformed() {
                    self.malformed += 1;
                }
            }
            LinkEvent::Rejected { .. } | LinkEvent::Truncated { .. } => self.malformed += 1,
            LinkEvent::Unterminated { .. } => self.unterminated += 1,
            LinkEvent::Skipped { .. } | LinkEvent::NotThisProtocol { .. } => {}
        }
    }
}

impl fmt::Display for DumpSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records, {} frames, {} messages, {} malformed, {} unterminated",
            self.records, self.frames, self.messages, self.malformed, self.unterminated
        )
    }
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins over `verbose` (0 warn, 1 debug, 2+ trace). Fails if a
/// global subscriber is already installed.
pub fn init_logging(verbose: u8) -> Result<()> {
    use tracing_subscriber::EnvFilter;

    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| DumpError::Logging(err.to_string()))
}

/// Read the records of a capture according to `config.input`.
pub fn read_capture(input: Vec<u8>, config: &DumpConfig) -> Result<Vec<CaptureRecord>> {
    match config.input {
        InputFormat::Hex => {
            let text = String::from_utf8_lossy(&input);
            parse_hex_capture(&text, config)
        }
        InputFormat::Raw => Ok(raw_capture(input, config)),
    }
}

/// Decode `records` and write one rendered line per event to `out`.
pub fn dump<W: Write>(records: &[CaptureRecord], config: &DumpConfig, out: &mut W) -> Result<DumpSummary> {
    let mut decoder = LinkDecoder::new(config.decoder.clone());
    let renderer = Renderer::new(config.output);
    let mut summary = DumpSummary::default();

    for record in records {
        debug!(line = record.line, key = %record.key, len = record.bytes.len(), "decoding record");
        summary.records += 1;
        let events = match config.mode {
            CaptureMode::Stream => decoder.feed(&record.key, &record.bytes),
            CaptureMode::Datagram => decoder.decode_datagram(&record.key, &record.bytes),
        };
        for event in &events {
            summary.count(event);
            writeln!(out, "{}", renderer.render(event)?)?;
        }
    }

    for event in &decoder.finish() {
        summary.count(event);
        writeln!(out, "{}", renderer.render(event)?)?;
    }

    info!(%summary, "capture decoded");
    Ok(summary)
}

/// Read a capture, decode it and write the result.
pub fn run<W: Write>(input: Vec<u8>, config: &DumpConfig, out: &mut W) -> Result<DumpSummary> {
    let records = read_capture(input, config)?;
    info!(records = records.len(), mode = ?config.mode, "capture loaded");
    dump(&records, config, out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_logging_init_is_reported() {
        // The first call may lose to another test; the second always fails.
        let _ = init_logging(0);
        assert!(matches!(init_logging(1), Err(DumpError::Logging(_))));
    }
}
