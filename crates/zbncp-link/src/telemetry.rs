//! Decoder metrics.
//!
//! Every counter the decoder emits is declared here as a [`Metric`] so that
//! names and label keys are not repeated as string literals. Counters go
//! through the `metrics` facade and cost nothing until a recorder is
//! installed.
//!
//! ```rust,ignore
//! use zbncp_link::telemetry::{describe_metrics, FRAMES};
//!
//! describe_metrics();
//! metrics::counter!(FRAMES.name, "kind" => "data").increment(1);
//! ```

use metrics::{counter, describe_counter, Unit};

use crate::{Anomaly, PacketKind};

/// A counter declaration with its metadata.
#[derive(Debug, Clone)]
pub struct Metric {
    /// Metric name.
    pub name: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// Unit of measurement.
    pub unit: Unit,
    /// Expected label keys.
    pub labels: &'static [&'static str],
}

impl Metric {
    /// Declare a counter.
    pub const fn counter(name: &'static str) -> Self {
        Metric {
            name,
            description: "",
            unit: Unit::Count,
            labels: &[],
        }
    }

    /// Set the description.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Set the unit.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    /// Set the expected label keys.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Register the description with the installed recorder.
    pub fn describe(&self) {
        describe_counter!(self.name, self.unit, self.description);
    }
}

/// Frames decoded, labelled `kind` = `data` | `ack`.
pub const FRAMES: Metric = Metric::counter("zbncp.frames")
    .with_description("Link frames decoded")
    .with_labels(&["kind"]);

/// Messages reassembled and envelope-decoded, labelled by packet kind.
pub const MESSAGES: Metric = Metric::counter("zbncp.messages")
    .with_description("Messages reassembled and decoded")
    .with_labels(&["packet_kind"]);

/// Anomalies reported, labelled by [`Anomaly::label`].
pub const ANOMALIES: Metric = Metric::counter("zbncp.anomalies")
    .with_description("Protocol anomalies reported")
    .with_labels(&["anomaly"]);

/// Bytes skipped while resynchronising on the frame signature.
pub const SKIPPED_BYTES: Metric = Metric::counter("zbncp.skipped_bytes")
    .with_description("Bytes skipped while searching for a frame signature")
    .with_unit(Unit::Bytes);

/// All metrics declared by this crate.
pub const ALL: &[&Metric] = &[&FRAMES, &MESSAGES, &ANOMALIES, &SKIPPED_BYTES];

/// Register every metric description. Call once at startup.
pub fn describe_metrics() {
    for metric in ALL {
        metric.describe();
    }
}

pub(crate) fn record_frame(is_ack: bool) {
    let kind = if is_ack { "ack" } else { "data" };
    counter!(FRAMES.name, "kind" => kind).increment(1);
}

pub(crate) fn record_message(packet_kind: PacketKind) {
    counter!(MESSAGES.name, "packet_kind" => packet_kind.as_label()).increment(1);
}

pub(crate) fn record_anomalies(anomalies: &[Anomaly]) {
    for anomaly in anomalies {
        counter!(ANOMALIES.name, "anomaly" => anomaly.label()).increment(1);
    }
}

pub(crate) fn record_skipped(len: usize) {
    counter!(SKIPPED_BYTES.name).increment(len as u64);
}
