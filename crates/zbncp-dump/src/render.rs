//! Event rendering, one line per event.

use serde::Serialize;
use zbncp_link::{
    Anomaly, CommandSchema, ConversationKey, Envelope, FrameEvent, FrameOutcome, LinkEvent,
    PacketKind, PartialMessage, RenderedBody, SchemaRegistry,
};

use crate::config::OutputFormat;
use crate::error::Result;

/// Renders [`LinkEvent`]s as text or JSON lines.
#[derive(Debug, Clone)]
pub struct Renderer {
    format: OutputFormat,
    schema: SchemaRegistry,
}

impl Renderer {
    /// Create a renderer using the builtin command layouts.
    pub fn new(format: OutputFormat) -> Self {
        Self::with_schema(format, SchemaRegistry::builtin())
    }

    /// Create a renderer with custom command layouts.
    pub fn with_schema(format: OutputFormat, schema: SchemaRegistry) -> Self {
        Renderer { format, schema }
    }

    /// Render one event.
    pub fn render(&self, event: &LinkEvent) -> Result<String> {
        match self.format {
            OutputFormat::Text => Ok(self.text(event)),
            OutputFormat::Json => Ok(serde_json::to_string(&self.record(event))?),
        }
    }

    fn text(&self, event: &LinkEvent) -> String {
        match event {
            LinkEvent::Frame(frame) => self.frame_text(frame),
            LinkEvent::Skipped { key, bytes } => {
                format!("{}: skipped {} bytes: {}", key, bytes.len(), hex::encode(bytes))
            }
            LinkEvent::NotThisProtocol { key, bytes } => {
                format!("{}: not ZBNCP ({} bytes): {}", key, bytes.len(), hex::encode(bytes))
            }
            LinkEvent::Truncated { key, bytes } => {
                format!("{}: truncated frame ({} bytes): {}", key, bytes.len(), hex::encode(bytes))
            }
            LinkEvent::Rejected { key, anomaly, .. } => format!("{}: malformed: {}", key, anomaly),
            LinkEvent::Unterminated { key, partial } => format!(
                "{}: unterminated fragment: {} bytes from {} frame(s) of {}: {}",
                key,
                partial.bytes.len(),
                partial.fragments,
                call_text(partial),
                hex::encode(&partial.bytes)
            ),
        }
    }

    fn frame_text(&self, frame: &FrameEvent) -> String {
        let flags = &frame.header.flags;
        let mut line = format!("{}: ", frame.key);
        if flags.ack {
            line.push_str(&format!("ACK ack_seq={}", flags.ack_seq));
        } else {
            line.push_str(&format!(
                "DATA seq={} ack_seq={}{}{}{}",
                flags.send_seq,
                flags.ack_seq,
                if flags.retransmit { " retransmit" } else { "" },
                if flags.first_fragment { " first" } else { "" },
                if flags.last_fragment { " last" } else { "" },
            ));
        }

        match &frame.outcome {
            FrameOutcome::Ack => {}
            FrameOutcome::Buffered { buffered } => {
                line.push_str(&format!(" | fragment buffered ({} bytes)", buffered));
            }
            FrameOutcome::Message { envelope, fragments } => {
                line.push_str(" | ");
                line.push_str(&self.envelope_text(envelope));
                if *fragments > 1 {
                    line.push_str(&format!(" ({} fragments)", fragments));
                }
            }
            FrameOutcome::Undecodable { raw, error } => {
                line.push_str(&format!(" | undecodable ({}): {}", error, hex::encode(raw)));
            }
            FrameOutcome::Orphan { body } => {
                line.push_str(&format!(" | orphan fragment: {}", hex::encode(body)));
            }
        }

        let (malformed, advisory): (Vec<&Anomaly>, Vec<&Anomaly>) =
            frame.anomalies.iter().partition(|anomaly| anomaly.is_malformed());
        if !malformed.is_empty() {
            line.push_str(" | malformed: ");
            line.push_str(&join(&malformed));
        }
        if !advisory.is_empty() {
            line.push_str(" | note: ");
            line.push_str(&join(&advisory));
        }
        line
    }

    fn envelope_text(&self, envelope: &Envelope) -> String {
        let body = self.render_body(envelope);
        let mut text = format!(
            "{} 0x{:04X} {}",
            envelope.packet_kind,
            envelope.call_id,
            body.command.unwrap_or("UNKNOWN")
        );
        if let Some(tsn) = envelope.transaction {
            text.push_str(&format!(" tsn={}", tsn));
        }
        if let Some(status) = envelope.status {
            text.push_str(&format!(" status=[{}]", status));
        }
        for field in &body.fields {
            text.push_str(&format!(" {}={}", field.name, field.value));
        }
        if body.truncated {
            text.push_str(" <truncated>");
        }
        if !body.trailing.is_empty() {
            text.push_str(&format!(" data={}", hex::encode(&body.trailing)));
        }
        text
    }

    fn render_body(&self, envelope: &Envelope) -> RenderedBody {
        self.schema
            .render(envelope.call_id, envelope.packet_kind, &envelope.body)
    }

    fn record<'a>(&self, event: &'a LinkEvent) -> Record<'a> {
        match event {
            LinkEvent::Frame(frame) => {
                let flags = &frame.header.flags;
                Record::Frame {
                    endpoints: Endpoints::from(&frame.key),
                    kind: frame.header.kind,
                    body_len: frame.header.body_len,
                    ack: flags.ack,
                    retransmit: flags.retransmit,
                    send_seq: flags.send_seq.value(),
                    ack_seq: flags.ack_seq.value(),
                    first_fragment: flags.first_fragment,
                    last_fragment: flags.last_fragment,
                    header_crc_ok: frame.header_crc_ok,
                    outcome: self.outcome_record(&frame.outcome),
                    anomalies: frame.anomalies.iter().map(AnomalyRecord::from).collect(),
                }
            }
            LinkEvent::Skipped { key, bytes } => Record::Skipped {
                endpoints: Endpoints::from(key),
                data: hex::encode(bytes),
            },
            LinkEvent::NotThisProtocol { key, bytes } => Record::NotThisProtocol {
                endpoints: Endpoints::from(key),
                data: hex::encode(bytes),
            },
            LinkEvent::Truncated { key, bytes } => Record::Truncated {
                endpoints: Endpoints::from(key),
                data: hex::encode(bytes),
            },
            LinkEvent::Rejected {
                key,
                anomaly,
                bytes,
            } => Record::Rejected {
                endpoints: Endpoints::from(key),
                anomaly: AnomalyRecord::from(anomaly),
                data: hex::encode(bytes),
            },
            LinkEvent::Unterminated { key, partial } => Record::Unterminated {
                endpoints: Endpoints::from(key),
                fragments: partial.fragments,
                expected_call: partial.expected_call.map(|label| label.to_string()),
                data: hex::encode(&partial.bytes),
            },
        }
    }

    fn outcome_record(&self, outcome: &FrameOutcome) -> OutcomeRecord {
        match outcome {
            FrameOutcome::Ack => OutcomeRecord::Ack,
            FrameOutcome::Buffered { buffered } => OutcomeRecord::Buffered {
                buffered: *buffered,
            },
            FrameOutcome::Message { envelope, fragments } => {
                let body = self.render_body(envelope);
                OutcomeRecord::Message {
                    packet_kind: envelope.packet_kind,
                    call_id: envelope.call_id,
                    command: body.command,
                    version: envelope.version,
                    transaction: envelope.transaction,
                    status: envelope.status.map(|status| status.to_string()),
                    success: envelope.status.map(|status| status.is_success()),
                    body_crc_ok: envelope.crc_valid(),
                    fragments: *fragments,
                    fields: body
                        .fields
                        .iter()
                        .map(|field| FieldRecord {
                            name: field.name,
                            value: field.value.to_string(),
                        })
                        .collect(),
                    truncated: body.truncated,
                    trailing: hex::encode(&body.trailing),
                }
            }
            FrameOutcome::Undecodable { raw, error } => OutcomeRecord::Undecodable {
                error: error.to_string(),
                data: hex::encode(raw),
            },
            FrameOutcome::Orphan { body } => OutcomeRecord::Orphan {
                data: hex::encode(body),
            },
        }
    }
}

fn join(anomalies: &[&Anomaly]) -> String {
    anomalies
        .iter()
        .map(|anomaly| anomaly.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn call_text(partial: &PartialMessage) -> String {
    partial
        .expected_call
        .map_or_else(|| "unknown call".to_string(), |label| label.to_string())
}

#[derive(Serialize)]
struct Endpoints<'a> {
    src: &'a str,
    dst: &'a str,
}

impl<'a> From<&'a ConversationKey> for Endpoints<'a> {
    fn from(key: &'a ConversationKey) -> Self {
        Endpoints {
            src: key.src().as_str(),
            dst: key.dst().as_str(),
        }
    }
}

#[derive(Serialize)]
struct AnomalyRecord {
    label: &'static str,
    malformed: bool,
    message: String,
}

impl From<&Anomaly> for AnomalyRecord {
    fn from(anomaly: &Anomaly) -> Self {
        AnomalyRecord {
            label: anomaly.label(),
            malformed: anomaly.is_malformed(),
            message: anomaly.to_string(),
        }
    }
}

#[derive(Serialize)]
struct FieldRecord {
    name: &'static str,
    value: String,
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Record<'a> {
    Frame {
        #[serde(flatten)]
        endpoints: Endpoints<'a>,
        kind: u8,
        body_len: u16,
        ack: bool,
        retransmit: bool,
        send_seq: u8,
        ack_seq: u8,
        first_fragment: bool,
        last_fragment: bool,
        header_crc_ok: bool,
        outcome: OutcomeRecord,
        anomalies: Vec<AnomalyRecord>,
    },
    Skipped {
        #[serde(flatten)]
        endpoints: Endpoints<'a>,
        data: String,
    },
    NotThisProtocol {
        #[serde(flatten)]
        endpoints: Endpoints<'a>,
        data: String,
    },
    Truncated {
        #[serde(flatten)]
        endpoints: Endpoints<'a>,
        data: String,
    },
    Rejected {
        #[serde(flatten)]
        endpoints: Endpoints<'a>,
        anomaly: AnomalyRecord,
        data: String,
    },
    Unterminated {
        #[serde(flatten)]
        endpoints: Endpoints<'a>,
        fragments: usize,
        expected_call: Option<String>,
        data: String,
    },
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutcomeRecord {
    Ack,
    Buffered {
        buffered: usize,
    },
    Message {
        packet_kind: PacketKind,
        call_id: u16,
        command: Option<&'static str>,
        version: u8,
        transaction: Option<u8>,
        status: Option<String>,
        success: Option<bool>,
        body_crc_ok: bool,
        fragments: usize,
        fields: Vec<FieldRecord>,
        truncated: bool,
        trailing: String,
    },
    Undecodable {
        error: String,
        data: String,
    },
    Orphan {
        data: String,
    },
}
