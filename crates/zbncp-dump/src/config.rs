//! Dump configuration, loaded from YAML.
//!
//! ```yaml
//! host: host
//! ncp: ncp
//! mode: stream        # stream | datagram
//! input: hex          # hex | raw
//! output: text        # text | json
//! decoder:
//!   verify_header_crc: true
//!   strict_body_crc: false
//!   max_frame_body: 1024
//! ```
//!
//! Every field is optional. Command-line flags override the file.

use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use zbncp_link::DecoderConfig;

use crate::error::Result;

/// How capture records are handed to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    /// Records are chunks of a continuous byte stream per direction.
    #[default]
    Stream,
    /// Each record holds whole frames.
    Datagram,
}

/// Capture file encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// One record per line: `> hex`, `< hex` or `src dst hex`.
    #[default]
    Hex,
    /// The file is the raw host-to-NCP byte stream.
    Raw,
}

/// Output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One human-readable line per event.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Dump configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpConfig {
    /// Link decoder settings.
    pub decoder: DecoderConfig,
    /// Name of the host endpoint (`>` records travel host to NCP).
    pub host: String,
    /// Name of the NCP endpoint.
    pub ncp: String,
    pub mode: CaptureMode,
    pub input: InputFormat,
    pub output: OutputFormat,
}

impl Default for DumpConfig {
    fn default() -> Self {
        DumpConfig {
            decoder: DecoderConfig::default(),
            host: "host".to_string(),
            ncp: "ncp".to_string(),
            mode: CaptureMode::default(),
            input: InputFormat::default(),
            output: OutputFormat::default(),
        }
    }
}

impl DumpConfig {
    /// Load from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    /// Parse from YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }
}
