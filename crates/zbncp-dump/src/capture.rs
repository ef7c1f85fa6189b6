//! Capture readers.
//!
//! A hex capture holds one record per line:
//!
//! ```text
//! # comment
//! > DEAD0600014... 7A          host to NCP
//! < de ad 09 00 ...            NCP to host
//! coordinator radio DEAD...    explicit source and destination
//! ```
//!
//! Whitespace and `:` separators inside the hex are ignored.

use zbncp_link::ConversationKey;

use crate::config::DumpConfig;
use crate::error::{DumpError, Result};

/// One chunk of captured traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRecord {
    /// Source line (1-based), or 0 for raw captures.
    pub line: usize,
    /// Direction of travel.
    pub key: ConversationKey,
    pub bytes: Vec<u8>,
}

/// Parse a hex capture.
pub fn parse_hex_capture(text: &str, config: &DumpConfig) -> Result<Vec<CaptureRecord>> {
    let mut records = Vec::new();

    for (index, raw_line) in text.lines().enumerate() {
        let line = index + 1;
        let content = raw_line.split('#').next().unwrap_or_default().trim();
        if content.is_empty() {
            continue;
        }

        let mut tokens = content.split_whitespace();
        let (key, hex_tokens) = match tokens.next() {
            Some(">") => (
                ConversationKey::new(config.host.as_str(), config.ncp.as_str()),
                tokens,
            ),
            Some("<") => (
                ConversationKey::new(config.ncp.as_str(), config.host.as_str()),
                tokens,
            ),
            Some(src) => {
                let dst = tokens.next().ok_or_else(|| DumpError::Capture {
                    line,
                    message: format!("expected '<src> <dst> <hex>' after '{}'", src),
                })?;
                (ConversationKey::new(src, dst), tokens)
            }
            None => continue,
        };

        let digits: String = hex_tokens
            .flat_map(|token| token.split(':'))
            .collect();
        if digits.is_empty() {
            return Err(DumpError::Capture {
                line,
                message: "record has no bytes".to_string(),
            });
        }
        let bytes = hex::decode(&digits).map_err(|source| DumpError::Hex { line, source })?;

        records.push(CaptureRecord { line, key, bytes });
    }

    Ok(records)
}

/// Treat a whole file as the host-to-NCP byte stream.
pub fn raw_capture(bytes: Vec<u8>, config: &DumpConfig) -> Vec<CaptureRecord> {
    if bytes.is_empty() {
        return Vec::new();
    }
    vec![CaptureRecord {
        line: 0,
        key: ConversationKey::new(config.host.as_str(), config.ncp.as_str()),
        bytes,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_shorthand() {
        let config = DumpConfig::default();
        let records = parse_hex_capture("> dead 01\n\n< DE:AD\n", &config).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].line, 1);
        assert_eq!(records[0].key, ConversationKey::new("host", "ncp"));
        assert_eq!(records[0].bytes, vec![0xDE, 0xAD, 0x01]);
        assert_eq!(records[1].line, 3);
        assert_eq!(records[1].key, ConversationKey::new("ncp", "host"));
    }

    #[test]
    fn test_explicit_endpoints_and_comments() {
        let config = DumpConfig::default();
        let text = "# header\nzc radio 0102 # trailing\n";
        let records = parse_hex_capture(text, &config).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key.src().as_str(), "zc");
        assert_eq!(records[0].key.dst().as_str(), "radio");
        assert_eq!(records[0].bytes, vec![0x01, 0x02]);
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        let config = DumpConfig::default();
        match parse_hex_capture("> dead\n> xyz\n", &config) {
            Err(DumpError::Hex { line, .. }) => assert_eq!(line, 2),
            other => panic!("Expected Hex error, got {:?}", other),
        }
        match parse_hex_capture("\n\nlonely\n", &config) {
            Err(DumpError::Capture { line, .. }) => assert_eq!(line, 3),
            other => panic!("Expected Capture error, got {:?}", other),
        }
        assert!(matches!(
            parse_hex_capture(">\n", &config),
            Err(DumpError::Capture { line: 1, .. })
        ));
    }

    #[test]
    fn test_raw_capture() {
        let config = DumpConfig::default();
        assert!(raw_capture(Vec::new(), &config).is_empty());
        let records = raw_capture(vec![1, 2], &config);
        assert_eq!(records[0].key, ConversationKey::new("host", "ncp"));
    }
}
