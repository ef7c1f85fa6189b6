//! Errors for the capture decoder CLI.

use thiserror::Error;

/// Errors that can occur while loading configuration or reading a capture.
#[derive(Debug, Error)]
pub enum DumpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("line {line}: invalid hex: {source}")]
    Hex {
        line: usize,
        #[source]
        source: hex::FromHexError,
    },

    #[error("line {line}: {message}")]
    Capture { line: usize, message: String },

    #[error("failed to install log subscriber: {0}")]
    Logging(String),
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, DumpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_numbers_in_messages() {
        let err = DumpError::Capture {
            line: 7,
            message: "missing destination".to_string(),
        };
        assert_eq!(err.to_string(), "line 7: missing destination");

        let err = DumpError::Hex {
            line: 3,
            source: hex::FromHexError::OddLength,
        };
        assert!(err.to_string().starts_with("line 3: invalid hex"));
    }
}
