//! Protocol-level error types.

use thiserror::Error;

use crate::status::ReplyStatus;

/// Errors that can occur when encoding or decoding protocol structures.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The payload could not be interpreted as the expected structure.
    #[error("Malformed request: {0}")]
    Decode(#[source] serde_json::Error),

    /// A structure could not be serialized.
    #[error("Failed to encode: {0}")]
    Encode(#[source] serde_json::Error),
}

impl ProtocolError {
    /// Reply status to report for this error.
    pub fn status(&self) -> ReplyStatus {
        match self {
            ProtocolError::Decode(_) => ReplyStatus::SyntaxError,
            ProtocolError::Encode(_) => ReplyStatus::ServerError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_is_syntax_error() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = ProtocolError::Decode(err);
        assert_eq!(err.status(), ReplyStatus::SyntaxError);
        assert!(err.to_string().starts_with("Malformed request"));
    }
}
