//! Protocol error types.

use thiserror::Error;

/// Errors raised while encoding commands or decoding daemon replies.
///
/// Every variant except `InvalidArgument` and `InvalidCommand` means the
/// byte stream did not look like the protocol we speak. Callers treat those
/// as transport-level failures: the connection can no longer be trusted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("malformed line: {0:?}")]
    MalformedLine(String),

    #[error("malformed ACK line: {0:?}")]
    MalformedAck(String),

    #[error("malformed greeting: {0:?}")]
    MalformedGreeting(String),

    #[error("unexpected key: expected {expected:?}, got {found:?}")]
    UnexpectedKey { expected: String, found: String },

    #[error("more than one entity in response (repeated key {key:?})")]
    MultipleEntities { key: String },

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid integer for {key:?}: {value:?}")]
    InvalidInteger { key: String, value: String },

    #[error("line too long: {len} bytes without newline (max {max})")]
    LineTooLong { len: usize, max: usize },

    #[error("binary chunk too large: {len} bytes (max {max})")]
    ChunkTooLarge { len: usize, max: usize },

    #[error("binary payload not followed by newline")]
    BinaryTerminator,

    #[error("empty binary chunk at offset {offset} of {size}")]
    EmptyChunk { offset: usize, size: u64 },

    #[error("binary object size changed: expected {expected}, got {actual}")]
    SizeChanged { expected: u64, actual: u64 },

    #[error("invalid UTF-8 in line")]
    InvalidUtf8,

    #[error("invalid argument: {0:?}")]
    InvalidArgument(String),

    #[error("invalid command name: {0:?}")]
    InvalidCommand(String),

    #[error("unterminated quoted string: {0:?}")]
    UnterminatedQuote(String),

    #[error("unexpected list_OK outside a command list")]
    UnexpectedListOk,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::MalformedAck("ACK garbage".into());
        assert!(err.to_string().contains("ACK garbage"));

        let err = ProtocolError::UnexpectedKey {
            expected: "Artist".into(),
            found: "Album".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Artist"));
        assert!(msg.contains("Album"));

        let err = ProtocolError::LineTooLong { len: 100, max: 50 };
        assert!(err.to_string().contains("100"));

        let err = ProtocolError::EmptyChunk {
            offset: 8192,
            size: 10000,
        };
        let msg = err.to_string();
        assert!(msg.contains("8192"));
        assert!(msg.contains("10000"));

        let err = ProtocolError::MissingField("size");
        assert!(err.to_string().contains("size"));

        let err = ProtocolError::InvalidUtf8;
        assert!(err.to_string().contains("UTF-8"));
    }
}
