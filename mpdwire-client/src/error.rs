//! Client error types.

use crate::config::ConfigError;
use mpdwire_protocol::{AckCode, AckError, ProtocolError};
use thiserror::Error;

/// Client errors.
///
/// Three families: transport failures (`Io`, `ConnectionClosed`,
/// `NotConnected`, `Timeout`), protocol errors reported by the daemon
/// (`Server`), and replies that could not be decoded (`Protocol`).
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("not connected")]
    NotConnected,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("request timeout")]
    Timeout,

    #[error("server error: {0}")]
    Server(#[from] AckError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// Whether the connection is unusable after this error.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ClientError::Io(_)
                | ClientError::ConnectionClosed
                | ClientError::NotConnected
                | ClientError::Timeout
                | ClientError::Protocol(_)
        )
    }

    /// The daemon's ACK, if this is a protocol error.
    pub fn ack(&self) -> Option<&AckError> {
        match self {
            ClientError::Server(err) => Some(err),
            _ => None,
        }
    }

    pub fn ack_code(&self) -> Option<AckCode> {
        self.ack().map(|err| err.code)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
            || self.ack_code() == Some(AckCode::NoExist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_families() {
        let ack = AckError::parse("ACK [50@0] {play} No such song").unwrap();
        let err = ClientError::from(ack);
        assert!(!err.is_transport());
        assert_eq!(err.ack_code(), Some(AckCode::NoExist));
        assert!(err.is_not_found());

        let err = ClientError::from(ProtocolError::MalformedAck("ACK ?".into()));
        assert!(err.is_transport());
        assert!(err.ack().is_none());

        assert!(ClientError::Timeout.is_transport());
        assert!(ClientError::ConnectionClosed.is_transport());
        assert!(ClientError::NotFound("cover".into()).is_not_found());
        assert!(!ClientError::InvalidArgument("x".into()).is_transport());
    }
}
