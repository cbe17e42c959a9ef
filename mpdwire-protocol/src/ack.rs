//! ACK error lines.
//!
//! Shape: `ACK [<code>@<index>] {<command>} <message>`.

use crate::error::ProtocolError;
use crate::ACK_PREFIX;
use std::fmt;
use thiserror::Error;

/// Classified ACK error codes.
///
/// The numbering is fixed by the daemon. Codes this crate does not know
/// are kept as [`AckCode::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AckCode {
    NotList,
    Arg,
    Password,
    Permission,
    UnknownCommand,
    NoExist,
    PlaylistMax,
    System,
    PlaylistLoad,
    UpdateAlready,
    PlayerSync,
    Exist,
    Other(u16),
}

impl AckCode {
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => AckCode::NotList,
            2 => AckCode::Arg,
            3 => AckCode::Password,
            4 => AckCode::Permission,
            5 => AckCode::UnknownCommand,
            50 => AckCode::NoExist,
            51 => AckCode::PlaylistMax,
            52 => AckCode::System,
            53 => AckCode::PlaylistLoad,
            54 => AckCode::UpdateAlready,
            55 => AckCode::PlayerSync,
            56 => AckCode::Exist,
            other => AckCode::Other(other),
        }
    }

    /// Returns the numeric code as sent on the wire.
    pub fn code(&self) -> u16 {
        match self {
            AckCode::NotList => 1,
            AckCode::Arg => 2,
            AckCode::Password => 3,
            AckCode::Permission => 4,
            AckCode::UnknownCommand => 5,
            AckCode::NoExist => 50,
            AckCode::PlaylistMax => 51,
            AckCode::System => 52,
            AckCode::PlaylistLoad => 53,
            AckCode::UpdateAlready => 54,
            AckCode::PlayerSync => 55,
            AckCode::Exist => 56,
            AckCode::Other(code) => *code,
        }
    }
}

impl fmt::Display for AckCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AckCode::NotList => write!(f, "not-list"),
            AckCode::Arg => write!(f, "bad-argument"),
            AckCode::Password => write!(f, "bad-password"),
            AckCode::Permission => write!(f, "permission-denied"),
            AckCode::UnknownCommand => write!(f, "unknown-command"),
            AckCode::NoExist => write!(f, "does-not-exist"),
            AckCode::PlaylistMax => write!(f, "playlist-full"),
            AckCode::System => write!(f, "system-error"),
            AckCode::PlaylistLoad => write!(f, "playlist-load-failed"),
            AckCode::UpdateAlready => write!(f, "already-updating"),
            AckCode::PlayerSync => write!(f, "player-sync-error"),
            AckCode::Exist => write!(f, "already-exists"),
            AckCode::Other(code) => write!(f, "error-{}", code),
        }
    }
}

/// A well-formed ACK reply from the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code} ({}) in {{{command}}} at index {index}: {message}", .code.code())]
pub struct AckError {
    pub code: AckCode,
    /// Index of the failing command inside a list, as reported by the
    /// daemon; 0 when absent.
    pub index: u32,
    pub command: String,
    pub message: String,
}

impl AckError {
    /// Parses a full ACK line (including the `ACK ` prefix).
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let malformed = || ProtocolError::MalformedAck(line.to_string());

        let rest = line.strip_prefix(ACK_PREFIX).ok_or_else(malformed)?;
        let rest = rest.strip_prefix('[').ok_or_else(malformed)?;
        let (position, rest) = rest.split_once(']').ok_or_else(malformed)?;

        let (code, index) = match position.split_once('@') {
            Some((code, "")) => (code, None),
            Some((code, index)) => (code, Some(index)),
            None => (position, None),
        };
        let code: u16 = code.parse().map_err(|_| malformed())?;
        let index: u32 = match index {
            Some(index) => index.parse().map_err(|_| malformed())?,
            None => 0,
        };

        let rest = rest.strip_prefix(' ').ok_or_else(malformed)?;
        let rest = rest.strip_prefix('{').ok_or_else(malformed)?;
        let (command, message) = rest.split_once('}').ok_or_else(malformed)?;
        let message = message.strip_prefix(' ').unwrap_or(message);

        Ok(Self {
            code: AckCode::from_code(code),
            index,
            command: command.to_string(),
            message: message.to_string(),
        })
    }
}
