//! Chunked binary fetches: `albumart` and `readpicture`.

use crate::connection::Connection;
use crate::error::ClientError;
use bytes::Bytes;
use mpdwire_protocol::{AckCode, ChunkAssembler, Command, ProtocolError};

/// Which binary object to fetch for a song.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryCommand {
    /// Cover file stored next to the song (`cover.jpg` and friends).
    AlbumArt,
    /// Picture embedded in the song's tags.
    ReadPicture,
}

impl BinaryCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BinaryCommand::AlbumArt => "albumart",
            BinaryCommand::ReadPicture => "readpicture",
        }
    }
}

/// Fetches a whole binary object, one chunk per round trip.
///
/// Returns empty bytes when the song has no such object. A missing song
/// on the first round trip is reported as [`ClientError::NotFound`].
pub async fn fetch_binary(
    conn: &Connection,
    kind: BinaryCommand,
    uri: &str,
) -> Result<Bytes, ClientError> {
    let mut assembler = ChunkAssembler::new(conn.binary_limit());
    let mut round_trips = 0usize;

    loop {
        let command = Command::new(kind.name())
            .arg(uri)
            .arg(assembler.offset().to_string());
        let response = conn.request(&command).await?;
        round_trips += 1;

        let response = match response.into_result() {
            Ok(response) => response,
            Err(ack) if ack.code == AckCode::NoExist && round_trips == 1 => {
                tracing::debug!("No {} for {}: {}", kind.name(), uri, ack.message);
                return Err(ClientError::NotFound(uri.to_string()));
            }
            Err(ack) => return Err(ack.into()),
        };

        let chunk = match response.into_chunk()? {
            Some(chunk) => chunk,
            None if round_trips == 1 => return Ok(Bytes::new()),
            None => return Err(ProtocolError::MissingField("binary").into()),
        };

        if let Some(data) = assembler.push(chunk)? {
            tracing::debug!(
                "Fetched {} bytes of {} for {} in {} round trips",
                data.len(),
                kind.name(),
                uri,
                round_trips
            );
            return Ok(data);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_names() {
        assert_eq!(BinaryCommand::AlbumArt.name(), "albumart");
        assert_eq!(BinaryCommand::ReadPicture.name(), "readpicture");
    }
}
