//! Line transport: writes command lines, reads whole responses.

use crate::error::ClientError;
use mpdwire_protocol::{
    parse_greeting, AckError, Command, CommandList, Response, ResponseDecoder, ACK_PREFIX,
};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// A byte stream paired with a response decoder.
///
/// Not synchronized: one command/response cycle must be fully consumed
/// before the next one is written.
pub struct Transport<S> {
    stream: S,
    decoder: ResponseDecoder,
    buf: Vec<u8>,
}

impl<S> Transport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, read_buffer_size: usize) -> Self {
        Self {
            stream,
            decoder: ResponseDecoder::new(),
            buf: vec![0u8; read_buffer_size.max(1)],
        }
    }

    /// Reads the greeting line and returns the daemon version.
    pub async fn read_greeting(&mut self) -> Result<String, ClientError> {
        let line = loop {
            if let Some(line) = self.decoder.decode_line()? {
                break line;
            }
            self.fill().await?;
        };

        if line.starts_with(ACK_PREFIX) {
            return Err(ClientError::Server(AckError::parse(&line)?));
        }
        let version = parse_greeting(&line)?;
        tracing::debug!("Daemon greeting: version {}", version);
        Ok(version)
    }

    /// Writes one line, adding the newline.
    pub async fn write_line(&mut self, line: &str) -> Result<(), ClientError> {
        let mut data = Vec::with_capacity(line.len() + 1);
        data.extend_from_slice(line.as_bytes());
        data.push(b'\n');
        self.write_all(&data).await
    }

    /// Encodes and writes a command.
    pub async fn send(&mut self, command: &Command) -> Result<(), ClientError> {
        let line = command
            .encode()
            .map_err(|e| ClientError::InvalidArgument(e.to_string()))?;
        tracing::debug!("Sending command: {}", command);
        self.write_all(line.as_bytes()).await
    }

    /// Encodes and writes a command list.
    pub async fn send_list(&mut self, list: &CommandList) -> Result<(), ClientError> {
        let data = list
            .encode()
            .map_err(|e| ClientError::InvalidArgument(e.to_string()))?;
        tracing::debug!("Sending command list of {} commands", list.len());
        self.write_all(data.as_bytes()).await
    }

    /// Reads until one response is complete.
    pub async fn read_response(&mut self) -> Result<Response, ClientError> {
        loop {
            if let Some(response) = self.decoder.decode_response()? {
                return Ok(response);
            }
            self.fill().await?;
        }
    }

    /// Writes a command and reads its response within `timeout`.
    pub async fn round_trip(
        &mut self,
        command: &Command,
        timeout: Duration,
    ) -> Result<Response, ClientError> {
        tokio::time::timeout(timeout, async {
            self.send(command).await?;
            self.read_response().await
        })
        .await
        .map_err(|_| {
            tracing::debug!("Command {} timed out", command.name());
            ClientError::Timeout
        })?
    }

    /// Shuts down the write side of the stream.
    pub async fn shutdown(&mut self) -> Result<(), ClientError> {
        self.stream.shutdown().await?;
        Ok(())
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<(), ClientError> {
        self.stream.write_all(data).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn fill(&mut self) -> Result<(), ClientError> {
        let n = self.stream.read(&mut self.buf).await?;
        if n == 0 {
            tracing::debug!(
                "Connection closed with {} bytes buffered",
                self.decoder.buffered()
            );
            return Err(ClientError::ConnectionClosed);
        }
        self.decoder.extend(&self.buf[..n]);
        Ok(())
    }
}
