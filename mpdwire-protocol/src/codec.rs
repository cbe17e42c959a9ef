//! Incremental decoder for daemon replies.
//!
//! The decoder owns a byte buffer. Callers append whatever they read from
//! the socket with [`ResponseDecoder::extend`] and poll one of the
//! `decode_*` methods, which return `Ok(None)` until enough data is
//! buffered. Partial state survives between calls, so a reply can arrive
//! in arbitrarily small pieces.

use crate::ack::AckError;
use crate::error::ProtocolError;
use crate::response::{parse_int, Response, Terminator};
use crate::{
    ACK_PREFIX, GREETING_PREFIX, MAX_BINARY_CHUNK, MAX_LINE_LENGTH, RESPONSE_LIST_OK, RESPONSE_OK,
};
use bytes::{Buf, Bytes, BytesMut};

/// One protocol unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Pair { key: String, value: String },
    Binary(Bytes),
    Ok,
    ListOk,
    Ack(AckError),
}

/// Parses one text line of a reply.
pub fn parse_line(line: &str) -> Result<Frame, ProtocolError> {
    if line == RESPONSE_OK {
        return Ok(Frame::Ok);
    }
    if line == RESPONSE_LIST_OK {
        return Ok(Frame::ListOk);
    }
    if line.starts_with(ACK_PREFIX) {
        return AckError::parse(line).map(Frame::Ack);
    }

    match line.split_once(':') {
        Some((key, value)) if !key.is_empty() => Ok(Frame::Pair {
            key: key.to_string(),
            value: value.strip_prefix(' ').unwrap_or(value).to_string(),
        }),
        _ => Err(ProtocolError::MalformedLine(line.to_string())),
    }
}

/// Extracts the daemon version from the greeting line.
pub fn parse_greeting(line: &str) -> Result<String, ProtocolError> {
    match line.strip_prefix(GREETING_PREFIX) {
        Some(version) if !version.is_empty() => Ok(version.to_string()),
        _ => Err(ProtocolError::MalformedGreeting(line.to_string())),
    }
}

/// Buffered, resumable reply decoder.
pub struct ResponseDecoder {
    buffer: BytesMut,
    /// Raw bytes still owed by a `binary:` line.
    binary_len: Option<usize>,
    pairs: Vec<(String, String)>,
    binary: Option<Bytes>,
}

impl ResponseDecoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
            binary_len: None,
            pairs: Vec::new(),
            binary: None,
        }
    }

    /// Appends data to the internal buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Returns the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Drops buffered bytes and any half-decoded response.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.binary_len = None;
        self.pairs.clear();
        self.binary = None;
    }

    /// Whether a response has been started but not terminated.
    pub fn in_progress(&self) -> bool {
        !self.pairs.is_empty() || self.binary.is_some() || self.binary_len.is_some()
    }

    /// Takes the next complete line, without its newline.
    pub fn decode_line(&mut self) -> Result<Option<String>, ProtocolError> {
        match self.buffer.iter().position(|&b| b == b'\n') {
            Some(pos) => {
                let line = self.buffer.split_to(pos + 1);
                let text =
                    std::str::from_utf8(&line[..pos]).map_err(|_| ProtocolError::InvalidUtf8)?;
                Ok(Some(text.to_string()))
            }
            None if self.buffer.len() > MAX_LINE_LENGTH => Err(ProtocolError::LineTooLong {
                len: self.buffer.len(),
                max: MAX_LINE_LENGTH,
            }),
            None => Ok(None),
        }
    }

    /// Takes the next protocol unit.
    pub fn decode_frame(&mut self) -> Result<Option<Frame>, ProtocolError> {
        if let Some(len) = self.binary_len {
            // Payload plus its trailing newline.
            if self.buffer.len() < len + 1 {
                return Ok(None);
            }
            let data = self.buffer.split_to(len).freeze();
            if self.buffer[0] != b'\n' {
                return Err(ProtocolError::BinaryTerminator);
            }
            self.buffer.advance(1);
            self.binary_len = None;
            return Ok(Some(Frame::Binary(data)));
        }

        let Some(line) = self.decode_line()? else {
            return Ok(None);
        };
        let frame = parse_line(&line)?;

        if let Frame::Pair { key, value } = &frame {
            if key == "binary" {
                let len: usize = parse_int(key, value)?;
                if len > MAX_BINARY_CHUNK {
                    return Err(ProtocolError::ChunkTooLarge {
                        len,
                        max: MAX_BINARY_CHUNK,
                    });
                }
                self.binary_len = Some(len);
            }
        }

        Ok(Some(frame))
    }

    /// Takes the next complete response.
    pub fn decode_response(&mut self) -> Result<Option<Response>, ProtocolError> {
        while let Some(frame) = self.decode_frame()? {
            let terminator = match frame {
                Frame::Pair { key, value } => {
                    self.pairs.push((key, value));
                    continue;
                }
                Frame::Binary(data) => {
                    if self.binary.is_some() {
                        return Err(ProtocolError::MalformedLine(
                            "second binary payload in one response".to_string(),
                        ));
                    }
                    self.binary = Some(data);
                    continue;
                }
                Frame::Ok => Terminator::Ok,
                Frame::ListOk => Terminator::ListOk,
                Frame::Ack(err) => Terminator::Ack(err),
            };

            return Ok(Some(Response {
                pairs: std::mem::take(&mut self.pairs),
                binary: self.binary.take(),
                terminator,
            }));
        }
        Ok(None)
    }
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ack::AckCode;

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("OK").unwrap(), Frame::Ok);
        assert_eq!(parse_line("list_OK").unwrap(), Frame::ListOk);
        assert_eq!(
            parse_line("Title: a: b").unwrap(),
            Frame::Pair {
                key: "Title".into(),
                value: "a: b".into()
            }
        );
        assert_eq!(
            parse_line("Comment:").unwrap(),
            Frame::Pair {
                key: "Comment".into(),
                value: "".into()
            }
        );
        assert_eq!(
            parse_line("Name:  two spaces").unwrap(),
            Frame::Pair {
                key: "Name".into(),
                value: " two spaces".into()
            }
        );
        assert!(matches!(parse_line("ACK [2@0] {x} y").unwrap(), Frame::Ack(_)));
    }

    #[test]
    fn test_parse_line_malformed() {
        assert!(matches!(
            parse_line("no colon here"),
            Err(ProtocolError::MalformedLine(_))
        ));
        assert!(parse_line(": value").is_err());
        assert!(matches!(
            parse_line("ACK nonsense"),
            Err(ProtocolError::MalformedAck(_))
        ));
    }

    #[test]
    fn test_parse_greeting() {
        assert_eq!(parse_greeting("OK MPD 0.23.5").unwrap(), "0.23.5");
        assert_eq!(parse_greeting("OK MPD gompd0.1").unwrap(), "gompd0.1");
        assert!(parse_greeting("OK").is_err());
        assert!(parse_greeting("HELLO 1.0").is_err());
    }

    #[test]
    fn test_decode_response() {
        let mut decoder = ResponseDecoder::new();
        decoder.extend(b"volume: 50\nstate: play\nOK\n");

        let response = decoder.decode_response().unwrap().unwrap();
        assert_eq!(response.terminator, Terminator::Ok);
        assert_eq!(response.get("state"), Some("play"));
        assert_eq!(decoder.buffered(), 0);
        assert!(decoder.decode_response().unwrap().is_none());
    }

    #[test]
    fn test_decode_response_in_pieces() {
        let data = b"file: a.ogg\nTitle: A\nfile: b.ogg\nOK\n";
        let mut decoder = ResponseDecoder::new();

        for (i, byte) in data.iter().enumerate() {
            decoder.extend(&[*byte]);
            let result = decoder.decode_response().unwrap();
            if i + 1 < data.len() {
                assert!(result.is_none());
            } else {
                let records = result.unwrap().into_attrs_list(&["file"]).unwrap();
                assert_eq!(records.len(), 2);
            }
        }
    }

    #[test]
    fn test_decode_ack_terminator() {
        let mut decoder = ResponseDecoder::new();
        decoder.extend(b"ACK [50@0] {listplaylist} No such playlist\n");

        let response = decoder.decode_response().unwrap().unwrap();
        assert_eq!(response.error().unwrap().code, AckCode::NoExist);
        assert!(!decoder.in_progress());
    }

    #[test]
    fn test_decode_command_list() {
        let mut decoder = ResponseDecoder::new();
        decoder.extend(b"list_OK\nId: 7\nlist_OK\nOK\n");

        let first = decoder.decode_response().unwrap().unwrap();
        assert_eq!(first.terminator, Terminator::ListOk);
        assert!(first.pairs.is_empty());

        let second = decoder.decode_response().unwrap().unwrap();
        assert_eq!(second.terminator, Terminator::ListOk);
        assert_eq!(second.get("Id"), Some("7"));

        let last = decoder.decode_response().unwrap().unwrap();
        assert_eq!(last.terminator, Terminator::Ok);
    }

    #[test]
    fn test_decode_binary() {
        let mut decoder = ResponseDecoder::new();
        decoder.extend(b"size: 5\ntype: image/png\nbinary: 3\n\x01\n\x03\nOK\n");

        let response = decoder.decode_response().unwrap().unwrap();
        assert_eq!(response.binary.as_deref(), Some(&b"\x01\n\x03"[..]));

        let chunk = response.into_chunk().unwrap().unwrap();
        assert_eq!(chunk.size, 5);
        assert_eq!(chunk.len(), 3);
    }

    #[test]
    fn test_decode_binary_split_across_reads() {
        let mut decoder = ResponseDecoder::new();
        decoder.extend(b"size: 4\nbinary: 4\n\x00\x01");
        assert!(decoder.decode_response().unwrap().is_none());
        assert!(decoder.in_progress());

        decoder.extend(b"\x02\x03");
        assert!(decoder.decode_response().unwrap().is_none());

        decoder.extend(b"\nOK\n");
        let response = decoder.decode_response().unwrap().unwrap();
        assert_eq!(response.binary.unwrap().as_ref(), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_decode_binary_without_newline() {
        let mut decoder = ResponseDecoder::new();
        decoder.extend(b"size: 2\nbinary: 2\nabXOK\n");
        assert_eq!(
            decoder.decode_response().unwrap_err(),
            ProtocolError::BinaryTerminator
        );
    }

    #[test]
    fn test_decode_binary_too_large() {
        let mut decoder = ResponseDecoder::new();
        decoder.extend(format!("binary: {}\n", MAX_BINARY_CHUNK + 1).as_bytes());
        assert!(matches!(
            decoder.decode_response(),
            Err(ProtocolError::ChunkTooLarge { .. })
        ));
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let mut decoder = ResponseDecoder::new();
        decoder.extend(b"Title: \xff\xfe\nOK\n");
        assert_eq!(
            decoder.decode_response().unwrap_err(),
            ProtocolError::InvalidUtf8
        );
    }

    #[test]
    fn test_line_too_long() {
        let mut decoder = ResponseDecoder::new();
        decoder.extend(&vec![b'x'; MAX_LINE_LENGTH + 1]);
        assert!(matches!(
            decoder.decode_line(),
            Err(ProtocolError::LineTooLong { .. })
        ));
    }

    #[test]
    fn test_clear() {
        let mut decoder = ResponseDecoder::new();
        decoder.extend(b"file: a\npartial");
        assert!(decoder.decode_response().unwrap().is_none());
        assert!(decoder.in_progress());

        decoder.clear();
        assert_eq!(decoder.buffered(), 0);
        assert!(!decoder.in_progress());
    }

    #[test]
    fn test_decoder_default() {
        let decoder = ResponseDecoder::default();
        assert_eq!(decoder.buffered(), 0);
    }
}
