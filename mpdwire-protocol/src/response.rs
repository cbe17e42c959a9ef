//! Decoded responses and the typed views over them.

use crate::ack::AckError;
use crate::binary::BinaryChunk;
use crate::error::ProtocolError;
use bytes::Bytes;
use std::collections::HashMap;

/// One logical entity's attributes (a song, an output, a directory...).
pub type Attrs = HashMap<String, String>;

/// How a response ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminator {
    /// `OK`: the command (or the whole command list) succeeded.
    Ok,
    /// `list_OK`: one command inside a command list succeeded.
    ListOk,
    /// An ACK line.
    Ack(AckError),
}

/// A complete reply to one command, in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub pairs: Vec<(String, String)>,
    pub binary: Option<Bytes>,
    pub terminator: Terminator,
}

impl Response {
    /// Creates a successful response from key/value pairs.
    pub fn ok<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            binary: None,
            terminator: Terminator::Ok,
        }
    }

    pub fn is_ok(&self) -> bool {
        !self.is_error()
    }

    pub fn is_error(&self) -> bool {
        matches!(self.terminator, Terminator::Ack(_))
    }

    pub fn error(&self) -> Option<&AckError> {
        match &self.terminator {
            Terminator::Ack(err) => Some(err),
            _ => None,
        }
    }

    /// Splits off the ACK, if any.
    pub fn into_result(self) -> Result<Self, AckError> {
        match self.terminator {
            Terminator::Ack(err) => Err(err),
            _ => Ok(self),
        }
    }

    /// Returns the value of the last pair with `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty() && self.binary.is_none()
    }

    /// All pairs as one record. Later duplicates overwrite earlier ones.
    pub fn into_attrs(self) -> Attrs {
        self.pairs.into_iter().collect()
    }

    /// Splits the pairs into records, opening a new record at every
    /// occurrence of a boundary key.
    pub fn into_attrs_list(self, boundary_keys: &[&str]) -> Result<Vec<Attrs>, ProtocolError> {
        self.split_records(boundary_keys, false)
    }

    /// Like [`Response::into_attrs_list`], with every key ASCII-lowercased
    /// (`Last-Modified` becomes `last-modified`).
    pub fn into_lowercase_attrs_list(
        self,
        boundary_keys: &[&str],
    ) -> Result<Vec<Attrs>, ProtocolError> {
        self.split_records(boundary_keys, true)
    }

    fn split_records(
        self,
        boundary_keys: &[&str],
        lowercase: bool,
    ) -> Result<Vec<Attrs>, ProtocolError> {
        let mut records: Vec<Attrs> = Vec::new();

        for (mut key, value) in self.pairs {
            if lowercase {
                key.make_ascii_lowercase();
            }
            if boundary_keys.contains(&key.as_str()) {
                records.push(Attrs::new());
            }
            match records.last_mut() {
                Some(record) => {
                    record.insert(key, value);
                }
                None => {
                    return Err(ProtocolError::UnexpectedKey {
                        expected: boundary_keys.join("|"),
                        found: key,
                    })
                }
            }
        }

        Ok(records)
    }

    /// One record describing at most one entity.
    ///
    /// A second occurrence of any boundary key means the daemon sent more
    /// than one entity where exactly one was asked for.
    pub fn into_entity(self, boundary_keys: &[&str]) -> Result<Attrs, ProtocolError> {
        let mut seen_boundary = false;
        let mut record = Attrs::new();

        for (key, value) in self.pairs {
            if boundary_keys.contains(&key.as_str()) {
                if seen_boundary {
                    return Err(ProtocolError::MultipleEntities { key });
                }
                seen_boundary = true;
            }
            record.insert(key, value);
        }

        Ok(record)
    }

    /// The values of a response where every line shares `key`.
    ///
    /// Keys compare ASCII case-insensitively: the daemon echoes tag names
    /// in its own capitalization.
    pub fn into_values(self, key: &str) -> Result<Vec<String>, ProtocolError> {
        self.pairs
            .into_iter()
            .map(|(k, v)| {
                if k.eq_ignore_ascii_case(key) {
                    Ok(v)
                } else {
                    Err(ProtocolError::UnexpectedKey {
                        expected: key.to_string(),
                        found: k,
                    })
                }
            })
            .collect()
    }

    /// The binary chunk carried by this response.
    ///
    /// Returns `None` when the daemon answered without `size` and `binary`,
    /// which is how it reports a file without embedded artwork.
    pub fn into_chunk(self) -> Result<Option<BinaryChunk>, ProtocolError> {
        let mut size = None;
        let mut length = None;
        let mut attrs = Attrs::new();

        for (key, value) in self.pairs {
            match key.as_str() {
                "size" => size = Some(parse_int::<u64>(&key, &value)?),
                "binary" => length = Some(parse_int::<usize>(&key, &value)?),
                _ => {
                    attrs.insert(key, value);
                }
            }
        }

        match (size, length, self.binary) {
            (None, None, None) => Ok(None),
            (None, _, _) => Err(ProtocolError::MissingField("size")),
            (Some(_), None, _) => Err(ProtocolError::MissingField("binary")),
            (Some(_), Some(_), None) => Err(ProtocolError::MissingField("binary payload")),
            (Some(size), Some(length), Some(data)) => {
                if data.len() != length {
                    return Err(ProtocolError::MalformedLine(format!(
                        "binary: {} with {} bytes of payload",
                        length,
                        data.len()
                    )));
                }
                Ok(Some(BinaryChunk { size, data, attrs }))
            }
        }
    }
}

/// Parses a decimal attribute value.
pub fn parse_int<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ProtocolError> {
    value.trim().parse().map_err(|_| ProtocolError::InvalidInteger {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ack::AckCode;

    fn listing() -> Response {
        Response::ok([
            ("directory", "music"),
            ("Last-Modified", "2024-01-01T00:00:00Z"),
            ("file", "song0000.ogg"),
            ("Artist", "A"),
            ("Title", "One"),
            ("file", "song0001.ogg"),
            ("Title", "Two"),
            ("playlist", "mix.m3u"),
        ])
    }

    #[test]
    fn test_into_attrs_last_write_wins() {
        let attrs = Response::ok([("Artist", "first"), ("Title", "x"), ("Artist", "second")])
            .into_attrs();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs["Artist"], "second");
    }

    #[test]
    fn test_into_attrs_list_splits_on_boundaries() {
        let records = listing()
            .into_attrs_list(&["file", "directory", "playlist"])
            .unwrap();

        assert_eq!(records.len(), 4);
        assert_eq!(records[0]["directory"], "music");
        assert_eq!(records[0]["Last-Modified"], "2024-01-01T00:00:00Z");
        assert_eq!(records[1].len(), 3);
        assert_eq!(records[1]["Title"], "One");
        assert_eq!(records[2]["file"], "song0001.ogg");
        assert!(!records[2].contains_key("Artist"));
        assert_eq!(records[3].len(), 1);
    }

    #[test]
    fn test_into_lowercase_attrs_list() {
        let records = listing()
            .into_lowercase_attrs_list(&["file", "directory", "playlist"])
            .unwrap();

        assert_eq!(records.len(), 4);
        assert_eq!(records[0]["last-modified"], "2024-01-01T00:00:00Z");
        assert_eq!(records[1]["artist"], "A");
        assert_eq!(records[1]["title"], "One");
        assert!(!records[1].contains_key("Title"));
        assert_eq!(records[3]["playlist"], "mix.m3u");
    }

    #[test]
    fn test_into_attrs_list_duplicate_inside_record() {
        let records = Response::ok([("outputid", "0"), ("attribute", "a=1"), ("attribute", "b=2")])
            .into_attrs_list(&["outputid"])
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["attribute"], "b=2");
    }

    #[test]
    fn test_into_attrs_list_empty() {
        let records = Response::ok(Vec::<(String, String)>::new())
            .into_attrs_list(&["file"])
            .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_into_attrs_list_rejects_leading_pairs() {
        let err = Response::ok([("Title", "orphan"), ("file", "a.ogg")])
            .into_attrs_list(&["file"])
            .unwrap_err();
        assert!(matches!(err, ProtocolError::UnexpectedKey { .. }));
    }

    #[test]
    fn test_into_entity() {
        let song = Response::ok([("file", "a.ogg"), ("Title", "A")])
            .into_entity(&["file"])
            .unwrap();
        assert_eq!(song["Title"], "A");

        let none = Response::ok(Vec::<(String, String)>::new())
            .into_entity(&["file"])
            .unwrap();
        assert!(none.is_empty());

        let err = Response::ok([("file", "a.ogg"), ("file", "b.ogg")])
            .into_entity(&["file"])
            .unwrap_err();
        assert_eq!(
            err,
            ProtocolError::MultipleEntities {
                key: "file".to_string()
            }
        );
    }

    #[test]
    fn test_into_values() {
        let values = Response::ok([("Artist", "A"), ("Artist", "B"), ("artist", "C")])
            .into_values("artist")
            .unwrap();
        assert_eq!(values, vec!["A", "B", "C"]);

        let err = Response::ok([("Artist", "A"), ("Album", "X")])
            .into_values("Artist")
            .unwrap_err();
        assert!(matches!(err, ProtocolError::UnexpectedKey { found, .. } if found == "Album"));
    }

    #[test]
    fn test_into_chunk() {
        let mut response = Response::ok([("size", "5"), ("type", "image/png"), ("binary", "3")]);
        response.binary = Some(Bytes::from_static(&[1, 2, 3]));

        let chunk = response.into_chunk().unwrap().unwrap();
        assert_eq!(chunk.size, 5);
        assert_eq!(chunk.data.as_ref(), &[1, 2, 3]);
        assert_eq!(chunk.mime_type(), Some("image/png"));
    }

    #[test]
    fn test_into_chunk_absent() {
        let response = Response::ok(Vec::<(String, String)>::new());
        assert!(response.into_chunk().unwrap().is_none());
    }

    #[test]
    fn test_into_chunk_errors() {
        let response = Response::ok([("size", "5")]);
        assert_eq!(
            response.into_chunk().unwrap_err(),
            ProtocolError::MissingField("binary")
        );

        let response = Response::ok([("size", "five"), ("binary", "1")]);
        assert!(matches!(
            response.into_chunk(),
            Err(ProtocolError::InvalidInteger { .. })
        ));

        let mut response = Response::ok([("size", "5"), ("binary", "3")]);
        response.binary = Some(Bytes::from_static(&[1]));
        assert!(response.into_chunk().is_err());
    }

    #[test]
    fn test_into_result() {
        let ack = AckError::parse("ACK [50@0] {albumart} No file exists").unwrap();
        let response = Response {
            pairs: Vec::new(),
            binary: None,
            terminator: Terminator::Ack(ack),
        };
        assert!(response.is_error());
        assert_eq!(response.error().unwrap().code, AckCode::NoExist);
        assert_eq!(response.into_result().unwrap_err().code, AckCode::NoExist);

        assert!(Response::ok([("a", "b")]).into_result().is_ok());
    }

    #[test]
    fn test_get_returns_last() {
        let response = Response::ok([("changed", "player"), ("changed", "mixer")]);
        assert_eq!(response.get("changed"), Some("mixer"));
        assert_eq!(response.get("missing"), None);
    }
}
