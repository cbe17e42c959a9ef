//! Binary chunks and their reassembly.

use crate::error::ProtocolError;
use crate::response::Attrs;
use bytes::{Bytes, BytesMut};

/// One slice of a binary object as returned by `albumart` or `readpicture`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryChunk {
    /// Total size of the object in bytes.
    pub size: u64,
    /// This chunk's payload.
    pub data: Bytes,
    /// The other attributes of the reply (e.g. `type`).
    pub attrs: Attrs,
}

impl BinaryChunk {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// MIME type, when the daemon reports one.
    pub fn mime_type(&self) -> Option<&str> {
        self.attrs.get("type").map(String::as_str)
    }
}

/// Accumulates chunks until the advertised size is reached.
#[derive(Debug, Default)]
pub struct ChunkAssembler {
    limit: Option<usize>,
    size: Option<u64>,
    data: BytesMut,
}

impl ChunkAssembler {
    /// `limit` is the largest chunk the daemon may send, when known.
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            limit,
            size: None,
            data: BytesMut::new(),
        }
    }

    /// Offset to request next.
    pub fn offset(&self) -> usize {
        self.data.len()
    }

    /// Total size reported by the first chunk.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Adds a chunk. Returns the whole object once complete.
    pub fn push(&mut self, chunk: BinaryChunk) -> Result<Option<Bytes>, ProtocolError> {
        if let Some(limit) = self.limit {
            if chunk.len() > limit {
                return Err(ProtocolError::ChunkTooLarge {
                    len: chunk.len(),
                    max: limit,
                });
            }
        }

        let size = match self.size {
            None => {
                self.size = Some(chunk.size);
                chunk.size
            }
            Some(expected) if expected != chunk.size => {
                return Err(ProtocolError::SizeChanged {
                    expected,
                    actual: chunk.size,
                })
            }
            Some(expected) => expected,
        };

        if size == 0 {
            return Ok(Some(Bytes::new()));
        }
        if chunk.is_empty() {
            return Err(ProtocolError::EmptyChunk {
                offset: self.offset(),
                size,
            });
        }

        self.data.extend_from_slice(&chunk.data);

        if self.data.len() as u64 >= size {
            // `size` is below the accumulated length here, so it fits in usize.
            self.data.truncate(size as usize);
            return Ok(Some(std::mem::take(&mut self.data).freeze()));
        }
        Ok(None)
    }
}
