//! # mpdwire-protocol
//!
//! Wire protocol implementation for the MPD text protocol.
//!
//! This crate provides:
//! - Argument quoting and command line encoding, including command lists
//! - An incremental, I/O-free response decoder (text lines and binary payloads)
//! - Typed views over replies: records, record lists, scalar lists, binary chunks
//! - ACK error line classification
//! - Reassembly of chunked binary objects (album art, embedded pictures)

pub mod ack;
pub mod binary;
pub mod codec;
pub mod command;
pub mod error;
pub mod quote;
pub mod response;

pub use ack::{AckCode, AckError};
pub use binary::{BinaryChunk, ChunkAssembler};
pub use codec::{parse_greeting, parse_line, Frame, ResponseDecoder};
pub use command::{Command, CommandList};
pub use error::ProtocolError;
pub use quote::{quote, quote_args, split_args, unquote};
pub use response::{Attrs, Response, Terminator};

/// Default TCP port of the daemon.
pub const DEFAULT_PORT: u16 = 6600;

/// Prefix of the greeting line sent on connect; the rest is the version.
pub const GREETING_PREFIX: &str = "OK MPD ";

/// Successful end of a response.
pub const RESPONSE_OK: &str = "OK";

/// Successful end of one command inside a command list.
pub const RESPONSE_LIST_OK: &str = "list_OK";

/// Prefix of an error line.
pub const ACK_PREFIX: &str = "ACK ";

/// Longest text line accepted without a newline (1 MiB).
pub const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Largest binary payload accepted in one response (16 MiB).
pub const MAX_BINARY_CHUNK: usize = 16 * 1024 * 1024;
