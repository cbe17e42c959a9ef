//! # mpdwire-client
//!
//! Client library for MPD.
//!
//! This crate provides:
//! - Async TCP and Unix socket connections with timeouts
//! - High-level API over the common commands, plus raw commands and command lists
//! - Chunked album art and embedded picture fetching
//! - A background idle watcher with its own connection
//! - YAML and environment configuration

pub mod artwork;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod stream;
pub mod transport;
pub mod watcher;

pub use artwork::{fetch_binary, BinaryCommand};
pub use client::{Client, Sticker};
pub use config::{ClientConfig, ConfigError};
pub use connection::{Address, Connection, ConnectionConfig};
pub use error::ClientError;
pub use watcher::{WatchEvent, Watcher};
