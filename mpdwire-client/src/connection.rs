//! Connection management.

use crate::error::ClientError;
use crate::stream::ClientStream;
use crate::transport::Transport;
use mpdwire_protocol::{Command, CommandList, ProtocolError, Response, Terminator, DEFAULT_PORT};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// Default read buffer size (8 KiB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Minimum read buffer size (1 KiB).
pub const MIN_READ_BUFFER_SIZE: usize = 1024;

/// Maximum read buffer size (1 MiB).
pub const MAX_READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Smallest chunk size the daemon accepts for `binarylimit`.
pub const MIN_BINARY_LIMIT: usize = 64;

/// Where the daemon listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    Tcp { host: String, port: u16 },
    Unix(PathBuf),
}

impl Address {
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Address::Tcp {
            host: host.into(),
            port,
        }
    }

    pub fn unix(path: impl Into<PathBuf>) -> Self {
        Address::Unix(path.into())
    }
}

impl Default for Address {
    fn default() -> Self {
        Address::tcp("localhost", DEFAULT_PORT)
    }
}

/// Parses `host`, `host:port`, `[v6]:port` or an absolute socket path.
impl FromStr for Address {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ClientError::InvalidArgument("empty address".into()));
        }
        if s.starts_with('/') {
            return Ok(Address::unix(s));
        }
        if s.starts_with('@') {
            return Err(ClientError::InvalidArgument(format!(
                "abstract socket addresses are not supported: {}",
                s
            )));
        }

        let invalid_port = |port: &str| {
            ClientError::InvalidArgument(format!("invalid port '{}' in address '{}'", port, s))
        };

        if let Some(rest) = s.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| ClientError::InvalidArgument(format!("invalid address: {}", s)))?;
            let port = match tail.strip_prefix(':') {
                Some(port) => port.parse().map_err(|_| invalid_port(port))?,
                None if tail.is_empty() => DEFAULT_PORT,
                None => return Err(ClientError::InvalidArgument(format!("invalid address: {}", s))),
            };
            return Ok(Address::tcp(host, port));
        }

        match s.rsplit_once(':') {
            // A bare IPv6 address has several colons and no port.
            Some((host, _)) if host.contains(':') => Ok(Address::tcp(s, DEFAULT_PORT)),
            Some((host, port)) => Ok(Address::tcp(host, port.parse().map_err(|_| invalid_port(port))?)),
            None => Ok(Address::tcp(s, DEFAULT_PORT)),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Tcp { host, port } if host.contains(':') => write!(f, "[{}]:{}", host, port),
            Address::Tcp { host, port } => write!(f, "{}:{}", host, port),
            Address::Unix(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Daemon address.
    pub address: Address,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Request timeout, applied to each command/response cycle.
    pub request_timeout: Duration,
    /// Password sent right after the greeting (optional).
    pub password: Option<String>,
    /// Read buffer size for socket reads.
    pub read_buffer_size: usize,
    /// Chunk size requested with `binarylimit` on connect (optional).
    pub binary_limit: Option<usize>,
}

impl ConnectionConfig {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            password: None,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            binary_limit: None,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.clamp(MIN_READ_BUFFER_SIZE, MAX_READ_BUFFER_SIZE);
        self
    }

    pub fn with_binary_limit(mut self, limit: usize) -> Self {
        self.binary_limit = Some(limit.max(MIN_BINARY_LIMIT));
        self
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new(Address::default())
    }
}

/// Opens a stream, reads the greeting and authenticates.
///
/// Returns the ready transport and the daemon version. Used both by
/// [`Connection`] and by the idle watcher, which owns its own socket.
pub async fn dial(
    config: &ConnectionConfig,
) -> Result<(Transport<ClientStream>, String), ClientError> {
    tracing::debug!("Connecting to {}...", config.address);

    let stream = tokio::time::timeout(config.connect_timeout, open(&config.address))
        .await
        .map_err(|_| {
            tracing::debug!("Connection timeout");
            ClientError::Timeout
        })?
        .map_err(|e| {
            tracing::debug!("Connection failed: {}", e);
            e
        })?;

    let mut transport = Transport::new(stream, config.read_buffer_size);
    let version = tokio::time::timeout(config.request_timeout, transport.read_greeting())
        .await
        .map_err(|_| ClientError::Timeout)??;

    if let Some(password) = &config.password {
        tracing::debug!("Authenticating...");
        let command = Command::new("password").arg(password.as_str());
        transport
            .round_trip(&command, config.request_timeout)
            .await?
            .into_result()?;
    }

    Ok((transport, version))
}

async fn open(address: &Address) -> Result<ClientStream, ClientError> {
    match address {
        Address::Tcp { host, port } => {
            let stream = TcpStream::connect((host.as_str(), *port)).await?;
            stream.set_nodelay(true)?;
            Ok(ClientStream::from(stream))
        }
        #[cfg(unix)]
        Address::Unix(path) => {
            let stream = tokio::net::UnixStream::connect(path).await?;
            Ok(ClientStream::from(stream))
        }
        #[cfg(not(unix))]
        Address::Unix(path) => Err(ClientError::InvalidArgument(format!(
            "unix sockets are not supported on this platform: {}",
            path.display()
        ))),
    }
}

/// A connection to a daemon.
///
/// The protocol is strictly half-duplex: the transport lock is held for a
/// whole command/response cycle, so concurrent callers are serialized.
pub struct Connection {
    config: ConnectionConfig,
    /// Live transport, `None` until connected or after a transport failure.
    transport: Mutex<Option<Transport<ClientStream>>>,
    /// Version from the greeting.
    version: parking_lot::Mutex<Option<String>>,
    /// Chunk size in effect for binary responses, when known.
    binary_limit: parking_lot::Mutex<Option<usize>>,
    /// Is the connection established?
    connected: AtomicBool,
}

impl Connection {
    /// Creates a new connection (not yet connected).
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            transport: Mutex::new(None),
            version: parking_lot::Mutex::new(None),
            binary_limit: parking_lot::Mutex::new(None),
            connected: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Connects to the daemon.
    pub async fn connect(&self) -> Result<(), ClientError> {
        let (mut transport, version) = dial(&self.config).await?;

        if let Some(limit) = self.config.binary_limit {
            let command = Command::new("binarylimit").arg(limit.to_string());
            transport
                .round_trip(&command, self.config.request_timeout)
                .await?
                .into_result()?;
        }

        *self.transport.lock().await = Some(transport);
        *self.version.lock() = Some(version.clone());
        *self.binary_limit.lock() = self.config.binary_limit;
        self.connected.store(true, Ordering::SeqCst);

        tracing::info!("Connected to {} (MPD {})", self.config.address, version);
        Ok(())
    }

    /// Sends one command and waits for its response.
    ///
    /// ACK replies are returned as responses, not errors. Transport and
    /// framing failures close the connection.
    pub async fn request(&self, command: &Command) -> Result<Response, ClientError> {
        let mut guard = self.transport.lock().await;
        let transport = guard.as_mut().ok_or(ClientError::NotConnected)?;

        let result = transport
            .round_trip(command, self.config.request_timeout)
            .await
            .and_then(|response| {
                if response.terminator == Terminator::ListOk {
                    return Err(ClientError::Protocol(ProtocolError::UnexpectedListOk));
                }
                Ok(response)
            });

        if let Err(e) = &result {
            if e.is_transport() {
                tracing::warn!("Dropping connection after {}: {}", command.name(), e);
                *guard = None;
                self.connected.store(false, Ordering::SeqCst);
            }
        }
        result
    }

    /// Sends a command list and collects one response per command.
    ///
    /// Stops at the first ACK, which is the last element of the result.
    pub async fn request_list(&self, list: &CommandList) -> Result<Vec<Response>, ClientError> {
        let mut guard = self.transport.lock().await;
        let transport = guard.as_mut().ok_or(ClientError::NotConnected)?;

        let result = tokio::time::timeout(self.config.request_timeout, async {
            transport.send_list(list).await?;
            let mut responses = Vec::with_capacity(list.len());
            loop {
                let response = transport.read_response().await?;
                match response.terminator {
                    Terminator::ListOk => responses.push(response),
                    Terminator::Ok => break,
                    Terminator::Ack(_) => {
                        responses.push(response);
                        break;
                    }
                }
            }
            Ok(responses)
        })
        .await
        .unwrap_or(Err(ClientError::Timeout));

        if let Err(e) = &result {
            if e.is_transport() {
                tracing::warn!("Dropping connection after command list: {}", e);
                *guard = None;
                self.connected.store(false, Ordering::SeqCst);
            }
        }
        result
    }

    /// Returns the daemon version from the greeting.
    pub fn version(&self) -> Option<String> {
        self.version.lock().clone()
    }

    /// Returns the chunk size in effect for binary responses, when known.
    pub fn binary_limit(&self) -> Option<usize> {
        *self.binary_limit.lock()
    }

    pub(crate) fn set_binary_limit(&self, limit: usize) {
        *self.binary_limit.lock() = Some(limit);
    }

    /// Returns whether the connection is established.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Closes the connection.
    pub async fn close(&self) -> Result<(), ClientError> {
        let transport = self.transport.lock().await.take();
        self.connected.store(false, Ordering::SeqCst);

        if let Some(mut transport) = transport {
            // The daemon replies to `close` by hanging up.
            transport.send(&Command::new("close")).await?;
            transport.shutdown().await?;
            tracing::debug!("Closed connection to {}", self.config.address);
        }
        Ok(())
    }
}
