//! Background idle watcher.
//!
//! `idle` blocks the connection it is sent on, so the watcher dials a
//! connection of its own and reports changes over a channel.

use crate::connection::{dial, ConnectionConfig};
use crate::error::ClientError;
use crate::stream::ClientStream;
use crate::transport::Transport;
use mpdwire_protocol::Command;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Default capacity for the event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Something the watcher observed.
#[derive(Debug)]
pub enum WatchEvent {
    /// A subsystem changed (`player`, `mixer`, `database`...).
    Changed(String),
    /// The watch connection failed; no more events follow.
    Error(ClientError),
}

/// Handle to a running idle loop.
pub struct Watcher {
    events: mpsc::Receiver<WatchEvent>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
    version: String,
}

impl Watcher {
    /// Connects and starts watching `subsystems` (all of them, if empty).
    pub async fn spawn<I, S>(config: ConnectionConfig, subsystems: I) -> Result<Self, ClientError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (transport, version) = dial(&config).await?;
        let idle = Command::new("idle").args(subsystems);
        tracing::debug!("Starting watcher: {}", idle);

        let (events_tx, events) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(run(
            transport,
            idle,
            events_tx,
            shutdown_rx,
            config.request_timeout,
        ));

        Ok(Self {
            events,
            shutdown: Some(shutdown_tx),
            handle,
            version,
        })
    }

    /// Waits for the next event; `None` once the loop has ended.
    pub async fn next(&mut self) -> Option<WatchEvent> {
        self.events.recv().await
    }

    /// Daemon version of the watch connection.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Stops the loop and waits for the connection to close.
    pub async fn close(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(e) = (&mut self.handle).await {
            tracing::warn!("Watcher task failed: {}", e);
        }
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn run(
    mut transport: Transport<ClientStream>,
    idle: Command,
    events: mpsc::Sender<WatchEvent>,
    mut shutdown: oneshot::Receiver<()>,
    request_timeout: Duration,
) {
    loop {
        if let Err(e) = transport.send(&idle).await {
            let _ = events.send(WatchEvent::Error(e)).await;
            return;
        }

        let response = tokio::select! {
            response = transport.read_response() => response,
            _ = &mut shutdown => {
                if let Err(e) = leave(&mut transport, request_timeout).await {
                    tracing::debug!("Watcher shutdown: {}", e);
                }
                return;
            }
        };

        let changed = response
            .and_then(|response| Ok(response.into_result()?))
            .and_then(|response| Ok(response.into_values("changed")?));

        match changed {
            Ok(changed) => {
                for name in changed {
                    tracing::debug!("Subsystem changed: {}", name);
                    if events.send(WatchEvent::Changed(name)).await.is_err() {
                        // Receiver gone; no idle is pending here.
                        let _ = goodbye(&mut transport).await;
                        return;
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Watcher stopped: {}", e);
                let _ = events.send(WatchEvent::Error(e)).await;
                return;
            }
        }
    }
}

/// Cancels the pending `idle`, drains its reply and says goodbye.
async fn leave(
    transport: &mut Transport<ClientStream>,
    request_timeout: Duration,
) -> Result<(), ClientError> {
    transport
        .round_trip(&Command::new("noidle"), request_timeout)
        .await?;
    goodbye(transport).await
}

async fn goodbye(transport: &mut Transport<ClientStream>) -> Result<(), ClientError> {
    transport.send(&Command::new("close")).await?;
    transport.shutdown().await
}
