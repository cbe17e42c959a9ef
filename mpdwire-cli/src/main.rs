//! mpdwire - Command-line interface for MPD
//!
//! Provides both a REPL and one-shot command execution.

mod commands;
mod repl;

use clap::{Parser, Subcommand};
use colored::Colorize;
use mpdwire_client::{Client, ClientConfig, WatchEvent, Watcher};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mpdwire")]
#[command(about = "Command-line client for the Music Player Daemon")]
#[command(version)]
struct Cli {
    /// Daemon host, `password@host`, or socket path
    #[arg(long, env = "MPD_HOST")]
    host: Option<String>,

    /// Daemon port
    #[arg(short, long, env = "MPD_PORT")]
    port: Option<u16>,

    /// YAML configuration file
    #[arg(short, long, env = "MPDWIRE_CONFIG")]
    config: Option<PathBuf>,

    /// Print records as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start interactive REPL
    Repl,

    /// Ping the daemon
    Ping,

    /// Show player status
    Status,

    /// Show the current song
    Current,

    /// List the queue
    Queue,

    /// List a database directory
    Ls {
        /// Directory URI (database root if omitted)
        uri: Option<String>,
    },

    /// List the distinct values of a tag
    List {
        /// Tag name, e.g. Artist or Album
        tag: String,
    },

    /// List audio outputs
    Outputs,

    /// Enable an output
    Enable {
        /// Output id
        id: u32,
    },

    /// Disable an output
    Disable {
        /// Output id
        id: u32,
    },

    /// Update the database
    Update {
        /// Only update this directory or file
        uri: Option<String>,
    },

    /// List stored playlists
    Playlists,

    /// Read and write song stickers
    Sticker {
        #[command(subcommand)]
        action: StickerAction,
    },

    /// Save the album art of a song to a file
    Albumart {
        /// Song URI
        uri: String,
        /// Output file
        out: PathBuf,
    },

    /// Save the picture embedded in a song to a file
    Readpicture {
        /// Song URI
        uri: String,
        /// Output file
        out: PathBuf,
    },

    /// Print subsystem changes until interrupted
    Watch {
        /// Subsystems to watch (all if omitted)
        subsystems: Vec<String>,
    },

    /// Send any command
    Raw {
        /// Command name
        command: String,
        /// Arguments, quoted on the wire
        args: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum StickerAction {
    /// Get one sticker
    Get { uri: String, name: String },
    /// Set a sticker
    Set {
        uri: String,
        name: String,
        value: String,
    },
    /// List the stickers of a song
    List { uri: String },
    /// Delete one sticker, or all of them
    Delete { uri: String, name: Option<String> },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::default(),
    };
    config.apply_overrides(|name| std::env::var(name).ok());
    if let Some(host) = &cli.host {
        config.set_host(host);
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    let address = config.address();

    match cli.command {
        Some(Commands::Repl) | None => {
            let client = Client::from_config(&config)?;
            repl::run(client, address).await?;
        }
        Some(Commands::Watch { subsystems }) => {
            // Streams changes until Ctrl+C
            let mut watcher = Watcher::spawn(config.to_connection_config()?, subsystems)
                .await
                .map_err(|e| {
                    eprintln!("{}: {}", "Connection failed".red(), e);
                    e
                })?;
            eprintln!("{} {}", "Watching".green(), address.to_string().cyan());
            eprintln!("{}", "Press Ctrl+C to stop...".dimmed());

            loop {
                tokio::select! {
                    event = watcher.next() => match event {
                        Some(WatchEvent::Changed(name)) => {
                            if cli.json {
                                println!("{}", serde_json::json!({ "changed": name }));
                            } else {
                                println!("{}: {}", "changed".cyan(), name);
                            }
                        }
                        Some(WatchEvent::Error(e)) => {
                            eprintln!("{}: {}", "Error".red(), e);
                            std::process::exit(1);
                        }
                        None => break,
                    },
                    _ = tokio::signal::ctrl_c() => {
                        eprintln!("\n{}", "Stopping watch...".dimmed());
                        break;
                    }
                }
            }

            watcher.close().await;
        }
        Some(cmd) => {
            // Connect for one-shot command
            let client = Client::from_config(&config)?;
            client.connect().await.map_err(|e| {
                eprintln!("{}: {}", "Connection failed".red(), e);
                e
            })?;

            match commands::execute(&client, cmd, cli.json).await {
                Ok(output) => {
                    println!("{}", output);
                }
                Err(e) => {
                    eprintln!("{}: {}", "Error".red(), e);
                    std::process::exit(1);
                }
            }

            client.close().await?;
        }
    }

    Ok(())
}
