//! Interactive REPL.
//!
//! Any line is sent to the daemon as a command; arguments may be quoted
//! the way the protocol quotes them.

use crate::commands::format_response;
use colored::Colorize;
use mpdwire_client::{Address, Client, ClientError};
use mpdwire_protocol::{split_args, Command};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};

const HELP_TEXT: &str = r#"
Every line is sent as a command, for example:
  status                        Player status
  currentsong                   Current song
  playlistinfo                  The queue
  lsinfo "Some Directory"       Directory listing
  list Artist                   Distinct tag values
  play 3                        Play queue position 3

Local commands:
  help                          Show this help
  albumart <uri>                Fetch album art and print its size
  readpicture <uri>             Fetch the embedded picture and print its size
  reconnect                     Reconnect to the daemon
  quit, exit                    Exit the REPL
"#;

/// Outcome of one REPL line.
enum Step {
    Output(String),
    Exit,
}

pub async fn run(client: Client, address: Address) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "mpdwire".bold().cyan());
    println!("Connecting to {}...", address);

    client.connect().await?;
    println!(
        "{} (MPD {})",
        "Connected!".green(),
        client.version().unwrap_or_default()
    );

    // Create readline editor
    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl: Editor<(), DefaultHistory> = Editor::with_config(config)?;

    // Load history
    let history_path = std::env::var("HOME")
        .map(|h| std::path::PathBuf::from(h).join(".mpdwire_history"))
        .unwrap_or_else(|_| ".mpdwire_history".into());
    let _ = rl.load_history(&history_path);

    println!("Type 'help' for available commands.\n");

    loop {
        let prompt = format!("{} ", "mpd>".cyan());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match execute_repl_command(&client, line).await {
                    Ok(Step::Output(output)) => println!("{}\n", output),
                    Ok(Step::Exit) => break,
                    Err(e) => {
                        println!("{}: {}\n", "Error".red(), e);
                        if !client.is_connected() {
                            println!("{}\n", "Connection lost; type 'reconnect'.".yellow());
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                println!("{}: {:?}", "Error".red(), err);
                break;
            }
        }
    }

    // Save history
    let _ = rl.save_history(&history_path);

    // Disconnect
    let _ = client.close().await;
    println!("{}", "Disconnected.".dimmed());

    Ok(())
}

async fn execute_repl_command(client: &Client, line: &str) -> Result<Step, ClientError> {
    let mut parts = split_args(line)?;
    if parts.is_empty() {
        return Ok(Step::Output(String::new()));
    }
    let name = parts.remove(0);

    match name.to_lowercase().as_str() {
        "help" | "?" => Ok(Step::Output(HELP_TEXT.to_string())),

        "quit" | "exit" | "q" => Ok(Step::Exit),

        "reconnect" => {
            client.connect().await?;
            Ok(Step::Output("Connected!".green().to_string()))
        }

        "albumart" | "readpicture" => {
            let Some(uri) = parts.first() else {
                return Ok(Step::Output(format!("Usage: {} <uri>", name)));
            };
            let data = if name.eq_ignore_ascii_case("albumart") {
                client.album_art(uri).await?
            } else {
                client.read_picture(uri).await?
            };
            if data.is_empty() {
                return Ok(Step::Output("No picture".yellow().to_string()));
            }
            Ok(Step::Output(format!("{} bytes", data.len())))
        }

        _ => {
            let response = client.command(Command::new(name).args(parts)).await?;
            format_response(&response, false)
                .map(Step::Output)
                .map_err(|e| ClientError::InvalidArgument(e.to_string()))
        }
    }
}
