//! Command execution and output formatting.

use crate::{Commands, StickerAction};
use colored::Colorize;
use mpdwire_client::{Client, Sticker};
use mpdwire_protocol::{Attrs, Command, Response};
use serde::Serialize;
use std::path::Path;

/// Executes a command and returns the formatted output.
pub async fn execute(
    client: &Client,
    cmd: Commands,
    json: bool,
) -> Result<String, Box<dyn std::error::Error>> {
    match cmd {
        // Handled directly in main.rs
        Commands::Repl | Commands::Watch { .. } => unreachable!(),

        Commands::Ping => {
            client.ping().await?;
            Ok("OK".green().to_string())
        }

        Commands::Status => Ok(format_record(&client.status().await?, json)?),

        Commands::Current => {
            let song = client.current_song().await?;
            if song.is_empty() && !json {
                return Ok("Nothing playing".yellow().to_string());
            }
            Ok(format_record(&song, json)?)
        }

        Commands::Queue => {
            let songs = client.playlist_info(None, None).await?;
            if songs.is_empty() && !json {
                return Ok("Queue is empty".yellow().to_string());
            }
            if json {
                return Ok(serde_json::to_string_pretty(&songs)?);
            }
            let mut output = String::new();
            for song in &songs {
                let pos = song.get("Pos").map(String::as_str).unwrap_or("?");
                output.push_str(&format!("{:>4}  {}\n", pos.dimmed(), song_label(song)));
            }
            Ok(output)
        }

        Commands::Ls { uri } => {
            let entries = client.list_info(uri.as_deref().unwrap_or("")).await?;
            if json {
                return Ok(serde_json::to_string_pretty(&entries)?);
            }
            let mut output = String::new();
            for entry in &entries {
                if let Some(dir) = entry.get("directory") {
                    output.push_str(&format!("{}/\n", dir.blue()));
                } else if let Some(file) = entry.get("file") {
                    output.push_str(&format!("{}\n", file));
                } else if let Some(playlist) = entry.get("playlist") {
                    output.push_str(&format!("{}\n", playlist.magenta()));
                }
            }
            Ok(output)
        }

        Commands::List { tag } => {
            let values = client.list(&tag).await?;
            if json {
                return Ok(serde_json::to_string_pretty(&values)?);
            }
            Ok(values.join("\n"))
        }

        Commands::Outputs => {
            let outputs = client.list_outputs().await?;
            if json {
                return Ok(serde_json::to_string_pretty(&outputs)?);
            }
            let mut output = String::new();
            for out in &outputs {
                let id = out.get("outputid").map(String::as_str).unwrap_or("?");
                let name = out.get("outputname").map(String::as_str).unwrap_or("?");
                let state = if out.get("outputenabled").map(String::as_str) == Some("1") {
                    "enabled".green()
                } else {
                    "disabled".dimmed()
                };
                output.push_str(&format!("  [{}] {} ({})\n", id.cyan(), name, state));
            }
            Ok(output)
        }

        Commands::Enable { id } => {
            client.enable_output(id).await?;
            Ok(format!("{} output {}", "Enabled".green(), id))
        }

        Commands::Disable { id } => {
            client.disable_output(id).await?;
            Ok(format!("{} output {}", "Disabled".green(), id))
        }

        Commands::Update { uri } => {
            let job = client.update(uri.as_deref()).await?;
            Ok(format!("{} (job {})", "Updating database".green(), job))
        }

        Commands::Playlists => {
            let playlists = client.list_playlists().await?;
            if json {
                return Ok(serde_json::to_string_pretty(&playlists)?);
            }
            let mut output = String::new();
            for playlist in &playlists {
                let name = playlist.get("playlist").map(String::as_str).unwrap_or("?");
                output.push_str(&format!("{}\n", name.magenta()));
            }
            Ok(output)
        }

        Commands::Sticker { action } => match action {
            StickerAction::Get { uri, name } => {
                let sticker = client.sticker_get(&uri, &name).await?;
                Ok(format_sticker(&sticker))
            }
            StickerAction::Set { uri, name, value } => {
                client.sticker_set(&uri, &name, &value).await?;
                Ok(format!("{} {}={}", "Set".green(), name.cyan(), value))
            }
            StickerAction::List { uri } => {
                let stickers = client.sticker_list(&uri).await?;
                Ok(stickers
                    .iter()
                    .map(format_sticker)
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
            StickerAction::Delete { uri, name } => {
                client.sticker_delete(&uri, name.as_deref()).await?;
                Ok(format!("{} stickers of {}", "Deleted".green(), uri.cyan()))
            }
        },

        Commands::Albumart { uri, out } => {
            let data = client.album_art(&uri).await?;
            write_picture(&uri, &data, &out)
        }

        Commands::Readpicture { uri, out } => {
            let data = client.read_picture(&uri).await?;
            write_picture(&uri, &data, &out)
        }

        Commands::Raw { command, args } => {
            let response = client.command(Command::new(command).args(args)).await?;
            Ok(format_response(&response, json)?)
        }
    }
}

fn write_picture(
    uri: &str,
    data: &[u8],
    out: &Path,
) -> Result<String, Box<dyn std::error::Error>> {
    if data.is_empty() {
        return Ok(format!("{}: {}", "No picture".yellow(), uri));
    }
    std::fs::write(out, data)?;
    Ok(format!(
        "{} {} to {}",
        "Wrote".green(),
        format_bytes(data.len() as u64),
        out.display()
    ))
}

fn song_label(song: &Attrs) -> String {
    match (song.get("Artist"), song.get("Title")) {
        (Some(artist), Some(title)) => format!("{} - {}", artist.cyan(), title),
        (None, Some(title)) => title.clone(),
        _ => song.get("file").cloned().unwrap_or_default(),
    }
}

fn format_sticker(sticker: &Sticker) -> String {
    format!("{}={}", sticker.name.cyan(), sticker.value)
}

/// Formats one record with sorted keys.
pub fn format_record(attrs: &Attrs, json: bool) -> Result<String, serde_json::Error> {
    if json {
        return serde_json::to_string_pretty(attrs);
    }
    let mut keys: Vec<&String> = attrs.keys().collect();
    keys.sort();
    Ok(keys
        .into_iter()
        .map(|key| format!("{}: {}", key.cyan(), attrs[key]))
        .collect::<Vec<_>>()
        .join("\n"))
}

#[derive(Serialize)]
struct ResponseJson<'a> {
    pairs: Vec<[&'a str; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    binary_len: Option<usize>,
}

/// Formats a raw response in wire order.
pub fn format_response(response: &Response, json: bool) -> Result<String, serde_json::Error> {
    if json {
        return serde_json::to_string_pretty(&ResponseJson {
            pairs: response
                .pairs
                .iter()
                .map(|(k, v)| [k.as_str(), v.as_str()])
                .collect(),
            binary_len: response.binary.as_ref().map(|b| b.len()),
        });
    }

    let mut lines: Vec<String> = response
        .pairs
        .iter()
        .map(|(key, value)| format!("{}: {}", key.cyan(), value))
        .collect();
    if let Some(binary) = &response.binary {
        let note = format!("<{} of binary data>", format_bytes(binary.len() as u64));
        lines.push(note.dimmed().to_string());
    }
    if lines.is_empty() {
        return Ok("OK".green().to_string());
    }
    Ok(lines.join("\n"))
}

/// Formats bytes as human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.2} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn test_format_record_json() {
        let mut attrs = Attrs::new();
        attrs.insert("volume".into(), "50".into());
        let output = format_record(&attrs, true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["volume"], "50");
    }

    #[test]
    fn test_format_response_json_keeps_order() {
        let response = Response::ok([("Title", "B"), ("Title", "A")]);
        let output = format_response(&response, true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["pairs"][0][1], "B");
        assert_eq!(value["pairs"][1][1], "A");
        assert!(value.get("binary_len").is_none());
    }
}
