//! High-level client API.

use crate::artwork::{fetch_binary, BinaryCommand};
use crate::config::ClientConfig;
use crate::connection::{Connection, ConnectionConfig, MIN_BINARY_LIMIT};
use crate::error::ClientError;
use bytes::Bytes;
use mpdwire_protocol::response::parse_int;
use mpdwire_protocol::{Attrs, Command, CommandList, ProtocolError, Response};
use std::sync::Arc;

/// Boundary keys of database listings.
const DATABASE_ENTITIES: &[&str] = &["file", "directory", "playlist"];

/// A sticker attached to a song.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sticker {
    pub name: String,
    pub value: String,
}

impl Sticker {
    /// Parses the `name=value` form used in `sticker:` lines.
    pub fn parse(s: &str) -> Result<Self, ProtocolError> {
        let (name, value) = s
            .split_once('=')
            .ok_or_else(|| ProtocolError::MalformedLine(format!("sticker: {}", s)))?;
        Ok(Self {
            name: name.to_string(),
            value: value.to_string(),
        })
    }
}

/// High-level client for an MPD daemon.
pub struct Client {
    conn: Arc<Connection>,
}

impl Client {
    /// Creates a new client with the given configuration.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            conn: Arc::new(Connection::new(config)),
        }
    }

    /// Creates a client from a loaded [`ClientConfig`], validating it first.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        Ok(Self::new(config.to_connection_config()?))
    }

    /// Connects to the daemon.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.conn.connect().await
    }

    /// Returns whether the client is connected.
    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    /// Returns the daemon version from the greeting.
    pub fn version(&self) -> Option<String> {
        self.conn.version()
    }

    /// Closes the connection.
    pub async fn close(&self) -> Result<(), ClientError> {
        self.conn.close().await
    }

    /// Returns the underlying connection.
    pub fn connection(&self) -> Arc<Connection> {
        self.conn.clone()
    }

    // =========================================================================
    // Helper methods
    // =========================================================================

    async fn request(&self, command: Command) -> Result<Response, ClientError> {
        let response = self.conn.request(&command).await?;
        Ok(response.into_result()?)
    }

    async fn ok(&self, command: Command) -> Result<(), ClientError> {
        self.request(command).await?;
        Ok(())
    }

    async fn attrs_list(
        &self,
        command: Command,
        boundary_keys: &[&str],
    ) -> Result<Vec<Attrs>, ClientError> {
        Ok(self.request(command).await?.into_attrs_list(boundary_keys)?)
    }

    /// Directory listings come back with lowercased keys.
    async fn listing(&self, command: Command) -> Result<Vec<Attrs>, ClientError> {
        Ok(self
            .request(command)
            .await?
            .into_lowercase_attrs_list(DATABASE_ENTITIES)?)
    }

    async fn values(&self, command: Command, key: &str) -> Result<Vec<String>, ClientError> {
        Ok(self.request(command).await?.into_values(key)?)
    }

    // =========================================================================
    // Raw commands
    // =========================================================================

    /// Sends any command; an ACK reply becomes [`ClientError::Server`].
    pub async fn command(&self, command: Command) -> Result<Response, ClientError> {
        self.request(command).await
    }

    /// Sends a command list, returning one response per command.
    ///
    /// The first failing command ends the batch; its ACK carries the
    /// index the daemon reports for that command.
    pub async fn command_list(&self, list: CommandList) -> Result<Vec<Response>, ClientError> {
        let responses = self.conn.request_list(&list).await?;
        responses
            .into_iter()
            .map(|response| response.into_result().map_err(ClientError::from))
            .collect()
    }

    // =========================================================================
    // Connection settings
    // =========================================================================

    /// Pings the daemon.
    pub async fn ping(&self) -> Result<(), ClientError> {
        self.ok(Command::new("ping")).await
    }

    /// Authenticates with a password.
    pub async fn password(&self, password: &str) -> Result<(), ClientError> {
        self.ok(Command::new("password").arg(password)).await
    }

    /// Sets the chunk size for binary responses.
    pub async fn binary_limit(&self, limit: usize) -> Result<(), ClientError> {
        if limit < MIN_BINARY_LIMIT {
            return Err(ClientError::InvalidArgument(format!(
                "binary limit must be at least {}, got {}",
                MIN_BINARY_LIMIT, limit
            )));
        }
        self.ok(Command::new("binarylimit").arg(limit.to_string()))
            .await?;
        self.conn.set_binary_limit(limit);
        Ok(())
    }

    // =========================================================================
    // Status
    // =========================================================================

    pub async fn status(&self) -> Result<Attrs, ClientError> {
        Ok(self.request(Command::new("status")).await?.into_attrs())
    }

    pub async fn stats(&self) -> Result<Attrs, ClientError> {
        Ok(self.request(Command::new("stats")).await?.into_attrs())
    }

    /// Returns the current song, or an empty record when nothing is queued.
    pub async fn current_song(&self) -> Result<Attrs, ClientError> {
        Ok(self
            .request(Command::new("currentsong"))
            .await?
            .into_entity(&["file"])?)
    }

    /// Blocks until one of `subsystems` changes (any, if empty).
    ///
    /// This holds the connection for as long as the daemon stays idle;
    /// use a [`Watcher`](crate::Watcher) to wait without blocking other
    /// commands.
    pub async fn idle(&self, subsystems: &[&str]) -> Result<Vec<String>, ClientError> {
        let command = Command::new("idle").args(subsystems.iter().copied());
        self.values(command, "changed").await
    }

    // =========================================================================
    // Playback
    // =========================================================================

    /// Starts playback, at queue position `pos` if given.
    pub async fn play(&self, pos: Option<u32>) -> Result<(), ClientError> {
        self.ok(Command::new("play").opt_arg(pos.map(|p| p.to_string())))
            .await
    }

    pub async fn play_id(&self, id: u32) -> Result<(), ClientError> {
        self.ok(Command::new("playid").arg(id.to_string())).await
    }

    pub async fn pause(&self, pause: bool) -> Result<(), ClientError> {
        self.ok(Command::new("pause").arg(flag(pause))).await
    }

    pub async fn stop(&self) -> Result<(), ClientError> {
        self.ok(Command::new("stop")).await
    }

    pub async fn next(&self) -> Result<(), ClientError> {
        self.ok(Command::new("next")).await
    }

    pub async fn previous(&self) -> Result<(), ClientError> {
        self.ok(Command::new("previous")).await
    }

    /// Seeks to `seconds` within the song at queue position `pos`.
    pub async fn seek(&self, pos: u32, seconds: f64) -> Result<(), ClientError> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(ClientError::InvalidArgument(format!(
                "invalid seek time: {}",
                seconds
            )));
        }
        self.ok(
            Command::new("seek")
                .arg(pos.to_string())
                .arg(format!("{:.3}", seconds)),
        )
        .await
    }

    pub async fn set_volume(&self, volume: u8) -> Result<(), ClientError> {
        if volume > 100 {
            return Err(ClientError::InvalidArgument(format!(
                "volume must be between 0 and 100, got {}",
                volume
            )));
        }
        self.ok(Command::new("setvol").arg(volume.to_string())).await
    }

    pub async fn random(&self, random: bool) -> Result<(), ClientError> {
        self.ok(Command::new("random").arg(flag(random))).await
    }

    pub async fn repeat(&self, repeat: bool) -> Result<(), ClientError> {
        self.ok(Command::new("repeat").arg(flag(repeat))).await
    }

    // =========================================================================
    // Queue
    // =========================================================================

    /// Lists queued songs: all of them, the one at `start`, or the
    /// half-open range `start..end`.
    pub async fn playlist_info(
        &self,
        start: Option<u32>,
        end: Option<u32>,
    ) -> Result<Vec<Attrs>, ClientError> {
        let range = range_arg(start, end)?;
        self.attrs_list(Command::new("playlistinfo").opt_arg(range), &["file"])
            .await
    }

    /// Appends a song or directory to the queue.
    pub async fn add(&self, uri: &str) -> Result<(), ClientError> {
        self.ok(Command::new("add").arg(uri)).await
    }

    /// Adds a song to the queue and returns its song id.
    pub async fn add_id(&self, uri: &str, position: Option<u32>) -> Result<u32, ClientError> {
        let command = Command::new("addid")
            .arg(uri)
            .opt_arg(position.map(|p| p.to_string()));
        let response = self.request(command).await?;
        let id = response
            .get("Id")
            .ok_or(ProtocolError::MissingField("Id"))?;
        Ok(parse_int("Id", id)?)
    }

    pub async fn delete(&self, pos: u32) -> Result<(), ClientError> {
        self.ok(Command::new("delete").arg(pos.to_string())).await
    }

    pub async fn delete_id(&self, id: u32) -> Result<(), ClientError> {
        self.ok(Command::new("deleteid").arg(id.to_string())).await
    }

    pub async fn clear(&self) -> Result<(), ClientError> {
        self.ok(Command::new("clear")).await
    }

    /// Sets the priority of the song at `start`, or of `start..end`.
    pub async fn set_priority(
        &self,
        priority: u32,
        start: u32,
        end: Option<u32>,
    ) -> Result<(), ClientError> {
        let priority = check_priority(priority)?;
        let range = range_arg(Some(start), end)?;
        self.ok(Command::new("prio").arg(priority).opt_arg(range))
            .await
    }

    pub async fn set_priority_id(&self, priority: u32, id: u32) -> Result<(), ClientError> {
        let priority = check_priority(priority)?;
        self.ok(Command::new("prioid").arg(priority).arg(id.to_string()))
            .await
    }

    // =========================================================================
    // Database
    // =========================================================================

    /// Lists the songs, directories and playlists directly under `uri`.
    pub async fn list_info(&self, uri: &str) -> Result<Vec<Attrs>, ClientError> {
        self.listing(Command::new("lsinfo").arg(uri)).await
    }

    /// Recursively lists everything under `uri` with metadata.
    pub async fn list_all_info(&self, uri: &str) -> Result<Vec<Attrs>, ClientError> {
        self.listing(Command::new("listallinfo").arg(uri)).await
    }

    /// Returns the URI of every song in the database.
    pub async fn get_files(&self) -> Result<Vec<String>, ClientError> {
        let response = self.request(Command::new("listall")).await?;
        Ok(response
            .pairs
            .into_iter()
            .filter(|(key, _)| key == "file")
            .map(|(_, value)| value)
            .collect())
    }

    /// Returns the distinct values of a tag, e.g. `Artist`.
    pub async fn list(&self, tag: &str) -> Result<Vec<String>, ClientError> {
        self.values(Command::new("list").arg(tag), tag).await
    }

    /// Starts a database update and returns the job id.
    pub async fn update(&self, uri: Option<&str>) -> Result<u32, ClientError> {
        self.update_job(Command::new("update").opt_arg(uri)).await
    }

    /// Like [`update`](Self::update), but rereads unmodified files too.
    pub async fn rescan(&self, uri: Option<&str>) -> Result<u32, ClientError> {
        self.update_job(Command::new("rescan").opt_arg(uri)).await
    }

    async fn update_job(&self, command: Command) -> Result<u32, ClientError> {
        let response = self.request(command).await?;
        let job = response
            .get("updating_db")
            .ok_or(ProtocolError::MissingField("updating_db"))?;
        Ok(parse_int("updating_db", job)?)
    }

    /// Returns the raw comment tags of a song file.
    pub async fn read_comments(&self, uri: &str) -> Result<Attrs, ClientError> {
        Ok(self
            .request(Command::new("readcomments").arg(uri))
            .await?
            .into_attrs())
    }

    // =========================================================================
    // Outputs
    // =========================================================================

    pub async fn list_outputs(&self) -> Result<Vec<Attrs>, ClientError> {
        self.attrs_list(Command::new("outputs"), &["outputid"]).await
    }

    pub async fn enable_output(&self, id: u32) -> Result<(), ClientError> {
        self.ok(Command::new("enableoutput").arg(id.to_string()))
            .await
    }

    pub async fn disable_output(&self, id: u32) -> Result<(), ClientError> {
        self.ok(Command::new("disableoutput").arg(id.to_string()))
            .await
    }

    pub async fn toggle_output(&self, id: u32) -> Result<(), ClientError> {
        self.ok(Command::new("toggleoutput").arg(id.to_string()))
            .await
    }

    // =========================================================================
    // Stored playlists
    // =========================================================================

    pub async fn list_playlists(&self) -> Result<Vec<Attrs>, ClientError> {
        self.attrs_list(Command::new("listplaylists"), &["playlist"])
            .await
    }

    /// Returns the songs of a stored playlist with metadata.
    pub async fn playlist_contents(&self, name: &str) -> Result<Vec<Attrs>, ClientError> {
        self.attrs_list(Command::new("listplaylistinfo").arg(name), &["file"])
            .await
    }

    pub async fn playlist_add(&self, name: &str, uri: &str) -> Result<(), ClientError> {
        self.ok(Command::new("playlistadd").arg(name).arg(uri))
            .await
    }

    pub async fn playlist_delete(&self, name: &str, pos: u32) -> Result<(), ClientError> {
        self.ok(
            Command::new("playlistdelete")
                .arg(name)
                .arg(pos.to_string()),
        )
        .await
    }

    pub async fn playlist_clear(&self, name: &str) -> Result<(), ClientError> {
        self.ok(Command::new("playlistclear").arg(name)).await
    }

    pub async fn playlist_remove(&self, name: &str) -> Result<(), ClientError> {
        self.ok(Command::new("rm").arg(name)).await
    }

    pub async fn playlist_rename(&self, name: &str, new_name: &str) -> Result<(), ClientError> {
        self.ok(Command::new("rename").arg(name).arg(new_name)).await
    }

    /// Loads a stored playlist (or the range `start..end` of it) into the queue.
    pub async fn playlist_load(
        &self,
        name: &str,
        start: Option<u32>,
        end: Option<u32>,
    ) -> Result<(), ClientError> {
        let range = range_arg(start, end)?;
        self.ok(Command::new("load").arg(name).opt_arg(range)).await
    }

    /// Saves the queue as a stored playlist.
    pub async fn playlist_save(&self, name: &str) -> Result<(), ClientError> {
        self.ok(Command::new("save").arg(name)).await
    }

    // =========================================================================
    // Stickers
    // =========================================================================

    pub async fn sticker_set(&self, uri: &str, name: &str, value: &str) -> Result<(), ClientError> {
        self.ok(sticker_command("set", uri).arg(name).arg(value))
            .await
    }

    pub async fn sticker_get(&self, uri: &str, name: &str) -> Result<Sticker, ClientError> {
        let response = self.request(sticker_command("get", uri).arg(name)).await?;
        let line = response
            .get("sticker")
            .ok_or(ProtocolError::MissingField("sticker"))?;
        Ok(Sticker::parse(line)?)
    }

    pub async fn sticker_list(&self, uri: &str) -> Result<Vec<Sticker>, ClientError> {
        let values = self.values(sticker_command("list", uri), "sticker").await?;
        values
            .iter()
            .map(|value| Sticker::parse(value).map_err(ClientError::from))
            .collect()
    }

    /// Finds songs under `uri` carrying sticker `name`.
    ///
    /// Returns `(file, sticker)` pairs.
    pub async fn sticker_find(
        &self,
        uri: &str,
        name: &str,
    ) -> Result<Vec<(String, Sticker)>, ClientError> {
        let records = self
            .attrs_list(sticker_command("find", uri).arg(name), &["file"])
            .await?;
        records
            .into_iter()
            .map(|mut record| -> Result<(String, Sticker), ClientError> {
                let file = record
                    .remove("file")
                    .ok_or(ProtocolError::MissingField("file"))?;
                let sticker = record
                    .get("sticker")
                    .ok_or(ProtocolError::MissingField("sticker"))?;
                Ok((file, Sticker::parse(sticker)?))
            })
            .collect()
    }

    /// Deletes sticker `name`, or every sticker of the song if `None`.
    pub async fn sticker_delete(&self, uri: &str, name: Option<&str>) -> Result<(), ClientError> {
        self.ok(sticker_command("delete", uri).opt_arg(name)).await
    }

    // =========================================================================
    // Artwork
    // =========================================================================

    /// Fetches the cover file of a song's directory.
    ///
    /// Empty bytes mean the song has no cover.
    pub async fn album_art(&self, uri: &str) -> Result<Bytes, ClientError> {
        fetch_binary(&self.conn, BinaryCommand::AlbumArt, uri).await
    }

    /// Fetches the picture embedded in a song's tags.
    pub async fn read_picture(&self, uri: &str) -> Result<Bytes, ClientError> {
        fetch_binary(&self.conn, BinaryCommand::ReadPicture, uri).await
    }
}

fn flag(on: bool) -> &'static str {
    if on {
        "1"
    } else {
        "0"
    }
}

fn sticker_command(action: &str, uri: &str) -> Command {
    Command::new("sticker").arg(action).arg("song").arg(uri)
}

/// Formats a position or `start:end` range argument.
fn range_arg(start: Option<u32>, end: Option<u32>) -> Result<Option<String>, ClientError> {
    match (start, end) {
        (None, None) => Ok(None),
        (None, Some(_)) => Err(ClientError::InvalidArgument(
            "range end given without a start".into(),
        )),
        (Some(start), None) => Ok(Some(start.to_string())),
        (Some(start), Some(end)) if end < start => Err(ClientError::InvalidArgument(format!(
            "range end {} is before start {}",
            end, start
        ))),
        (Some(start), Some(end)) => Ok(Some(format!("{}:{}", start, end))),
    }
}

fn check_priority(priority: u32) -> Result<String, ClientError> {
    if priority > 255 {
        return Err(ClientError::InvalidArgument(format!(
            "priority must be between 0 and 255, got {}",
            priority
        )));
    }
    Ok(priority.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sticker_parse() {
        let sticker = Sticker::parse("rating=5").unwrap();
        assert_eq!(sticker.name, "rating");
        assert_eq!(sticker.value, "5");

        // Only the first '=' separates name from value.
        let sticker = Sticker::parse("note=a=b").unwrap();
        assert_eq!(sticker.value, "a=b");

        assert!(Sticker::parse("rating").is_err());
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let config = ClientConfig {
            host: "@mpd".into(),
            ..ClientConfig::default()
        };
        assert!(matches!(
            Client::from_config(&config),
            Err(ClientError::Config(_))
        ));

        let client = Client::from_config(&ClientConfig::default()).unwrap();
        assert!(!client.is_connected());
    }

    #[test]
    fn test_range_arg() {
        assert_eq!(range_arg(None, None).unwrap(), None);
        assert_eq!(range_arg(Some(3), None).unwrap().as_deref(), Some("3"));
        assert_eq!(range_arg(Some(1), Some(4)).unwrap().as_deref(), Some("1:4"));
        assert!(range_arg(None, Some(4)).is_err());
        assert!(range_arg(Some(5), Some(4)).is_err());
    }

    #[test]
    fn test_check_priority() {
        assert_eq!(check_priority(0).unwrap(), "0");
        assert_eq!(check_priority(255).unwrap(), "255");
        assert!(matches!(
            check_priority(256),
            Err(ClientError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_flag() {
        assert_eq!(flag(true), "1");
        assert_eq!(flag(false), "0");
    }
}
