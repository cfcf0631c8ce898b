//! # MPD Client Module
//!
//! Thin transport to the Music Player Daemon. Everything mpdc needs from the
//! daemon goes through the [`Daemon`] trait; [`Mpc`] implements it by running
//! the `mpc` command-line client, so no MPD protocol handling lives here.
//!
//! Queue positions are 1-based, as `mpc` prints and accepts them.
//!
//! Bulk operations (`add`, `insert`, `del`) pass their arguments on standard
//! input, one per line, so queue edits of any size take a single `mpc` call.

use anyhow::{bail, Context, Result};
use log::{debug, info};
use std::io::Write;
use std::process::{Command, Stdio};

use crate::catalog::{TagRecord, Track};
use crate::config::Profile;

/// Operations mpdc performs against the daemon.
pub trait Daemon {
    /// Fails when the daemon cannot be reached.
    fn connect(&mut self) -> Result<()>;
    /// Marker that changes whenever the daemon's track database changes.
    fn database_stamp(&mut self) -> Result<String>;
    /// Every track in the daemon's canonical order.
    fn list_tracks(&mut self) -> Result<Vec<Track>>;
    fn stored_playlists(&mut self) -> Result<Vec<String>>;
    fn stored_playlist_tracks(&mut self, name: &str) -> Result<Vec<String>>;
    /// Files in the play queue; index `i` is position `i + 1`.
    fn queue_files(&mut self) -> Result<Vec<String>>;
    /// Appends to the end of the queue.
    fn add(&mut self, files: &[String]) -> Result<()>;
    /// Inserts right after the current track.
    fn insert(&mut self, files: &[String]) -> Result<()>;
    fn remove_positions(&mut self, positions: &[usize]) -> Result<()>;
    fn play_position(&mut self, position: usize) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
    /// Removes everything except the current track.
    fn crop(&mut self) -> Result<()>;
    /// Rescans the music directory and waits for it to finish.
    fn update(&mut self) -> Result<()>;
}

const FIELD_SEPARATOR: char = '\u{1f}';

/// `mpc` format printing one track per line, fields separated by
/// [`FIELD_SEPARATOR`]. Bracketed tags print nothing when absent.
fn track_format() -> String {
    ["%file%", "[%artist%]", "[%albumartist%]", "[%album%]", "[%title%]", "[%track%]"]
        .join(&FIELD_SEPARATOR.to_string())
}

/// Parses one line printed with [`track_format`].
pub fn parse_track_line(line: &str) -> Option<Track> {
    let mut fields = line.split(FIELD_SEPARATOR);
    let file = fields.next().filter(|f| !f.is_empty())?;
    let mut next = || fields.next().unwrap_or_default().trim().to_string();
    let tags = TagRecord {
        artist: next(),
        albumartist: next(),
        album: next(),
        title: next(),
        track: next(),
    };
    Some(Track::new(file, tags))
}

/// Extracts the `DB Updated:` line of `mpc stats`.
pub fn parse_database_stamp(stats: &str) -> Option<String> {
    stats
        .lines()
        .find_map(|line| line.strip_prefix("DB Updated:"))
        .map(|stamp| stamp.trim().to_string())
}

fn non_empty_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// [`Daemon`] backed by the `mpc` binary.
#[derive(Debug, Clone)]
pub struct Mpc {
    connection_args: Vec<String>,
}

impl Mpc {
    pub fn new(profile: &Profile) -> Self {
        let host = match &profile.password {
            Some(password) => format!("{password}@{}", profile.host),
            None => profile.host.clone(),
        };
        Self {
            connection_args: vec!["-h".into(), host, "-p".into(), profile.port.to_string()],
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new("mpc");
        command.args(&self.connection_args);
        command
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        debug!("mpc {}", args.join(" "));
        let output = self
            .command()
            .args(args)
            .output()
            .context("Failed to execute mpc command. Please install mpc (MPD client)")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("mpc {} failed: {}", args.join(" "), stderr.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn run_with_input(&self, args: &[&str], lines: &[String]) -> Result<()> {
        if lines.is_empty() {
            return Ok(());
        }
        debug!("mpc {} <{} lines>", args.join(" "), lines.len());

        let mut child = self
            .command()
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to execute mpc command. Please install mpc (MPD client)")?;

        {
            let mut stdin = child
                .stdin
                .take()
                .ok_or_else(|| anyhow::anyhow!("Failed to get stdin of mpc {}", args.join(" ")))?;
            stdin
                .write_all(lines.join("\n").as_bytes())
                .with_context(|| format!("Failed to feed mpc {}", args.join(" ")))?;
        }

        let output = child.wait_with_output().context("mpc did not finish")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("mpc {} failed: {}", args.join(" "), stderr.trim());
        }
        Ok(())
    }
}

impl Daemon for Mpc {
    fn connect(&mut self) -> Result<()> {
        self.run(&["version"]).context(
            "Failed to connect to MPD. Make sure MPD is running and the profile's host and port are right",
        )?;
        Ok(())
    }

    fn database_stamp(&mut self) -> Result<String> {
        let stats = self.run(&["stats"])?;
        parse_database_stamp(&stats).context("mpc stats printed no `DB Updated` line")
    }

    fn list_tracks(&mut self) -> Result<Vec<Track>> {
        let format = track_format();
        let output = self.run(&["-f", &format, "listall"])?;
        let tracks: Vec<Track> = output.lines().filter_map(parse_track_line).collect();
        info!("Fetched {} tracks from MPD", tracks.len());
        Ok(tracks)
    }

    fn stored_playlists(&mut self) -> Result<Vec<String>> {
        Ok(non_empty_lines(&self.run(&["lsplaylists"])?))
    }

    fn stored_playlist_tracks(&mut self, name: &str) -> Result<Vec<String>> {
        let output = self
            .run(&["-f", "%file%", "playlist", name])
            .with_context(|| format!("Failed to list stored playlist `{name}`"))?;
        Ok(non_empty_lines(&output))
    }

    fn queue_files(&mut self) -> Result<Vec<String>> {
        Ok(non_empty_lines(&self.run(&["-f", "%file%", "playlist"])?))
    }

    fn add(&mut self, files: &[String]) -> Result<()> {
        self.run_with_input(&["add"], files)
    }

    fn insert(&mut self, files: &[String]) -> Result<()> {
        self.run_with_input(&["insert"], files)
    }

    fn remove_positions(&mut self, positions: &[usize]) -> Result<()> {
        let lines: Vec<String> = positions.iter().map(usize::to_string).collect();
        self.run_with_input(&["del"], &lines)
    }

    fn play_position(&mut self, position: usize) -> Result<()> {
        self.run(&["play", &position.to_string()])?;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.run(&["clear"])?;
        Ok(())
    }

    fn crop(&mut self) -> Result<()> {
        self.run(&["crop"])?;
        Ok(())
    }

    fn update(&mut self) -> Result<()> {
        info!("Asking MPD to rescan its music directory");
        self.run(&["update", "--wait"])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_args_include_password() {
        let profile = Profile { host: "box".into(), port: 6601, password: Some("pw".into()) };
        assert_eq!(Mpc::new(&profile).connection_args, vec!["-h", "pw@box", "-p", "6601"]);
        let open = Profile::default();
        assert_eq!(Mpc::new(&open).connection_args, vec!["-h", "localhost", "-p", "6600"]);
    }

    #[test]
    fn test_parse_track_line() {
        let line = ["Jazz/so what.flac", "Miles Davis", "", "Kind of Blue", "So What", "1/5"]
            .join(&FIELD_SEPARATOR.to_string());
        let track = parse_track_line(&line).unwrap();
        assert_eq!(track.file, "Jazz/so what.flac");
        assert_eq!(track.tags.artist, "Miles Davis");
        assert_eq!(track.tags.albumartist, "");
        assert_eq!(track.tags.track, "1/5");
    }

    #[test]
    fn test_parse_track_line_with_missing_fields() {
        let track = parse_track_line("lonely.mp3").unwrap();
        assert_eq!(track.tags, TagRecord::default());
        assert!(parse_track_line("").is_none());
    }

    #[test]
    fn test_parse_database_stamp() {
        let stats = "Artists:     12\nSongs:      340\nDB Updated: Sat Oct 17 21:04:11 2026\n";
        assert_eq!(parse_database_stamp(stats).as_deref(), Some("Sat Oct 17 21:04:11 2026"));
        assert_eq!(parse_database_stamp("Songs: 1"), None);
    }

    #[test]
    fn test_track_format_brackets_optional_tags() {
        let format = track_format();
        assert!(format.starts_with("%file%"));
        assert_eq!(format.matches('[').count(), 5);
    }
}
