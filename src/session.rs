//! # Session
//!
//! One invocation of mpdc: a daemon connection, the cache, the catalog
//! snapshot and the collection store, wired together at startup and flushed
//! at shutdown.
//!
//! ## Startup
//!
//! 1. Connect to the daemon and read its database stamp.
//! 2. Take the track list from the cache when the stamp matches, otherwise
//!    fetch it and rewrite the cache.
//! 3. Fetch stored playlists and compare them with the cached snapshot.
//! 4. Feed the collection store: forced when the tracks or playlists changed,
//!    otherwise from the cache unless the definitions file is newer.
//!
//! ## Shutdown
//!
//! Dropping a session saves the definitions file if a collection was defined
//! or deleted. Call [`Session::close`] to see that write fail.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use crate::cache::{Cache, CacheExt};
use crate::catalog::{Catalog, Playlists, TagRecord, Track};
use crate::cel;
use crate::collections::{CollectionStore, FeedOutcome};
use crate::error::{EvalError, StoreError};
use crate::mpd_client::Daemon;

pub const DB_STAMP_KEY: &str = "db_stamp";
pub const SONGS_KEY: &str = "songs_tags";
pub const PLAYLISTS_KEY: &str = "playlists";

/// Absent tags stay empty; an empty `albumartist` falls back to `artist`.
pub fn normalize_tags(mut tags: TagRecord) -> TagRecord {
    for value in [
        &mut tags.artist,
        &mut tags.albumartist,
        &mut tags.album,
        &mut tags.title,
        &mut tags.track,
    ] {
        let trimmed = value.trim();
        if trimmed.len() != value.len() {
            *value = trimmed.to_string();
        }
    }
    if tags.albumartist.is_empty() {
        tags.albumartist = tags.artist.clone();
    }
    tags
}

pub struct Session<D: Daemon> {
    daemon: D,
    cache: Box<dyn Cache>,
    catalog: Catalog,
    store: CollectionStore,
    collections_path: PathBuf,
    closed: bool,
}

impl<D: Daemon> Session<D> {
    /// Connects and brings catalog, playlists and collections up to date.
    ///
    /// # Errors
    ///
    /// Daemon failures and an unreadable definitions file. Cache problems only
    /// cost a refetch.
    pub fn open(mut daemon: D, mut cache: Box<dyn Cache>, collections_path: &Path) -> Result<Self> {
        daemon.connect()?;

        let (tracks, catalog_changed) = load_tracks(&mut daemon, cache.as_mut(), false)?;
        let (playlists, playlists_changed) = load_playlists(&mut daemon, cache.as_mut())?;
        let catalog = Catalog::new(tracks, playlists);

        let mut store = CollectionStore::new();
        let force = catalog_changed || playlists_changed;
        let outcome = store
            .feed(collections_path, cache.as_mut(), force)
            .context("Failed to load collections")?;
        if outcome == FeedOutcome::File {
            store.update_cache(cache.as_mut(), &catalog);
        }

        Ok(Self {
            daemon,
            cache,
            catalog,
            store,
            collections_path: collections_path.to_path_buf(),
            closed: false,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn store(&self) -> &CollectionStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut CollectionStore {
        &mut self.store
    }

    pub fn daemon_mut(&mut self) -> &mut D {
        &mut self.daemon
    }

    pub fn collections_path(&self) -> &Path {
        &self.collections_path
    }

    /// Parses and evaluates `expression`.
    pub fn resolve(&self, expression: &str) -> Result<Vec<String>> {
        let ast = cel::parse_expression(expression).map_err(|e| {
            debug!("{}", e.render_diagnostic(expression));
            anyhow::Error::from(e)
        })?;
        let files = cel::evaluate(&ast, &self.catalog, &self.store)
            .with_context(|| format!("Failed to resolve `{expression}`"))?;
        debug!("`{expression}` resolved to {} tracks", files.len());
        Ok(files)
    }

    /// Re-resolves every collection against the current catalog.
    pub fn refresh_results(&mut self) -> Vec<(String, EvalError)> {
        self.store.refresh_results(&self.catalog)
    }

    /// Asks the daemon to rescan, then refetches everything and rewrites
    /// every cache entry.
    pub fn refresh(&mut self) -> Result<()> {
        self.daemon.update()?;

        let (tracks, _) = load_tracks(&mut self.daemon, self.cache.as_mut(), true)?;
        let (playlists, _) = load_playlists(&mut self.daemon, self.cache.as_mut())?;
        self.catalog = Catalog::new(tracks, playlists);

        if self.store.is_dirty() {
            self.flush()?;
        }
        self.store
            .feed(&self.collections_path, self.cache.as_mut(), true)
            .context("Failed to reload collections")?;
        self.store.update_cache(self.cache.as_mut(), &self.catalog);
        info!("Refreshed {} tracks and {} collections", self.catalog.len(), self.store.len());
        Ok(())
    }

    /// Saves the definitions file if anything changed.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        if self.store.is_dirty() {
            self.store.persist(&self.collections_path)?;
        }
        Ok(())
    }

    /// Flushes and ends the session.
    pub fn close(mut self) -> Result<(), StoreError> {
        self.finish()
    }

    /// Final flush; the drop guard does not try again afterwards.
    fn finish(&mut self) -> Result<(), StoreError> {
        self.closed = true;
        self.flush()
    }
}

impl<D: Daemon> Drop for Session<D> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.finish() {
            warn!("Collections were not saved: {e}");
        }
    }
}

/// Combines the outcome of a command with the outcome of closing its
/// session, so neither failure is lost.
pub fn conclude(result: Result<()>, closed: Result<(), StoreError>) -> Result<()> {
    match (result, closed) {
        (result, Ok(())) => result,
        (Ok(()), Err(e)) => Err(e.into()),
        (Err(e), Err(close_err)) => Err(e.context(format!("Collections were not saved either: {close_err}"))),
    }
}

/// Track list from the cache if the daemon's stamp still matches, else from
/// the daemon. Returns whether it had to be fetched.
fn load_tracks(daemon: &mut dyn Daemon, cache: &mut dyn Cache, force: bool) -> Result<(Vec<Track>, bool)> {
    let stamp = daemon.database_stamp()?;

    if !force && cache.read_as::<String>(DB_STAMP_KEY).as_deref() == Some(stamp.as_str()) {
        if let Some(tracks) = cache.read_as::<Vec<Track>>(SONGS_KEY) {
            debug!("Using {} cached tracks", tracks.len());
            return Ok((tracks, false));
        }
    }

    info!("Track database changed, fetching tracks from MPD");
    let tracks: Vec<Track> = daemon
        .list_tracks()?
        .into_iter()
        .map(|track| Track { tags: normalize_tags(track.tags), ..track })
        .collect();
    cache.write_as(SONGS_KEY, &tracks);
    cache.write_as(DB_STAMP_KEY, &stamp);
    Ok((tracks, true))
}

/// Current stored playlists. Returns whether they differ from the cached
/// snapshot.
fn load_playlists(daemon: &mut dyn Daemon, cache: &mut dyn Cache) -> Result<(Playlists, bool)> {
    let mut playlists = Playlists::new();
    for name in daemon.stored_playlists()? {
        let files = daemon.stored_playlist_tracks(&name)?;
        playlists.insert(name, files);
    }

    let changed = cache.read_as::<Playlists>(PLAYLISTS_KEY).as_ref() != Some(&playlists);
    if changed {
        info!("Stored playlists changed");
        cache.write_as(PLAYLISTS_KEY, &playlists);
    }
    Ok((playlists, changed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Default)]
    struct IdleDaemon;

    impl Daemon for IdleDaemon {
        fn connect(&mut self) -> Result<()> {
            Ok(())
        }
        fn database_stamp(&mut self) -> Result<String> {
            Ok("0".into())
        }
        fn list_tracks(&mut self) -> Result<Vec<Track>> {
            Ok(Vec::new())
        }
        fn stored_playlists(&mut self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        fn stored_playlist_tracks(&mut self, _name: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        fn queue_files(&mut self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        fn add(&mut self, _files: &[String]) -> Result<()> {
            Ok(())
        }
        fn insert(&mut self, _files: &[String]) -> Result<()> {
            Ok(())
        }
        fn remove_positions(&mut self, _positions: &[usize]) -> Result<()> {
            Ok(())
        }
        fn play_position(&mut self, _position: usize) -> Result<()> {
            Ok(())
        }
        fn clear(&mut self) -> Result<()> {
            Ok(())
        }
        fn crop(&mut self) -> Result<()> {
            Ok(())
        }
        fn update(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_close_is_not_retried_on_drop() {
        let dir = TempDir::new().unwrap();
        let defs_dir = dir.path().join("defs");
        fs::create_dir(&defs_dir).unwrap();
        let path = defs_dir.join("collections.mpdc");
        fs::write(&path, "").unwrap();

        let mut session = Session::open(IdleDaemon, Box::new(MemoryCache::new()), &path).unwrap();
        session.store_mut().define("everything", "all").unwrap();
        fs::remove_dir_all(&defs_dir).unwrap();
        assert!(matches!(session.finish(), Err(StoreError::Unwritable { .. })));

        fs::create_dir(&defs_dir).unwrap();
        drop(session);
        assert!(!path.exists());
    }

    #[test]
    fn test_conclude_keeps_both_failures() {
        let unwritable = || StoreError::Unwritable {
            path: "c.mpdc".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };

        assert!(conclude(Ok(()), Ok(())).is_ok());
        let only_close = conclude(Ok(()), Err(unwritable())).unwrap_err();
        assert!(only_close.to_string().contains("c.mpdc"));

        let both = conclude(Err(anyhow::anyhow!("unknown reference `x`")), Err(unwritable())).unwrap_err();
        let chain: Vec<String> = both.chain().map(ToString::to_string).collect();
        assert!(chain[0].contains("c.mpdc"));
        assert!(chain[1].contains("unknown reference"));
    }

    #[test]
    fn test_syntax_error_is_one_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("collections.mpdc");
        fs::write(&path, "").unwrap();
        let session = Session::open(IdleDaemon, Box::new(MemoryCache::new()), &path).unwrap();

        let err = session.resolve("a OR b c").unwrap_err();
        let message = err.to_string();
        assert!(!message.contains('\n'), "{message}");
        assert!(message.contains("position 7"), "{message}");
    }

    #[test]
    fn test_albumartist_falls_back_to_artist() {
        let tags = normalize_tags(TagRecord { artist: " Nina Simone ".into(), ..Default::default() });
        assert_eq!(tags.artist, "Nina Simone");
        assert_eq!(tags.albumartist, "Nina Simone");
    }

    #[test]
    fn test_albumartist_is_kept_when_present() {
        let tags = normalize_tags(TagRecord {
            artist: "Guest".into(),
            albumartist: "Band".into(),
            ..Default::default()
        });
        assert_eq!(tags.albumartist, "Band");
    }
}
