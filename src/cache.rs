//! # Cache Adapter
//!
//! Key/value snapshots of everything expensive to fetch from the daemon: the
//! track list, stored playlists and collection definitions with their resolved
//! results. Values are JSON; every entry remembers when it was written so
//! callers can compare it against the definitions file.
//!
//! The cache is an optimization. Failures are logged and reported as a miss,
//! never as an error.

use anyhow::{Context, Result};
use log::{debug, warn};
use rusqlite::{Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub trait Cache {
    fn exists(&mut self, key: &str) -> bool;
    fn read(&mut self, key: &str) -> Option<Value>;
    fn write(&mut self, key: &str, value: Value);
    fn last_modified(&mut self, key: &str) -> Option<SystemTime>;
}

/// Typed access on top of any [`Cache`].
pub trait CacheExt: Cache {
    /// A value that no longer deserializes into `T` counts as a miss.
    fn read_as<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        let value = self.read(key)?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!("Ignoring cache entry `{key}` with unexpected shape: {e}");
                None
            }
        }
    }

    fn write_as<T: Serialize>(&mut self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => self.write(key, value),
            Err(e) => warn!("Failed to encode cache entry `{key}`: {e}"),
        }
    }
}

impl<C: Cache + ?Sized> CacheExt for C {}

fn to_millis(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

fn from_millis(millis: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(u64::try_from(millis).unwrap_or(0))
}

/// Cache backed by a SQLite database, one per daemon profile.
pub struct SqliteCache {
    conn: Connection,
    memo: HashMap<String, Option<(Value, SystemTime)>>,
}

impl SqliteCache {
    /// Opens (creating if needed) the cache database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open cache database at {}", path.display()))?;
        Self::with_connection(conn)
    }

    /// Cache living only as long as the process.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory cache database")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS cache (
                key      TEXT    PRIMARY KEY,
                payload  TEXT    NOT NULL,
                modified INTEGER NOT NULL
            )",
            (),
        )
        .context("Failed to create cache table")?;

        Ok(Self { conn, memo: HashMap::new() })
    }

    fn entry(&mut self, key: &str) -> Option<&(Value, SystemTime)> {
        if !self.memo.contains_key(key) {
            let loaded = self.fetch(key).unwrap_or_else(|e| {
                warn!("Cache read of `{key}` failed: {e:#}");
                None
            });
            self.memo.insert(key.to_string(), loaded);
        }
        self.memo.get(key).and_then(Option::as_ref)
    }

    fn fetch(&self, key: &str) -> Result<Option<(Value, SystemTime)>> {
        let row: Option<(String, i64)> = self
            .conn
            .query_row(
                "SELECT payload, modified FROM cache WHERE key = ?1",
                [key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((payload, modified)) = row else {
            debug!("Cache miss: {key}");
            return Ok(None);
        };
        let value = serde_json::from_str(&payload)
            .with_context(|| format!("Corrupt cache payload for `{key}`"))?;
        Ok(Some((value, from_millis(modified))))
    }

    fn store(&self, key: &str, value: &Value, modified: SystemTime) -> Result<()> {
        let payload = serde_json::to_string(value)?;
        self.conn.execute(
            "INSERT INTO cache (key, payload, modified) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET payload = excluded.payload, modified = excluded.modified",
            (key, &payload, to_millis(modified)),
        )?;
        Ok(())
    }
}

impl Cache for SqliteCache {
    fn exists(&mut self, key: &str) -> bool {
        self.entry(key).is_some()
    }

    fn read(&mut self, key: &str) -> Option<Value> {
        self.entry(key).map(|(value, _)| value.clone())
    }

    fn write(&mut self, key: &str, value: Value) {
        let now = SystemTime::now();
        if let Err(e) = self.store(key, &value, now) {
            warn!("Cache write of `{key}` failed: {e:#}");
        }
        // Stored timestamps have millisecond precision.
        self.memo.insert(key.to_string(), Some((value, from_millis(to_millis(now)))));
    }

    fn last_modified(&mut self, key: &str) -> Option<SystemTime> {
        self.entry(key).map(|(_, modified)| *modified)
    }
}

/// Process-local cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: HashMap<String, (Value, SystemTime)>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backdates (or postdates) an existing entry.
    pub fn set_modified(&mut self, key: &str, modified: SystemTime) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.1 = modified;
        }
    }
}

impl Cache for MemoryCache {
    fn exists(&mut self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn read(&mut self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|(value, _)| value.clone())
    }

    fn write(&mut self, key: &str, value: Value) {
        self.entries.insert(key.to_string(), (value, SystemTime::now()));
    }

    fn last_modified(&mut self, key: &str) -> Option<SystemTime> {
        self.entries.get(key).map(|(_, modified)| *modified)
    }
}
