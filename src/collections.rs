//! # Collection Store
//!
//! Named collections bind a name to the raw text of an expression. The text
//! is the source of truth; parsed trees and resolved track lists are derived
//! and can be dropped at any time.
//!
//! ## Definitions File
//!
//! One collection per line, in the order they were defined:
//!
//! ```text
//! favorites = artist:"Miles Davis" OR loved
//! late night = (ambient OR album:Nocturnes) AND NOT live
//! ```
//!
//! Lines without that shape are ignored. The store is written back once, at
//! the end of a session, if anything changed.
//!
//! ## Cycles
//!
//! [`CollectionStore::define`] rejects a definition that would close a
//! dependency cycle. Definitions edited by hand are not checked on load;
//! resolution reports those cycles instead (see [`crate::cel::eval`]).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use log::{debug, info, warn};

use crate::cache::{Cache, CacheExt};
use crate::catalog::Catalog;
use crate::cel::{self, AstNode, Evaluator, SyntaxError, TokenKind};
use crate::error::{EvalError, StoreError};

/// Cache key of the definitions snapshot.
pub const CACHE_KEY: &str = "collections";

/// A named, persisted expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    name: String,
    expression: String,
    ast: Option<AstNode>,
    dependencies: BTreeSet<String>,
    cached_result: Option<Vec<String>>,
}

impl Collection {
    /// Parses `expression`; an unparsable one is kept with no tree so the
    /// error surfaces when the collection is resolved.
    fn parse(name: &str, expression: &str) -> Self {
        let ast = match cel::parse_expression(expression) {
            Ok(ast) => Some(ast),
            Err(err) => {
                warn!("Collection `{name}` does not parse: {err}");
                None
            }
        };
        Self::from_parts(name, expression, ast)
    }

    fn from_parts(name: &str, expression: &str, ast: Option<AstNode>) -> Self {
        let dependencies = ast.as_ref().map(AstNode::references).unwrap_or_default();
        Self {
            name: name.to_string(),
            expression: expression.to_string(),
            ast,
            dependencies,
            cached_result: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw expression text, exactly as defined.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// `None` when the expression does not parse.
    pub fn ast(&self) -> Option<&AstNode> {
        self.ast.as_ref()
    }

    /// Names referenced by the expression.
    pub fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependencies
    }

    /// Track ids from the last [`CollectionStore::refresh_results`], if still
    /// valid.
    pub fn cached_result(&self) -> Option<&[String]> {
        self.cached_result.as_deref()
    }
}

/// Result of [`CollectionStore::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The in-memory copy was already at least as new as the file.
    Fresh,
    /// The file was read; this many collections were loaded.
    Loaded(usize),
}

/// Where [`CollectionStore::feed`] took the definitions from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOutcome {
    Cache,
    File,
}

/// Why a caller wants the store reloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshSignal {
    /// The daemon's track database changed.
    Catalog,
    /// Stored playlists were added, removed or edited.
    Playlists,
    /// The definitions file is newer than the in-memory copy.
    Definitions,
}

#[derive(Debug, Clone)]
struct SourceFile {
    path: PathBuf,
    /// Modification time of the definitions the in-memory copy reflects.
    seen: SystemTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedCollection {
    name: String,
    expression: String,
    #[serde(default)]
    songs: Option<Vec<String>>,
}

/// Ordered name → [`Collection`] mapping.
#[derive(Debug, Clone, Default)]
pub struct CollectionStore {
    collections: Vec<Collection>,
    source: Option<SourceFile>,
    dirty: bool,
}

fn modified(path: &Path) -> Result<SystemTime, StoreError> {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|source| StoreError::Unreadable { path: path.to_path_buf(), source })
}

/// Splits a definitions file into `(name, expression)` pairs, file order.
pub fn parse_definitions(text: &str) -> Vec<(String, String)> {
    text.lines()
        .enumerate()
        .filter_map(|(number, line)| {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                return None;
            }
            let parsed = trimmed
                .split_once('=')
                .map(|(name, expression)| (name.trim(), expression.trim()))
                .filter(|(name, expression)| !name.is_empty() && !expression.is_empty());
            if parsed.is_none() {
                warn!("Ignoring line {} of collections file: {trimmed:?}", number + 1);
            }
            parsed.map(|(name, expression)| (name.to_string(), expression.to_string()))
        })
        .collect()
}

/// Checks that `name` can be written to the definitions file and referenced
/// from an expression.
fn validate_name(name: &str) -> Result<(), StoreError> {
    let invalid = |reason| Err(StoreError::InvalidName { name: name.to_string(), reason });

    if name.trim().is_empty() {
        return invalid("name is empty");
    }
    if name != name.trim() {
        return invalid("name has leading or trailing whitespace");
    }
    if name.starts_with('#') {
        return invalid("name starts with `#`, which marks a comment line");
    }
    if name == cel::ALL {
        return invalid("`all` always means every track");
    }
    if name.contains(['=', ':', '"', '(', ')', '\n', '\r']) {
        return invalid("name contains one of = : \" ( ) or a line break");
    }
    match cel::tokenize(name) {
        Ok(tokens) => match tokens.first().map(|t| &t.kind) {
            Some(TokenKind::And | TokenKind::Or | TokenKind::Not) if tokens.len() == 2 => {
                invalid("name is an operator keyword")
            }
            _ => Ok(()),
        },
        Err(_) => invalid("name contains a reserved character"),
    }
}

impl CollectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Whether a mutation happened since the last load or persist.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Path of the definitions file this store was loaded from.
    pub fn source_path(&self) -> Option<&Path> {
        self.source.as_ref().map(|s| s.path.as_path())
    }

    pub fn get(&self, name: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Collection> {
        self.collections.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.collections.iter().map(|c| c.name.as_str())
    }

    /// Collections whose expression references `name` directly.
    pub fn dependents(&self, name: &str) -> Vec<&str> {
        self.collections
            .iter()
            .filter(|c| c.dependencies.contains(name))
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Reads the definitions file at `path`.
    ///
    /// Without `force`, nothing happens when the in-memory copy came from the
    /// same file and is at least as new as its modification time.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unreadable`] if the file cannot be opened or read.
    pub fn load(&mut self, path: &Path, force: bool) -> Result<LoadOutcome, StoreError> {
        let file_mtime = modified(path)?;

        if !force {
            if let Some(source) = &self.source {
                if source.path == path && source.seen >= file_mtime {
                    debug!("Collections from {} are fresh", path.display());
                    return Ok(LoadOutcome::Fresh);
                }
            }
        }

        let text = fs::read_to_string(path)
            .map_err(|source| StoreError::Unreadable { path: path.to_path_buf(), source })?;

        if self.dirty {
            warn!("Discarding unsaved collection changes while reloading {}", path.display());
        }

        self.collections.clear();
        for (name, expression) in parse_definitions(&text) {
            self.insert_unchecked(&name, &expression);
        }
        self.source = Some(SourceFile { path: path.to_path_buf(), seen: file_mtime });
        self.dirty = false;

        info!("Loaded {} collections from {}", self.collections.len(), path.display());
        Ok(LoadOutcome::Loaded(self.collections.len()))
    }

    /// Inserts or replaces a collection without validating the name or
    /// checking for cycles, as loading from a file does. Does not mark the
    /// store dirty.
    pub fn insert_unchecked(&mut self, name: &str, expression: &str) {
        let collection = Collection::parse(name, expression);
        self.put(collection);
    }

    fn put(&mut self, collection: Collection) {
        match self.collections.iter_mut().find(|c| c.name == collection.name) {
            Some(existing) => *existing = collection,
            None => self.collections.push(collection),
        }
    }

    /// Defines `name` as `expression`, replacing an existing definition in
    /// place. The store is left unchanged on error.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidName`] for names that cannot be referenced
    /// - [`StoreError::MultilineExpression`] when `expression` spans lines
    /// - [`StoreError::InvalidExpression`] when `expression` does not parse
    /// - [`StoreError::Cycle`] when the definition would make `name` depend
    ///   on itself
    pub fn define(&mut self, name: &str, expression: &str) -> Result<(), StoreError> {
        validate_name(name)?;
        let expression = expression.trim();
        if expression.contains(['\n', '\r']) {
            return Err(StoreError::MultilineExpression { name: name.to_string() });
        }
        let ast = cel::parse_expression(expression).map_err(|source: SyntaxError| {
            StoreError::InvalidExpression { name: name.to_string(), source }
        })?;
        let collection = Collection::from_parts(name, expression, Some(ast));

        if let Some(path) = self.cycle_through(name, &collection.dependencies) {
            return Err(StoreError::Cycle { path });
        }

        debug!("Defining collection `{name}` = {expression}");
        self.put(collection);
        self.clear_results();
        self.dirty = true;
        Ok(())
    }

    /// Removes a collection. Collections referencing it will fail to resolve
    /// until it is defined again.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if there is no such collection.
    pub fn delete(&mut self, name: &str) -> Result<Collection, StoreError> {
        let index = self
            .collections
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        let removed = self.collections.remove(index);

        let dependents = self.dependents(name);
        if !dependents.is_empty() {
            warn!("Collection `{name}` is still referenced by: {}", dependents.join(", "));
        }

        self.clear_results();
        self.dirty = true;
        Ok(removed)
    }

    /// Depth-first search from `name`'s would-be dependencies through the
    /// existing definitions. Returns the cycle, `name` first and last.
    fn cycle_through(&self, name: &str, dependencies: &BTreeSet<String>) -> Option<Vec<String>> {
        let mut path = vec![name.to_string()];
        let mut pending: Vec<Vec<&str>> = vec![dependencies.iter().rev().map(String::as_str).collect()];
        let mut visited: HashSet<&str> = HashSet::new();

        while let Some(frame) = pending.last_mut() {
            let Some(next) = frame.pop() else {
                pending.pop();
                path.pop();
                continue;
            };

            if next == name {
                path.push(name.to_string());
                return Some(path);
            }
            if !visited.insert(next) {
                continue;
            }
            if let Some(collection) = self.get(next) {
                path.push(next.to_string());
                pending.push(collection.dependencies.iter().rev().map(String::as_str).collect());
            }
        }

        None
    }

    /// Resolves a named collection against `catalog`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`], [`StoreError::Cycle`] (also for cycles that
    /// bypassed [`define`](Self::define)), and everything evaluating the
    /// expression can fail with.
    pub fn resolve(&self, name: &str, catalog: &Catalog) -> Result<Vec<String>, EvalError> {
        Evaluator::new(catalog, self).resolve_collection(name)
    }

    /// Writes every definition to `path`, one `name = expression` per line in
    /// store order. The file is replaced atomically.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unwritable`] if the file cannot be written.
    pub fn persist(&mut self, path: &Path) -> Result<(), StoreError> {
        let unwritable = |source| StoreError::Unwritable { path: path.to_path_buf(), source };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = tempfile::NamedTempFile::new_in(dir).map_err(unwritable)?;
        for collection in &self.collections {
            writeln!(file, "{} = {}", collection.name, collection.expression).map_err(unwritable)?;
        }
        file.flush().map_err(unwritable)?;
        file.persist(path).map_err(|err| unwritable(err.error))?;

        let seen = modified(path).unwrap_or_else(|_| SystemTime::now());
        self.source = Some(SourceFile { path: path.to_path_buf(), seen });
        self.dirty = false;

        info!("Saved {} collections to {}", self.collections.len(), path.display());
        Ok(())
    }

    /// Drops derived state and reloads the definitions file unconditionally.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unreadable`] if the file cannot be read.
    pub fn invalidate_and_refeed(&mut self, signal: RefreshSignal) -> Result<LoadOutcome, StoreError> {
        self.clear_results();
        let Some(path) = self.source.as_ref().map(|s| s.path.clone()) else {
            debug!("Refresh ({signal:?}) requested before any collections were loaded");
            return Ok(LoadOutcome::Fresh);
        };
        info!("Reloading collections ({signal:?} changed)");
        self.load(&path, true)
    }

    /// Loads definitions from the cache when its snapshot is at least as new
    /// as the definitions file, from the file otherwise (then snapshots it).
    ///
    /// # Errors
    ///
    /// [`StoreError::Unreadable`] if the definitions file cannot be read. A
    /// broken cache only forces the file path.
    pub fn feed(&mut self, path: &Path, cache: &mut dyn Cache, force: bool) -> Result<FeedOutcome, StoreError> {
        let file_mtime = modified(path)?;

        if !force {
            let cached_at = cache.last_modified(CACHE_KEY).filter(|at| *at >= file_mtime);
            if let Some(cached_at) = cached_at {
                if let Some(snapshot) = cache.read_as::<Vec<CachedCollection>>(CACHE_KEY) {
                    self.collections = snapshot
                        .into_iter()
                        .map(|entry| {
                            let mut collection = Collection::parse(&entry.name, &entry.expression);
                            collection.cached_result = entry.songs;
                            collection
                        })
                        .collect();
                    self.source = Some(SourceFile { path: path.to_path_buf(), seen: cached_at });
                    self.dirty = false;
                    debug!("Fed {} collections from cache", self.collections.len());
                    return Ok(FeedOutcome::Cache);
                }
            }
        }

        self.load(path, true)?;
        self.write_snapshot(cache);
        Ok(FeedOutcome::File)
    }

    /// Resolves every collection against `catalog` and snapshots definitions
    /// and results into the cache. Resolution failures are logged and leave
    /// that collection without a cached result.
    pub fn update_cache(&mut self, cache: &mut dyn Cache, catalog: &Catalog) {
        for (name, err) in self.refresh_results(catalog) {
            warn!("Collection `{name}` could not be resolved: {err}");
        }
        self.write_snapshot(cache);
    }

    fn write_snapshot(&self, cache: &mut dyn Cache) {
        let snapshot: Vec<CachedCollection> = self
            .collections
            .iter()
            .map(|c| CachedCollection {
                name: c.name.clone(),
                expression: c.expression.clone(),
                songs: c.cached_result.clone(),
            })
            .collect();
        cache.write_as(CACHE_KEY, &snapshot);
    }

    /// Recomputes every cached result. Returns the collections that failed.
    pub fn refresh_results(&mut self, catalog: &Catalog) -> Vec<(String, EvalError)> {
        self.clear_results();

        let results: Vec<(String, Result<Vec<String>, EvalError>)> = {
            let mut evaluator = Evaluator::new(catalog, self);
            self.collections
                .iter()
                .map(|c| (c.name.clone(), evaluator.resolve_collection(&c.name)))
                .collect()
        };

        let mut failures = Vec::new();
        for (name, result) in results {
            match result {
                Ok(files) => {
                    if let Some(collection) = self.collections.iter_mut().find(|c| c.name == name) {
                        collection.cached_result = Some(files);
                    }
                }
                Err(err) => failures.push((name, err)),
            }
        }
        failures
    }

    /// Forgets every resolved result.
    pub fn clear_results(&mut self) {
        for collection in &mut self.collections {
            collection.cached_result = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::catalog::{Playlists, TagRecord, Track};
    use std::time::Duration;
    use tempfile::TempDir;

    fn catalog() -> Catalog {
        let song = |file: &str, artist: &str| {
            Track::new(file, TagRecord { artist: artist.to_string(), ..Default::default() })
        };
        Catalog::new(vec![song("s1", "X"), song("s2", "Y"), song("s3", "X")], Playlists::new())
    }

    fn write_file(dir: &TempDir, text: &str) -> PathBuf {
        let path = dir.path().join("collections.mpdc");
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_parse_definitions_keeps_order_and_skips_junk() {
        let pairs = parse_definitions("b = artist:X\n\n# note\nnot a definition\na=b OR c\n = x\ny =\n");
        assert_eq!(
            pairs,
            vec![
                ("b".to_string(), "artist:X".to_string()),
                ("a".to_string(), "b OR c".to_string()),
            ]
        );
    }

    #[test]
    fn test_load_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "");
        let mut store = CollectionStore::new();
        assert_eq!(store.load(&path, false).unwrap(), LoadOutcome::Loaded(0));
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_missing_file_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let mut store = CollectionStore::new();
        let err = store.load(&dir.path().join("missing"), true).unwrap_err();
        assert!(matches!(err, StoreError::Unreadable { .. }));
    }

    #[test]
    fn test_unforced_load_is_noop_when_fresh() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "a = all\n");
        let mut store = CollectionStore::new();
        assert_eq!(store.load(&path, false).unwrap(), LoadOutcome::Loaded(1));
        assert_eq!(store.load(&path, false).unwrap(), LoadOutcome::Fresh);
        assert_eq!(store.load(&path, true).unwrap(), LoadOutcome::Loaded(1));
    }

    #[test]
    fn test_duplicate_names_in_file_replace() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "a = all\nb = a\na = artist:X\n");
        let mut store = CollectionStore::new();
        store.load(&path, true).unwrap();
        assert_eq!(store.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(store.get("a").unwrap().expression(), "artist:X");
    }

    #[test]
    fn test_define_rejects_two_step_cycle() {
        let mut store = CollectionStore::new();
        store.define("A", "B").unwrap();
        let err = store.define("B", "A").unwrap_err();
        match err {
            StoreError::Cycle { path } => assert_eq!(path, vec!["B", "A", "B"]),
            other => panic!("unexpected {other:?}"),
        }
        assert!(store.get("B").is_none());
        assert_eq!(store.get("A").unwrap().expression(), "B");
    }

    #[test]
    fn test_define_rejects_self_reference() {
        let mut store = CollectionStore::new();
        assert!(matches!(store.define("a", "a OR all"), Err(StoreError::Cycle { .. })));
        assert!(store.is_empty());
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_redefinition_that_closes_a_cycle_keeps_old_definition() {
        let mut store = CollectionStore::new();
        store.define("a", "artist:X").unwrap();
        store.define("b", "a").unwrap();
        store.define("c", "b AND all").unwrap();
        assert!(matches!(store.define("a", "c"), Err(StoreError::Cycle { .. })));
        assert_eq!(store.get("a").unwrap().expression(), "artist:X");
    }

    #[test]
    fn test_define_validates_name_and_expression() {
        let mut store = CollectionStore::new();
        for bad in ["", "all", "a=b", "tag:x", "and", "(x)", " padded", "#x"] {
            assert!(
                matches!(store.define(bad, "all"), Err(StoreError::InvalidName { .. })),
                "{bad:?}"
            );
        }
        assert!(matches!(
            store.define("ok", "a AND"),
            Err(StoreError::InvalidExpression { .. })
        ));
        assert!(store.define("late night", "all").is_ok());
    }

    #[test]
    fn test_redefinition_replaces_in_place() {
        let mut store = CollectionStore::new();
        store.define("a", "all").unwrap();
        store.define("b", "all").unwrap();
        store.define("a", "artist:Y").unwrap();
        assert_eq!(store.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(store.resolve("a", &catalog()).unwrap(), vec!["s2"]);
    }

    #[test]
    fn test_delete() {
        let mut store = CollectionStore::new();
        store.define("a", "all").unwrap();
        store.define("b", "a").unwrap();
        assert_eq!(store.delete("a").unwrap().name(), "a");
        assert!(matches!(store.delete("a"), Err(StoreError::NotFound(_))));
        assert!(matches!(
            store.resolve("b", &catalog()),
            Err(EvalError::UnknownReference(name)) if name == "a"
        ));
    }

    #[test]
    fn test_persist_then_reload_round_trips_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("collections.mpdc");
        let mut store = CollectionStore::new();
        store.define("favorites", r#"artist:"Miles Davis"   OR  album:Kind"#).unwrap();
        store.define("late night", "NOT favorites").unwrap();
        store.persist(&path).unwrap();
        assert!(!store.is_dirty());

        let mut reloaded = CollectionStore::new();
        reloaded.load(&path, true).unwrap();
        let pairs = |s: &CollectionStore| {
            s.iter()
                .map(|c| (c.name().to_string(), c.expression().to_string()))
                .collect::<Vec<_>>()
        };
        assert_eq!(pairs(&reloaded), pairs(&store));
    }

    #[test]
    fn test_define_rejects_line_breaks() {
        let mut store = CollectionStore::new();
        for expression in ["artist:X\nOR artist:Y", "title:\"a\nb\"", "artist:X\r\nOR all"] {
            assert!(
                matches!(store.define("mix", expression), Err(StoreError::MultilineExpression { .. })),
                "{expression:?}"
            );
        }
        assert!(store.is_empty());
        assert!(!store.is_dirty());
        store.define("mix", "  artist:X OR artist:Y\n").unwrap();
        assert_eq!(store.get("mix").unwrap().expression(), "artist:X OR artist:Y");
    }

    #[test]
    fn test_every_accepted_definition_survives_persist_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("collections.mpdc");
        let mut store = CollectionStore::new();
        store.define("mix", "artist:X OR artist:Y").unwrap();
        store.define("quoted", r#"title:"a b""#).unwrap();
        assert!(store.define("#best", "artist:X").is_err());
        assert!(store.define("split", "artist:X\nOR artist:Y").is_err());
        store.define("best#", "mix").unwrap();
        store.persist(&path).unwrap();

        let mut reloaded = CollectionStore::new();
        reloaded.load(&path, true).unwrap();
        let pairs = |s: &CollectionStore| {
            s.iter()
                .map(|c| (c.name().to_string(), c.expression().to_string()))
                .collect::<Vec<_>>()
        };
        assert_eq!(pairs(&reloaded), pairs(&store));
        assert_eq!(reloaded.len(), 3);
    }

    #[test]
    fn test_persist_into_missing_directory_is_unwritable() {
        let dir = TempDir::new().unwrap();
        let mut store = CollectionStore::new();
        let err = store.persist(&dir.path().join("nope").join("c.mpdc")).unwrap_err();
        assert!(matches!(err, StoreError::Unwritable { .. }));
    }

    #[test]
    fn test_feed_prefers_fresh_cache() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "x = artist:X\n");
        let mut cache = MemoryCache::new();

        let mut store = CollectionStore::new();
        assert_eq!(store.feed(&path, &mut cache, false).unwrap(), FeedOutcome::File);
        store.update_cache(&mut cache, &catalog());

        let mut second = CollectionStore::new();
        assert_eq!(second.feed(&path, &mut cache, false).unwrap(), FeedOutcome::Cache);
        assert_eq!(
            second.get("x").unwrap().cached_result(),
            Some(&["s1".to_string(), "s3".to_string()][..])
        );

        let mut forced = CollectionStore::new();
        assert_eq!(forced.feed(&path, &mut cache, true).unwrap(), FeedOutcome::File);
        assert!(forced.get("x").unwrap().cached_result().is_none());
    }

    #[test]
    fn test_feed_reads_file_when_newer_than_cache() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "x = artist:X\n");
        let mut cache = MemoryCache::new();
        cache.write_as(CACHE_KEY, &Vec::<CachedCollection>::new());
        cache.set_modified(CACHE_KEY, SystemTime::UNIX_EPOCH + Duration::from_secs(1));

        let mut store = CollectionStore::new();
        assert_eq!(store.feed(&path, &mut cache, false).unwrap(), FeedOutcome::File);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_invalidate_and_refeed_picks_up_edits() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "a = all\n");
        let mut store = CollectionStore::new();
        store.load(&path, false).unwrap();
        fs::write(&path, "a = all\nb = a\n").unwrap();
        assert_eq!(
            store.invalidate_and_refeed(RefreshSignal::Definitions).unwrap(),
            LoadOutcome::Loaded(2)
        );
    }

    #[test]
    fn test_refresh_results_reports_failures() {
        let mut store = CollectionStore::new();
        store.define("good", "artist:X").unwrap();
        store.define("bad", "missing").unwrap();
        let failures = store.refresh_results(&catalog());
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "bad");
        assert!(store.get("good").unwrap().cached_result().is_some());
        assert!(store.get("bad").unwrap().cached_result().is_none());
    }
}
