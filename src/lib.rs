//! Address MPD tracks with one expression language.
//!
//! Stored playlists, tag filters and named collections combine with `AND`,
//! `OR`, `NOT` and parentheses; an expression resolves to the matching track
//! ids in the daemon's own order, without duplicates.
//!
//! Core modules:
//! - [`cel`] - lexer, parser and evaluator of collection expressions
//! - [`catalog`] - read-only snapshot of tracks and stored playlists
//! - [`collections`] - named, persisted collections with cycle checks
//! - [`cache`] - snapshot storage between runs
//!
//! ### Supporting Modules
//!
//! - [`session`] - startup and shutdown of one invocation
//! - [`commands`] - subcommand handlers
//! - [`mpd_client`] - daemon transport through `mpc`
//! - [`config`] - configuration and data directory management
//! - [`cli`] - command-line interface definitions with clap integration
//! - [`completion`] - shell completion generation
//!
//! ## Quick Start Example
//!
//! ```
//! use mpdc::catalog::{Catalog, Playlists, TagRecord, Track};
//! use mpdc::cel;
//! use mpdc::collections::CollectionStore;
//!
//! let tags = |artist: &str| TagRecord { artist: artist.to_string(), ..Default::default() };
//! let catalog = Catalog::new(
//!     vec![
//!         Track::new("a.flac", tags("Miles Davis")),
//!         Track::new("b.flac", tags("John Coltrane")),
//!     ],
//!     Playlists::new(),
//! );
//!
//! let mut store = CollectionStore::new();
//! store.define("miles", "artist:miles")?;
//!
//! let tree = cel::parse_expression("all AND NOT miles")?;
//! assert_eq!(cel::evaluate(&tree, &catalog, &store)?, vec!["b.flac"]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cache;
pub mod catalog;
pub mod cel;
pub mod cli;
pub mod collections;
pub mod commands;
pub mod completion;
pub mod config;
pub mod error;
pub mod mpd_client;
pub mod session;
