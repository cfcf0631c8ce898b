//! # mpdc
//!
//! Command-line companion for MPD that resolves collection expressions into
//! track lists.
//!
//! ## Usage
//!
//! ```bash
//! mpdc playlist add 'artist:Coltrane AND NOT live'
//! mpdc collections define quiet 'ambient OR album:Nocturnes'
//! mpdc collections show quiet
//! mpdc database check
//! ```
//!
//! Logging is controlled with `RUST_LOG`, e.g. `RUST_LOG=mpdc=debug`.

use anyhow::Result;
use clap::{CommandFactory, Parser};
use log::{debug, warn};
use std::io;

use mpdc::cache::{Cache, MemoryCache, SqliteCache};
use mpdc::config::{self, Config};
use mpdc::mpd_client::Mpc;
use mpdc::session::{conclude, Session};
use mpdc::{cli, commands, completion};

/// On-disk cache for `profile`, or an in-memory one when disabled or
/// unavailable.
fn open_cache(config: &Config, profile: usize, no_cache: bool) -> Box<dyn Cache> {
    if no_cache || !config.cache {
        debug!("Cache disabled");
        return Box::new(MemoryCache::new());
    }
    match config::cache_path(profile).and_then(|path| SqliteCache::open(&path)) {
        Ok(cache) => Box::new(cache),
        Err(e) => {
            warn!("Running without cache: {e:#}");
            Box::new(MemoryCache::new())
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();

    if let cli::Command::Completion { shell } = &args.command {
        let mut cmd = cli::Args::command();
        completion::generate_completions(completion::shell_to_completion_shell(shell), &mut cmd);
        return Ok(());
    }

    let config = Config::load(args.config.as_deref())?;

    if let cli::Command::CompleteCollections = &args.command {
        return completion::print_collection_completions(&config.collections_path()?, &mut io::stdout());
    }

    let profile_index = args.profile.unwrap_or(config.default_profile);
    let profile = config.profile(Some(profile_index))?;
    let columns = config.column_tags()?;
    let cache = open_cache(&config, profile_index, args.no_cache);

    let mut session = Session::open(Mpc::new(profile), cache, &config.collections_path()?)?;

    let mut out = io::stdout().lock();
    let mut err = io::stderr().lock();
    let result = match &args.command {
        cli::Command::Playlist { action } => commands::playlist(&mut session, action),
        cli::Command::Collections { action } => {
            commands::collections(&mut session, action, &columns, &mut out, &mut err)
        }
        cli::Command::Database { action } => commands::database(&mut session, action, &mut out),
        cli::Command::Completion { .. } | cli::Command::CompleteCollections => Ok(()),
    };

    let closed = session.close();
    conclude(result, closed)
}
