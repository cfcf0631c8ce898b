//! # Command-Line Interface Module
//!
//! Clap definitions for mpdc.
//!
//! ## Commands
//!
//! - `playlist`: edit the daemon's play queue with collection expressions
//! - `collections`: list, show, define, delete and check named collections
//! - `database` (`db`): rescan the daemon's database, report tagging problems
//! - `completion`: generate shell completion scripts
//!
//! ## Examples
//!
//! ```bash
//! mpdc playlist replace 'artist:"Miles Davis" AND NOT live'
//! mpdc collections define favorites 'road OR album:"Kind of Blue"'
//! mpdc collections show favorites 'favorites AND extension:flac'
//! ```

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
#[derive(Parser, Debug)]
#[command(name = "mpdc")]
#[command(about = "mpdc: address MPD tracks with collection expressions")]
#[command(version)]
pub struct Args {
    /// Configuration file
    ///
    /// Defaults to `config.json` in the platform configuration directory.
    #[arg(long, global = true, env = "MPDC_CONFIG", value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Daemon profile to use for this invocation (1-based)
    #[arg(long, global = true)]
    pub profile: Option<usize>,

    /// Ignore and do not write the on-disk cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// One or more words forming a single expression.
#[derive(ClapArgs, Debug, Clone)]
pub struct Expression {
    /// Collection expression, e.g. `artist:Coltrane AND NOT live`
    ///
    /// Several words are joined with spaces; quote the whole expression to
    /// keep double quotes away from the shell.
    #[arg(required = true, num_args = 1.., value_hint = clap::ValueHint::Other)]
    pub words: Vec<String>,
}

impl Expression {
    pub fn text(&self) -> String {
        self.words.join(" ")
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Actions on the current MPD play queue
    Playlist {
        #[command(subcommand)]
        action: PlaylistAction,
    },

    /// Actions on named collections
    Collections {
        #[command(subcommand)]
        action: CollectionsAction,
    },

    /// Actions on the MPD database
    #[command(alias = "db")]
    Database {
        #[command(subcommand)]
        action: DatabaseAction,
    },

    /// Generate shell completions
    ///
    /// Usage: mpdc completion bash > ~/.local/share/bash-completion/completions/mpdc
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },

    /// List collection names for completion (hidden command)
    #[command(hide = true)]
    CompleteCollections,
}

#[derive(Subcommand, Debug)]
pub enum PlaylistAction {
    /// Append the matching tracks to the queue
    Add(Expression),
    /// Append the matching tracks and play the first of them
    Addp(Expression),
    /// Insert the matching tracks after the current track
    Insert(Expression),
    /// Clear the queue, then add the matching tracks
    Replace(Expression),
    /// Remove every queued occurrence of the matching tracks
    #[command(alias = "rm")]
    Remove(Expression),
    /// Remove every queued track that does not match
    Keep(Expression),
    /// Play the first queued track that matches
    Play(Expression),
    /// Clear the queue
    Clear,
    /// Remove everything but the current track
    Crop,
}

#[derive(Subcommand, Debug)]
pub enum CollectionsAction {
    /// List collection names with their expressions
    List,

    /// Print the tracks of each expression
    ///
    /// Every argument is a separate expression. An expression that fails is
    /// reported and the others are still shown.
    Show {
        #[arg(required = true, value_hint = clap::ValueHint::Other)]
        expressions: Vec<String>,
    },

    /// Define or redefine a collection
    Define {
        /// Collection name
        name: String,
        #[command(flatten)]
        expression: Expression,
    },

    /// Delete a collection
    Delete {
        /// Collection name
        name: String,
    },

    /// Resolve every collection and report the ones that fail
    Check,
}

#[derive(Subcommand, Debug)]
pub enum DatabaseAction {
    /// Rescan the music directory and refresh every cache
    Update,

    /// Report tracks with missing tags and tracks whose tags collide
    Check {
        /// Expression selecting the tracks to check
        #[arg(default_value = "all", value_hint = clap::ValueHint::Other)]
        words: Vec<String>,
    },
}
