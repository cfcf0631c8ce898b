//! # Shell Completion Module
//!
//! Static completion scripts come from clap. Collection names are dynamic:
//! `mpdc complete-collections` prints them, one per line, for shell functions
//! that want to offer them as expression words.
//!
//! ```bash
//! mpdc completion bash > ~/.local/share/bash-completion/completions/mpdc
//! mpdc completion zsh > ~/.config/zsh/completions/_mpdc
//! ```

use anyhow::{Context, Result};
use clap::Command;
use clap_complete::{generate, Generator, Shell as CompletionShell};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::collections::parse_definitions;

/// Generate shell completions for the given shell
pub fn generate_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
}

/// Convert our Shell enum to clap_complete's Shell enum
pub fn shell_to_completion_shell(shell: &crate::cli::Shell) -> CompletionShell {
    match shell {
        crate::cli::Shell::Bash => CompletionShell::Bash,
        crate::cli::Shell::Zsh => CompletionShell::Zsh,
        crate::cli::Shell::Fish => CompletionShell::Fish,
        crate::cli::Shell::PowerShell => CompletionShell::PowerShell,
        crate::cli::Shell::Elvish => CompletionShell::Elvish,
    }
}

/// Collection names in the definitions file, without contacting the daemon.
/// Names containing spaces come back quoted, ready to use in an expression.
pub fn collection_completions(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut names: Vec<String> = parse_definitions(&text)
        .into_iter()
        .map(|(name, _)| {
            if name.contains(char::is_whitespace) {
                format!("\"{name}\"")
            } else {
                name
            }
        })
        .collect();
    names.sort();
    names.dedup();
    Ok(names)
}

pub fn print_collection_completions(path: &Path, out: &mut dyn Write) -> Result<()> {
    for name in collection_completions(path)? {
        writeln!(out, "{name}")?;
    }
    Ok(())
}
