//! # Configuration Module
//!
//! Loads the user configuration and locates the files mpdc keeps between runs.
//!
//! ## Files
//!
//! | File | Default location (Linux) |
//! |------|--------------------------|
//! | configuration | `~/.config/mpdc/config.json` |
//! | collection definitions | `~/.config/mpdc/collections.mpdc` |
//! | cache, one per profile | `~/.local/share/mpdc/cache-<profile>.db` |
//!
//! ## Format
//!
//! ```json
//! {
//!   "profiles": [{ "host": "localhost", "port": 6600, "password": null }],
//!   "default_profile": 1,
//!   "collections": "~/music/collections.mpdc",
//!   "columns": ["artist", "title", "album"],
//!   "cache": true
//! }
//! ```
//!
//! Every field is optional. A missing configuration file means defaults.

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info};
use path_absolutize::Absolutize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::Tag;

const APP_DIR: &str = "mpdc";

/// Returns the platform configuration directory for mpdc, creating it.
///
/// # Errors
///
/// If the platform has no configuration directory or it cannot be created.
pub fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| {
        anyhow!("Could not determine system config directory. Pass --config explicitly.")
    })?;
    let dir = base.join(APP_DIR);
    fs::create_dir_all(&dir).with_context(|| {
        format!("Failed to create mpdc config directory at {}. Please check file permissions.", dir.display())
    })?;
    Ok(dir)
}

/// Returns the platform data directory for mpdc, creating it.
///
/// # Errors
///
/// If the platform has no data directory or it cannot be created.
pub fn data_dir() -> Result<PathBuf> {
    let base = dirs::data_dir()
        .ok_or_else(|| anyhow!("Could not determine system data directory."))?;
    let dir = base.join(APP_DIR);
    fs::create_dir_all(&dir).with_context(|| {
        format!("Failed to create mpdc data directory at {}. Please check file permissions.", dir.display())
    })?;
    Ok(dir)
}

/// Cache database for the given 1-based profile.
pub fn cache_path(profile: usize) -> Result<PathBuf> {
    Ok(data_dir()?.join(format!("cache-{profile}.db")))
}

/// Expands a leading `~` and makes `path` absolute.
pub fn resolve_path(path: &Path) -> Result<PathBuf> {
    let expanded = match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .ok_or_else(|| anyhow!("Cannot expand `~`: no home directory"))?
            .join(rest),
        Err(_) => path.to_path_buf(),
    };
    let absolute = expanded
        .absolutize()
        .with_context(|| format!("Failed to make {} absolute", expanded.display()))?;
    Ok(absolute.into_owned())
}

/// Connection settings for one daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
}

impl Default for Profile {
    fn default() -> Self {
        Self { host: "localhost".to_string(), port: 6600, password: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub profiles: Vec<Profile>,
    /// 1-based index into `profiles`.
    pub default_profile: usize,
    /// Definitions file; `None` means the one in [`config_dir`].
    pub collections: Option<PathBuf>,
    /// Tags printed per track, joined by ` - `.
    pub columns: Vec<String>,
    pub cache: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profiles: vec![Profile::default()],
            default_profile: 1,
            collections: None,
            columns: vec!["artist".into(), "title".into(), "album".into()],
            cache: true,
        }
    }
}

impl Config {
    /// Reads the configuration from `path`, or from the default location.
    ///
    /// An explicit `path` must exist; a missing default file yields
    /// [`Config::default`].
    ///
    /// # Errors
    ///
    /// Unreadable or invalid JSON, unknown column names, or a
    /// `default_profile` outside `profiles`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = config_dir()?.join("config.json");
                if !default.exists() {
                    debug!("No configuration at {}, using defaults", default.display());
                    return Ok(Self::default());
                }
                default
            }
        };

        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration {}", path.display()))?;
        let config = Self::from_json(&text)
            .with_context(|| format!("Invalid configuration {}", path.display()))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parses and validates a configuration document.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.profiles.is_empty() {
            bail!("`profiles` must list at least one daemon");
        }
        self.profile(None)?;
        self.column_tags()?;
        Ok(())
    }

    /// Profile `index` (1-based), or the default profile.
    pub fn profile(&self, index: Option<usize>) -> Result<&Profile> {
        let index = index.unwrap_or(self.default_profile);
        index
            .checked_sub(1)
            .and_then(|i| self.profiles.get(i))
            .ok_or_else(|| anyhow!("No profile {index}: {} configured", self.profiles.len()))
    }

    pub fn column_tags(&self) -> Result<Vec<Tag>> {
        self.columns
            .iter()
            .map(|name| match Tag::from_name(name) {
                Some(Tag::Extension) | None => Err(anyhow!(
                    "Unknown column `{name}`; use artist, albumartist, album, title, track or file"
                )),
                Some(tag) => Ok(tag),
            })
            .collect()
    }

    /// Absolute path of the definitions file. The default file is created
    /// empty when missing.
    pub fn collections_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.collections {
            return resolve_path(path);
        }

        let path = config_dir()?.join("collections.mpdc");
        if !path.exists() {
            info!("Creating empty collections file at {}", path.display());
            fs::write(&path, "")
                .with_context(|| format!("Failed to create {}", path.display()))?;
        }
        Ok(path)
    }
}
