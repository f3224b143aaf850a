use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::background::WALLPAPERS_DIR;
use crate::board::MAX_COLUMNS;

pub const DEFAULT_QUOTA_BYTES: u64 = 5 * 1024 * 1024;

/// Files kept under the configuration directory.
#[derive(Clone, Debug)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub storage_file: PathBuf,
    pub log_file: PathBuf,
    pub wallpapers_dir: PathBuf,
}

impl AppPaths {
    pub fn new() -> Result<Self> {
        let config_dir = match dirs::config_dir() {
            Some(dir) => dir.join("tabdeck"),
            None => dirs::home_dir()
                .context("Unable to determine home directory")?
                .join(".local/tabdeck"),
        };
        Self::at(config_dir)
    }

    pub fn at(config_dir: impl Into<PathBuf>) -> Result<Self> {
        let config_dir = config_dir.into();
        fs::create_dir_all(&config_dir)
            .with_context(|| format!("Unable to create {}", config_dir.display()))?;
        Ok(Self {
            config_file: config_dir.join("config.json"),
            storage_file: config_dir.join("storage.json"),
            log_file: config_dir.join("tabdeck.log"),
            wallpapers_dir: config_dir.join(WALLPAPERS_DIR),
            config_dir,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub title: String,
    pub columns: u16,
    pub opener: String,
    pub export_dir: Option<PathBuf>,
    pub bookmarks_file: Option<PathBuf>,
    pub storage_quota_bytes: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            title: "Quick Links".into(),
            columns: 1,
            opener: default_opener().into(),
            export_dir: None,
            bookmarks_file: None,
            storage_quota_bytes: Some(DEFAULT_QUOTA_BYTES),
        }
    }
}

fn default_opener() -> &'static str {
    if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    }
}

impl Settings {
    /// Read `path`, writing defaults first when it does not exist. A file
    /// that fails to parse is left alone and the defaults are used.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            let default = Settings::default();
            default.save(path)?;
            return Ok(default);
        }
        let data = fs::read_to_string(path)
            .with_context(|| format!("Unable to read {}", path.display()))?;
        match serde_json::from_str::<Settings>(&data) {
            Ok(parsed) => Ok(parsed.normalized()),
            Err(err) => {
                log::warn!("ignoring unreadable {}: {err}", path.display());
                Ok(Settings::default())
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data).with_context(|| format!("Unable to write {}", path.display()))?;
        Ok(())
    }

    fn normalized(mut self) -> Self {
        self.columns = self.columns.clamp(1, MAX_COLUMNS);
        if self.opener.trim().is_empty() {
            self.opener = default_opener().into();
        }
        self
    }

    pub fn export_dir(&self, paths: &AppPaths) -> PathBuf {
        self.export_dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| paths.config_dir.clone())
    }
}
