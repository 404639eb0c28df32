use crate::error::{LedgerError, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable that replaces the per-OS application folder.
pub const HOME_ENV: &str = "UNOTRACK_HOME";

const SAVES_DIR: &str = "saves";
const SNAPSHOT_EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct SaveResolver {
    home_dir: Option<PathBuf>,
    app_dir: Option<PathBuf>,
}

impl Default for SaveResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SaveResolver {
    pub fn new() -> Self {
        Self {
            home_dir: dirs::home_dir(),
            app_dir: env::var_os(HOME_ENV).map(PathBuf::from),
        }
    }

    pub fn with_home<P: Into<PathBuf>>(mut self, home: P) -> Self {
        self.home_dir = Some(home.into());
        self
    }

    pub fn with_app_dir<P: Into<PathBuf>>(mut self, app_dir: P) -> Self {
        self.app_dir = Some(app_dir.into());
        self
    }

    pub fn home_dir(&self) -> Result<&Path> {
        self.home_dir.as_deref().ok_or(LedgerError::NoHomeDirectory)
    }

    /// Per-OS application folder: `%APPDATA%\Uno`, `~/Library/Application Support/Uno`
    /// or `~/.uno`, unless overridden.
    pub fn app_dir(&self) -> Result<PathBuf> {
        if let Some(ref app_dir) = self.app_dir {
            return Ok(app_dir.clone());
        }

        if cfg!(windows)
            && let Some(appdata) = env::var_os("APPDATA")
        {
            return Ok(PathBuf::from(appdata).join("Uno"));
        }

        let home = self.home_dir()?;
        if cfg!(target_os = "macos") {
            Ok(home.join("Library/Application Support/Uno"))
        } else {
            Ok(home.join(".uno"))
        }
    }

    pub fn saves_dir(&self) -> Result<PathBuf> {
        Ok(self.app_dir()?.join(SAVES_DIR))
    }

    pub fn snapshot_file(&self, id: &str) -> Result<PathBuf> {
        Ok(self
            .saves_dir()?
            .join(format!("{}.{}", id, SNAPSHOT_EXTENSION)))
    }

    /// Snapshot ids found in the saves directory, newest first.
    ///
    /// Ids embed their creation time in a sortable form, so a reverse
    /// lexical sort is a reverse chronological one.
    pub fn list_snapshot_ids(&self) -> Result<Vec<String>> {
        let saves_dir = self.saves_dir()?;
        if !saves_dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&saves_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some(SNAPSHOT_EXTENSION)
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                ids.push(stem.to_string());
            }
        }
        ids.sort_unstable_by(|a, b| b.cmp(a));
        Ok(ids)
    }

    /// Creates the saves directory if it does not exist yet.
    pub fn ensure_saves_dir(&self) -> Result<PathBuf> {
        let dir = self.saves_dir()?;
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    pub fn exists(&self) -> bool {
        self.saves_dir().map(|p| p.exists()).unwrap_or(false)
    }
}

mod dirs {
    use super::*;

    pub fn home_dir() -> Option<PathBuf> {
        env::var_os("HOME")
            .or_else(|| env::var_os("USERPROFILE"))
            .map(PathBuf::from)
    }
}
