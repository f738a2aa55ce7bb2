//! Project management
//!
//! Handles project initialization and provides access to the store.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::{Config, ShiftStore};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Not in a shift-board project. Run 'shifts init' first.")]
    NotInProject,
}

const DEFAULT_CONFIG: &str = r#"# shift-board configuration

[timeline]
window_start = "09:00"
window_end = "22:00"
step_minutes = 30

# Acting party when neither --actor nor SHIFTS_ACTOR is given
# [actor]
# id = "alice"
# role = "staff"

[store]
# Times a conflicting write is recomputed before giving up
conflict_retries = 1

# Days marked on the timeline
[holidays]
# "2026-01-01" = "New Year's Day"
"#;

const GITIGNORE: &str = r#"# Lock file for concurrent writers
shifts.lock

# Invalid records moved aside during rewrites
quarantine.jsonl

# Interrupted rewrites
*.tmp
"#;

/// A shift-board project
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens an existing project at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if !root.join(".shifts").is_dir() {
            return Err(ProjectError::NotInProject.into());
        }

        let config = Config::for_project(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the project at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let root = Config::find_project_root().ok_or(ProjectError::NotInProject)?;

        Self::open(root)
    }

    /// Initializes a new project at the given path.
    ///
    /// Existing files are left alone, so running it twice is harmless.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let shifts_dir = root.join(".shifts");

        fs::create_dir_all(&shifts_dir).with_context(|| {
            format!("Failed to create .shifts directory: {}", shifts_dir.display())
        })?;

        let config_path = shifts_dir.join("config.toml");
        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        let gitignore_path = shifts_dir.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(&gitignore_path, GITIGNORE).with_context(|| {
                format!("Failed to write .gitignore: {}", gitignore_path.display())
            })?;
        }

        let store_path = shifts_dir.join("shifts.jsonl");
        if !store_path.exists() {
            fs::write(&store_path, "")
                .with_context(|| format!("Failed to create store: {}", store_path.display()))?;
        }

        Self::open(root)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the .shifts directory path
    pub fn shifts_dir(&self) -> PathBuf {
        self.root.join(".shifts")
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the shift store
    pub fn store(&self) -> ShiftStore {
        ShiftStore::for_project(&self.root)
    }
}
