//! Configuration handling for shift-board
//!
//! Configuration is stored in `.shifts/config.toml` (project) and
//! `~/.config/shift-board/config.toml` (global).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveTime;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{hhmm, Actor, ActorRole, HolidayCalendar, LayoutWindow, ResourceId};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Visible span and resolution of the timeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    #[serde(with = "hhmm")]
    pub window_start: NaiveTime,

    #[serde(with = "hhmm")]
    pub window_end: NaiveTime,

    /// Minutes per grid step
    pub step_minutes: u32,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        let window = LayoutWindow::default();
        Self {
            window_start: window.start(),
            window_end: window.end(),
            step_minutes: window.step_minutes(),
        }
    }
}

impl TimelineConfig {
    /// Validates the configured window
    pub fn window(&self) -> Result<LayoutWindow, ConfigError> {
        LayoutWindow::new(self.window_start, self.window_end, self.step_minutes)
            .map_err(|e| ConfigError::Invalid(format!("[timeline] {}", e)))
    }
}

/// Who is acting when no flag says otherwise
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ActorConfig {
    pub id: Option<String>,
    pub role: Option<ActorRole>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// How often a conflicting write is recomputed before giving up
    pub conflict_retries: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            conflict_retries: 1,
        }
    }
}

/// Project-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProjectConfig {
    pub timeline: TimelineConfig,

    pub actor: ActorConfig,

    pub store: StoreConfig,

    /// `"YYYY-MM-DD" = "label"`
    pub holidays: HashMap<String, String>,
}

impl ProjectConfig {
    pub fn holiday_calendar(&self) -> Result<HolidayCalendar, ConfigError> {
        HolidayCalendar::from_labels(&self.holidays)
            .map_err(|key| ConfigError::Invalid(format!("[holidays] '{}' is not a YYYY-MM-DD date", key)))
    }
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,

    pub actor: ActorConfig,
}

/// Combined configuration (global + project)
#[derive(Debug, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub global: GlobalConfig,
    pub project_root: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from default locations
    pub fn load() -> Result<Self> {
        let global = Self::load_global()?;
        let (project, project_root) = Self::load_project()?;

        Ok(Self {
            project,
            global,
            project_root,
        })
    }

    /// Loads configuration for a specific project
    pub fn for_project(project_root: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project_config(project_root)?;

        Ok(Self {
            project,
            global,
            project_root: Some(project_root.to_path_buf()),
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "shift-board", "shift-board")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads global configuration
    fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Finds and loads project configuration
    fn load_project() -> Result<(ProjectConfig, Option<PathBuf>)> {
        match Self::find_project_root() {
            Some(root) => {
                let config = Self::load_project_config(&root)?;
                Ok((config, Some(root)))
            }
            None => Ok((ProjectConfig::default(), None)),
        }
    }

    /// Loads project configuration from a specific root
    fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
        let config_path = project_root.join(".shifts").join("config.toml");

        if !config_path.exists() {
            return Ok(ProjectConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read project config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse project config")
    }

    /// Finds the project root by looking for a `.shifts/` directory upwards
    /// from the current directory
    pub fn find_project_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::find_project_root_from(&current)
    }

    pub fn find_project_root_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            if current.join(".shifts").is_dir() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// The flag value if given, else the global default
    pub fn output_format(&self, flag: Option<OutputFormat>) -> OutputFormat {
        flag.unwrap_or(self.global.default_format)
    }

    /// Resolves the acting party.
    ///
    /// Each of `id` and `role` comes from the first of: the caller (flags or
    /// environment), project `[actor]`, global `[actor]`. The ID falls back to
    /// `$USER`, the role to staff.
    pub fn current_actor(&self, id: Option<&str>, role: Option<ActorRole>) -> Result<Actor, ConfigError> {
        let id = id
            .map(str::to_string)
            .or_else(|| self.project.actor.id.clone())
            .or_else(|| self.global.actor.id.clone())
            .or_else(|| std::env::var("USER").ok())
            .ok_or_else(|| ConfigError::Invalid("No actor given; pass --actor or set [actor] id".to_string()))?;

        let id: ResourceId = id
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("{}", e)))?;

        let role = role
            .or(self.project.actor.role)
            .or(self.global.actor.role)
            .unwrap_or_default();

        Ok(Actor::new(id, role))
    }
}
