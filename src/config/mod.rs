//! Typed configuration, loaded from a YAML file and validated once.
//!
//! Every database connection the restore can target is listed here under its
//! alias, so the orchestrator carries no global connection registry.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::{BackupError, Result};

fn default_jobs() -> usize {
    1
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Root directory under which snapshot directories live.
    pub base_dir: PathBuf,
    /// How many units to run at a time. 1 means strictly sequential.
    #[serde(default = "default_jobs")]
    pub jobs: usize,
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub files: FilesConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DbConfig {
    /// Aliases excluded from every run, on top of any per-call skip list.
    #[serde(default)]
    pub skip: Vec<String>,
    /// Alias -> connection parameters. BTreeMap keeps iteration order stable.
    #[serde(default)]
    pub databases: BTreeMap<String, DatabaseConnection>,
}

/// Connection parameters for one database alias, handed verbatim to the
/// Postgres client tools.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConnection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// Physical database name on the server.
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilesConfig {
    /// Subset of `locations` participating in backup/restore. Absent means
    /// all configured locations.
    #[serde(default)]
    pub directories: Option<Vec<String>>,
    /// Setting name -> directory path it currently points to.
    #[serde(default)]
    pub locations: BTreeMap<String, PathBuf>,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            BackupError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Config = serde_yaml::from_str(&raw).map_err(|e| {
            BackupError::Config(format!("cannot parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.base_dir.as_os_str().is_empty() {
            return Err(BackupError::Config("base_dir must not be empty".to_string()));
        }
        if self.jobs == 0 {
            return Err(BackupError::Config("jobs must be at least 1".to_string()));
        }
        if let Some(directories) = &self.files.directories {
            for setting in directories {
                if !self.files.locations.contains_key(setting) {
                    return Err(BackupError::Config(format!(
                        "files.directories names unknown setting '{setting}' \
                         (no entry in files.locations)"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Directory settings participating in backup/restore, with their current
    /// locations, in lexical order by setting name.
    pub fn directory_settings(&self) -> Vec<(String, PathBuf)> {
        let mut settings: Vec<(String, PathBuf)> = match &self.files.directories {
            Some(names) => names
                .iter()
                .filter_map(|name| {
                    self.files
                        .locations
                        .get(name)
                        .map(|path| (name.clone(), path.clone()))
                })
                .collect(),
            None => self
                .files
                .locations
                .iter()
                .map(|(name, path)| (name.clone(), path.clone()))
                .collect(),
        };
        settings.sort_by(|a, b| a.0.cmp(&b.0));
        settings
    }
}
