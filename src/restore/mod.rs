//! Restore orchestration.
//!
//! [`Backup`] is the facade over both directions: [`Backup::prepare_restore`]
//! resolves configuration and a snapshot up front, [`Backup::restore`] drives
//! the per-unit restorers. Every selected unit is attempted even when earlier
//! units fail; failures are aggregated into the returned error.

pub mod db_restore;
pub mod dir_restore;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::archive::{BackupArchive, DirectoryUnit};
use crate::backup::db_dump::{DatabaseDumper, PgDump};
use crate::config::Config;
use crate::errors::{BackupError, Result, UnitFailure};
use crate::{UnitTask, run_units};

pub use db_restore::{DatabaseRestorer, PgRestore};

/// Per-call restore selection: master switches, skip lists and the alias
/// rename map. The default restores everything the archive holds.
#[derive(Debug, Clone)]
pub struct RestoreOptions {
    /// Master switch for the database category.
    pub db: bool,
    /// Master switch for the directory category.
    pub files: bool,
    /// Aliases present in the archive but excluded from this run.
    pub skip_db: Vec<String>,
    /// Directory settings excluded from this run.
    pub skip_files: Vec<String>,
    /// Source alias -> destination alias. Applied after skip filtering, so a
    /// skipped source is simply never remapped.
    pub db_names: BTreeMap<String, String>,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            db: true,
            files: true,
            skip_db: Vec::new(),
            skip_files: Vec::new(),
            db_names: BTreeMap::new(),
        }
    }
}

/// Orchestrates restore (and, via `src/backup`, snapshot creation) against one
/// resolved archive. Construct through [`Backup::prepare_restore`] or
/// [`Backup::prepare_backup`].
pub struct Backup {
    pub(crate) config: Config,
    pub(crate) archive: BackupArchive,
    pub(crate) restorer: Arc<dyn DatabaseRestorer>,
    pub(crate) dumper: Arc<dyn DatabaseDumper>,
}

impl std::fmt::Debug for Backup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backup")
            .field("config", &self.config)
            .field("archive", &self.archive)
            .finish_non_exhaustive()
    }
}

impl Backup {
    /// Loads configuration and resolves the snapshot at `archive_path`.
    ///
    /// Both steps are fallible, which is why this is a factory rather than a
    /// constructor: an unreadable config or a missing snapshot fails here,
    /// before any restore work starts.
    pub fn prepare_restore(config_path: &Path, archive_path: &Path) -> Result<Self> {
        let config = Config::from_file(config_path)?;
        let archive = BackupArchive::resolve(archive_path)?;
        info!(archive = %archive.path().display(), "prepared restore");
        Ok(Self::new(config, archive))
    }

    pub(crate) fn new(config: Config, archive: BackupArchive) -> Self {
        Self {
            config,
            archive,
            restorer: Arc::new(PgRestore),
            dumper: Arc::new(PgDump),
        }
    }

    /// Replaces the database restorer, e.g. with a fake in tests.
    pub fn with_restorer(mut self, restorer: Arc<dyn DatabaseRestorer>) -> Self {
        self.restorer = restorer;
        self
    }

    /// Replaces the database dumper, e.g. with a fake in tests.
    pub fn with_dumper(mut self, dumper: Arc<dyn DatabaseDumper>) -> Self {
        self.dumper = dumper;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn archive(&self) -> &BackupArchive {
        &self.archive
    }

    /// Restores the selected units from the archive.
    ///
    /// Databases and directories are filtered independently; units that fail
    /// do not stop the remaining units. When anything failed the call returns
    /// [`BackupError::RestoreFailed`] (one unit) or
    /// [`BackupError::RestoreIncomplete`] (several), naming every failed unit.
    pub async fn restore(&self, opts: &RestoreOptions) -> Result<()> {
        let mut failures = Vec::new();

        if opts.db {
            failures.extend(self.restore_databases(opts).await?);
        } else {
            info!("database restore disabled, skipping all database units");
        }

        if opts.files {
            failures.extend(self.restore_directories(opts).await?);
        } else {
            info!("file restore disabled, skipping all directory units");
        }

        match failures.len() {
            0 => Ok(()),
            1 => Err(BackupError::RestoreFailed(failures.remove(0))),
            _ => Err(BackupError::RestoreIncomplete(failures)),
        }
    }

    async fn restore_databases(&self, opts: &RestoreOptions) -> Result<Vec<UnitFailure>> {
        let units = self.archive.database_units()?;
        let skip: BTreeSet<&str> = self
            .config
            .db
            .skip
            .iter()
            .chain(opts.skip_db.iter())
            .map(String::as_str)
            .collect();

        let mut failures = Vec::new();
        let mut tasks: Vec<UnitTask> = Vec::new();
        for unit in units {
            if skip.contains(unit.alias.as_str()) {
                info!(alias = %unit.alias, "skipping database unit");
                continue;
            }
            let target_alias = opts
                .db_names
                .get(&unit.alias)
                .cloned()
                .unwrap_or_else(|| unit.alias.clone());
            if target_alias != unit.alias {
                info!(
                    alias = %unit.alias,
                    target = %target_alias,
                    "restoring dump into a different alias"
                );
            }
            let Some(connection) = self.config.db.databases.get(&target_alias).cloned() else {
                failures.push(UnitFailure::database(
                    &unit.alias,
                    format!("no configured connection for alias '{target_alias}'"),
                ));
                continue;
            };
            let restorer = Arc::clone(&self.restorer);
            tasks.push(Box::new(move || {
                restorer.restore_database(&unit.alias, &unit.dump_path, &connection)
            }));
        }

        failures.extend(run_units(self.config.jobs, tasks).await);
        Ok(failures)
    }

    async fn restore_directories(&self, opts: &RestoreOptions) -> Result<Vec<UnitFailure>> {
        let mut failures = Vec::new();
        let mut tasks: Vec<UnitTask> = Vec::new();
        for (setting, location) in self.config.directory_settings() {
            if opts.skip_files.contains(&setting) {
                info!(setting = %setting, "skipping directory unit");
                continue;
            }
            let Some(source) = self.archive.directory_source(&location) else {
                failures.push(UnitFailure::directory(
                    &setting,
                    format!(
                        "archive {} has no directory for this setting",
                        self.archive.path().display()
                    ),
                ));
                continue;
            };
            let unit = DirectoryUnit { setting, source };
            info!(
                setting = %unit.setting,
                dest = %location.display(),
                "restoring directory tree"
            );
            tasks.push(Box::new(move || {
                dir_restore::restore_directory(&unit.source, &location)
                    .map_err(|e| UnitFailure::directory(&unit.setting, e.to_string()))
            }));
        }

        failures.extend(run_units(self.config.jobs, tasks).await);
        Ok(failures)
    }
}
