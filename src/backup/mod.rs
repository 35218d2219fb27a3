//! Snapshot creation, the counterpart to `src/restore`.
//!
//! A backup writes a date-stamped snapshot directory under `base_dir` holding
//! one `<alias>.dump` per configured database and one subdirectory per
//! participating directory setting, i.e. exactly the layout
//! [`crate::restore::Backup::restore`] consumes.

pub mod db_dump;

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::Local;
use tracing::info;

use crate::archive::BackupArchive;
use crate::config::Config;
use crate::errors::{BackupError, Result, UnitFailure};
use crate::restore::{Backup, dir_restore};
use crate::{UnitTask, run_units};

pub use db_dump::{DatabaseDumper, PgDump};

/// Per-call backup selection, the mirror image of
/// [`crate::restore::RestoreOptions`] without the rename map (dumps always
/// carry their source alias name).
#[derive(Debug, Clone)]
pub struct BackupOptions {
    pub db: bool,
    pub files: bool,
    pub skip_db: Vec<String>,
    pub skip_files: Vec<String>,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            db: true,
            files: true,
            skip_db: Vec::new(),
            skip_files: Vec::new(),
        }
    }
}

impl Backup {
    /// Loads configuration and creates today's snapshot directory under
    /// `base_dir`, named `YYYY-MM-DD-daily` to match what the restore side
    /// expects to find.
    pub fn prepare_backup(config_path: &Path) -> Result<Self> {
        let config = Config::from_file(config_path)?;
        let name = format!("{}-daily", Local::now().format("%Y-%m-%d"));
        let path = config.base_dir.join(&name);
        fs::create_dir_all(&path)?;
        let archive = BackupArchive::resolve(&path)?;
        info!(archive = %archive.path().display(), "prepared backup");
        Ok(Self::new(config, archive))
    }

    /// Dumps the selected databases and directory trees into the snapshot.
    /// Same selection and aggregation semantics as restore: all selected
    /// units are attempted, failures are collected and reported together.
    pub async fn run_backup(&self, opts: &BackupOptions) -> Result<()> {
        let mut failures = Vec::new();

        if opts.db {
            failures.extend(self.dump_databases(opts).await);
        } else {
            info!("database backup disabled, skipping all database units");
        }

        if opts.files {
            failures.extend(self.bundle_directories(opts).await);
        } else {
            info!("file backup disabled, skipping all directory units");
        }

        match failures.len() {
            0 => Ok(()),
            1 => Err(BackupError::BackupFailed(failures.remove(0))),
            _ => Err(BackupError::BackupIncomplete(failures)),
        }
    }

    async fn dump_databases(&self, opts: &BackupOptions) -> Vec<UnitFailure> {
        let skip: BTreeSet<&str> = self
            .config
            .db
            .skip
            .iter()
            .chain(opts.skip_db.iter())
            .map(String::as_str)
            .collect();

        let mut tasks: Vec<UnitTask> = Vec::new();
        for (alias, connection) in &self.config.db.databases {
            if skip.contains(alias.as_str()) {
                info!(alias = %alias, "skipping database unit");
                continue;
            }
            let alias = alias.clone();
            let connection = connection.clone();
            let dump_path = self.archive.dump_path(&alias);
            let dumper = Arc::clone(&self.dumper);
            tasks.push(Box::new(move || {
                dumper.dump_database(&alias, &connection, &dump_path)
            }));
        }

        run_units(self.config.jobs, tasks).await
    }

    async fn bundle_directories(&self, opts: &BackupOptions) -> Vec<UnitFailure> {
        let mut failures = Vec::new();
        let mut tasks: Vec<UnitTask> = Vec::new();
        for (setting, location) in self.config.directory_settings() {
            if opts.skip_files.contains(&setting) {
                info!(setting = %setting, "skipping directory unit");
                continue;
            }
            if !location.is_dir() {
                failures.push(UnitFailure::directory(
                    &setting,
                    format!("source directory missing: {}", location.display()),
                ));
                continue;
            }
            let Some(basename) = location.file_name() else {
                failures.push(UnitFailure::directory(
                    &setting,
                    format!("location has no basename: {}", location.display()),
                ));
                continue;
            };
            let dest = self.archive.path().join(basename);
            info!(
                setting = %setting,
                source = %location.display(),
                "bundling directory tree"
            );
            tasks.push(Box::new(move || {
                dir_restore::copy_tree(&location, &dest)
                    .map_err(|e| UnitFailure::directory(&setting, e.to_string()))
            }));
        }

        failures.extend(run_units(self.config.jobs, tasks).await);
        failures
    }
}
