//! Backup and restore for a web application's persistence layer: Postgres
//! databases (one per configured alias) and uploaded-file directory trees.
//!
//! Dumping and restoring delegate to the Postgres client tools (`pg_dump`,
//! `pg_restore`, `createdb`); directory trees are copied as-is. A snapshot is
//! a plain directory under `base_dir`, so archives stay inspectable with
//! ordinary shell tools.
//!
//! ```no_run
//! use std::path::Path;
//! use backuptool::{Backup, RestoreOptions};
//!
//! # async fn run() -> backuptool::Result<()> {
//! let backup = Backup::prepare_restore(
//!     Path::new("config.yml"),
//!     Path::new("/var/backups/myapp/2018-06-27-daily"),
//! )?;
//! backup.restore(&RestoreOptions::default()).await?;
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod backup;
pub mod config;
pub mod errors;
pub mod restore;

pub use archive::{BackupArchive, DatabaseUnit, DirectoryUnit};
pub use backup::{BackupOptions, DatabaseDumper, PgDump};
pub use config::{Config, DatabaseConnection};
pub use errors::{BackupError, Result, UnitFailure};
pub use restore::{Backup, DatabaseRestorer, PgRestore, RestoreOptions};

use tokio::task::JoinSet;
use tracing::error;

/// One unit's worth of blocking work (a subprocess invocation or a tree copy).
pub(crate) type UnitTask = Box<dyn FnOnce() -> std::result::Result<(), UnitFailure> + Send + 'static>;

/// Runs unit tasks in batches of `jobs`, collecting failures instead of
/// aborting. `jobs == 1` runs strictly sequentially; larger values fan the
/// batch out over blocking worker threads. Units touch disjoint connections
/// and paths, so no coordination between them is needed.
pub(crate) async fn run_units(jobs: usize, tasks: Vec<UnitTask>) -> Vec<UnitFailure> {
    let mut failures = Vec::new();

    if jobs <= 1 {
        for task in tasks {
            if let Err(failure) = task() {
                error!(unit = %failure.unit, reason = %failure.reason, "unit failed");
                failures.push(failure);
            }
        }
        return failures;
    }

    let mut tasks = tasks.into_iter();
    loop {
        let batch: Vec<UnitTask> = tasks.by_ref().take(jobs).collect();
        if batch.is_empty() {
            break;
        }
        let mut set = JoinSet::new();
        for task in batch {
            set.spawn_blocking(task);
        }
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(failure)) => {
                    error!(unit = %failure.unit, reason = %failure.reason, "unit failed");
                    failures.push(failure);
                }
                Err(e) => failures.push(UnitFailure {
                    unit: "worker".to_string(),
                    reason: format!("unit task panicked: {e}"),
                }),
            }
        }
    }

    failures
}
