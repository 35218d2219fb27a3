use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Identity and cause of one failed unit (one database or one directory).
///
/// Units fail independently; the orchestrator collects these and reports them
/// all at once instead of aborting on the first one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFailure {
    pub unit: String,
    pub reason: String,
}

impl UnitFailure {
    pub fn database(alias: &str, reason: impl Into<String>) -> Self {
        Self {
            unit: format!("database '{alias}'"),
            reason: reason.into(),
        }
    }

    pub fn directory(setting: &str, reason: impl Into<String>) -> Self {
        Self {
            unit: format!("directory '{setting}'"),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.unit, self.reason)
    }
}

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("backup archive not found or not a directory: {0}")]
    ArchiveNotFound(PathBuf),

    #[error("restore failed for {0}")]
    RestoreFailed(UnitFailure),

    #[error("restore incomplete, {} unit(s) failed: {}", .0.len(), list_failures(.0))]
    RestoreIncomplete(Vec<UnitFailure>),

    #[error("backup failed for {0}")]
    BackupFailed(UnitFailure),

    #[error("backup incomplete, {} unit(s) failed: {}", .0.len(), list_failures(.0))]
    BackupIncomplete(Vec<UnitFailure>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn list_failures(failures: &[UnitFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, BackupError>;
