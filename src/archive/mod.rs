//! Snapshot directories and the restorable units found inside them.
//!
//! A snapshot is a plain directory (typically date-stamped, e.g.
//! `2018-06-27-daily/`) holding one `<alias>.dump` file per database and one
//! subdirectory per backed-up directory tree, named after the basename of the
//! tree's configured location. Enumeration only reads the filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{BackupError, Result};

/// File extension of database dump files inside a snapshot.
pub const DUMP_EXTENSION: &str = "dump";

/// A resolved snapshot directory. Resolution checks existence once; the
/// archive is immutable afterwards.
#[derive(Debug, Clone)]
pub struct BackupArchive {
    name: String,
    path: PathBuf,
}

/// One restorable database dump, keyed by alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseUnit {
    pub alias: String,
    pub dump_path: PathBuf,
}

/// One restorable directory tree, keyed by setting name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryUnit {
    pub setting: String,
    pub source: PathBuf,
}

impl BackupArchive {
    /// Resolves the snapshot `name` under `base_dir`.
    pub fn locate(base_dir: &Path, name: &str) -> Result<Self> {
        Self::resolve(&base_dir.join(name))
    }

    /// Resolves a snapshot from its full path.
    pub fn resolve(path: &Path) -> Result<Self> {
        if !path.is_dir() {
            return Err(BackupError::ArchiveNotFound(path.to_path_buf()));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        debug!(archive = %path.display(), "resolved backup archive");
        Ok(Self {
            name,
            path: path.to_path_buf(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All database units physically present, lexically ordered by alias.
    /// Files without the dump extension and subdirectories are ignored.
    pub fn database_units(&self) -> Result<Vec<DatabaseUnit>> {
        let mut units = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(DUMP_EXTENSION) {
                continue;
            }
            let Some(alias) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            units.push(DatabaseUnit {
                alias: alias.to_string(),
                dump_path: path.clone(),
            });
        }
        units.sort_by(|a, b| a.alias.cmp(&b.alias));
        Ok(units)
    }

    /// The archived tree for a directory setting whose current location is
    /// `location`, if the snapshot contains one. The tree is stored under the
    /// location's basename.
    pub fn directory_source(&self, location: &Path) -> Option<PathBuf> {
        let basename = location.file_name()?;
        let candidate = self.path.join(basename);
        candidate.is_dir().then_some(candidate)
    }

    /// Path a dump file for `alias` has (or would have) inside this snapshot.
    pub fn dump_path(&self, alias: &str) -> PathBuf {
        self.path.join(format!("{alias}.{DUMP_EXTENSION}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn snapshot(dir: &Path) -> PathBuf {
        let path = dir.join("2018-06-27-daily");
        fs::create_dir(&path).unwrap();
        path
    }

    #[test]
    fn missing_snapshot_is_archive_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let err = BackupArchive::locate(tmp.path(), "2018-06-26-daily").unwrap_err();
        match err {
            BackupError::ArchiveNotFound(path) => {
                assert_eq!(path, tmp.path().join("2018-06-26-daily"));
            }
            other => panic!("expected ArchiveNotFound, got {other:?}"),
        }
    }

    #[test]
    fn snapshot_path_that_is_a_file_is_not_an_archive() {
        let tmp = tempfile::tempdir().unwrap();
        File::create(tmp.path().join("snap")).unwrap();
        let err = BackupArchive::locate(tmp.path(), "snap").unwrap_err();
        assert!(matches!(err, BackupError::ArchiveNotFound(_)));
    }

    #[test]
    fn database_units_are_lexical_and_filtered() {
        let tmp = tempfile::tempdir().unwrap();
        let snap = snapshot(tmp.path());
        File::create(snap.join("secondary.dump")).unwrap();
        File::create(snap.join("default.dump")).unwrap();
        File::create(snap.join("notes.txt")).unwrap();
        fs::create_dir(snap.join("media")).unwrap();

        let archive = BackupArchive::resolve(&snap).unwrap();
        let units = archive.database_units().unwrap();
        let aliases: Vec<&str> = units.iter().map(|u| u.alias.as_str()).collect();
        assert_eq!(aliases, vec!["default", "secondary"]);
        assert_eq!(units[0].dump_path, snap.join("default.dump"));
    }

    #[test]
    fn directory_source_matches_location_basename() {
        let tmp = tempfile::tempdir().unwrap();
        let snap = snapshot(tmp.path());
        fs::create_dir(snap.join("media")).unwrap();

        let archive = BackupArchive::resolve(&snap).unwrap();
        assert_eq!(
            archive.directory_source(Path::new("/srv/app/media")),
            Some(snap.join("media"))
        );
        assert_eq!(archive.directory_source(Path::new("/srv/app/private_media")), None);
    }

    #[test]
    fn archive_name_is_the_directory_name() {
        let tmp = tempfile::tempdir().unwrap();
        let snap = snapshot(tmp.path());
        let archive = BackupArchive::resolve(&snap).unwrap();
        assert_eq!(archive.name(), "2018-06-27-daily");
        assert_eq!(archive.dump_path("default"), snap.join("default.dump"));
    }
}
