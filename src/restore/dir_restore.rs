//! Additive directory tree restore.

use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::errors::Result;

/// Recursively copies the contents of `source` into `dest`.
///
/// `dest` is created if missing. Files that already exist at the destination
/// are overwritten; files present only at the destination are left untouched,
/// so a restore never deletes anything. Symlinks are not followed.
pub fn restore_directory(source: &Path, dest: &Path) -> Result<()> {
    copy_tree(source, dest)
}

pub(crate) fn copy_tree(source: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)?;
    let mut files = 0usize;
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(io::Error::other)?;
        let path = entry.path();
        let relative = path.strip_prefix(source).map_err(io::Error::other)?;
        if relative.as_os_str().is_empty() {
            continue;
        }
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(path, &target)?;
            files += 1;
        }
    }
    debug!(
        source = %source.display(),
        dest = %dest.display(),
        files,
        "copied directory tree"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn write(path: &Path, contents: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut file = File::create(path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn copies_nested_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("src");
        let dest = tmp.path().join("dst");
        write(&source.join("1"), "one");
        write(&source.join("nested/deep/2"), "two");

        restore_directory(&source, &dest).unwrap();

        assert_eq!(read(&dest.join("1")), "one");
        assert_eq!(read(&dest.join("nested/deep/2")), "two");
    }

    #[test]
    fn overwrites_colliding_files() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("src");
        let dest = tmp.path().join("dst");
        write(&source.join("1"), "fresh");
        write(&dest.join("1"), "stale");

        restore_directory(&source, &dest).unwrap();

        assert_eq!(read(&dest.join("1")), "fresh");
    }

    #[test]
    fn leaves_extra_destination_files_alone() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("src");
        let dest = tmp.path().join("dst");
        write(&source.join("1"), "one");
        write(&dest.join("precious"), "keep me");

        restore_directory(&source, &dest).unwrap();

        assert_eq!(read(&dest.join("precious")), "keep me");
        assert_eq!(read(&dest.join("1")), "one");
    }

    #[test]
    fn missing_source_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let result = restore_directory(&tmp.path().join("absent"), &tmp.path().join("dst"));
        assert!(result.is_err());
    }
}
