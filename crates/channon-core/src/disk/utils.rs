//! Low-level file helpers shared by the plan and run writers.

use std::{
    fs::{self, OpenOptions, Permissions},
    io::{ErrorKind, Write},
    os::unix::fs::{OpenOptionsExt, PermissionsExt},
    path::Path,
};

use log::warn;

use crate::error::{FileSystemResultExt, Result};

const EXECUTABLE_MODE: u32 = 0o755;

/// Replaces `path` with `contents` via a sibling temp file and a rename, so
/// readers never observe a partially written document.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).at_path(parent)?;
    }
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents).at_path(&tmp_path)?;
    fs::rename(&tmp_path, path).at_path(path)
}

/// Serializes `value` as pretty JSON and writes it atomically.
pub fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = serde_json::to_vec_pretty(value)?;
    buf.push(b'\n');
    write_atomic(path, &buf)
}

/// Removes `path`, treating a missing file as success.
///
/// Returns `Ok(true)` when something was removed.
pub fn remove_if_present(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).at_path(path),
    }
}

/// Writes `contents` to a fresh executable file at `path`.
///
/// The old file is deleted first. A failure to delete it is logged and the
/// write is still attempted; a failure to create or write the new file is
/// returned.
pub fn write_executable(path: &Path, contents: &str) -> Result<()> {
    if let Err(e) = remove_if_present(path) {
        warn!("Problem removing {}: {e}", path.display());
    }

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(EXECUTABLE_MODE)
        .open(path)
        .at_path(path)?;
    file.write_all(contents.as_bytes()).at_path(path)?;
    file.set_permissions(Permissions::from_mode(EXECUTABLE_MODE))
        .at_path(path)?;
    file.sync_all().at_path(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_replaces_and_cleans_temp() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("nested").join("run.json");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_remove_if_present_tolerates_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("step0");

        assert!(!remove_if_present(&path).unwrap());
        fs::write(&path, "x").unwrap();
        assert!(remove_if_present(&path).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_write_executable_sets_mode_and_replaces_content() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("step0");

        write_executable(&path, "#!/bin/sh\necho one\n").unwrap();
        write_executable(&path, "#!/bin/sh\necho two\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "#!/bin/sh\necho two\n");
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_write_executable_reports_missing_parent() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("missing").join("step0");

        let err = write_executable(&path, "#!/bin/sh\n").unwrap_err();
        assert!(matches!(err, crate::ChannonError::FileSystem { .. }));
    }
}
