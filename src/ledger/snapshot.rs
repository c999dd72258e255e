//! Whole-file snapshot I/O for the ledger.
//!
//! Writes use write-to-temp-then-rename:
//! 1. Write `<file>.tmp`
//! 2. fsync the temp file
//! 3. Rename over `<file>`
//! 4. fsync the parent directory
//!
//! Readers therefore see either the previous snapshot or the new one.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::domain::Fingerprint;

pub type Entries = HashMap<Fingerprint, i64>;

/// Outcome of reading a snapshot file.
#[derive(Debug)]
pub enum Loaded {
    Missing,
    Entries(Entries),
    Corrupt(serde_json::Error),
}

pub fn read_snapshot(path: &Path) -> io::Result<Loaded> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Loaded::Missing),
        Err(e) => return Err(e),
    };

    Ok(match serde_json::from_slice(&bytes) {
        Ok(entries) => Loaded::Entries(entries),
        Err(e) => Loaded::Corrupt(e),
    })
}

pub fn write_snapshot_atomic(path: &Path, entries: &Entries) -> io::Result<()> {
    if let Some(parent) = non_empty_parent(path) {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = sibling(path, ".tmp");
    let bytes = serde_json::to_vec(entries)?;

    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
    }

    fs::rename(&tmp_path, path)?;

    if let Some(parent) = non_empty_parent(path) {
        fsync_dir(parent)?;
    }

    Ok(())
}

/// Move an unreadable snapshot out of the way so the next write does not
/// destroy it.
pub fn quarantine(path: &Path) -> io::Result<PathBuf> {
    let target = sibling(path, ".corrupt");
    fs::rename(path, &target)?;
    Ok(target)
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

fn non_empty_parent(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}

#[cfg(unix)]
fn fsync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn fsync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let loaded = read_snapshot(&dir.path().join("ledger.json")).unwrap();
        assert!(matches!(loaded, Loaded::Missing));
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.json");
        let mut entries = Entries::new();
        entries.insert(Fingerprint::of("a"), 1_700_000_000);

        write_snapshot_atomic(&path, &entries).unwrap();

        match read_snapshot(&path).unwrap() {
            Loaded::Entries(read) => assert_eq!(read, entries),
            other => panic!("unexpected {other:?}"),
        }
        assert!(!sibling(&path, ".tmp").exists());
    }

    #[test]
    fn test_reads_flat_object_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("news_state.json");
        fs::write(&path, r#"{"0123456789abcdef": 1717000000}"#).unwrap();

        match read_snapshot(&path).unwrap() {
            Loaded::Entries(read) => {
                assert_eq!(read.len(), 1);
                assert_eq!(read.values().next(), Some(&1_717_000_000));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        fs::write(&path, b"{\"truncated\": 12").unwrap();
        assert!(matches!(read_snapshot(&path).unwrap(), Loaded::Corrupt(_)));
    }

    #[test]
    fn test_quarantine_moves_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        fs::write(&path, b"garbage").unwrap();

        let moved = quarantine(&path).unwrap();
        assert!(!path.exists());
        assert_eq!(moved, dir.path().join("ledger.json.corrupt"));
        assert_eq!(fs::read(moved).unwrap(), b"garbage");
    }
}
