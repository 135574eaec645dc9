//! Filesystem helpers shared by the file-backed repositories.

use crate::{MandalError, MandalResult, ShardableUuid};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Creates a unique sharded directory within `base_dir`.
///
/// Generates ids with `uuid_source` and creates `base_dir/<s1>/<s2>/<uuid>/`. Collisions with
/// existing directories are retried up to 5 times with fresh ids.
///
/// # Errors
///
/// Returns `MandalError::OrderDirCreation` if directory creation fails or no free id is found
/// after 5 attempts.
pub(crate) fn create_uuid_and_shard_dir(
    base_dir: &Path,
    mut uuid_source: impl FnMut() -> ShardableUuid,
) -> MandalResult<(ShardableUuid, PathBuf)> {
    for _attempt in 0..5 {
        let uuid = uuid_source();
        let candidate = uuid.sharded_dir(base_dir);

        if candidate.exists() {
            continue;
        }

        if let Some(parent) = candidate.parent() {
            fs::create_dir_all(parent).map_err(MandalError::OrderDirCreation)?;
        }

        match fs::create_dir(&candidate) {
            Ok(()) => return Ok((uuid, candidate)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(MandalError::OrderDirCreation(e)),
        }
    }

    Err(MandalError::OrderDirCreation(io::Error::new(
        ErrorKind::AlreadyExists,
        "failed to allocate a unique order directory after 5 attempts",
    )))
}

/// Writes `value` as pretty JSON to a file that must not exist yet.
///
/// Returns `Ok(false)` without writing if the file already exists.
pub(crate) fn write_new_json<T: Serialize>(path: &Path, value: &T) -> MandalResult<bool> {
    let json = serde_json::to_string_pretty(value).map_err(MandalError::Serialization)?;

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(MandalError::FileWrite(e)),
    };
    file.write_all(json.as_bytes())
        .and_then(|()| file.sync_all())
        .map_err(MandalError::FileWrite)?;
    Ok(true)
}

/// Reads a JSON file; `Ok(None)` if it does not exist.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> MandalResult<Option<T>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(MandalError::FileRead(e)),
    };
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(MandalError::Deserialization)
}

/// Every `<base>/<s1>/<s2>/<uuid>` directory below `base_dir`.
///
/// Missing or unreadable levels are skipped.
pub(crate) fn sharded_dirs(base_dir: &Path) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    for s1 in subdirs(base_dir) {
        for s2 in subdirs(&s1) {
            dirs.extend(subdirs(&s2));
        }
    }
    dirs
}

fn subdirs(dir: &Path) -> Vec<PathBuf> {
    match fs::read_dir(dir) {
        Ok(entries) => entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn shard_dir_retries_on_collision() {
        let temp = TempDir::new().unwrap();
        let taken = ShardableUuid::parse("aabbccddeeff00112233445566778899").unwrap();
        fs::create_dir_all(taken.sharded_dir(temp.path())).unwrap();

        let fresh = ShardableUuid::parse("00112233445566778899aabbccddeeff").unwrap();
        let mut ids = vec![fresh.clone(), taken.clone()];
        let (uuid, dir) = create_uuid_and_shard_dir(temp.path(), || ids.pop().unwrap()).unwrap();

        assert_eq!(uuid, fresh);
        assert!(dir.ends_with("00/11/00112233445566778899aabbccddeeff"));
        assert!(dir.is_dir());
    }

    #[test]
    fn shard_dir_gives_up_after_five_collisions() {
        let temp = TempDir::new().unwrap();
        let taken = ShardableUuid::new();
        fs::create_dir_all(taken.sharded_dir(temp.path())).unwrap();

        let err = create_uuid_and_shard_dir(temp.path(), || taken.clone()).unwrap_err();
        assert!(matches!(err, MandalError::OrderDirCreation(_)));
    }

    #[test]
    fn write_new_json_refuses_to_overwrite() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("row.json");

        assert!(write_new_json(&path, &vec![1, 2, 3]).unwrap());
        assert!(!write_new_json(&path, &vec![4]).unwrap());
        assert_eq!(read_json::<Vec<i32>>(&path).unwrap(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn read_json_missing_file_is_none() {
        let temp = TempDir::new().unwrap();
        assert_eq!(read_json::<Vec<i32>>(&temp.path().join("nope.json")).unwrap(), None);
    }

    #[test]
    fn sharded_dirs_walks_three_levels() {
        let temp = TempDir::new().unwrap();
        let a = ShardableUuid::new();
        let b = ShardableUuid::new();
        fs::create_dir_all(a.sharded_dir(temp.path())).unwrap();
        fs::create_dir_all(b.sharded_dir(temp.path())).unwrap();
        fs::write(temp.path().join("stray.txt"), "x").unwrap();

        let mut found = sharded_dirs(temp.path());
        found.sort();
        let mut expected = vec![a.sharded_dir(temp.path()), b.sharded_dir(temp.path())];
        expected.sort();
        assert_eq!(found, expected);
        assert!(sharded_dirs(&temp.path().join("missing")).is_empty());
    }
}
