//! Atomic record writes
//!
//! Every persisted record goes through [`write_json_atomic`]: the payload is
//! written to a sibling temp file in the same directory, flushed, then renamed
//! over the target. Readers see either the old complete file or the new one.
//!
//! The rename is only atomic within a single filesystem volume, which holds
//! because the temp file is always created next to the target.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::{Error, Result};

/// Suffix of in-flight temp files; record scans ignore it
pub const TEMP_SUFFIX: &str = ".tmp";

/// Atomically write data to a file
///
/// On a failed write the temp file is removed and the target is untouched.
/// On a failed rename the previous target content stays in place.
pub fn write_atomic(path: impl AsRef<Path>, data: &[u8]) -> Result<()> {
    let path = path.as_ref();

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    // Dropping the handle on any early return deletes the temp file.
    let mut temp = tempfile::Builder::new()
        .prefix(".")
        .suffix(TEMP_SUFFIX)
        .tempfile_in(parent)
        .map_err(|err| write_failed(path, err))?;
    temp.write_all(data).map_err(|err| write_failed(path, err))?;
    temp.as_file()
        .sync_all()
        .map_err(|err| write_failed(path, err))?;

    temp.persist(path)
        .map_err(|err| write_failed(path, err.error))?;

    Ok(())
}

/// Serialize `value` as pretty JSON and write it atomically
///
/// Output is deterministic: struct fields keep declaration order and the
/// file always ends with a newline.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    write_atomic(path, json.as_bytes())
}

fn write_failed(path: &Path, err: std::io::Error) -> Error {
    Error::WriteFailed {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.txt");

        write_atomic(&file_path, b"Hello, World!").unwrap();

        let content = fs::read_to_string(&file_path).unwrap();
        assert_eq!(content, "Hello, World!");

        // Overwrite
        write_atomic(&file_path, b"Updated!").unwrap();
        let content = fs::read_to_string(&file_path).unwrap();
        assert_eq!(content, "Updated!");
    }

    #[test]
    fn leaves_no_temp_files_behind() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("record.json");

        write_json_atomic(&file_path, &serde_json::json!({ "id": 1 })).unwrap();
        write_json_atomic(&file_path, &serde_json::json!({ "id": 2 })).unwrap();

        let names: Vec<String> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["record.json".to_string()]);
    }

    #[test]
    fn json_output_is_pretty_and_newline_terminated() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("nested").join("data.json");

        write_json_atomic(&file_path, &serde_json::json!({ "key": "value" })).unwrap();

        let content = fs::read_to_string(&file_path).unwrap();
        assert_eq!(content, "{\n  \"key\": \"value\"\n}\n");
    }

    #[test]
    fn failed_rename_keeps_previous_target() {
        let temp_dir = TempDir::new().unwrap();
        // A non-empty directory cannot be replaced by a file rename.
        let target = temp_dir.path().join("occupied");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep.txt"), "keep").unwrap();

        let result = write_atomic(&target, b"new content");
        assert!(matches!(result, Err(Error::WriteFailed { .. })));
        assert_eq!(fs::read_to_string(target.join("keep.txt")).unwrap(), "keep");

        let leftovers = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter(|entry| {
                entry
                    .as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .ends_with(TEMP_SUFFIX)
            })
            .count();
        assert_eq!(leftovers, 0);
    }
}
