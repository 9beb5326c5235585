//! Storage layer for the task store
//!
//! Everything lives under a `.tasks/` marker directory at the repository root.
//!
//! # Directory Structure
//!
//! ```text
//! .tasks/
//!   manifest.json               # next_id, created, version
//!   index.json                  # derived summary of every task
//!   config.toml                 # optional defaults
//!   tasks/
//!     00001.json                # one record per task, zero-padded id
//! ```
//!
//! Task files are the source of truth. The index is rebuilt from a full scan
//! after every mutation and is never patched in place.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::de::DeserializeOwned;

use crate::atomic::write_json_atomic;
use crate::error::{Error, Result};
use crate::task::{Index, Manifest, Task, TaskId};

/// Name of the store marker directory
pub const STORE_DIR: &str = ".tasks";

/// Subdirectory holding one file per task
pub const RECORDS_DIR: &str = "tasks";

pub const MANIFEST_FILE: &str = "manifest.json";
pub const INDEX_FILE: &str = "index.json";
pub const CONFIG_FILE: &str = "config.toml";

/// Digits in a task file name; lexical order matches numeric order below 10^5
const ID_WIDTH: usize = 5;

/// Handle on a task store rooted at a repository directory
#[derive(Debug, Clone)]
pub struct Storage {
    /// Directory containing `.tasks/`
    root: PathBuf,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Open the store that contains the current working directory
    pub fn discover() -> Result<Self> {
        Ok(Self::new(locate_root()?))
    }

    /// Open the store that contains `start`
    pub fn discover_from(start: &Path) -> Result<Self> {
        Ok(Self::new(locate_root_from(start)?))
    }

    /// Open the store at `root`, failing if it has not been initialized
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let storage = Self::new(root);
        if !storage.is_initialized() {
            return Err(Error::NotInitialized(storage.root.clone()));
        }
        Ok(storage)
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the `.tasks/` directory
    pub fn store_dir(&self) -> PathBuf {
        self.root.join(STORE_DIR)
    }

    /// Path to the per-task record directory
    pub fn records_dir(&self) -> PathBuf {
        self.store_dir().join(RECORDS_DIR)
    }

    pub fn manifest_file(&self) -> PathBuf {
        self.store_dir().join(MANIFEST_FILE)
    }

    pub fn index_file(&self) -> PathBuf {
        self.store_dir().join(INDEX_FILE)
    }

    pub fn config_file(&self) -> PathBuf {
        self.store_dir().join(CONFIG_FILE)
    }

    /// Path to the record file for `id`
    pub fn task_file(&self, id: TaskId) -> PathBuf {
        self.records_dir()
            .join(format!("{:0width$}.json", id, width = ID_WIDTH))
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    pub fn is_initialized(&self) -> bool {
        self.store_dir().is_dir()
    }

    /// Create the on-disk layout with an empty index and `next_id = 1`
    pub fn initialize(&self) -> Result<()> {
        if self.store_dir().exists() {
            return Err(Error::AlreadyInitialized(self.store_dir()));
        }

        fs::create_dir_all(self.records_dir())?;

        let now = Utc::now();
        self.write_manifest(&Manifest::new(now))?;
        self.write_index(&Index::empty(now))?;

        tracing::debug!(root = %self.root.display(), "initialized task store");
        Ok(())
    }

    // =========================================================================
    // Manifest
    // =========================================================================

    pub fn read_manifest(&self) -> Result<Manifest> {
        read_record(&self.manifest_file())?
            .ok_or_else(|| missing(&self.manifest_file()))
    }

    pub fn write_manifest(&self, manifest: &Manifest) -> Result<()> {
        write_json_atomic(self.manifest_file(), manifest)
    }

    /// Issue the next task id: read, increment, persist, in one step.
    ///
    /// This is the only place identifiers are handed out. The manifest is
    /// persisted before the caller writes the task, so a failed task write
    /// leaves a gap rather than a reused id.
    pub fn allocate_id(&self) -> Result<TaskId> {
        let mut manifest = self.read_manifest()?;
        let id = manifest.next_id;
        manifest.next_id += 1;
        self.write_manifest(&manifest)?;
        tracing::debug!(id, "allocated task id");
        Ok(id)
    }

    // =========================================================================
    // Index
    // =========================================================================

    pub fn read_index(&self) -> Result<Index> {
        read_record(&self.index_file())?.ok_or_else(|| missing(&self.index_file()))
    }

    pub fn write_index(&self, index: &Index) -> Result<()> {
        write_json_atomic(self.index_file(), index)
    }

    /// Regenerate the index from every readable task record.
    ///
    /// Records that fail to parse are skipped. Task files are never modified.
    pub fn rebuild_index(&self) -> Result<Index> {
        let tasks = self.scan_tasks()?;
        let index = Index::from_tasks(&tasks, Utc::now());
        self.write_index(&index)?;
        tracing::debug!(entries = index.tasks.len(), "rebuilt index");
        Ok(index)
    }

    // =========================================================================
    // Task records
    // =========================================================================

    /// Strict read: missing file is `NotFound`, bad content is `Corrupt`
    pub fn read_task(&self, id: TaskId) -> Result<Task> {
        let path = self.task_file(id);
        let task: Task = read_record(&path)?.ok_or(Error::NotFound(id))?;
        if task.id != id {
            return Err(Error::Corrupt {
                path,
                reason: format!("record holds id {} instead of {}", task.id, id),
            });
        }
        Ok(task)
    }

    pub fn write_task(&self, task: &Task) -> Result<()> {
        write_json_atomic(self.task_file(task.id), task)?;
        tracing::debug!(id = task.id, "wrote task");
        Ok(())
    }

    /// Lenient scan of every task record, unreadable ones skipped
    pub fn scan_tasks(&self) -> Result<Vec<Task>> {
        let mut tasks = Vec::new();
        for entry in fs::read_dir(self.records_dir())? {
            let entry = entry?;
            let path = entry.path();
            if !is_record_file(&path) {
                continue;
            }
            if let Some(task) = read_task_lenient(&path) {
                tasks.push(task);
            }
        }
        Ok(tasks)
    }
}

/// Walk upward from the current directory to the first `.tasks/` marker
pub fn locate_root() -> Result<PathBuf> {
    locate_root_from(&std::env::current_dir()?)
}

pub fn locate_root_from(start: &Path) -> Result<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(STORE_DIR).is_dir())
        .map(Path::to_path_buf)
        .ok_or_else(|| Error::NotInitialized(start.to_path_buf()))
}

/// Best-effort parse used by scans; failures are logged and dropped.
///
/// A record is only accepted when its stored id matches the number in its
/// file name, the same check [`Storage::read_task`] makes.
pub fn read_task_lenient(path: &Path) -> Option<Task> {
    let Some(expected) = record_id(path) else {
        tracing::warn!(path = %path.display(), "skipping file without a task id name");
        return None;
    };
    match read_record::<Task>(path) {
        Ok(Some(task)) if task.id == expected => Some(task),
        Ok(Some(task)) => {
            tracing::warn!(
                path = %path.display(),
                stored = task.id,
                expected,
                "skipping task record with mismatched id"
            );
            None
        }
        Ok(None) => None,
        Err(err) => {
            tracing::warn!(path = %path.display(), "skipping unreadable task record: {err}");
            None
        }
    }
}

/// Id encoded in a record file name such as `00042.json`
fn record_id(path: &Path) -> Option<TaskId> {
    path.file_stem()?.to_str()?.parse().ok()
}

fn is_record_file(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == "json")
}

/// Read and parse a JSON record; `Ok(None)` when the file does not exist
fn read_record<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|err| Error::Corrupt {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })
}

fn missing(path: &Path) -> Error {
    Error::Corrupt {
        path: path.to_path_buf(),
        reason: "file is missing".to_string(),
    }
}
