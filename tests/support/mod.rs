#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use taskgraph::graph::TaskGraph;
use taskgraph::storage::Storage;
use taskgraph::task::{Task, TaskId};
use tempfile::TempDir;

pub struct TestStore {
    dir: TempDir,
    storage: Storage,
}

impl TestStore {
    /// Fresh directory without a `.tasks/` store
    pub fn empty() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let storage = Storage::new(dir.path());
        Self { dir, storage }
    }

    /// Fresh directory with an initialized store
    pub fn init() -> Self {
        let store = Self::empty();
        store.storage.initialize().expect("initialize store");
        store
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn graph(&self) -> TaskGraph {
        TaskGraph::new(self.storage.clone())
    }

    pub fn create(&self, title: &str) -> Task {
        self.graph().create(title, "").expect("create task")
    }

    pub fn task(&self, id: TaskId) -> Task {
        self.storage.read_task(id).expect("read task")
    }

    pub fn task_file(&self, id: TaskId) -> PathBuf {
        self.storage.task_file(id)
    }

    pub fn write_raw(&self, rel_path: &str, contents: &str) -> PathBuf {
        let path = self.storage.store_dir().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(&path, contents).expect("write file");
        path
    }

    /// `task` binary running inside the store directory
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("task").expect("binary");
        cmd.current_dir(self.dir.path());
        cmd.env_remove("TASKS_ROOT");
        cmd.env_remove("RUST_LOG");
        cmd
    }
}

pub fn parse_json(output: &[u8]) -> serde_json::Value {
    serde_json::from_slice(output).expect("valid json output")
}
