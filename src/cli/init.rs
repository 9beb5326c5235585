//! task init command implementation
//!
//! Creates the `.tasks/` store with an empty index, a fresh manifest and a
//! default config file.

use std::path::PathBuf;

use crate::config::Config;
use crate::error::Result;
use crate::output::{emit_success, Rendered};
use crate::storage::{Storage, STORE_DIR};

use super::GlobalOptions;

#[derive(serde::Serialize)]
struct InitReport {
    root: PathBuf,
    store: PathBuf,
    config: PathBuf,
}

pub fn run(globals: &GlobalOptions) -> Result<()> {
    let root = match &globals.root {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };

    let storage = Storage::new(root);
    storage.initialize()?;
    Config::default().save(&storage.config_file())?;
    tracing::info!(root = %storage.root().display(), "initialized task store");

    let report = InitReport {
        root: storage.root().to_path_buf(),
        store: storage.store_dir(),
        config: storage.config_file(),
    };

    let rendered = Rendered::lines([
        format!("Initialized task tracking in {STORE_DIR}/"),
        format!("Add to git with: git add {STORE_DIR} && git commit -m \"Initialize task tracking\""),
    ]);

    emit_success(globals.output(), "init", &report, &rendered)
}
