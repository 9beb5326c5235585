//! taskgraph - file-backed task graph
//!
//! This library provides the core functionality for the `task` CLI tool:
//! one JSON file per task, a rebuildable index, and graph edits that keep
//! links between tasks consistent.
//!
//! # Core Concepts
//!
//! - **Tasks**: records with a status, notes, and typed links to other tasks
//! - **Labels**: tasks with `label` status; tagging links a task to one as its `child`
//! - **Index**: denormalized summary regenerated from the task files after every write
//! - **Manifest**: the monotonic id counter
//!
//! # Module Organization
//!
//! - `atomic`: Temp-file-and-rename writes
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `.tasks/config.toml`
//! - `error`: Error types and result aliases
//! - `graph`: Link, unlink, tag, untag and merge
//! - `output`: Human and JSON output for commands
//! - `query`: List, search and context views
//! - `server`: Read-only HTTP viewer
//! - `storage`: Store layout, record I/O and index rebuild
//! - `task`: Entity model

pub mod atomic;
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod output;
pub mod query;
pub mod server;
pub mod storage;
pub mod task;

pub use error::{Error, Result};
