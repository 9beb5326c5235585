//! Command-line interface for the task store
//!
//! This module defines the CLI structure using clap derive macros.
//! Command implementations live in the submodules.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::Result;
use crate::graph::TaskGraph;
use crate::output::{OutputFormat, OutputOptions};
use crate::storage::Storage;
use crate::task::{parse_task_id, TaskId};

mod graph;
mod init;
mod serve;
mod task;

/// task - file-backed task graph
///
/// Tracks tasks as one JSON file each under `.tasks/`, with typed links,
/// label tags, and merges that keep every reference consistent.
#[derive(Parser, Debug)]
#[command(name = "task")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory to start the `.tasks/` search from (defaults to current directory)
    #[arg(long, global = true, env = "TASKS_ROOT")]
    pub root: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Shorthand for `--format json`
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize task tracking in the current directory
    Init,

    /// Create a new task
    Create {
        /// Task title
        title: String,

        /// Optional description
        description: Option<String>,
    },

    /// Show full task details
    Show {
        #[arg(value_parser = parse_task_id)]
        id: TaskId,
    },

    /// Update a task's fields or add a note
    Update {
        #[arg(value_parser = parse_task_id)]
        id: TaskId,

        /// New status: backlog, next, active, blocked, done, cancelled, label
        #[arg(long)]
        status: Option<String>,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// Append a note
        #[arg(long)]
        note: Option<String>,

        /// Note author (defaults to config `author`)
        #[arg(long)]
        author: Option<String>,
    },

    /// List tasks from the index
    List {
        /// Status filter or "all" (defaults to config `list.default_status`)
        #[arg(long)]
        status: Option<String>,

        /// Sort by: id, created, updated, title, status
        #[arg(long, default_value = "id")]
        sort: String,

        /// Reverse sort order
        #[arg(long)]
        reverse: bool,
    },

    /// Search titles, descriptions, tags and notes
    Search {
        query: String,
    },

    /// Summarize active and recently completed work
    Context,

    /// Link two tasks
    Link {
        #[arg(value_parser = parse_task_id)]
        source: TaskId,

        #[arg(value_parser = parse_task_id)]
        target: TaskId,

        /// Link type: blocks, blocked_by, parent, child, relates_to, duplicates, or any name
        #[arg(long = "type", default_value = "relates_to")]
        kind: String,

        /// Optional label for the link
        #[arg(long)]
        label: Option<String>,

        /// Also add the reciprocal link on the target
        #[arg(long)]
        bidirectional: bool,
    },

    /// Remove one link between two tasks
    Unlink {
        #[arg(value_parser = parse_task_id)]
        source: TaskId,

        #[arg(value_parser = parse_task_id)]
        target: TaskId,

        /// Only remove a link of this type
        #[arg(long = "type")]
        kind: Option<String>,

        /// Also remove the reciprocal link from the target
        #[arg(long)]
        bidirectional: bool,
    },

    /// Tag a task with a label
    Tag {
        #[arg(value_parser = parse_task_id)]
        id: TaskId,

        name: String,
    },

    /// Remove a label from a task
    Untag {
        #[arg(value_parser = parse_task_id)]
        id: TaskId,

        name: String,
    },

    /// Merge one task into another
    Merge {
        #[arg(value_parser = parse_task_id)]
        source: TaskId,

        #[arg(value_parser = parse_task_id)]
        target: TaskId,
    },

    /// Regenerate the index from task files
    Rebuild,

    /// Start the read-only web viewer
    Serve {
        /// Port to listen on (defaults to config `serve.port`)
        #[arg(long)]
        port: Option<u16>,

        /// Open the viewer in the default browser once listening
        #[arg(long)]
        open: bool,
    },
}

/// Flags shared by every command
#[derive(Debug, Clone)]
pub(crate) struct GlobalOptions {
    pub root: Option<PathBuf>,
    pub format: OutputFormat,
    pub quiet: bool,
}

impl GlobalOptions {
    pub fn output(&self) -> OutputOptions {
        OutputOptions {
            format: self.format,
            quiet: self.quiet,
        }
    }
}

pub(crate) struct CommandContext {
    pub graph: TaskGraph,
    pub config: Config,
}

impl CommandContext {
    pub fn storage(&self) -> &Storage {
        self.graph.storage()
    }
}

/// Find the store and load its config
pub(crate) fn load_context(root: Option<&PathBuf>) -> Result<CommandContext> {
    let storage = match root {
        Some(path) => Storage::discover_from(path)?,
        None => Storage::discover()?,
    };
    let config = Config::load_from_store(&storage);
    Ok(CommandContext {
        graph: TaskGraph::new(storage),
        config,
    })
}

impl Cli {
    /// Effective output format after applying `--json`
    pub fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.format
        }
    }

    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let globals = GlobalOptions {
            format: self.output_format(),
            root: self.root,
            quiet: self.quiet,
        };

        match self.command {
            Commands::Init => init::run(&globals),
            Commands::Create { title, description } => task::run_create(
                &globals,
                task::CreateOptions {
                    title,
                    description: description.unwrap_or_default(),
                },
            ),
            Commands::Show { id } => task::run_show(&globals, id),
            Commands::Update {
                id,
                status,
                title,
                description,
                note,
                author,
            } => task::run_update(
                &globals,
                task::UpdateOptions {
                    id,
                    status,
                    title,
                    description,
                    note,
                    author,
                },
            ),
            Commands::List {
                status,
                sort,
                reverse,
            } => task::run_list(
                &globals,
                task::ListOptions {
                    status,
                    sort,
                    reverse,
                },
            ),
            Commands::Search { query } => task::run_search(&globals, &query),
            Commands::Context => task::run_context(&globals),
            Commands::Rebuild => task::run_rebuild(&globals),
            Commands::Link {
                source,
                target,
                kind,
                label,
                bidirectional,
            } => graph::run_link(
                &globals,
                graph::LinkOptions {
                    source,
                    target,
                    kind,
                    label: label.unwrap_or_default(),
                    bidirectional,
                },
            ),
            Commands::Unlink {
                source,
                target,
                kind,
                bidirectional,
            } => graph::run_unlink(
                &globals,
                graph::UnlinkOptions {
                    source,
                    target,
                    kind,
                    bidirectional,
                },
            ),
            Commands::Tag { id, name } => graph::run_tag(&globals, id, &name),
            Commands::Untag { id, name } => graph::run_untag(&globals, id, &name),
            Commands::Merge { source, target } => graph::run_merge(&globals, source, target),
            Commands::Serve { port, open } => serve::run(&globals, port, open),
        }
    }
}
