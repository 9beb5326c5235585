//! Task record commands: create, show, update, list, search, context, rebuild.

use chrono::{Duration, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::graph::{NoteDraft, TaskUpdate};
use crate::output::{self, emit_success, Rendered};
use crate::query::{self, SortKey, StatusFilter};
use crate::task::{IndexEntry, Status, Task, TaskId};

use super::{load_context, GlobalOptions};

pub struct CreateOptions {
    pub title: String,
    pub description: String,
}

pub struct UpdateOptions {
    pub id: TaskId,
    pub status: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub note: Option<String>,
    pub author: Option<String>,
}

pub struct ListOptions {
    pub status: Option<String>,
    pub sort: String,
    pub reverse: bool,
}

#[derive(Serialize)]
struct TaskListOutput {
    total: usize,
    tasks: Vec<IndexEntry>,
}

#[derive(Serialize)]
struct SearchOutput<'a> {
    query: &'a str,
    total: usize,
    tasks: Vec<Task>,
}

#[derive(Serialize)]
struct RebuildOutput {
    total: usize,
}

pub fn run_create(globals: &GlobalOptions, options: CreateOptions) -> Result<()> {
    let ctx = load_context(globals.root.as_ref())?;
    let task = ctx.graph.create(&options.title, &options.description)?;

    let rendered = Rendered::text(format!("Created task #{}", task.id))
        .with_compact(output::compact_row(task.id, &task.title));
    emit_success(globals.output(), "create", &task, &rendered)
}

pub fn run_show(globals: &GlobalOptions, id: TaskId) -> Result<()> {
    let ctx = load_context(globals.root.as_ref())?;
    let task = ctx.storage().read_task(id)?;

    emit_success(globals.output(), "show", &task, &output::render_task(&task))
}

pub fn run_update(globals: &GlobalOptions, options: UpdateOptions) -> Result<()> {
    let ctx = load_context(globals.root.as_ref())?;
    let status = options
        .status
        .as_deref()
        .map(str::parse::<Status>)
        .transpose()?;
    let note = options.note.map(|text| NoteDraft {
        author: options
            .author
            .unwrap_or_else(|| ctx.config.author.clone()),
        text,
    });
    let changes = TaskUpdate {
        status,
        title: options.title,
        description: options.description,
        note,
    };
    let task = ctx.graph.update(options.id, changes)?;

    let rendered = Rendered::text(format!("Updated task #{}", task.id))
        .with_compact(output::compact_row(task.id, &task.title));
    emit_success(globals.output(), "update", &task, &rendered)
}

pub fn run_list(globals: &GlobalOptions, options: ListOptions) -> Result<()> {
    let ctx = load_context(globals.root.as_ref())?;
    let filter: StatusFilter = options
        .status
        .as_deref()
        .unwrap_or(&ctx.config.list.default_status)
        .parse()?;
    let sort: SortKey = options.sort.parse()?;
    let index = ctx.storage().read_index()?;
    let tasks = query::list(&index, filter, sort, options.reverse);
    tracing::debug!(filter = %filter, total = tasks.len(), "listed tasks");

    let rendered = output::render_index(&tasks);
    let payload = TaskListOutput {
        total: tasks.len(),
        tasks,
    };
    emit_success(globals.output(), "list", &payload, &rendered)
}

pub fn run_search(globals: &GlobalOptions, query: &str) -> Result<()> {
    let ctx = load_context(globals.root.as_ref())?;
    let tasks = query::search(ctx.storage(), query)?;

    let rendered = output::render_search(&tasks);
    let payload = SearchOutput {
        query,
        total: tasks.len(),
        tasks,
    };
    emit_success(globals.output(), "search", &payload, &rendered)
}

pub fn run_context(globals: &GlobalOptions) -> Result<()> {
    let ctx = load_context(globals.root.as_ref())?;
    let index = ctx.storage().read_index()?;
    let window = Duration::days(i64::from(ctx.config.context.recent_days));
    let summary = query::context(&index, Utc::now(), window, ctx.config.context.recent_limit);

    emit_success(
        globals.output(),
        "context",
        &summary,
        &output::render_context(&summary),
    )
}

pub fn run_rebuild(globals: &GlobalOptions) -> Result<()> {
    let ctx = load_context(globals.root.as_ref())?;
    let index = ctx.storage().rebuild_index()?;

    let rendered = Rendered::text(format!("Index rebuilt ({} tasks)", index.tasks.len()));
    let payload = RebuildOutput {
        total: index.tasks.len(),
    };
    emit_success(globals.output(), "rebuild", &payload, &rendered)
}
