//! Rendering for task commands.
//!
//! Every command produces a serializable payload plus the text a person
//! reads. `--format json` wraps the payload in a versioned envelope,
//! `compact` prints one `#id title` line per task, and `text` prints the
//! task tables and detail layouts below.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::query::ContextSummary;
use crate::task::{IndexEntry, Status, Task, TaskId};

pub const SCHEMA_VERSION: &str = "taskgraph.v1";

/// Longest description excerpt shown under a search hit
const EXCERPT_CHARS: usize = 80;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Compact,
}

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub format: OutputFormat,
    pub quiet: bool,
}

/// What a command prints outside JSON mode
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    text: String,
    compact: Option<String>,
}

impl Rendered {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            compact: None,
        }
    }

    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines: Vec<String> = lines.into_iter().map(Into::into).collect();
        Self::text(lines.join("\n"))
    }

    /// Alternative body for `--format compact`
    pub fn with_compact(mut self, compact: impl Into<String>) -> Self {
        self.compact = Some(compact.into());
        self
    }

    pub fn body(&self, format: OutputFormat) -> &str {
        match (format, &self.compact) {
            (OutputFormat::Compact, Some(compact)) => compact,
            _ => &self.text,
        }
    }
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    rendered: &Rendered,
) -> Result<()> {
    if options.format == OutputFormat::Json {
        #[derive(Serialize)]
        struct Envelope<'a, T: Serialize> {
            schema_version: &'static str,
            command: &'a str,
            status: &'static str,
            data: &'a T,
        }

        let payload = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "success",
            data,
        };
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if options.quiet {
        return Ok(());
    }

    let body = rendered.body(options.format);
    if !body.is_empty() {
        println!("{body}");
    }
    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let hint = error_hint(err);
    if json {
        #[derive(Serialize)]
        struct ErrorBody<'a> {
            message: &'a str,
            code: i32,
            kind: &'static str,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<serde_json::Value>,
        }

        #[derive(Serialize)]
        struct Envelope<'a> {
            schema_version: &'static str,
            command: &'a str,
            status: &'static str,
            error: ErrorBody<'a>,
            #[serde(skip_serializing_if = "Option::is_none")]
            hint: Option<&'static str>,
        }

        let payload = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "error",
            error: ErrorBody {
                message: &err.to_string(),
                code: err.exit_code(),
                kind: error_kind(err),
                details: err.details(),
            },
            hint,
        };
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    eprintln!("error: {err}");
    if let Some(hint) = hint {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

// =============================================================================
// Task renderers
// =============================================================================

/// `#id   [status   ] title`, the row used by list and search
pub fn task_row(id: TaskId, status: Status, title: &str) -> String {
    format!("#{:<4} [{:<9}] {}", id, status.as_str(), title)
}

pub fn compact_row(id: TaskId, title: &str) -> String {
    format!("#{id} {title}")
}

/// List output: a status table, or compact `#id title` lines
pub fn render_index(entries: &[IndexEntry]) -> Rendered {
    if entries.is_empty() {
        return Rendered::text("No tasks found").with_compact("");
    }
    let table = entries
        .iter()
        .map(|e| task_row(e.id, e.status, &e.title));
    let compact = entries.iter().map(|e| compact_row(e.id, &e.title));
    Rendered::lines(table).with_compact(collect_lines(compact))
}

/// Search output: table rows with a short description excerpt under each hit
pub fn render_search(tasks: &[Task]) -> Rendered {
    if tasks.is_empty() {
        return Rendered::text("No tasks found").with_compact("");
    }

    let mut lines = vec![format!("Found {} task(s):", tasks.len()), String::new()];
    for task in tasks {
        lines.push(task_row(task.id, task.status, &task.title));
        if !task.description.is_empty() {
            lines.push(format!("      {}", excerpt(&task.description)));
        }
        lines.push(String::new());
    }
    // Drop the blank line after the last hit.
    lines.pop();

    let compact = tasks.iter().map(|t| compact_row(t.id, &t.title));
    Rendered::lines(lines).with_compact(collect_lines(compact))
}

/// Full record layout used by `show`
pub fn render_task(task: &Task) -> Rendered {
    let mut lines = vec![
        format!("Task #{}: {}", task.id, task.title),
        format!("Status: {}", task.status),
        format!("Created: {}", timestamp(task.created)),
        format!("Updated: {}", timestamp(task.updated)),
    ];

    if !task.description.is_empty() {
        lines.push(String::new());
        lines.push("Description:".to_string());
        lines.push(task.description.clone());
    }

    if !task.links.is_empty() {
        lines.push(String::new());
        lines.push("Links:".to_string());
        for link in &task.links {
            if link.label.is_empty() {
                lines.push(format!("  {} #{}", link.kind, link.target_id));
            } else {
                lines.push(format!("  {} #{} ({})", link.kind, link.target_id, link.label));
            }
        }
    }

    if !task.dependencies.is_empty() {
        let deps: Vec<String> = task.dependencies.iter().map(|d| format!("#{d}")).collect();
        lines.push(String::new());
        lines.push(format!("Dependencies (deprecated): {}", deps.join(", ")));
    }

    if !task.tags.is_empty() {
        lines.push(String::new());
        lines.push(format!("Tags: {}", task.tags.join(", ")));
    }

    if !task.notes.is_empty() {
        lines.push(String::new());
        lines.push("Notes:".to_string());
        for note in &task.notes {
            lines.push(format!(
                "  [{}] {}: {}",
                note.timestamp.format("%Y-%m-%d %H:%M"),
                note.author,
                note.text
            ));
        }
    }

    Rendered::lines(lines).with_compact(compact_row(task.id, &task.title))
}

/// Context layout: active work, recent completions, then status totals
pub fn render_context(context: &ContextSummary) -> Rendered {
    let mut lines = vec!["PROJECT CONTEXT".to_string(), String::new()];

    if context.active.is_empty() {
        lines.push("Active Tasks: None".to_string());
    } else {
        lines.push(format!("Active Tasks ({}):", context.active.len()));
        for task in &context.active {
            lines.push(format!("  #{:<4} {}", task.id, task.title));
        }
    }
    lines.push(String::new());

    if !context.recently_completed.is_empty() {
        lines.push(format!(
            "Recently Completed ({}):",
            context.recently_completed.len()
        ));
        for task in &context.recently_completed {
            let mut line = format!("  #{:<4} {}", task.id, task.title);
            if let Some(completed) = task.completed {
                line.push_str(&format!(" (completed {})", completed.format("%Y-%m-%d")));
            }
            lines.push(line);
        }
        lines.push(String::new());
    }

    let counts = &context.summary;
    lines.push(format!(
        "Total: {} tasks ({} active, {} backlog, {} done, {} cancelled)",
        counts.total, counts.active, counts.backlog, counts.done, counts.cancelled
    ));
    Rendered::lines(lines)
}

/// First non-flag argument, used to label error envelopes
pub fn infer_command_name_from_args() -> String {
    command_name(std::env::args().skip(1))
}

fn command_name(args: impl IntoIterator<Item = String>) -> String {
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--root" || arg == "--format" {
            args.next();
            continue;
        }
        if !arg.starts_with('-') {
            return arg;
        }
    }
    "task".to_string()
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn excerpt(text: &str) -> String {
    if text.chars().count() <= EXCERPT_CHARS {
        return text.to_string();
    }
    let head: String = text.chars().take(EXCERPT_CHARS - 3).collect();
    format!("{head}...")
}

fn collect_lines(lines: impl Iterator<Item = String>) -> String {
    lines.collect::<Vec<_>>().join("\n")
}

fn error_kind(err: &Error) -> &'static str {
    match err.exit_code() {
        2 => "user_error",
        3 => "store_state",
        _ => "operation_failed",
    }
}

fn error_hint(err: &Error) -> Option<&'static str> {
    match err {
        Error::NotInitialized(_) => Some("task init"),
        Error::Corrupt { path, .. } if path.ends_with(crate::storage::INDEX_FILE) => {
            Some("task rebuild")
        }
        Error::NotFound(_) => Some("task list --status all"),
        Error::InvalidConfig(_) => Some("fix .tasks/config.toml then retry"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{ContextTask, StatusCounts};
    use crate::task::Link;
    use crate::task::LinkKind;
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 9, 30, 0).unwrap()
    }

    fn entry(id: TaskId, status: Status, title: &str) -> IndexEntry {
        IndexEntry {
            id,
            status,
            title: title.to_string(),
            created: at(1),
            updated: at(1),
        }
    }

    #[test]
    fn index_table_pads_id_and_status() {
        let rendered = render_index(&[
            entry(1, Status::Active, "write parser"),
            entry(12, Status::Cancelled, "old idea"),
        ]);
        assert_eq!(
            rendered.body(OutputFormat::Text),
            "#1    [active   ] write parser\n#12   [cancelled] old idea"
        );
        assert_eq!(
            rendered.body(OutputFormat::Compact),
            "#1 write parser\n#12 old idea"
        );
    }

    #[test]
    fn empty_index_says_no_tasks() {
        let rendered = render_index(&[]);
        assert_eq!(rendered.body(OutputFormat::Text), "No tasks found");
        assert_eq!(rendered.body(OutputFormat::Compact), "");
    }

    #[test]
    fn search_truncates_long_descriptions() {
        let mut task = Task::new(3, "Cache", &"x".repeat(100), at(1));
        task.status = Status::Next;
        let rendered = render_search(&[task]);
        let text = rendered.body(OutputFormat::Text);
        assert!(text.starts_with("Found 1 task(s):\n\n#3    [next     ] Cache\n      "));
        assert!(text.ends_with(&format!("{}...", "x".repeat(77))));
    }

    #[test]
    fn show_layout_lists_links_and_notes() {
        let mut task = Task::new(2, "Ship", "release notes", at(1));
        task.links.push(Link {
            target_id: 1,
            kind: LinkKind::BlockedBy,
            label: String::new(),
        });
        task.links.push(Link {
            target_id: 5,
            kind: LinkKind::RelatesTo,
            label: "docs".to_string(),
        });

        let text = render_task(&task).body(OutputFormat::Text).to_string();
        assert_eq!(
            text,
            "Task #2: Ship\nStatus: backlog\nCreated: 2024-03-01 09:30:00\n\
             Updated: 2024-03-01 09:30:00\n\nDescription:\nrelease notes\n\n\
             Links:\n  blocked_by #1\n  relates_to #5 (docs)"
        );
    }

    #[test]
    fn context_layout_marks_missing_active_work() {
        let context = ContextSummary {
            active: Vec::new(),
            recently_completed: vec![ContextTask {
                id: 4,
                title: "bootstrap".to_string(),
                completed: Some(at(7)),
            }],
            summary: StatusCounts {
                total: 2,
                active: 0,
                backlog: 1,
                done: 1,
                cancelled: 0,
            },
        };

        assert_eq!(
            render_context(&context).body(OutputFormat::Text),
            "PROJECT CONTEXT\n\nActive Tasks: None\n\nRecently Completed (1):\n  \
             #4    bootstrap (completed 2024-03-07)\n\n\
             Total: 2 tasks (0 active, 1 backlog, 1 done, 0 cancelled)"
        );
    }

    #[test]
    fn command_name_skips_flag_values() {
        let args = ["--format", "json", "--root", "/repo", "merge", "3", "4"].map(String::from);
        assert_eq!(command_name(args), "merge");
        assert_eq!(command_name(Vec::<String>::new()), "task");
    }

    #[test]
    fn corrupt_index_suggests_rebuild() {
        let err = Error::Corrupt {
            path: PathBuf::from("/repo/.tasks/index.json"),
            reason: "bad".to_string(),
        };
        assert_eq!(error_hint(&err), Some("task rebuild"));
        assert_eq!(error_kind(&err), "store_state");
    }
}
