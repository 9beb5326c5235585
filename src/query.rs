//! Read-only views over the index: listing, search, and the context summary.
//!
//! Filtering is a linear scan. Nothing here writes to the store.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::storage::Storage;
use crate::task::{Index, IndexEntry, Status, Task, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Only(Status),
}

impl StatusFilter {
    pub fn matches(self, status: Status) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => wanted == status,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str("all"),
            StatusFilter::Only(status) => f.write_str(status.as_str()),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        if value.trim().eq_ignore_ascii_case("all") {
            return Ok(StatusFilter::All);
        }
        value.parse().map(StatusFilter::Only)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Id,
    Created,
    Updated,
    Title,
    Status,
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "id" => Ok(SortKey::Id),
            "created" => Ok(SortKey::Created),
            "updated" => Ok(SortKey::Updated),
            "title" => Ok(SortKey::Title),
            "status" => Ok(SortKey::Status),
            _ => Err(Error::InvalidArgument(format!(
                "invalid sort key '{value}' (must be: id, created, updated, title, status)"
            ))),
        }
    }
}

/// Filter and order index entries
pub fn list(index: &Index, filter: StatusFilter, sort: SortKey, reverse: bool) -> Vec<IndexEntry> {
    let mut entries: Vec<IndexEntry> = index
        .tasks
        .iter()
        .filter(|entry| filter.matches(entry.status))
        .cloned()
        .collect();
    entries.sort_by(|left, right| {
        let ordering = compare(left, right, sort);
        if reverse {
            ordering.reverse()
        } else {
            ordering
        }
    });
    entries
}

fn compare(left: &IndexEntry, right: &IndexEntry, sort: SortKey) -> Ordering {
    let primary = match sort {
        SortKey::Id => Ordering::Equal,
        SortKey::Created => left.created.cmp(&right.created),
        SortKey::Updated => left.updated.cmp(&right.updated),
        SortKey::Title => left.title.cmp(&right.title),
        SortKey::Status => left.status.as_str().cmp(right.status.as_str()),
    };
    primary.then_with(|| left.id.cmp(&right.id))
}

/// Tasks whose title, description, tags or notes contain `query`, ignoring case
pub fn search(storage: &Storage, query: &str) -> Result<Vec<Task>> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Err(Error::InvalidArgument("search query cannot be empty".to_string()));
    }

    let index = storage.read_index()?;
    let mut matches = Vec::new();
    for entry in &index.tasks {
        let task = match storage.read_task(entry.id) {
            Ok(task) => task,
            Err(err) => {
                tracing::warn!(id = entry.id, "search skipping unreadable task: {err}");
                continue;
            }
        };
        if matches_query(&task, &needle) {
            matches.push(task);
        }
    }
    Ok(matches)
}

fn matches_query(task: &Task, needle: &str) -> bool {
    let contains = |text: &str| text.to_lowercase().contains(needle);
    contains(&task.title)
        || contains(&task.description)
        || task.tags.iter().any(|tag| contains(tag))
        || task.notes.iter().any(|note| contains(&note.text))
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ContextTask {
    pub id: TaskId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct StatusCounts {
    pub total: usize,
    pub active: usize,
    pub backlog: usize,
    pub done: usize,
    pub cancelled: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContextSummary {
    pub active: Vec<ContextTask>,
    pub recently_completed: Vec<ContextTask>,
    pub summary: StatusCounts,
}

/// Snapshot of current work for handing to a person or an agent.
///
/// Recently completed means done and updated within `window` of `now`; only
/// the last `limit` of those (in id order) are kept.
pub fn context(index: &Index, now: DateTime<Utc>, window: Duration, limit: usize) -> ContextSummary {
    let cutoff = now
        .checked_sub_signed(window)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let mut active = Vec::new();
    let mut completed = Vec::new();
    let mut summary = StatusCounts::default();

    for entry in &index.tasks {
        summary.total += 1;
        match entry.status {
            Status::Active => {
                summary.active += 1;
                active.push(ContextTask {
                    id: entry.id,
                    title: entry.title.clone(),
                    completed: None,
                });
            }
            Status::Backlog => summary.backlog += 1,
            Status::Done => {
                summary.done += 1;
                if entry.updated > cutoff {
                    completed.push(ContextTask {
                        id: entry.id,
                        title: entry.title.clone(),
                        completed: Some(entry.updated),
                    });
                }
            }
            Status::Cancelled => summary.cancelled += 1,
            Status::Next | Status::Blocked | Status::Label => {}
        }
    }

    if completed.len() > limit {
        completed.drain(..completed.len() - limit);
    }

    ContextSummary {
        active,
        recently_completed: completed,
        summary,
    }
}
