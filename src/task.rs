//! Task records and the derived index/manifest types.
//!
//! One [`Task`] is persisted per file under `.tasks/tasks/`. The [`Index`] is a
//! disposable projection of every task and the [`Manifest`] owns identifier
//! allocation.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// Integer task identifier, allocated by the manifest
pub type TaskId = u64;

/// Format version stamped into new manifests
pub const MANIFEST_VERSION: &str = "1.0";

/// Parse a task id, accepting an optional leading `#`
pub fn parse_task_id(raw: &str) -> Result<TaskId> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
    match digits.parse::<TaskId>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(Error::InvalidArgument(format!("invalid task ID '{raw}'"))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Backlog,
    Next,
    Active,
    Blocked,
    Done,
    Cancelled,
    /// Synthetic tag node; the task title is the tag name
    Label,
}

impl Status {
    pub const ALL: [Status; 7] = [
        Status::Backlog,
        Status::Next,
        Status::Active,
        Status::Blocked,
        Status::Done,
        Status::Cancelled,
        Status::Label,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Backlog => "backlog",
            Status::Next => "next",
            Status::Active => "active",
            Status::Blocked => "blocked",
            Status::Done => "done",
            Status::Cancelled => "cancelled",
            Status::Label => "label",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        Status::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                let valid: Vec<&str> = Status::ALL.iter().map(|s| s.as_str()).collect();
                Error::InvalidArgument(format!(
                    "invalid status '{value}' (must be: {})",
                    valid.join(", ")
                ))
            })
    }
}

/// Link type. Well-known kinds are variants; anything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LinkKind {
    Blocks,
    BlockedBy,
    Parent,
    Child,
    RelatesTo,
    Duplicates,
    /// A name outside the well-known set. Build it with [`LinkKind::custom`]
    /// so that `Custom("blocks")` never exists and names round-trip.
    Custom(String),
}

impl LinkKind {
    /// Type used when mirroring a link onto its target
    pub fn reciprocal(&self) -> LinkKind {
        match self {
            LinkKind::Blocks => LinkKind::BlockedBy,
            LinkKind::BlockedBy => LinkKind::Blocks,
            LinkKind::Parent => LinkKind::Child,
            LinkKind::Child => LinkKind::Parent,
            other => other.clone(),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            LinkKind::Blocks => "blocks",
            LinkKind::BlockedBy => "blocked_by",
            LinkKind::Parent => "parent",
            LinkKind::Child => "child",
            LinkKind::RelatesTo => "relates_to",
            LinkKind::Duplicates => "duplicates",
            LinkKind::Custom(name) => name,
        }
    }

    /// Kind for `name`, resolving well-known names to their variant
    pub fn custom(name: impl Into<String>) -> LinkKind {
        LinkKind::from(name.into())
    }

    /// Parse a caller-supplied link type; empty input is rejected
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidArgument("link type cannot be empty".to_string()));
        }
        Ok(LinkKind::custom(trimmed))
    }
}

impl From<String> for LinkKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "blocks" => LinkKind::Blocks,
            "blocked_by" => LinkKind::BlockedBy,
            "parent" => LinkKind::Parent,
            "child" => LinkKind::Child,
            "relates_to" => LinkKind::RelatesTo,
            "duplicates" => LinkKind::Duplicates,
            _ => LinkKind::Custom(value),
        }
    }
}

impl From<LinkKind> for String {
    fn from(kind: LinkKind) -> Self {
        match kind {
            LinkKind::Custom(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directed, typed edge stored on the source task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub target_id: TaskId,
    #[serde(rename = "type")]
    pub kind: LinkKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,
}

/// Append-only remark attached to a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub timestamp: DateTime<Utc>,
    pub author: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub status: Status,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub notes: Vec<Note>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub links: Vec<Link>,
    /// Deprecated. Read for compatibility with old records; links replace it.
    #[serde(default, deserialize_with = "nullable_vec")]
    pub dependencies: Vec<TaskId>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub tags: Vec<String>,
}

impl Task {
    pub fn new(
        id: TaskId,
        title: impl Into<String>,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            created: now,
            updated: now,
            status: Status::Backlog,
            title: title.into(),
            description: description.into(),
            notes: Vec::new(),
            links: Vec::new(),
            dependencies: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Tag node named `name`
    pub fn new_label(id: TaskId, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        let mut task = Self::new(id, name, String::new(), now);
        task.status = Status::Label;
        task
    }

    pub fn is_label(&self) -> bool {
        self.status == Status::Label
    }

    /// Bump `updated`, never moving it backwards
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.updated {
            self.updated = now;
        }
    }

    /// Append a link unless the (target, kind) pair is already present.
    /// Returns true when the link was added.
    pub fn add_link(&mut self, target_id: TaskId, kind: LinkKind, label: impl Into<String>) -> bool {
        if self.has_link(target_id, Some(&kind)) {
            return false;
        }
        self.links.push(Link {
            target_id,
            kind,
            label: label.into(),
        });
        true
    }

    /// Remove the first link to `target_id`, restricted to `kind` when given
    pub fn remove_link(&mut self, target_id: TaskId, kind: Option<&LinkKind>) -> Option<Link> {
        let position = self
            .links
            .iter()
            .position(|link| link_matches(link, target_id, kind))?;
        Some(self.links.remove(position))
    }

    pub fn has_link(&self, target_id: TaskId, kind: Option<&LinkKind>) -> bool {
        self.links
            .iter()
            .any(|link| link_matches(link, target_id, kind))
    }

    /// Point every link aimed at `from` at `to` instead, keeping kind and label.
    ///
    /// A rewritten link that would duplicate an existing (to, kind) pair is
    /// dropped. Returns the number of links that referenced `from`.
    pub fn retarget_links(&mut self, from: TaskId, to: TaskId) -> usize {
        let mut rewritten = 0;
        let mut kept: Vec<Link> = Vec::with_capacity(self.links.len());
        for mut link in self.links.drain(..) {
            if link.target_id == from {
                link.target_id = to;
                rewritten += 1;
            }
            let duplicate = kept
                .iter()
                .any(|existing| existing.target_id == link.target_id && existing.kind == link.kind);
            if !duplicate {
                kept.push(link);
            }
        }
        self.links = kept;
        rewritten
    }
}

fn link_matches(link: &Link, target_id: TaskId, kind: Option<&LinkKind>) -> bool {
    link.target_id == target_id && kind.map_or(true, |kind| &link.kind == kind)
}

/// Compact projection of a task used for listing and lookups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: TaskId,
    pub status: Status,
    pub title: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl From<&Task> for IndexEntry {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            status: task.status,
            title: task.title.clone(),
            created: task.created,
            updated: task.updated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    #[serde(default, deserialize_with = "nullable_vec")]
    pub tasks: Vec<IndexEntry>,
    pub updated: DateTime<Utc>,
}

impl Index {
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            tasks: Vec::new(),
            updated: now,
        }
    }

    /// Project `tasks` into entries sorted by id
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>, now: DateTime<Utc>) -> Self {
        let mut entries: Vec<IndexEntry> = tasks.into_iter().map(IndexEntry::from).collect();
        entries.sort_by_key(|entry| entry.id);
        Self {
            tasks: entries,
            updated: now,
        }
    }

    /// Label entry whose title matches `name` case-insensitively
    pub fn find_label(&self, name: &str) -> Option<&IndexEntry> {
        let wanted = name.trim().to_lowercase();
        self.tasks
            .iter()
            .find(|entry| entry.status == Status::Label && entry.title.to_lowercase() == wanted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub next_id: TaskId,
    pub created: DateTime<Utc>,
    pub version: String,
}

impl Manifest {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            next_id: 1,
            created: now,
            version: MANIFEST_VERSION.to_string(),
        }
    }
}

/// Older records carry `null` where a list is expected
fn nullable_vec<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn parse_task_id_accepts_hash_prefix() {
        assert_eq!(parse_task_id("12").unwrap(), 12);
        assert_eq!(parse_task_id("#3").unwrap(), 3);
        assert!(matches!(parse_task_id("0"), Err(Error::InvalidArgument(_))));
        assert!(matches!(parse_task_id("abc"), Err(Error::InvalidArgument(_))));
        assert!(matches!(parse_task_id("-1"), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn reciprocal_table() {
        assert_eq!(LinkKind::Blocks.reciprocal(), LinkKind::BlockedBy);
        assert_eq!(LinkKind::BlockedBy.reciprocal(), LinkKind::Blocks);
        assert_eq!(LinkKind::Parent.reciprocal(), LinkKind::Child);
        assert_eq!(LinkKind::Child.reciprocal(), LinkKind::Parent);
        assert_eq!(LinkKind::RelatesTo.reciprocal(), LinkKind::RelatesTo);
        assert_eq!(LinkKind::Duplicates.reciprocal(), LinkKind::Duplicates);
        let custom = LinkKind::custom("mentions");
        assert_eq!(custom.reciprocal(), custom);
    }

    #[test]
    fn link_kind_parses_known_and_custom_names() {
        assert_eq!(LinkKind::parse("blocked_by").unwrap(), LinkKind::BlockedBy);
        assert_eq!(
            LinkKind::parse("mentions").unwrap(),
            LinkKind::Custom("mentions".to_string())
        );
        assert!(matches!(
            LinkKind::parse("  "),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn custom_constructor_normalizes_known_names() {
        assert_eq!(LinkKind::custom("blocks"), LinkKind::Blocks);
        assert_eq!(LinkKind::custom("relates_to"), LinkKind::RelatesTo);

        let reviews = LinkKind::custom("reviews");
        assert_eq!(reviews, LinkKind::Custom("reviews".to_string()));
        let json = serde_json::to_string(&reviews).unwrap();
        assert_eq!(json, "\"reviews\"");
        assert_eq!(serde_json::from_str::<LinkKind>(&json).unwrap(), reviews);

        let json = serde_json::to_string(&LinkKind::custom("blocked_by")).unwrap();
        assert_eq!(serde_json::from_str::<LinkKind>(&json).unwrap(), LinkKind::BlockedBy);
    }

    #[test]
    fn status_parse_rejects_unknown_values() {
        assert_eq!("Active".parse::<Status>().unwrap(), Status::Active);
        let err = "paused".parse::<Status>().unwrap_err();
        assert!(err.to_string().contains("backlog, next, active"));
    }

    #[test]
    fn add_link_suppresses_duplicate_pairs() {
        let mut task = Task::new(1, "A", "", at(0));
        assert!(task.add_link(2, LinkKind::RelatesTo, ""));
        assert!(!task.add_link(2, LinkKind::RelatesTo, "again"));
        assert!(task.add_link(2, LinkKind::Blocks, ""));
        assert_eq!(task.links.len(), 2);
    }

    #[test]
    fn remove_link_without_kind_removes_first_match_only() {
        let mut task = Task::new(1, "A", "", at(0));
        task.add_link(2, LinkKind::Blocks, "");
        task.add_link(2, LinkKind::RelatesTo, "");

        let removed = task.remove_link(2, None).unwrap();
        assert_eq!(removed.kind, LinkKind::Blocks);
        assert_eq!(task.links.len(), 1);
        assert_eq!(task.links[0].kind, LinkKind::RelatesTo);
        assert!(task.remove_link(3, None).is_none());
    }

    #[test]
    fn retarget_links_rewrites_and_dedupes() {
        let mut task = Task::new(5, "X", "", at(0));
        task.add_link(1, LinkKind::Blocks, "first");
        task.add_link(2, LinkKind::Blocks, "");
        task.add_link(1, LinkKind::RelatesTo, "");

        let rewritten = task.retarget_links(1, 2);
        assert_eq!(rewritten, 2);
        assert_eq!(
            task.links,
            vec![
                Link {
                    target_id: 2,
                    kind: LinkKind::Blocks,
                    label: "first".to_string()
                },
                Link {
                    target_id: 2,
                    kind: LinkKind::RelatesTo,
                    label: String::new()
                },
            ]
        );
    }

    #[test]
    fn touch_never_moves_backwards() {
        let mut task = Task::new(1, "A", "", at(10));
        task.touch(at(5));
        assert_eq!(task.updated, at(10));
        task.touch(at(20));
        assert_eq!(task.updated, at(20));
        assert!(task.updated >= task.created);
    }

    #[test]
    fn empty_label_is_omitted_on_disk() {
        let link = Link {
            target_id: 3,
            kind: LinkKind::Child,
            label: String::new(),
        };
        let json = serde_json::to_value(&link).unwrap();
        assert_eq!(json, serde_json::json!({ "target_id": 3, "type": "child" }));

        let back: Link = serde_json::from_value(json).unwrap();
        assert_eq!(back, link);
    }

    #[test]
    fn legacy_nulls_read_as_empty_lists() {
        let raw = r#"{
            "id": 7,
            "created": "2024-03-01T10:00:00+02:00",
            "updated": "2024-03-01T10:00:00+02:00",
            "status": "label",
            "title": "urgent",
            "description": "",
            "notes": [],
            "links": null,
            "dependencies": null,
            "tags": null
        }"#;
        let task: Task = serde_json::from_str(raw).unwrap();
        assert!(task.is_label());
        assert!(task.links.is_empty());
        assert!(task.dependencies.is_empty());
        assert_eq!(task.created.to_rfc3339(), "2024-03-01T08:00:00+00:00");
    }

    #[test]
    fn index_from_tasks_sorts_by_id() {
        let tasks = vec![
            Task::new(3, "C", "", at(0)),
            Task::new(1, "A", "", at(0)),
            Task::new_label(2, "Urgent", at(0)),
        ];
        let index = Index::from_tasks(&tasks, at(1));
        let ids: Vec<TaskId> = index.tasks.iter().map(|entry| entry.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(index.find_label("urgent").map(|entry| entry.id), Some(2));
        assert!(index.find_label("A").is_none());
    }
}
