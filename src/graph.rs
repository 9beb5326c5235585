//! Graph editing over persisted tasks.
//!
//! Every mutation follows the same shape: read the records it touches, change
//! them in memory, write each changed record atomically, then rebuild the
//! index from a full scan. All referenced tasks are read before the first
//! write, so a missing or corrupt task aborts the operation with nothing
//! committed. The one exception is the inbound-link rewrite in [`TaskGraph::merge`],
//! which skips unreadable bystanders the same way the index rebuild does.
//!
//! There is no cross-process locking. Two commands running at once can
//! interleave writes, and a late index rebuild can overwrite a newer one until
//! the next rebuild heals it.

use chrono::Utc;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::storage::Storage;
use crate::task::{IndexEntry, LinkKind, Note, Status, Task, TaskId};

/// Field changes applied by [`TaskGraph::update`]
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub status: Option<Status>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub note: Option<NoteDraft>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.title.is_none()
            && self.description.is_none()
            && self.note.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct NoteDraft {
    pub author: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct LinkRequest {
    pub source: TaskId,
    pub target: TaskId,
    pub kind: LinkKind,
    pub label: String,
    pub bidirectional: bool,
}

#[derive(Debug, Clone)]
pub struct UnlinkRequest {
    pub source: TaskId,
    pub target: TaskId,
    /// `None` removes the first link to the target of any kind
    pub kind: Option<LinkKind>,
    pub bidirectional: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkOutcome {
    pub source: TaskId,
    pub target: TaskId,
    pub kind: LinkKind,
    /// False when the source already held this (target, kind) pair
    pub added: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reciprocal: Option<ReciprocalOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReciprocalOutcome {
    pub kind: LinkKind,
    pub added: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnlinkOutcome {
    pub source: TaskId,
    pub target: TaskId,
    /// Kind of the link that was actually removed
    pub removed: LinkKind,
    /// Kind removed from the target when mirroring; `None` if nothing matched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reciprocal_removed: Option<LinkKind>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagOutcome {
    pub task: TaskId,
    pub label: TaskId,
    pub name: String,
    pub label_created: bool,
    /// False when the task already carried the tag
    pub tagged: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UntagOutcome {
    pub task: TaskId,
    pub label: TaskId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeOutcome {
    pub source: TaskId,
    pub target: TaskId,
    /// Tasks whose links to the source were pointed at the target
    pub rewritten: Vec<TaskId>,
    pub links_copied: usize,
    pub notes_copied: usize,
}

/// Mutation entry points over a [`Storage`]
#[derive(Debug, Clone)]
pub struct TaskGraph {
    storage: Storage,
}

impl TaskGraph {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Create a backlog task with a freshly allocated id
    pub fn create(&self, title: &str, description: &str) -> Result<Task> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::InvalidArgument("title cannot be empty".to_string()));
        }

        let id = self.storage.allocate_id()?;
        let task = Task::new(id, title, description, Utc::now());
        self.storage.write_task(&task)?;
        self.storage.rebuild_index()?;
        tracing::info!(id, "created task");
        Ok(task)
    }

    /// Apply field changes and optionally append a note
    pub fn update(&self, id: TaskId, changes: TaskUpdate) -> Result<Task> {
        if changes.is_empty() {
            return Err(Error::InvalidArgument("no updates specified".to_string()));
        }

        let mut task = self.storage.read_task(id)?;
        let now = Utc::now();

        if let Some(status) = changes.status {
            task.status = status;
        }
        if let Some(title) = changes.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(Error::InvalidArgument("title cannot be empty".to_string()));
            }
            task.title = title.to_string();
        }
        if let Some(description) = changes.description {
            task.description = description;
        }
        if let Some(note) = changes.note {
            if note.text.trim().is_empty() {
                return Err(Error::InvalidArgument("note cannot be empty".to_string()));
            }
            task.notes.push(Note {
                timestamp: now,
                author: note.author,
                text: note.text,
            });
        }

        task.touch(now);
        self.storage.write_task(&task)?;
        self.storage.rebuild_index()?;
        Ok(task)
    }

    /// Add a typed link, optionally mirrored onto the target.
    ///
    /// A pair the task already holds is left alone and nothing is written.
    pub fn link(&self, request: LinkRequest) -> Result<LinkOutcome> {
        let LinkRequest {
            source,
            target,
            kind,
            label,
            bidirectional,
        } = request;
        if source == target {
            return Err(Error::InvalidArgument(
                "cannot link a task to itself".to_string(),
            ));
        }

        let mut source_task = self.storage.read_task(source)?;
        let mut target_task = self.storage.read_task(target)?;
        let now = Utc::now();

        let added = source_task.add_link(target, kind.clone(), label.clone());
        if added {
            source_task.touch(now);
            self.storage.write_task(&source_task)?;
            self.storage.rebuild_index()?;
        }

        let reciprocal = if bidirectional {
            let reciprocal_kind = kind.reciprocal();
            let mirrored = target_task.add_link(source, reciprocal_kind.clone(), label);
            if mirrored {
                target_task.touch(now);
                self.storage.write_task(&target_task)?;
                self.storage.rebuild_index()?;
            }
            Some(ReciprocalOutcome {
                kind: reciprocal_kind,
                added: mirrored,
            })
        } else {
            None
        };

        tracing::debug!(source, target, kind = %kind, added, "link");
        Ok(LinkOutcome {
            source,
            target,
            kind,
            added,
            reciprocal,
        })
    }

    /// Remove one link from `source` to `target`.
    ///
    /// Only the first match is removed, even when no kind is given and several
    /// links point at the target. A missing mirror link is not an error.
    pub fn unlink(&self, request: UnlinkRequest) -> Result<UnlinkOutcome> {
        let UnlinkRequest {
            source,
            target,
            kind,
            bidirectional,
        } = request;

        let mut source_task = self.storage.read_task(source)?;
        let mut target_task = if bidirectional {
            Some(self.storage.read_task(target)?)
        } else {
            None
        };
        let now = Utc::now();

        let removed = source_task
            .remove_link(target, kind.as_ref())
            .ok_or_else(|| {
                Error::NoMatch(match &kind {
                    Some(kind) => format!("no {kind} link found from task #{source} to #{target}"),
                    None => format!("no link found from task #{source} to #{target}"),
                })
            })?;
        source_task.touch(now);
        self.storage.write_task(&source_task)?;
        self.storage.rebuild_index()?;

        let mut reciprocal_removed = None;
        if let Some(target_task) = target_task.as_mut() {
            let reciprocal_kind = kind.as_ref().map(LinkKind::reciprocal);
            if let Some(link) = target_task.remove_link(source, reciprocal_kind.as_ref()) {
                target_task.touch(now);
                self.storage.write_task(target_task)?;
                self.storage.rebuild_index()?;
                reciprocal_removed = Some(link.kind);
            }
        }

        Ok(UnlinkOutcome {
            source,
            target,
            removed: removed.kind,
            reciprocal_removed,
        })
    }

    /// Label entry for `name`, matched case-insensitively
    pub fn find_label(&self, name: &str) -> Result<Option<IndexEntry>> {
        Ok(self.storage.read_index()?.find_label(name).cloned())
    }

    /// Tag a task by linking it as a `child` of the label task for `name`.
    ///
    /// The label task is created on first use.
    pub fn tag(&self, id: TaskId, name: &str) -> Result<TagOutcome> {
        let name = validate_tag_name(name)?;
        let mut task = self.storage.read_task(id)?;

        let existing = self.find_label(name)?;
        if task.is_label() && existing.as_ref().is_some_and(|label| label.id == id) {
            return Err(Error::InvalidArgument(format!(
                "label #{id} cannot be tagged with itself"
            )));
        }

        let (label, label_created) = match existing {
            Some(entry) => (self.storage.read_task(entry.id)?, false),
            None => (self.create_label(name)?, true),
        };

        if task.has_link(label.id, Some(&LinkKind::Child)) {
            return Ok(TagOutcome {
                task: id,
                label: label.id,
                name: label.title,
                label_created,
                tagged: false,
            });
        }

        task.add_link(label.id, LinkKind::Child, "");
        task.touch(Utc::now());
        self.storage.write_task(&task)?;
        self.storage.rebuild_index()?;

        Ok(TagOutcome {
            task: id,
            label: label.id,
            name: label.title,
            label_created,
            tagged: true,
        })
    }

    /// Remove the `child` link from a task to the label for `name`.
    ///
    /// The label task itself is kept.
    pub fn untag(&self, id: TaskId, name: &str) -> Result<UntagOutcome> {
        let name = validate_tag_name(name)?;
        let mut task = self.storage.read_task(id)?;

        let label = self
            .find_label(name)?
            .ok_or_else(|| Error::NoMatch(format!("label '{name}' not found")))?;

        if task.remove_link(label.id, Some(&LinkKind::Child)).is_none() {
            return Err(Error::NoMatch(format!(
                "task #{id} is not tagged with '{name}'"
            )));
        }

        task.touch(Utc::now());
        self.storage.write_task(&task)?;
        self.storage.rebuild_index()?;

        Ok(UntagOutcome {
            task: id,
            label: label.id,
            name: label.title,
        })
    }

    /// Fold `source` into `target`.
    ///
    /// Links held by other tasks that point at the source are retargeted.
    /// The target absorbs the source's notes and any links it does not already
    /// hold, except links pointing at the target itself: those would become
    /// self-loops and are dropped rather than copied. The source is cancelled
    /// and its description marked, but its own links stay as they were.
    pub fn merge(&self, source: TaskId, target: TaskId) -> Result<MergeOutcome> {
        if source == target {
            return Err(Error::InvalidArgument(
                "source and target cannot be the same task".to_string(),
            ));
        }

        let mut source_task = self.storage.read_task(source)?;
        let mut target_task = self.storage.read_task(target)?;
        let index = self.storage.read_index()?;
        let now = Utc::now();

        let mut rewritten = Vec::new();
        for entry in &index.tasks {
            if entry.id == source || entry.id == target {
                continue;
            }
            let mut task = match self.storage.read_task(entry.id) {
                Ok(task) => task,
                Err(err) => {
                    tracing::warn!(id = entry.id, "merge skipping unreadable task: {err}");
                    continue;
                }
            };
            if task.retarget_links(source, target) > 0 {
                task.touch(now);
                self.storage.write_task(&task)?;
                rewritten.push(task.id);
            }
        }

        let mut links_copied = 0;
        for link in &source_task.links {
            // A link from the source to the target would become a self-loop.
            if link.target_id == target {
                continue;
            }
            if target_task.add_link(link.target_id, link.kind.clone(), link.label.clone()) {
                links_copied += 1;
            }
        }

        let notes_copied = source_task.notes.len();
        target_task.notes.extend(source_task.notes.iter().cloned());
        target_task.touch(now);

        source_task.status = Status::Cancelled;
        source_task.description = merged_description(target, &source_task.description);
        source_task.touch(now);

        self.storage.write_task(&target_task)?;
        self.storage.write_task(&source_task)?;
        self.storage.rebuild_index()?;

        tracing::info!(source, target, rewritten = rewritten.len(), "merged task");
        Ok(MergeOutcome {
            source,
            target,
            rewritten,
            links_copied,
            notes_copied,
        })
    }

    fn create_label(&self, name: &str) -> Result<Task> {
        let id = self.storage.allocate_id()?;
        let label = Task::new_label(id, name, Utc::now());
        self.storage.write_task(&label)?;
        self.storage.rebuild_index()?;
        tracing::debug!(id, name, "created label task");
        Ok(label)
    }
}

fn validate_tag_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidArgument("tag name cannot be empty".to_string()));
    }
    Ok(name)
}

fn merged_description(target: TaskId, description: &str) -> String {
    let marker = format!("[MERGED INTO #{target}]");
    if description.is_empty() {
        marker
    } else {
        format!("{marker} {description}")
    }
}
