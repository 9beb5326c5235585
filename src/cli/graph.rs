//! Graph editing commands: link, unlink, tag, untag, merge.

use crate::error::Result;
use crate::graph::{LinkRequest, UnlinkRequest};
use crate::output::{emit_success, Rendered};
use crate::task::{LinkKind, TaskId};

use super::{load_context, GlobalOptions};

pub struct LinkOptions {
    pub source: TaskId,
    pub target: TaskId,
    pub kind: String,
    pub label: String,
    pub bidirectional: bool,
}

pub struct UnlinkOptions {
    pub source: TaskId,
    pub target: TaskId,
    pub kind: Option<String>,
    pub bidirectional: bool,
}

pub fn run_link(globals: &GlobalOptions, options: LinkOptions) -> Result<()> {
    let ctx = load_context(globals.root.as_ref())?;
    let kind = LinkKind::parse(&options.kind)?;
    let outcome = ctx.graph.link(LinkRequest {
        source: options.source,
        target: options.target,
        kind,
        label: options.label,
        bidirectional: options.bidirectional,
    })?;

    let mut lines = vec![if outcome.added {
        format!(
            "Linked task #{} to #{} ({})",
            outcome.source, outcome.target, outcome.kind
        )
    } else {
        format!(
            "Task #{} already linked to #{} ({})",
            outcome.source, outcome.target, outcome.kind
        )
    }];
    if let Some(reciprocal) = &outcome.reciprocal {
        lines.push(if reciprocal.added {
            format!(
                "Created reciprocal link: task #{} to #{} ({})",
                outcome.target, outcome.source, reciprocal.kind
            )
        } else {
            format!(
                "Reciprocal link already present: task #{} to #{} ({})",
                outcome.target, outcome.source, reciprocal.kind
            )
        });
    }

    emit_success(globals.output(), "link", &outcome, &Rendered::lines(lines))
}

pub fn run_unlink(globals: &GlobalOptions, options: UnlinkOptions) -> Result<()> {
    let ctx = load_context(globals.root.as_ref())?;
    let kind = options.kind.as_deref().map(LinkKind::parse).transpose()?;
    let outcome = ctx.graph.unlink(UnlinkRequest {
        source: options.source,
        target: options.target,
        kind,
        bidirectional: options.bidirectional,
    })?;

    let mut lines = vec![format!(
        "Removed link ({}) from task #{} to #{}",
        outcome.removed, outcome.source, outcome.target
    )];
    match &outcome.reciprocal_removed {
        Some(reciprocal) => lines.push(format!(
            "Removed reciprocal link ({}) from task #{} to #{}",
            reciprocal, outcome.target, outcome.source
        )),
        None if options.bidirectional => lines.push(format!(
            "No reciprocal link found on task #{}",
            outcome.target
        )),
        None => {}
    }

    emit_success(globals.output(), "unlink", &outcome, &Rendered::lines(lines))
}

pub fn run_tag(globals: &GlobalOptions, id: TaskId, name: &str) -> Result<()> {
    let ctx = load_context(globals.root.as_ref())?;
    let outcome = ctx.graph.tag(id, name)?;

    let message = if outcome.tagged {
        format!(
            "Tagged task #{} with '{}' (label task #{})",
            outcome.task, outcome.name, outcome.label
        )
    } else {
        format!("Task #{} already tagged with '{}'", outcome.task, outcome.name)
    };

    emit_success(globals.output(), "tag", &outcome, &Rendered::text(message))
}

pub fn run_untag(globals: &GlobalOptions, id: TaskId, name: &str) -> Result<()> {
    let ctx = load_context(globals.root.as_ref())?;
    let outcome = ctx.graph.untag(id, name)?;

    let message = format!("Removed tag '{}' from task #{}", outcome.name, outcome.task);
    emit_success(globals.output(), "untag", &outcome, &Rendered::text(message))
}

pub fn run_merge(globals: &GlobalOptions, source: TaskId, target: TaskId) -> Result<()> {
    let ctx = load_context(globals.root.as_ref())?;
    let outcome = ctx.graph.merge(source, target)?;

    let rendered = Rendered::lines([
        format!("Merged task #{} into #{}", outcome.source, outcome.target),
        format!(
            "Updated {} task(s) that referenced #{}",
            outcome.rewritten.len(),
            outcome.source
        ),
        format!(
            "Copied {} link(s) and {} note(s)",
            outcome.links_copied, outcome.notes_copied
        ),
        format!("Source task #{} marked as cancelled", outcome.source),
    ]);

    emit_success(globals.output(), "merge", &outcome, &rendered)
}
