//! # Lifecycle Manager
//!
//! Clone, soft-delete and reset-to-initial over the live stage.
//!
//! The baseline is the frozen project built from the same document as the live
//! one. It is shared read-only and only ever used for lookups by universal id.

use crate::errors::EngineError;
use crate::object::StageObject;
use crate::project::Project;
use crate::scene::Stage;
use crate::types::NodeId;
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

/// The frozen initial state of a project, indexed by universal id.
#[derive(Debug)]
pub struct Baseline {
    project: Project,
    by_uid: HashMap<Uuid, NodeId>,
}

impl Baseline {
    pub fn new(project: Project) -> Self {
        let by_uid = project
            .stage
            .iter()
            .filter(|(_, o)| !o.is_clone())
            .map(|(id, o)| (o.uid, id))
            .collect();
        Self { project, by_uid }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// The initial state of the object with universal id `uid`.
    pub fn counterpart(&self, uid: Uuid) -> Option<&StageObject> {
        self.by_uid.get(&uid).and_then(|&id| self.project.stage.get(id))
    }
}

/// Result of a reset request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResetOutcome {
    /// Restored in place. `changed` lists the authored fields that differed.
    Reset { changed: Vec<&'static str> },
    /// The object was a clone and has been detached and destroyed.
    Discarded,
    /// No baseline counterpart; nothing happened.
    NoBaseline,
}

impl ResetOutcome {
    pub fn changed(&self) -> &[&'static str] {
        match self {
            ResetOutcome::Reset { changed } => changed,
            _ => &[],
        }
    }
}

/// Clones `source` into the current frame of its own parent.
pub fn clone_object(stage: &mut Stage, source: NodeId) -> Result<NodeId, EngineError> {
    let parent = stage.object(source)?.parent().unwrap_or(stage.root());
    clone_into(stage, source, parent)
}

/// Deep-copies `source`, marks the copy and its subtree as clones, attaches it to
/// the current frame of `parent` and queues it for the renderer.
pub fn clone_into(stage: &mut Stage, source: NodeId, parent: NodeId) -> Result<NodeId, EngineError> {
    stage.object(parent)?.as_symbol()?;
    let copy = stage.copy_subtree(source)?;

    let mut stack = vec![copy];
    while let Some(id) = stack.pop() {
        let obj = stage.object_mut(id)?;
        obj.is_clone = true;
        obj.restart();
        stack.extend(stage.all_children(id));
    }

    stage.attach_to_current_frame(parent, copy)?;
    stage.request_refresh(copy);
    debug!(source, clone = copy, parent, "cloned object");
    Ok(copy)
}

/// Marks `node` deleted. It stays in the tree and reachable by navigation but leaves
/// the active subtree. Returns whether the flag changed.
pub fn soft_delete(stage: &mut Stage, node: NodeId) -> Result<bool, EngineError> {
    if node == stage.root() {
        warn!("ignoring delete of the root object");
        return Ok(false);
    }
    let obj = stage.object_mut(node)?;
    if obj.state.deleted {
        return Ok(false);
    }
    obj.state.deleted = true;
    obj.flags.hovered_over = false;
    debug!(node, object = %obj.id, "soft-deleted object");
    Ok(true)
}

/// Returns `node` and its subtree to the initial state.
///
/// Clones are detached and destroyed. Objects without a baseline counterpart are
/// left untouched. Children are reset across every frame, not only the current one.
pub fn reset_object(stage: &mut Stage, baseline: &Baseline, node: NodeId) -> Result<ResetOutcome, EngineError> {
    let outcome = reset_single(stage, baseline, node)?;
    if !matches!(outcome, ResetOutcome::Reset { .. }) {
        return Ok(outcome);
    }

    let mut stack = stage.all_children(node);
    while let Some(child) = stack.pop() {
        if let ResetOutcome::Reset { .. } = reset_single(stage, baseline, child)? {
            stack.extend(stage.all_children(child));
        }
    }
    Ok(outcome)
}

fn reset_single(stage: &mut Stage, baseline: &Baseline, node: NodeId) -> Result<ResetOutcome, EngineError> {
    let obj = stage.object(node)?;
    if obj.is_clone() {
        let id = obj.id;
        stage.destroy_object(node);
        debug!(node, object = %id, "discarded clone on reset");
        return Ok(ResetOutcome::Discarded);
    }
    let Some(initial) = baseline.counterpart(obj.uid) else {
        debug!(node, object = %obj.id, "no baseline counterpart, reset skipped");
        return Ok(ResetOutcome::NoBaseline);
    };

    let obj = stage.object_mut(node)?;
    let changed = obj.state.restore_from(&initial.state);
    obj.restart();
    if !changed.is_empty() {
        debug!(node, object = %obj.id, ?changed, "reset restored fields");
    }
    Ok(ResetOutcome::Reset { changed })
}
