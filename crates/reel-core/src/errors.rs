use crate::object::ScriptEvent;
use crate::types::{NodeId, ObjectId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Malformed project: {0}")]
    MalformedProject(String),
    #[error("Renderer unavailable: {0}")]
    RendererUnavailable(String),
    #[error("No project is running")]
    NotRunning,
    #[error("Unknown object at node {0}")]
    UnknownObject(NodeId),
    #[error("Invalid object kind: expected {expected}, found {found}")]
    InvalidKind {
        expected: &'static str,
        found: &'static str,
    },
    #[error("Frame snapshot error: {0}")]
    Snapshot(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// A script hook that raised while running.
///
/// Faults are recovered at the object boundary: they are logged and collected
/// into the tick report, and the walker moves on to the next object.
#[derive(Clone, Debug, PartialEq)]
pub struct ScriptFault {
    pub object: ObjectId,
    pub node: NodeId,
    pub event: ScriptEvent,
    pub message: String,
}

impl std::fmt::Display for ScriptFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} hook of object {} faulted: {}",
            self.event, self.object, self.message
        )
    }
}
