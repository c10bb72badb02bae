//! # Scripting Types
//!
//! Handle types for Rhai scripting integration.
//!
//! ## Responsibilities
//! - **ObjectHandle**: Reference to a live stage object, shared with the lifecycle baseline

use crate::lifecycle::Baseline;
use crate::object::StageObject;
use crate::project::Project;
use crate::scene::Stage;
use crate::types::{NodeId, ObjectId};
use crate::errors::EngineError;
use rhai::EvalAltResult;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Handle to a specific object in the live project.
///
/// Carries the object id seen when the handle was made, so a handle to a slot that
/// has since been recycled is detected instead of silently aliasing another object.
#[derive(Clone)]
pub struct ObjectHandle {
    pub live: Arc<Mutex<Project>>,
    pub baseline: Arc<Baseline>,
    pub node: NodeId,
    pub id: ObjectId,
}

impl ObjectHandle {
    /// Resolves the object currently stored in `node`.
    pub fn new(live: Arc<Mutex<Project>>, baseline: Arc<Baseline>, node: NodeId) -> Option<Self> {
        let id = lock_project(&live).stage.get(node)?.id;
        Some(Self {
            live,
            baseline,
            node,
            id,
        })
    }

    /// A handle to another object of the same project.
    pub fn sibling(&self, node: NodeId) -> Option<Self> {
        Self::new(self.live.clone(), self.baseline.clone(), node)
    }

    pub fn lock(&self) -> MutexGuard<'_, Project> {
        lock_project(&self.live)
    }

    pub fn read<R>(&self, f: impl FnOnce(&StageObject) -> R) -> Result<R, Box<EvalAltResult>> {
        let project = self.lock();
        Ok(f(self.resolve(&project.stage)?))
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut StageObject) -> R) -> Result<R, Box<EvalAltResult>> {
        let mut project = self.lock();
        self.resolve(&project.stage)?;
        let obj = project
            .stage
            .get_mut(self.node)
            .ok_or_else(|| stale(self.node))?;
        Ok(f(obj))
    }

    /// Runs a stage-level operation on this object, mapping engine errors into script errors.
    pub fn with_stage<R>(
        &self,
        f: impl FnOnce(&mut Stage, NodeId) -> Result<R, EngineError>,
    ) -> Result<R, Box<EvalAltResult>> {
        let mut project = self.lock();
        self.resolve(&project.stage)?;
        f(&mut project.stage, self.node).map_err(|e| e.to_string().into())
    }

    fn resolve<'a>(&self, stage: &'a Stage) -> Result<&'a StageObject, Box<EvalAltResult>> {
        match stage.get(self.node) {
            Some(obj) if obj.id == self.id => Ok(obj),
            _ => Err(stale(self.node)),
        }
    }
}

fn stale(node: NodeId) -> Box<EvalAltResult> {
    format!("object at node {} no longer exists", node).into()
}

/// Locks the live project. A panic while the lock was held leaves the project usable.
pub fn lock_project(live: &Mutex<Project>) -> MutexGuard<'_, Project> {
    live.lock().unwrap_or_else(PoisonError::into_inner)
}
