//! # Session
//!
//! One run of a project: the live tree, its frozen baseline and the script engine.
//! Every operation goes through a session, so several runs can coexist in one
//! process without sharing state.

use crate::config::PlayerConfig;
use crate::errors::EngineError;
use crate::lifecycle::{self, Baseline, ResetOutcome};
use crate::project::{load_project_pair, Project};
use crate::scripting::types::lock_project;
use crate::scripting::{ObjectHandle, ScriptHost};
use crate::systems::walker::{self, TickInput, TickReport};
use crate::types::NodeId;
use std::sync::{Arc, Mutex, MutexGuard};

pub struct Session {
    live: Arc<Mutex<Project>>,
    baseline: Arc<Baseline>,
    scripts: ScriptHost,
    ticks: u64,
}

impl Session {
    pub fn new(live: Project, baseline: Project, max_script_operations: u64) -> Self {
        Self {
            live: Arc::new(Mutex::new(live)),
            baseline: Arc::new(Baseline::new(baseline)),
            scripts: ScriptHost::new(max_script_operations),
            ticks: 0,
        }
    }

    /// Parses `json` into a live project and its baseline.
    pub fn load(json: &str, config: &PlayerConfig) -> Result<Self, EngineError> {
        let (mut live, baseline) = load_project_pair(json)?;
        live.settings.fit_screen = config.fit_screen;
        Ok(Self::new(live, baseline, config.max_script_operations))
    }

    pub fn project(&self) -> MutexGuard<'_, Project> {
        lock_project(&self.live)
    }

    pub fn shared_project(&self) -> Arc<Mutex<Project>> {
        self.live.clone()
    }

    pub fn baseline(&self) -> &Arc<Baseline> {
        &self.baseline
    }

    pub fn scripts(&self) -> &ScriptHost {
        &self.scripts
    }

    /// Number of ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn tick(&mut self, input: &TickInput) -> TickReport {
        self.ticks += 1;
        walker::walk(&self.live, &self.baseline, &self.scripts, self.ticks, input)
    }

    pub fn root(&self) -> NodeId {
        self.project().stage.root()
    }

    /// First object named `name`, searching the whole tree in arena order.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.project()
            .stage
            .iter()
            .find(|(_, o)| o.name() == Some(name))
            .map(|(id, _)| id)
    }

    pub fn handle(&self, node: NodeId) -> Option<ObjectHandle> {
        ObjectHandle::new(self.live.clone(), self.baseline.clone(), node)
    }

    pub fn active_objects(&self) -> Vec<NodeId> {
        self.project().stage.active_objects()
    }

    pub fn clone_object(&self, node: NodeId) -> Result<NodeId, EngineError> {
        lifecycle::clone_object(&mut self.project().stage, node)
    }

    pub fn delete_object(&self, node: NodeId) -> Result<bool, EngineError> {
        lifecycle::soft_delete(&mut self.project().stage, node)
    }

    pub fn reset_object(&self, node: NodeId) -> Result<ResetOutcome, EngineError> {
        lifecycle::reset_object(&mut self.project().stage, &self.baseline, node)
    }

    /// Returns the whole project to its initial state without reloading it.
    pub fn restart(&self) -> Result<ResetOutcome, EngineError> {
        let mut project = self.project();
        let root = project.stage.root();
        lifecycle::reset_object(&mut project.stage, &self.baseline, root)
    }
}
