//! # Project Module
//!
//! A running project: its settings and the stage arena holding the object tree.

use crate::document::{self, IdPolicy, ProjectDocument};
use crate::errors::EngineError;
use crate::scene::Stage;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Settings handed to the renderer on setup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectSettings {
    pub name: String,
    pub frame_rate: f32,
    pub width: u32,
    pub height: u32,
    /// Scale the canvas to the host window.
    pub fit_screen: bool,
}

#[derive(Clone, Debug)]
pub struct Project {
    pub settings: ProjectSettings,
    pub stage: Stage,
}

impl Project {
    /// Builds a project from an already validated document, allocating fresh ids.
    pub fn from_document(doc: &ProjectDocument) -> Result<Self, EngineError> {
        let root_doc = doc
            .root
            .as_ref()
            .ok_or_else(|| EngineError::MalformedProject("missing root object".into()))?;
        let mut stage = Stage::new(document::build_object(root_doc, IdPolicy::Fresh));
        let root = stage.root();
        stage.object(root)?.as_symbol()?;
        document::populate(&mut stage, root, root_doc, IdPolicy::Fresh)?;
        Ok(Self {
            settings: ProjectSettings {
                name: doc.name.clone(),
                frame_rate: doc.frame_rate,
                width: doc.width,
                height: doc.height,
                fit_screen: true,
            },
            stage,
        })
    }

    /// Parses and builds a single project.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Self::from_document(&document::parse_document(json)?)
    }

    /// Exports the live tree.
    pub fn to_document(&self) -> Result<ProjectDocument, EngineError> {
        Ok(ProjectDocument {
            name: self.settings.name.clone(),
            frame_rate: self.settings.frame_rate,
            width: self.settings.width,
            height: self.settings.height,
            root: Some(document::export_object(&self.stage, self.stage.root())?),
        })
    }

    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(&self.to_document()?)?)
    }
}

/// Builds the live project and its frozen initial-state copy from one document.
///
/// Both are built from the same parsed document, so universal ids correlate.
#[instrument(level = "debug", skip(json))]
pub fn load_project_pair(json: &str) -> Result<(Project, Project), EngineError> {
    let doc = document::parse_document(json)?;
    let live = Project::from_document(&doc)?;
    let baseline = Project::from_document(&doc)?;
    info!(
        name = %live.settings.name,
        objects = live.stage.len(),
        frame_rate = live.settings.frame_rate,
        "project loaded"
    );
    Ok((live, baseline))
}
