//! # Document Module
//!
//! The JSON project format and its conversion to and from the stage arena.
//!
//! ## Responsibilities
//! - **Parsing**: `parse_document` decodes and validates a project document.
//! - **Building**: `instantiate` turns an object document into arena objects.
//! - **Export**: `export_object` serializes a live subtree back into documents.
//! - **Sources**: `ProjectSource` resolves a path to document text.

use crate::errors::EngineError;
use crate::object::{FontData, ObjectKind, Resettable, Scripts, Shape, StageObject, Symbol};
use crate::scene::Stage;
use crate::timeline::{Frame, Timeline, MAX_TIMELINE_LENGTH};
use crate::tween::Tween;
use crate::types::{NodeId, ObjectId, Size, Transform};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{instrument, warn};
use uuid::Uuid;

/// Deepest nesting accepted in a document.
pub const MAX_DEPTH: usize = 24;

fn default_true() -> bool {
    true
}

fn default_frame_length() -> u32 {
    1
}

fn default_frame_rate() -> f32 {
    12.0
}

fn default_width() -> u32 {
    720
}

fn default_height() -> u32 {
    480
}

/// A whole project as stored on disk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDocument {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<ObjectDocument>,
}

/// One object and, for symbols, its whole subtree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDocument {
    /// Object id, only present in frame snapshots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub size: Size,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub is_clone: bool,
    #[serde(default, skip_serializing_if = "Scripts::is_empty")]
    pub scripts: Scripts,
    #[serde(flatten)]
    pub kind: KindDocument,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KindDocument {
    Shape(ShapeDocument),
    Symbol(SymbolDocument),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<FontData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_src: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolDocument {
    #[serde(default)]
    pub frames: Vec<FrameDocument>,
    #[serde(default = "default_true")]
    pub looping: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<f32>,
    #[serde(default = "default_true")]
    pub is_playing: bool,
}

impl Default for SymbolDocument {
    fn default() -> Self {
        Self {
            frames: Vec::new(),
            looping: true,
            frame_rate: None,
            is_playing: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameDocument {
    #[serde(default = "default_frame_length")]
    pub length: u32,
    #[serde(default)]
    pub objects: Vec<ObjectDocument>,
    #[serde(default)]
    pub tweens: Vec<Tween>,
}

impl ObjectDocument {
    pub fn children(&self) -> impl Iterator<Item = &ObjectDocument> {
        let frames: &[FrameDocument] = match &self.kind {
            KindDocument::Symbol(symbol) => &symbol.frames,
            KindDocument::Shape(_) => &[],
        };
        frames.iter().flat_map(|f| f.objects.iter())
    }

    fn children_mut(&mut self) -> impl Iterator<Item = &mut ObjectDocument> {
        let frames: &mut [FrameDocument] = match &mut self.kind {
            KindDocument::Symbol(symbol) => &mut symbol.frames,
            KindDocument::Shape(_) => &mut [],
        };
        frames.iter_mut().flat_map(|f| f.objects.iter_mut())
    }
}

/// Decodes and validates a project document.
///
/// Objects without a universal id get one here, so every project built from the
/// returned document agrees on them.
#[instrument(level = "debug", skip(json), fields(bytes = json.len()))]
pub fn parse_document(json: &str) -> Result<ProjectDocument, EngineError> {
    let mut doc: ProjectDocument =
        serde_json::from_str(json).map_err(|e| EngineError::MalformedProject(e.to_string()))?;
    validate(&doc)?;
    if let Some(root) = doc.root.as_mut() {
        assign_uids(root);
    }
    Ok(doc)
}

fn validate(doc: &ProjectDocument) -> Result<(), EngineError> {
    if !doc.frame_rate.is_finite() || doc.frame_rate <= 0.0 {
        return Err(EngineError::MalformedProject(format!(
            "frame rate must be positive, got {}",
            doc.frame_rate
        )));
    }
    let root = doc
        .root
        .as_ref()
        .ok_or_else(|| EngineError::MalformedProject("missing root object".into()))?;
    if !matches!(root.kind, KindDocument::Symbol(_)) {
        return Err(EngineError::MalformedProject("root object must be a symbol".into()));
    }
    let mut seen = HashSet::new();
    validate_object(root, 0, &mut seen)
}

fn validate_object(
    obj: &ObjectDocument,
    depth: usize,
    seen: &mut HashSet<Uuid>,
) -> Result<(), EngineError> {
    if depth > MAX_DEPTH {
        return Err(EngineError::MalformedProject(format!(
            "objects nested deeper than {MAX_DEPTH} levels"
        )));
    }
    // clones share the universal id of their source
    if let Some(uid) = obj.uuid.filter(|_| !obj.is_clone) {
        if !seen.insert(uid) {
            return Err(EngineError::MalformedProject(format!(
                "object {uid} appears more than once"
            )));
        }
    }
    if let KindDocument::Symbol(symbol) = &obj.kind {
        if let Some(rate) = symbol.frame_rate {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(EngineError::MalformedProject(format!(
                    "symbol frame rate must be positive, got {rate}"
                )));
            }
        }
        let total = symbol
            .frames
            .iter()
            .try_fold(0u32, |total, frame| total.checked_add(frame.length))
            .filter(|&total| total <= MAX_TIMELINE_LENGTH);
        if total.is_none() {
            return Err(EngineError::MalformedProject(format!(
                "timeline of {} is longer than {MAX_TIMELINE_LENGTH} frames",
                obj.name.as_deref().unwrap_or("<unnamed>")
            )));
        }
        for (idx, frame) in symbol.frames.iter().enumerate() {
            if frame.length == 0 {
                return Err(EngineError::MalformedProject(format!(
                    "frame {} of {} has zero length",
                    idx + 1,
                    obj.name.as_deref().unwrap_or("<unnamed>")
                )));
            }
            for tween in &frame.tweens {
                let targeted = frame.objects.iter().any(|o| o.uuid == Some(tween.target));
                if !targeted {
                    warn!(target_uid = %tween.target, frame = idx + 1, "tween targets no object in its frame");
                }
            }
        }
    }
    for child in obj.children() {
        validate_object(child, depth + 1, seen)?;
    }
    Ok(())
}

fn assign_uids(obj: &mut ObjectDocument) {
    if obj.uuid.is_none() {
        obj.uuid = Some(Uuid::new_v4());
    }
    for child in obj.children_mut() {
        assign_uids(child);
    }
}

/// How object ids are chosen when building from a document.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IdPolicy {
    /// Every object gets a new id.
    Fresh,
    /// Ids stored in the document are kept; missing ones are allocated.
    Preserve,
}

/// Builds a single object with empty frames. Children are added by `populate`.
pub(crate) fn build_object(doc: &ObjectDocument, policy: IdPolicy) -> StageObject {
    let (kind, text, looping, frame_rate, is_playing) = match &doc.kind {
        KindDocument::Shape(shape) => (
            ObjectKind::Shape(Shape {
                font: shape.font.clone(),
                image_src: shape.image_src.clone(),
                audio_src: shape.audio_src.clone(),
            }),
            shape.text.clone(),
            true,
            None,
            true,
        ),
        KindDocument::Symbol(symbol) => {
            let frames = symbol
                .frames
                .iter()
                .map(|f| Frame {
                    length: f.length,
                    objects: Vec::new(),
                    tweens: f.tweens.clone(),
                })
                .collect();
            (
                ObjectKind::Symbol(Symbol::new(Timeline::from_frames(frames))),
                None,
                symbol.looping,
                symbol.frame_rate,
                symbol.is_playing,
            )
        }
    };

    let mut obj = StageObject::new(kind);
    if policy == IdPolicy::Preserve {
        if let Some(id) = doc.id {
            obj.id = ObjectId(id);
        }
    }
    if let Some(uid) = doc.uuid {
        obj.uid = uid;
    }
    obj.is_clone = doc.is_clone;
    obj.scripts = doc.scripts.clone();
    obj.state = Resettable {
        name: doc.name.clone(),
        transform: doc.transform,
        size: doc.size,
        deleted: doc.deleted,
        text,
        looping,
        frame_rate,
    };
    obj.flags.is_playing = is_playing;
    obj
}

/// Instantiates the children of `doc` under `node`, frame by frame.
pub(crate) fn populate(
    stage: &mut Stage,
    node: NodeId,
    doc: &ObjectDocument,
    policy: IdPolicy,
) -> Result<(), EngineError> {
    let KindDocument::Symbol(symbol) = &doc.kind else {
        return Ok(());
    };
    for (frame_idx, frame) in symbol.frames.iter().enumerate() {
        for child_doc in &frame.objects {
            let child = instantiate(stage, child_doc, policy)?;
            stage.object_mut(child)?.derived.parent = Some(node);
            let sym = stage.object_mut(node)?.as_symbol_mut()?;
            if let Some(slot) = sym.timeline.frames_mut().get_mut(frame_idx) {
                slot.objects.push(child);
            }
        }
    }
    Ok(())
}

/// Adds `doc` and its subtree to the arena as a detached object.
pub fn instantiate(stage: &mut Stage, doc: &ObjectDocument, policy: IdPolicy) -> Result<NodeId, EngineError> {
    let node = stage.add_object(build_object(doc, policy));
    populate(stage, node, doc, policy)?;
    Ok(node)
}

/// Serializes the live state of `node` and its subtree.
pub fn export_object(stage: &Stage, node: NodeId) -> Result<ObjectDocument, EngineError> {
    let obj = stage.object(node)?;
    let kind = match &obj.kind {
        ObjectKind::Shape(shape) => KindDocument::Shape(ShapeDocument {
            text: obj.state.text.clone(),
            font: shape.font.clone(),
            image_src: shape.image_src.clone(),
            audio_src: shape.audio_src.clone(),
        }),
        ObjectKind::Symbol(symbol) => {
            let frames = symbol
                .timeline
                .frames()
                .iter()
                .map(|f| {
                    Ok(FrameDocument {
                        length: f.length,
                        objects: f
                            .objects
                            .iter()
                            .map(|&child| export_object(stage, child))
                            .collect::<Result<Vec<_>, EngineError>>()?,
                        tweens: f.tweens.clone(),
                    })
                })
                .collect::<Result<Vec<_>, EngineError>>()?;
            KindDocument::Symbol(SymbolDocument {
                frames,
                looping: obj.state.looping,
                frame_rate: obj.state.frame_rate,
                is_playing: obj.flags.is_playing,
            })
        }
    };
    Ok(ObjectDocument {
        id: Some(obj.id.0),
        uuid: Some(obj.uid),
        name: obj.state.name.clone(),
        transform: obj.state.transform,
        size: obj.state.size,
        deleted: obj.state.deleted,
        is_clone: obj.is_clone,
        scripts: obj.scripts.clone(),
        kind,
    })
}

/// Resolves a project path to its document text.
pub trait ProjectSource: Send + Sync {
    fn load_document(&self, path: &str) -> Result<String>;
}

/// Reads documents from the local filesystem.
pub struct FsProjectSource;

impl ProjectSource for FsProjectSource {
    #[instrument(level = "debug", skip(self), fields(path = path))]
    fn load_document(&self, path: &str) -> Result<String> {
        if let Ok(text) = std::fs::read_to_string(path) {
            return Ok(text);
        }
        // Fallback to projects/
        let alt = format!("projects/{}", path);
        std::fs::read_to_string(&alt).map_err(|e| {
            warn!("Failed to load project document '{}' (and '{}'): {}", path, alt, e);
            anyhow::anyhow!("Failed to load project document: {}", path)
        })
    }
}
