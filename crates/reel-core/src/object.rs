//! # Object Model
//!
//! The node type of the scene tree: a leaf `Shape` or a `Symbol` that owns its
//! own timeline.
//!
//! ## State partitions
//! - **`Resettable`**: authored values restored from the initial snapshot on reset.
//! - **`RuntimeFlags`**: per-run flags forced to a fresh-start state on reset.
//! - **`Derived`**: handles and caches owned by the host collaborators. Reset never
//!   touches them.
//!
//! Scripts and the frame structure are authored but sit outside `Resettable`;
//! a reset recurses into children instead of replacing them.

use crate::errors::EngineError;
use crate::timeline::Timeline;
use crate::types::{NodeId, ObjectId, Size, Transform};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// The three points at which a script body can run.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScriptEvent {
    Load,
    Update,
    Click,
}

impl ScriptEvent {
    /// Firing order within a tick.
    pub const ORDER: [ScriptEvent; 3] = [ScriptEvent::Load, ScriptEvent::Update, ScriptEvent::Click];
}

impl fmt::Display for ScriptEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptEvent::Load => write!(f, "onLoad"),
            ScriptEvent::Update => write!(f, "onUpdate"),
            ScriptEvent::Click => write!(f, "onClick"),
        }
    }
}

/// At most one script body per event.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Scripts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_load: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_update: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_click: Option<String>,
}

impl Scripts {
    pub fn get(&self, event: ScriptEvent) -> Option<&str> {
        match event {
            ScriptEvent::Load => self.on_load.as_deref(),
            ScriptEvent::Update => self.on_update.as_deref(),
            ScriptEvent::Click => self.on_click.as_deref(),
        }
    }

    pub fn set(&mut self, event: ScriptEvent, body: impl Into<String>) {
        let slot = match event {
            ScriptEvent::Load => &mut self.on_load,
            ScriptEvent::Update => &mut self.on_update,
            ScriptEvent::Click => &mut self.on_click,
        };
        *slot = Some(body.into());
    }

    pub fn is_empty(&self) -> bool {
        self.on_load.is_none() && self.on_update.is_none() && self.on_click.is_none()
    }
}

/// Font description carried by text shapes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FontData {
    pub family: String,
    pub size: f32,
    #[serde(default)]
    pub fill: Option<String>,
}

/// Fields a reset restores from the initial snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct Resettable {
    pub name: Option<String>,
    pub transform: Transform,
    pub size: Size,
    pub deleted: bool,
    /// Text payload of a shape; always `None` for symbols.
    pub text: Option<String>,
    /// Symbols only: wrap to the first frame after the last one.
    pub looping: bool,
    /// Symbols only: frames per second, `None` inherits the project rate.
    pub frame_rate: Option<f32>,
}

impl Default for Resettable {
    fn default() -> Self {
        Self {
            name: None,
            transform: Transform::default(),
            size: Size::default(),
            deleted: false,
            text: None,
            looping: true,
            frame_rate: None,
        }
    }
}

impl Resettable {
    /// Overwrites every field that differs from `baseline` and returns the names
    /// of the fields that changed.
    pub fn restore_from(&mut self, baseline: &Resettable) -> Vec<&'static str> {
        // Exhaustive: a new field must be handled here.
        let Resettable {
            name,
            transform,
            size,
            deleted,
            text,
            looping,
            frame_rate,
        } = baseline;

        let mut changed = Vec::new();
        restore_field(&mut self.name, name, "name", &mut changed);
        restore_field(&mut self.transform, transform, "transform", &mut changed);
        restore_field(&mut self.size, size, "size", &mut changed);
        restore_field(&mut self.deleted, deleted, "deleted", &mut changed);
        restore_field(&mut self.text, text, "text", &mut changed);
        restore_field(&mut self.looping, looping, "looping", &mut changed);
        restore_field(&mut self.frame_rate, frame_rate, "frame_rate", &mut changed);
        changed
    }
}

fn restore_field<T: PartialEq + Clone>(
    current: &mut T,
    baseline: &T,
    field: &'static str,
    changed: &mut Vec<&'static str>,
) {
    if current != baseline {
        *current = baseline.clone();
        changed.push(field);
    }
}

/// Per-run flags owned by the update walker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuntimeFlags {
    pub is_playing: bool,
    pub just_entered_frame: bool,
    pub on_new_frame: bool,
    pub on_load_script_ran: bool,
    pub hovered_over: bool,
}

impl RuntimeFlags {
    /// The state of an object that has never been ticked.
    pub fn fresh_start() -> Self {
        Self {
            is_playing: true,
            just_entered_frame: true,
            on_new_frame: true,
            on_load_script_ran: false,
            hovered_over: false,
        }
    }
}

impl Default for RuntimeFlags {
    fn default() -> Self {
        Self::fresh_start()
    }
}

/// State owned by the host collaborators and derived caches.
#[derive(Clone, Debug, Default)]
pub struct Derived {
    /// Non-owning back-reference used for coordinates and lookups.
    pub parent: Option<NodeId>,
    pub render_handle: Option<u64>,
    pub audio_handle: Option<u64>,
    pub alpha_mask: Option<Arc<Vec<u8>>>,
    pub image_data: Option<Arc<Vec<u8>>>,
    pub audio_data: Option<Arc<Vec<u8>>>,
    pub script_cache: HashMap<ScriptEvent, Arc<rhai::AST>>,
}

/// Leaf content.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Shape {
    pub font: Option<FontData>,
    pub image_src: Option<String>,
    pub audio_src: Option<String>,
}

/// A container with its own timeline and playhead.
#[derive(Clone, Debug)]
pub struct Symbol {
    pub timeline: Timeline,
    /// 1-based playhead position.
    pub playhead: u32,
    /// Playhead observed on the previous tick; `None` before the first one.
    pub last_seen_playhead: Option<u32>,
    /// Skip the automatic advance on the next tick.
    pub hold_playhead: bool,
    /// Fractional frames owed when the symbol runs at its own rate.
    pub rate_accumulator: f32,
}

impl Symbol {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            timeline,
            playhead: 1,
            last_seen_playhead: None,
            hold_playhead: true,
            rate_accumulator: 0.0,
        }
    }

    pub fn frame_count(&self) -> u32 {
        self.timeline.frame_count()
    }

    /// Returns the playhead to frame 1 as if the symbol was just loaded.
    pub fn rewind(&mut self) {
        self.playhead = 1;
        self.last_seen_playhead = None;
        self.hold_playhead = true;
        self.rate_accumulator = 0.0;
    }

    /// Moves the playhead to `frame`, clamped to the timeline, and holds it there
    /// for the next tick.
    pub fn jump_to(&mut self, frame: u32) {
        let last = self.frame_count().max(1);
        self.playhead = frame.clamp(1, last);
        self.hold_playhead = true;
    }
}

#[derive(Clone, Debug)]
pub enum ObjectKind {
    Shape(Shape),
    Symbol(Symbol),
}

impl ObjectKind {
    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::Shape(_) => "shape",
            ObjectKind::Symbol(_) => "symbol",
        }
    }
}

/// A drawable, scriptable entity in the stage arena.
#[derive(Clone, Debug)]
pub struct StageObject {
    pub id: ObjectId,
    /// Stable across copies; correlates an object with its initial snapshot.
    pub uid: Uuid,
    pub is_clone: bool,
    pub state: Resettable,
    pub flags: RuntimeFlags,
    pub scripts: Scripts,
    pub kind: ObjectKind,
    pub derived: Derived,
}

impl StageObject {
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            id: ObjectId::next(),
            uid: Uuid::new_v4(),
            is_clone: false,
            state: Resettable::default(),
            flags: RuntimeFlags::fresh_start(),
            scripts: Scripts::default(),
            kind,
            derived: Derived::default(),
        }
    }

    pub fn shape(name: &str) -> Self {
        let mut obj = Self::new(ObjectKind::Shape(Shape::default()));
        obj.state.name = Some(name.to_string());
        obj
    }

    pub fn symbol(name: &str, timeline: Timeline) -> Self {
        let mut obj = Self::new(ObjectKind::Symbol(Symbol::new(timeline)));
        obj.state.name = Some(name.to_string());
        obj
    }

    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.state.transform.x = x;
        self.state.transform.y = y;
        self
    }

    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.state.size = Size { width, height };
        self
    }

    pub fn with_script(mut self, event: ScriptEvent, body: &str) -> Self {
        self.scripts.set(event, body);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.state.name.as_deref()
    }

    pub fn is_clone(&self) -> bool {
        self.is_clone
    }

    pub fn is_deleted(&self) -> bool {
        self.state.deleted
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self.kind, ObjectKind::Symbol(_))
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.derived.parent
    }

    pub fn as_symbol(&self) -> Result<&Symbol, EngineError> {
        match &self.kind {
            ObjectKind::Symbol(symbol) => Ok(symbol),
            other => Err(EngineError::InvalidKind {
                expected: "symbol",
                found: other.name(),
            }),
        }
    }

    pub fn as_symbol_mut(&mut self) -> Result<&mut Symbol, EngineError> {
        match &mut self.kind {
            ObjectKind::Symbol(symbol) => Ok(symbol),
            other => Err(EngineError::InvalidKind {
                expected: "symbol",
                found: other.name(),
            }),
        }
    }

    /// Copies this object's own fields under a fresh `ObjectId`.
    ///
    /// The universal id is kept. Host-owned state is not carried over, and a
    /// symbol's frames are left for the stage to re-populate with copied children.
    pub fn duplicate(&self) -> Self {
        Self {
            id: ObjectId::next(),
            uid: self.uid,
            is_clone: self.is_clone,
            state: self.state.clone(),
            flags: self.flags,
            scripts: self.scripts.clone(),
            kind: self.kind.clone(),
            derived: Derived::default(),
        }
    }

    /// Forces the runtime flags and playhead into the fresh-start state.
    pub fn restart(&mut self) {
        self.flags = RuntimeFlags::fresh_start();
        if let ObjectKind::Symbol(symbol) = &mut self.kind {
            symbol.rewind();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_reports_only_differing_fields() {
        let baseline = Resettable::default();
        let mut current = Resettable::default();
        current.transform.x = 5.0;
        current.deleted = true;

        let changed = current.restore_from(&baseline);
        assert_eq!(changed, vec!["transform", "deleted"]);
        assert_eq!(current, baseline);
        assert!(current.restore_from(&baseline).is_empty());
    }

    #[test]
    fn duplicate_keeps_uid_and_drops_host_state() {
        let mut obj = StageObject::shape("ball");
        obj.derived.render_handle = Some(7);
        obj.derived.parent = Some(3);

        let copy = obj.duplicate();
        assert_eq!(copy.uid, obj.uid);
        assert_ne!(copy.id, obj.id);
        assert_eq!(copy.derived.render_handle, None);
        assert_eq!(copy.derived.parent, None);
        assert_eq!(copy.name(), Some("ball"));
    }

    #[test]
    fn shape_is_not_a_symbol() {
        let mut obj = StageObject::shape("box");
        let err = obj.as_symbol_mut().unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidKind {
                expected: "symbol",
                found: "shape"
            }
        ));
    }

    #[test]
    fn scripts_lookup_by_event() {
        let obj = StageObject::shape("s").with_script(ScriptEvent::Click, "obj.x = 1.0;");
        assert_eq!(obj.scripts.get(ScriptEvent::Click), Some("obj.x = 1.0;"));
        assert_eq!(obj.scripts.get(ScriptEvent::Load), None);
        assert!(!obj.scripts.is_empty());
    }
}
