//! # Stage
//!
//! Arena holding every object of a project. Symbols reference their children by
//! `NodeId` through their frames; children point back at their parent with a
//! non-owning `NodeId`.

use crate::document::{self, IdPolicy};
use crate::errors::EngineError;
use crate::object::{ObjectKind, StageObject};
use crate::timeline::{Frame, FrameSnapshot};
use crate::types::{NodeId, ObjectId, Point, Rect};
use tracing::debug;
use uuid::Uuid;

/// Offset and scale mapping a parent's local coordinates to stage coordinates.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Placement {
    pub origin: Point,
    pub scale_x: f32,
    pub scale_y: f32,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            origin: Point::default(),
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

impl Placement {
    pub fn apply(&self, local: Point) -> Point {
        Point::new(
            self.origin.x + local.x * self.scale_x,
            self.origin.y + local.y * self.scale_y,
        )
    }
}

/// The scene arena. Slots of destroyed objects are recycled.
#[derive(Clone, Debug)]
pub struct Stage {
    nodes: Vec<Option<StageObject>>,
    free_indices: Vec<NodeId>,
    root: NodeId,
    /// Objects created at runtime that the renderer has not been told about yet.
    pending_refresh: Vec<NodeId>,
}

impl Stage {
    /// Creates a stage whose root is `root`.
    pub fn new(root: StageObject) -> Self {
        Self {
            nodes: vec![Some(root)],
            free_indices: Vec::new(),
            root: 0,
            pending_refresh: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Adds a detached object and returns its slot.
    pub fn add_object(&mut self, object: StageObject) -> NodeId {
        if let Some(id) = self.free_indices.pop() {
            self.nodes[id] = Some(object);
            id
        } else {
            let id = self.nodes.len();
            self.nodes.push(Some(object));
            id
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&StageObject> {
        self.nodes.get(id).and_then(|n| n.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut StageObject> {
        self.nodes.get_mut(id).and_then(|n| n.as_mut())
    }

    pub fn object(&self, id: NodeId) -> Result<&StageObject, EngineError> {
        self.get(id).ok_or(EngineError::UnknownObject(id))
    }

    pub fn object_mut(&mut self, id: NodeId) -> Result<&mut StageObject, EngineError> {
        self.get_mut(id).ok_or(EngineError::UnknownObject(id))
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates live objects with their slots.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &StageObject)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(id, n)| n.as_ref().map(|o| (id, o)))
    }

    /// Appends `child` to the frame of `parent` covering `position`, creating empty
    /// frames up to that position when needed.
    pub fn attach(&mut self, parent: NodeId, position: u32, child: NodeId) -> Result<(), EngineError> {
        self.object(child)?;
        let symbol = self.object_mut(parent)?.as_symbol_mut()?;
        symbol.timeline.ensure_position(position.max(1));
        if let Some(frame) = symbol.timeline.frame_at_mut(position.max(1)) {
            frame.objects.push(child);
        }
        self.object_mut(child)?.derived.parent = Some(parent);
        Ok(())
    }

    /// Appends `child` to the frame `parent` is currently showing.
    pub fn attach_to_current_frame(&mut self, parent: NodeId, child: NodeId) -> Result<(), EngineError> {
        let position = self.object(parent)?.as_symbol()?.playhead;
        self.attach(parent, position, child)
    }

    /// Removes `child` from its parent's frames without destroying it.
    pub fn detach(&mut self, child: NodeId) -> bool {
        let Some(parent) = self.get(child).and_then(|c| c.derived.parent) else {
            return false;
        };
        let removed = match self.get_mut(parent).map(|p| &mut p.kind) {
            Some(ObjectKind::Symbol(symbol)) => symbol.timeline.remove_object(child),
            _ => false,
        };
        if let Some(c) = self.get_mut(child) {
            c.derived.parent = None;
        }
        removed
    }

    /// Detaches and recursively destroys an object, freeing its slot for reuse.
    pub fn destroy_object(&mut self, id: NodeId) {
        if id == self.root || self.get(id).is_none() {
            return;
        }
        self.detach(id);
        for child in self.all_children(id) {
            self.destroy_object(child);
        }
        self.nodes[id] = None;
        self.free_indices.push(id);
        self.pending_refresh.retain(|&n| n != id);
    }

    /// Children of every frame of `id`, in frame order. Empty for shapes.
    pub fn all_children(&self, id: NodeId) -> Vec<NodeId> {
        match self.get(id).map(|o| &o.kind) {
            Some(ObjectKind::Symbol(symbol)) => symbol.timeline.all_objects().collect(),
            _ => Vec::new(),
        }
    }

    /// The frame `id` is currently showing, or `None` for shapes and empty positions.
    pub fn current_frame(&self, id: NodeId) -> Option<&Frame> {
        match &self.get(id)?.kind {
            ObjectKind::Symbol(symbol) => symbol.timeline.frame_at(symbol.playhead),
            ObjectKind::Shape(_) => None,
        }
    }

    /// Children in the current frame, deleted ones included.
    pub fn current_children(&self, id: NodeId) -> Vec<NodeId> {
        self.current_frame(id)
            .map(|f| f.objects.clone())
            .unwrap_or_default()
    }

    /// Non-deleted children in the current frame, in authored order.
    pub fn active_children(&self, id: NodeId) -> Vec<NodeId> {
        self.current_children(id)
            .into_iter()
            .filter(|&c| self.get(c).is_some_and(|o| !o.is_deleted()))
            .collect()
    }

    /// Every object in the active subtree below the root, in pre-order.
    ///
    /// Deleted objects and everything beneath them are excluded.
    pub fn active_objects(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.active_children(self.root).into_iter().rev().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.active_children(id).into_iter().rev());
        }
        out
    }

    /// Whether `id` is part of the active subtree.
    pub fn is_active(&self, id: NodeId) -> bool {
        if id == self.root {
            return true;
        }
        let Some(obj) = self.get(id) else {
            return false;
        };
        if obj.is_deleted() {
            return false;
        }
        match obj.derived.parent {
            Some(parent) => self.current_children(parent).contains(&id) && self.is_active(parent),
            None => false,
        }
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.get(id).and_then(|o| o.derived.parent);
        while let Some(parent) = cursor {
            if out.contains(&parent) {
                break;
            }
            out.push(parent);
            cursor = self.get(parent).and_then(|o| o.derived.parent);
        }
        out
    }

    /// The coordinate space `id` is placed in, folded from its ancestors'
    /// translation and scale. Rotation is not applied.
    pub fn placement_of(&self, id: NodeId) -> Placement {
        let mut placement = Placement::default();
        for ancestor in self.ancestors(id).into_iter().rev() {
            if ancestor == self.root {
                continue;
            }
            if let Some(a) = self.get(ancestor) {
                let t = &a.state.transform;
                placement.origin = placement.apply(Point::new(t.x, t.y));
                placement.scale_x *= t.scale_x;
                placement.scale_y *= t.scale_y;
            }
        }
        placement
    }

    /// Stage-space bounds. Symbols cover their own size and their active children.
    pub fn bounds(&self, id: NodeId) -> Rect {
        let Some(obj) = self.get(id) else {
            return Rect::default();
        };
        let placement = self.placement_of(id);
        let t = &obj.state.transform;
        let own = Rect::from_origin_size(
            placement.apply(Point::new(t.x, t.y)),
            obj.state.size.width * t.scale_x * placement.scale_x,
            obj.state.size.height * t.scale_y * placement.scale_y,
        );
        match obj.kind {
            ObjectKind::Shape(_) => own,
            ObjectKind::Symbol(_) => self
                .active_children(id)
                .into_iter()
                .fold(own, |acc, child| acc.union(&self.bounds(child))),
        }
    }

    pub fn hit_test(&self, id: NodeId, point: Point) -> bool {
        self.get(id).is_some_and(|o| !o.is_deleted()) && self.bounds(id).contains(point)
    }

    pub fn find_by_uid(&self, uid: Uuid) -> Option<NodeId> {
        self.iter()
            .filter(|(_, o)| o.uid == uid)
            .min_by_key(|(_, o)| o.is_clone)
            .map(|(id, _)| id)
    }

    pub fn find_by_id(&self, id: ObjectId) -> Option<NodeId> {
        self.iter().find(|(_, o)| o.id == id).map(|(n, _)| n)
    }

    /// First child named `name` in the current frame of `parent`.
    pub fn child_by_name(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.current_children(parent)
            .into_iter()
            .find(|&c| self.get(c).and_then(|o| o.name()) == Some(name))
    }

    /// Deep-copies `source` and its whole subtree under fresh object ids.
    ///
    /// The copy is detached; universal ids are preserved.
    pub fn copy_subtree(&mut self, source: NodeId) -> Result<NodeId, EngineError> {
        let mut copy = self.object(source)?.duplicate();
        let child_layout: Vec<Vec<NodeId>> = match &mut copy.kind {
            ObjectKind::Symbol(symbol) => symbol
                .timeline
                .frames_mut()
                .iter_mut()
                .map(|f| std::mem::take(&mut f.objects))
                .collect(),
            ObjectKind::Shape(_) => Vec::new(),
        };
        let new_id = self.add_object(copy);
        for (frame_idx, children) in child_layout.into_iter().enumerate() {
            for child in children {
                let child_copy = self.copy_subtree(child)?;
                self.object_mut(child_copy)?.derived.parent = Some(new_id);
                let symbol = self.object_mut(new_id)?.as_symbol_mut()?;
                if let Some(frame) = symbol.timeline.frames_mut().get_mut(frame_idx) {
                    frame.objects.push(child_copy);
                }
            }
        }
        Ok(new_id)
    }

    pub fn request_refresh(&mut self, id: NodeId) {
        if !self.pending_refresh.contains(&id) {
            self.pending_refresh.push(id);
        }
    }

    pub fn take_pending_refresh(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.pending_refresh)
    }

    /// Serializes the frame of `symbol` covering `position` into its snapshot cache.
    pub fn capture_frame(&mut self, symbol: NodeId, position: u32) -> Result<(), EngineError> {
        let Some(frame) = self.object(symbol)?.as_symbol()?.timeline.frame_at(position).cloned()
        else {
            return Ok(());
        };
        let objects = frame
            .objects
            .iter()
            .map(|&child| document::export_object(self, child))
            .collect::<Result<Vec<_>, _>>()?;
        let snapshot = FrameSnapshot {
            length: frame.length,
            objects,
            tweens: frame.tweens,
        };
        self.object_mut(symbol)?
            .as_symbol_mut()?
            .timeline
            .store_frame(position, &snapshot)?;
        debug!(symbol, position, "captured frame");
        Ok(())
    }

    /// Rebuilds the frame at `position` from the snapshot cache.
    ///
    /// Without a snapshot the authored frame is left as is; a position past the end
    /// of the timeline gets a fresh empty frame. Returns whether a snapshot was used.
    pub fn restore_frame(&mut self, symbol: NodeId, position: u32) -> Result<bool, EngineError> {
        let position = position.max(1);
        let snapshot = {
            let sym = self.object_mut(symbol)?.as_symbol_mut()?;
            match sym.timeline.load_frame(position)? {
                Some(snapshot) => snapshot,
                None => {
                    sym.timeline.ensure_position(position);
                    return Ok(false);
                }
            }
        };

        self.object_mut(symbol)?
            .as_symbol_mut()?
            .timeline
            .ensure_position(position);
        let old_children = self
            .object(symbol)?
            .as_symbol()?
            .timeline
            .frame_at(position)
            .map(|f| f.objects.clone())
            .unwrap_or_default();
        for child in old_children {
            self.destroy_object(child);
        }

        let mut children = Vec::with_capacity(snapshot.objects.len());
        for doc in &snapshot.objects {
            let child = document::instantiate(self, doc, IdPolicy::Preserve)?;
            self.object_mut(child)?.derived.parent = Some(symbol);
            children.push(child);
        }
        let sym = self.object_mut(symbol)?.as_symbol_mut()?;
        if let Some(frame) = sym.timeline.frame_at_mut(position) {
            frame.objects = children;
            frame.tweens = snapshot.tweens;
        }
        debug!(symbol, position, "restored frame from snapshot");
        Ok(true)
    }

    /// Editor-style scrubbing: stores the frame being left, moves the playhead and
    /// loads the frame being entered.
    pub fn go_to_frame(&mut self, symbol: NodeId, position: u32) -> Result<(), EngineError> {
        let current = self.object(symbol)?.as_symbol()?.playhead;
        self.capture_frame(symbol, current)?;
        self.restore_frame(symbol, position)?;
        self.object_mut(symbol)?.as_symbol_mut()?.jump_to(position.max(1));
        Ok(())
    }
}
