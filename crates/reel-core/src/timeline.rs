//! # Timeline Store
//!
//! Per-symbol ordered frames plus a write-through snapshot cache.
//!
//! Frames are contiguous from position 1. A frame may cover several playhead
//! positions (`length`). Positions past the end, or frames without objects,
//! are simply empty: that is never an error.

use crate::document::ObjectDocument;
use crate::errors::EngineError;
use crate::tween::Tween;
use crate::types::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Upper bound on the playhead positions one timeline may cover.
pub const MAX_TIMELINE_LENGTH: u32 = 1 << 16;

/// The children and tweens shown while the playhead is inside this frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// Number of playhead positions covered, at least 1.
    pub length: u32,
    /// Child objects in authored (render and evaluation) order.
    pub objects: Vec<NodeId>,
    pub tweens: Vec<Tween>,
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            length: 1,
            objects: Vec::new(),
            tweens: Vec::new(),
        }
    }
}

impl Frame {
    pub fn with_objects(objects: Vec<NodeId>) -> Self {
        Self {
            objects,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Serialized form of a frame kept in the write-through cache.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSnapshot {
    pub length: u32,
    pub objects: Vec<ObjectDocument>,
    #[serde(default)]
    pub tweens: Vec<Tween>,
}

/// Result of moving a playhead forward by one position.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// Moved to the given position.
    Moved(u32),
    /// Passed the last position and wrapped back to 1.
    Wrapped,
    /// A non-looping timeline sits on its last position.
    Ended(u32),
}

#[derive(Clone, Debug, Default)]
pub struct Timeline {
    frames: Vec<Frame>,
    snapshots: BTreeMap<u32, String>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_frames(frames: Vec<Frame>) -> Self {
        let mut timeline = Self::new();
        for frame in frames {
            timeline.push_frame(frame);
        }
        timeline
    }

    pub fn push_frame(&mut self, mut frame: Frame) {
        frame.length = frame.length.max(1);
        self.frames.push(frame);
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frames_mut(&mut self) -> &mut [Frame] {
        &mut self.frames
    }

    /// Total number of playhead positions.
    pub fn frame_count(&self) -> u32 {
        self.frames
            .iter()
            .fold(0u32, |total, f| total.saturating_add(f.length))
    }

    /// Finds the frame covering `position` and the position at which it starts.
    pub fn locate(&self, position: u32) -> Option<(usize, u32)> {
        if position == 0 {
            return None;
        }
        let mut start: u32 = 1;
        for (idx, frame) in self.frames.iter().enumerate() {
            let end = start.saturating_add(frame.length);
            if position < end {
                return Some((idx, start));
            }
            if end == u32::MAX {
                break;
            }
            start = end;
        }
        None
    }

    /// The frame shown at `position`, or `None` when the stage is empty there.
    pub fn frame_at(&self, position: u32) -> Option<&Frame> {
        self.locate(position).map(|(idx, _)| &self.frames[idx])
    }

    pub fn frame_at_mut(&mut self, position: u32) -> Option<&mut Frame> {
        self.locate(position).map(move |(idx, _)| &mut self.frames[idx])
    }

    /// Offset of `position` inside its covering frame.
    pub fn local_position(&self, position: u32) -> Option<u32> {
        self.locate(position).map(|(_, start)| position - start)
    }

    /// Appends empty frames until `position` is covered, up to
    /// [`MAX_TIMELINE_LENGTH`].
    pub fn ensure_position(&mut self, position: u32) {
        let target = position.min(MAX_TIMELINE_LENGTH);
        let count = self.frame_count();
        if count < target {
            self.frames
                .extend(std::iter::repeat_with(Frame::default).take((target - count) as usize));
        }
    }

    /// Every child of every frame, in frame order.
    pub fn all_objects(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.frames.iter().flat_map(|f| f.objects.iter().copied())
    }

    /// Removes `node` from whichever frame holds it. Returns whether it was found.
    pub fn remove_object(&mut self, node: NodeId) -> bool {
        for frame in &mut self.frames {
            if let Some(pos) = frame.objects.iter().position(|&n| n == node) {
                frame.objects.remove(pos);
                return true;
            }
        }
        false
    }

    /// Computes the next playhead position.
    pub fn step(&self, playhead: u32, looping: bool) -> Step {
        let count = self.frame_count().max(1);
        if playhead < count {
            Step::Moved(playhead + 1)
        } else if looping {
            Step::Wrapped
        } else {
            Step::Ended(count)
        }
    }

    /// Moves `playhead` forward by `steps` positions in one go.
    ///
    /// Looping timelines wrap modulo their length; others stop on the last position.
    pub fn advance(&self, playhead: u32, steps: u64, looping: bool) -> Step {
        let count = u64::from(self.frame_count().max(1));
        let playhead = u64::from(playhead.max(1));
        if steps == 0 {
            return Step::Moved(playhead as u32);
        }
        if looping {
            // past the end, the first step wraps to 1
            let (start, steps) = if playhead > count {
                (1, steps - 1)
            } else {
                (playhead, steps)
            };
            Step::Moved(((start - 1 + steps % count) % count + 1) as u32)
        } else if steps <= count.saturating_sub(playhead) {
            Step::Moved((playhead + steps) as u32)
        } else {
            Step::Ended(count as u32)
        }
    }

    /// Stores `snapshot` as the cached state of `position`.
    pub fn store_frame(&mut self, position: u32, snapshot: &FrameSnapshot) -> Result<(), EngineError> {
        let encoded = serde_json::to_string(snapshot)
            .map_err(|e| EngineError::Snapshot(format!("encode frame {position}: {e}")))?;
        self.snapshots.insert(position, encoded);
        Ok(())
    }

    /// Loads the cached state of `position`, if one was stored.
    pub fn load_frame(&self, position: u32) -> Result<Option<FrameSnapshot>, EngineError> {
        self.snapshots
            .get(&position)
            .map(|encoded| {
                serde_json::from_str(encoded)
                    .map_err(|e| EngineError::Snapshot(format!("decode frame {position}: {e}")))
            })
            .transpose()
    }

    pub fn has_snapshot(&self, position: u32) -> bool {
        self.snapshots.contains_key(&position)
    }
}
